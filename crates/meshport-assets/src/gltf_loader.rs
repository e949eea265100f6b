use std::ops::Range;

use gltf::mesh::Mode;
use meshport_core::{Vec3, Vec4};
use tracing::debug;

use crate::error::AssetError;
use crate::scene::{Face, Node, Scene, SceneMesh};

/// Parse a glTF 2.0 asset (`.glb`, or `.gltf` with embedded buffers) from
/// memory.
///
/// Every primitive becomes its own scene mesh; a node referencing a glTF
/// mesh lists all of that mesh's primitives in order.
pub fn parse_gltf(bytes: &[u8]) -> Result<Scene, AssetError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| AssetError::GltfLoadFailed(e.to_string()))?;

    let mut meshes = Vec::new();
    let mut primitive_ranges: Vec<Range<usize>> = Vec::new();

    for mesh in document.meshes() {
        let name = mesh.name().unwrap_or("unnamed");
        let start = meshes.len();
        let split = mesh.primitives().len() > 1;

        for primitive in mesh.primitives() {
            let name = if split {
                format!("{name}.{}", primitive.index())
            } else {
                name.to_string()
            };
            meshes.push(read_primitive(&primitive, &buffers, name)?);
        }

        primitive_ranges.push(start..meshes.len());
    }

    let root = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => Node {
            name: scene.name().unwrap_or_default().to_string(),
            meshes: Vec::new(),
            children: scene
                .nodes()
                .map(|node| convert_node(&node, &primitive_ranges))
                .collect(),
        },
        // Without a scene there is no hierarchy, so every mesh hangs off the root.
        None => Node {
            name: String::new(),
            meshes: (0..meshes.len()).collect(),
            children: Vec::new(),
        },
    };

    let scene = Scene { root, meshes };
    debug!(
        "glTF scene: {} meshes, {} mesh instances",
        scene.meshes.len(),
        scene.mesh_instance_count()
    );
    Ok(scene)
}

fn convert_node(node: &gltf::Node<'_>, primitive_ranges: &[Range<usize>]) -> Node {
    Node {
        name: node.name().unwrap_or_default().to_string(),
        meshes: node
            .mesh()
            .and_then(|mesh| primitive_ranges.get(mesh.index()))
            .map(|range| range.clone().collect())
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| convert_node(&child, primitive_ranges))
            .collect(),
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    name: String,
) -> Result<SceneMesh, AssetError> {
    if primitive.mode() != Mode::Triangles {
        return Err(AssetError::GltfLoadFailed(format!(
            "primitive '{name}' uses {:?}, only triangle lists are supported",
            primitive.mode()
        )));
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Option<Vec<Vec3>> = reader
        .read_positions()
        .map(|iter| iter.map(Vec3::from).collect());
    let vertex_count = positions.as_ref().map_or(0, Vec::len);

    let normals: Option<Vec<Vec3>> = reader
        .read_normals()
        .map(|iter| iter.map(Vec3::from).collect());

    let uvs: Option<Vec<Vec3>> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().map(|[u, v]| Vec3::new(u, v, 0.0)).collect());

    let colors: Option<Vec<Vec4>> = reader
        .read_colors(0)
        .map(|c| c.into_rgba_f32().map(Vec4::from).collect());

    // glTF tangents are vec4, the w component carries the bitangent sign.
    let raw_tangents: Option<Vec<Vec4>> = reader
        .read_tangents()
        .map(|iter| iter.map(Vec4::from).collect());
    let bitangents = match (&normals, &raw_tangents) {
        (Some(normals), Some(tangents)) => Some(
            normals
                .iter()
                .zip(tangents)
                .map(|(normal, tangent)| normal.cross(tangent.truncate()) * tangent.w)
                .collect(),
        ),
        _ => None,
    };
    let tangents = raw_tangents.map(|t| t.into_iter().map(Vec4::truncate).collect());

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|idx| idx.into_u32().collect())
        .unwrap_or_else(|| (0..vertex_count as u32).collect());
    if indices.len() % 3 != 0 {
        return Err(AssetError::Malformed(format!(
            "primitive '{name}' has {} indices, not a triangle list",
            indices.len()
        )));
    }
    let faces = indices.chunks_exact(3).map(Face::new).collect();

    debug!("Loaded glTF primitive '{}' with {} vertices", name, vertex_count);
    Ok(SceneMesh {
        name,
        vertex_count,
        faces,
        positions,
        normals,
        uvs,
        tangents,
        bitangents,
        colors,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a binary glTF with one triangle buffer shared by two meshes:
    /// `parent` on the root node and `child` on its only child.
    pub(crate) fn two_node_glb() -> Vec<u8> {
        let mut bin = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [
                {"name": "root", "mesh": 0, "children": [1]},
                {"name": "leaf", "mesh": 1}
            ],
            "meshes": [
                {"name": "parent", "primitives": [{"attributes": {"POSITION": 0}}]},
                {"name": "child", "primitives": [{"attributes": {"POSITION": 0}}]}
            ],
            "buffers": [{"byteLength": 36}],
            "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
            "accessors": [{
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            }]
        }"#;
        glb(json.as_bytes(), &bin)
    }

    fn glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
        let mut json = json.to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    #[test]
    fn parses_node_tree_and_meshes() {
        let scene = parse_gltf(&two_node_glb()).unwrap();
        assert_eq!(scene.meshes.len(), 2);
        assert_eq!(scene.meshes[0].name, "parent");
        assert_eq!(scene.meshes[1].name, "child");

        let root = &scene.root.children[0];
        assert_eq!(root.name, "root");
        assert_eq!(root.meshes, vec![0]);
        assert_eq!(root.children[0].meshes, vec![1]);

        let mesh = &scene.meshes[0];
        assert_eq!(mesh.vertex_count, 3);
        assert_eq!(mesh.faces, vec![Face::new([0, 1, 2])]);
        assert!(mesh.normals.is_none());
        assert!(mesh.uvs.is_none());
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        let result = parse_gltf(b"definitely not gltf");
        assert!(matches!(result, Err(AssetError::GltfLoadFailed(_))));
    }
}

use std::io::Cursor;
use std::path::Path;

use meshport_core::{Vec3, Vec4};
use tracing::debug;

use crate::error::AssetError;
use crate::scene::{Face, Node, Scene, SceneMesh};

/// Parse a Wavefront OBJ file from memory.
///
/// Vertices are re-indexed so every channel shares one index, and polygons
/// are triangulated. Each OBJ object becomes a child node of the root holding
/// a single mesh. Material libraries are not resolved.
pub fn parse_obj(bytes: &[u8]) -> Result<Scene, AssetError> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    };

    let mut reader = Cursor::new(bytes);
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &options, |_: &Path| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .map_err(|e| AssetError::ObjLoadFailed(e.to_string()))?;

    let mut meshes = Vec::with_capacity(models.len());
    let mut children = Vec::with_capacity(models.len());

    for model in models {
        let mesh = &model.mesh;
        let vertex_count = mesh.positions.len() / 3;

        let vec3s = |flat: &[f32]| -> Option<Vec<Vec3>> {
            (!flat.is_empty()).then(|| flat.chunks_exact(3).map(Vec3::from_slice).collect())
        };

        let uvs: Option<Vec<Vec3>> = (!mesh.texcoords.is_empty()).then(|| {
            mesh.texcoords
                .chunks_exact(2)
                .map(|uv| Vec3::new(uv[0], uv[1], 0.0))
                .collect()
        });

        let colors: Option<Vec<Vec4>> = (!mesh.vertex_color.is_empty()).then(|| {
            mesh.vertex_color
                .chunks_exact(3)
                .map(|rgb| Vec4::new(rgb[0], rgb[1], rgb[2], 1.0))
                .collect()
        });

        let faces: Vec<Face> = if mesh.face_arities.is_empty() {
            mesh.indices.chunks(3).map(Face::new).collect()
        } else {
            let mut faces = Vec::with_capacity(mesh.face_arities.len());
            let mut start = 0;
            for &arity in &mesh.face_arities {
                let end = start + arity as usize;
                faces.push(Face::new(&mesh.indices[start..end]));
                start = end;
            }
            faces
        };

        debug!("Loaded OBJ object '{}' with {} vertices", model.name, vertex_count);
        children.push(Node {
            name: model.name.clone(),
            meshes: vec![meshes.len()],
            children: Vec::new(),
        });
        meshes.push(SceneMesh {
            name: model.name.clone(),
            vertex_count,
            faces,
            positions: vec3s(&mesh.positions),
            normals: vec3s(&mesh.normals),
            uvs,
            tangents: None,
            bitangents: None,
            colors,
        });
    }

    Ok(Scene {
        root: Node {
            name: String::new(),
            meshes: Vec::new(),
            children,
        },
        meshes,
    })
}

/// A unit cube spanning -1..1 with per-face normals.
#[cfg(test)]
pub(crate) const CUBE_OBJ: &str = include_str!("../testdata/cube.obj");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_reindexed_and_triangulated() {
        let scene = parse_obj(CUBE_OBJ.as_bytes()).unwrap();
        assert_eq!(scene.meshes.len(), 1);

        let cube = &scene.meshes[0];
        assert_eq!(cube.name, "Cube");
        assert_eq!(cube.vertex_count, 24);
        assert_eq!(cube.faces.len(), 12);
        assert!(cube.faces.iter().all(|face| face.indices.len() == 3));
        assert_eq!(cube.normals.as_ref().map(Vec::len), Some(24));
        assert!(cube.uvs.is_none());
        assert!(cube.colors.is_none());

        assert_eq!(scene.root.children.len(), 1);
        assert_eq!(scene.root.children[0].meshes, vec![0]);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn objects_become_sibling_nodes() {
        let source = "\
o First
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
f 1/1 2/2 3/3
o Second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
        let scene = parse_obj(source.as_bytes()).unwrap();
        let names: Vec<_> = scene.meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(scene.root.children[1].meshes, vec![1]);

        let first = &scene.meshes[0];
        assert_eq!(first.uvs.as_ref().map(Vec::len), Some(3));
        let second = &scene.meshes[1];
        assert_eq!(second.vertex_count, 3);
        assert!(second.uvs.is_none());
        assert_eq!(second.faces[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn broken_face_is_an_error() {
        let result = parse_obj(b"v 0 0 0\nf 1 2 3\n");
        assert!(matches!(result, Err(AssetError::ObjLoadFailed(_))));
    }
}

//! Renderer-agnostic scene data as handed over by a scene provider.

use meshport_core::{Vec3, Vec4};

use crate::error::AssetError;

/// A parsed scene: a node tree whose nodes index into a flat mesh list.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub root: Node,
    pub meshes: Vec<SceneMesh>,
}

/// One node of the scene tree.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: String,
    /// Indices into [`Scene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<Node>,
}

/// A polygon of the source mesh. Providers triangulate, but indices are
/// carried per face so consumers never assume an arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl Face {
    pub fn new(indices: impl Into<Vec<u32>>) -> Self {
        Self {
            indices: indices.into(),
        }
    }
}

/// Vertex data for a single mesh. Every present channel holds exactly
/// `vertex_count` elements.
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub vertex_count: usize,
    pub faces: Vec<Face>,
    pub positions: Option<Vec<Vec3>>,
    pub normals: Option<Vec<Vec3>>,
    /// Texture coordinates of channel 0. The third component is unused by
    /// most formats.
    pub uvs: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    /// Vertex colors of channel 0, RGBA.
    pub colors: Option<Vec<Vec4>>,
}

impl SceneMesh {
    /// Total number of face indices.
    pub fn index_count(&self) -> usize {
        self.faces.iter().map(|face| face.indices.len()).sum()
    }

    fn validate(&self) -> Result<(), AssetError> {
        let lengths = [
            ("positions", self.positions.as_ref().map(Vec::len)),
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("uvs", self.uvs.as_ref().map(Vec::len)),
            ("tangents", self.tangents.as_ref().map(Vec::len)),
            ("bitangents", self.bitangents.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
        ];
        for (channel, len) in lengths {
            if let Some(len) = len.filter(|&len| len != self.vertex_count) {
                return Err(AssetError::Malformed(format!(
                    "mesh '{}' has {len} {channel} for {} vertices",
                    self.name, self.vertex_count
                )));
            }
        }

        let out_of_range = self
            .faces
            .iter()
            .flat_map(|face| face.indices.iter())
            .find(|&&index| index as usize >= self.vertex_count);
        if let Some(index) = out_of_range {
            return Err(AssetError::Malformed(format!(
                "mesh '{}' references vertex {index} of {}",
                self.name, self.vertex_count
            )));
        }
        Ok(())
    }
}

impl Scene {
    /// Check the invariants consumers rely on: channel lengths match the
    /// vertex count, face indices are in range and nodes only reference
    /// existing meshes.
    pub fn validate(&self) -> Result<(), AssetError> {
        for mesh in &self.meshes {
            mesh.validate()?;
        }
        self.validate_node(&self.root)
    }

    fn validate_node(&self, node: &Node) -> Result<(), AssetError> {
        if let Some(&index) = node.meshes.iter().find(|&&i| i >= self.meshes.len()) {
            return Err(AssetError::Malformed(format!(
                "node '{}' references mesh {index} of {}",
                node.name,
                self.meshes.len()
            )));
        }
        node.children
            .iter()
            .try_for_each(|child| self.validate_node(child))
    }

    /// Number of mesh slots a depth-first walk of the tree visits. A mesh
    /// referenced by several nodes is counted once per node.
    pub fn mesh_instance_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.meshes.len() + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> SceneMesh {
        SceneMesh {
            name: "tri".into(),
            vertex_count: 3,
            faces: vec![Face::new([0, 1, 2])],
            positions: Some(vec![Vec3::ZERO, Vec3::X, Vec3::Y]),
            ..Default::default()
        }
    }

    #[test]
    fn valid_scene_passes() {
        let scene = Scene {
            root: Node {
                meshes: vec![0],
                children: vec![Node {
                    meshes: vec![0],
                    ..Default::default()
                }],
                ..Default::default()
            },
            meshes: vec![triangle()],
        };
        assert!(scene.validate().is_ok());
        assert_eq!(scene.mesh_instance_count(), 2);
        assert_eq!(scene.meshes[0].index_count(), 3);
    }

    #[test]
    fn short_channel_is_malformed() {
        let mut mesh = triangle();
        mesh.normals = Some(vec![Vec3::Z]);
        let scene = Scene {
            root: Node::default(),
            meshes: vec![mesh],
        };
        assert!(matches!(scene.validate(), Err(AssetError::Malformed(_))));
    }

    #[test]
    fn face_index_out_of_range_is_malformed() {
        let mut mesh = triangle();
        mesh.faces.push(Face::new([0, 1, 3]));
        let scene = Scene {
            root: Node::default(),
            meshes: vec![mesh],
        };
        assert!(matches!(scene.validate(), Err(AssetError::Malformed(_))));
    }

    #[test]
    fn dangling_node_mesh_is_malformed() {
        let scene = Scene {
            root: Node {
                children: vec![Node {
                    name: "child".into(),
                    meshes: vec![4],
                    ..Default::default()
                }],
                ..Default::default()
            },
            meshes: vec![triangle()],
        };
        let err = scene.validate().unwrap_err();
        assert!(err.to_string().contains("child"));
    }
}

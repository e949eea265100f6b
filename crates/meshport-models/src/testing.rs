//! Fixtures shared by the unit tests of this crate.

use std::collections::HashMap;

use meshport_assets::{AssetError, DataLoader, Face, Node, Scene, SceneMesh, SceneProvider};
use meshport_core::Vec3;

pub(crate) const TRIANGLE_OBJ: &str = "\
o Tri
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";

/// A unit cube spanning -1..1 with per-face normals, 24 vertices after
/// re-indexing. Shared with the OBJ loader tests.
pub(crate) const CUBE_OBJ: &str = include_str!("../../meshport-assets/testdata/cube.obj");

/// Serves the same bytes for every address once `delay` polls have come
/// back empty.
pub(crate) struct ScriptedLoader {
    delay: usize,
    polls: usize,
    bytes: Vec<u8>,
}

impl ScriptedLoader {
    pub fn after(delay: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            delay,
            polls: 0,
            bytes: bytes.into(),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl DataLoader for ScriptedLoader {
    fn try_consume(&mut self, _address: &str) -> Result<Option<Vec<u8>>, AssetError> {
        self.polls += 1;
        Ok((self.polls > self.delay).then(|| self.bytes.clone()))
    }
}

/// Hands out prepared scenes keyed by the bytes' text.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    scenes: HashMap<String, Scene>,
}

impl ScriptedProvider {
    pub fn with(mut self, key: &str, scene: Scene) -> Self {
        self.scenes.insert(key.to_string(), scene);
        self
    }
}

impl SceneProvider for ScriptedProvider {
    fn parse(&self, bytes: &[u8], _format_hint: &str) -> Result<Scene, AssetError> {
        let key = String::from_utf8_lossy(bytes);
        self.scenes
            .get(&*key)
            .cloned()
            .ok_or_else(|| AssetError::Malformed(format!("no scene scripted for '{key}'")))
    }
}

/// A one-triangle mesh shifted by `offset`.
pub(crate) fn triangle(name: &str, offset: f32) -> SceneMesh {
    let origin = Vec3::splat(offset);
    SceneMesh {
        name: name.into(),
        vertex_count: 3,
        faces: vec![Face::new([0, 1, 2])],
        positions: Some(vec![origin, origin + Vec3::X, origin + Vec3::Y]),
        normals: Some(vec![Vec3::Z; 3]),
        ..SceneMesh::default()
    }
}

/// A scene whose root node holds one triangle per name.
pub(crate) fn flat_scene(names: &[&str]) -> Scene {
    Scene {
        root: Node {
            name: "root".into(),
            meshes: (0..names.len()).collect(),
            children: Vec::new(),
        },
        meshes: names
            .iter()
            .enumerate()
            .map(|(i, name)| triangle(name, i as f32))
            .collect(),
    }
}

use tracing::debug;

use crate::error::AssetError;
use crate::gltf_loader::parse_gltf;
use crate::obj_loader::parse_obj;
use crate::scene::Scene;

/// Turns raw asset bytes into a read-only scene tree.
///
/// The returned scene is owned by the caller and released when dropped.
pub trait SceneProvider {
    fn parse(&self, bytes: &[u8], format_hint: &str) -> Result<Scene, AssetError>;
}

/// Scene formats understood by [`Importer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Gltf,
    Obj,
}

impl SceneFormat {
    /// Map a file extension style hint (`"glb"`, `".OBJ"`) to a format.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().trim_start_matches('.');
        if hint.eq_ignore_ascii_case("gltf") || hint.eq_ignore_ascii_case("glb") {
            Some(SceneFormat::Gltf)
        } else if hint.eq_ignore_ascii_case("obj") {
            Some(SceneFormat::Obj)
        } else {
            None
        }
    }

    /// Guess the format from the leading bytes. Only glTF is recognizable.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"glTF") {
            return Some(SceneFormat::Gltf);
        }
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace())?;
        (*first == b'{').then_some(SceneFormat::Gltf)
    }
}

/// Default scene provider: glTF via the `gltf` crate, OBJ via `tobj`.
///
/// An empty hint falls back to sniffing the bytes. Parsed scenes are
/// validated before they are handed out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Importer;

impl Importer {
    pub fn new() -> Self {
        Self
    }
}

impl SceneProvider for Importer {
    fn parse(&self, bytes: &[u8], format_hint: &str) -> Result<Scene, AssetError> {
        let format = if format_hint.trim().is_empty() {
            SceneFormat::sniff(bytes)
        } else {
            SceneFormat::from_hint(format_hint)
        }
        .ok_or_else(|| AssetError::UnsupportedFormat(format_hint.to_string()))?;

        debug!("Parsing {} bytes as {:?}", bytes.len(), format);
        let scene = match format {
            SceneFormat::Gltf => parse_gltf(bytes)?,
            SceneFormat::Obj => parse_obj(bytes)?,
        };
        scene.validate()?;
        Ok(scene)
    }
}

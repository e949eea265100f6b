//! Records the import engine reads and writes.

use std::fmt;

use bitflags::bitflags;
use meshport_core::{Vec2, Vec3, Vec4};
use meshport_ecs::{ArrayElement, Entity, RefIndex, World};

use crate::settings::ImportSettings;

/// Maximum number of bytes kept from a format hint.
pub const MAX_FORMAT_LEN: usize = 8;

/// A short file-extension style format hint (`"glb"`, `"obj"`), stored
/// inline. Leading dots are stripped, letters lowercased, and anything that
/// is not ASCII alphanumeric dropped.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatHint {
    bytes: [u8; MAX_FORMAT_LEN],
    len: u8,
}

impl FormatHint {
    pub fn new(hint: &str) -> Self {
        let mut bytes = [0u8; MAX_FORMAT_LEN];
        let mut len = 0;
        for byte in hint.trim().trim_start_matches('.').bytes() {
            if len == MAX_FORMAT_LEN {
                break;
            }
            if byte.is_ascii_alphanumeric() {
                bytes[len] = byte.to_ascii_lowercase();
                len += 1;
            }
        }
        Self {
            bytes,
            len: len as u8,
        }
    }

    /// Derive the hint from the extension of the last path segment of an
    /// address. No extension gives an empty hint.
    pub fn from_address(address: &str) -> Self {
        let file = address.rsplit(['/', '\\']).next().unwrap_or(address);
        match file.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => Self::new(extension),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatHint({:?})", self.as_str())
    }
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a [`ModelRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestStatus {
    #[default]
    Submitted,
    Loading,
    Loaded,
    /// The source never produced bytes before the timeout. Terminal.
    NotFound,
    /// The bytes could not be turned into meshes. Terminal.
    Failed,
}

impl RequestStatus {
    /// Terminal states are never advanced again until the caller resubmits.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::NotFound | RequestStatus::Failed)
    }
}

/// Caller-owned request to load a model from an address.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub address: String,
    pub format: FormatHint,
    pub status: RequestStatus,
    /// Seconds spent waiting for bytes in the current load attempt.
    pub duration: f32,
    /// Seconds to wait for bytes before giving up.
    pub timeout: f32,
    /// Declared version. Bumping it asks for a reimport.
    pub version: u32,
}

impl ModelRequest {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            format: FormatHint::from_address(&address),
            address,
            status: RequestStatus::Submitted,
            duration: 0.0,
            timeout: ImportSettings::DEFAULT_TIMEOUT,
            version: 0,
        }
    }

    pub fn with_format(mut self, hint: &str) -> Self {
        self.format = FormatHint::new(hint);
        self
    }

    pub fn with_timeout(mut self, timeout: f32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask for the model to be imported again from the same address.
    pub fn request_reimport(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Restart a request, including one that ended in a terminal state.
    pub fn resubmit(&mut self) {
        self.status = RequestStatus::Submitted;
        self.duration = 0.0;
        self.request_reimport();
    }

    /// Spawn a new entity carrying this request.
    pub fn spawn(self, world: &mut World) -> Entity {
        let entity = world.spawn();
        world.insert(entity, self);
        entity
    }
}

/// Written on a model entity once a scene has been reconciled into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Model {
    /// Bumped on every successful import.
    pub version: u32,
    /// The [`ModelRequest::version`] the current meshes were imported from.
    pub imported_version: u32,
}

/// Element of a model's ordered mesh list: a reference slot on the model
/// that resolves to a mesh record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelMesh(pub RefIndex);

/// Display name of a mesh record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(pub String);

bitflags! {
    /// Vertex channels present on a mesh record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u8 {
        const POSITIONS = 1;
        const UVS = 1 << 1;
        const NORMALS = 1 << 2;
        const TANGENTS = 1 << 3;
        const BITANGENTS = 1 << 4;
        const COLORS = 1 << 5;
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        ChannelMask::empty()
    }
}

/// Header of a mesh record. The vertex data lives in per-channel arrays on
/// the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mesh {
    /// Bumped on every write.
    pub version: u32,
    pub channels: ChannelMask,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Caller-owned request for a copy of one mesh of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshRequest {
    /// Reference slot on the requesting entity that resolves to the model.
    pub model: RefIndex,
    pub mesh_index: u32,
    /// Declared version. Bumping it asks for a fresh copy.
    pub version: u32,
    /// [`Model::version`] of the last copy.
    pub source_version: u32,
    pub loaded: bool,
}

impl MeshRequest {
    pub fn new(model: RefIndex, mesh_index: u32) -> Self {
        Self {
            model,
            mesh_index,
            ..Self::default()
        }
    }

    /// Spawn an entity requesting mesh `mesh_index` of `model`. Returns
    /// `None` when `model` is not alive.
    pub fn spawn(world: &mut World, model: Entity, mesh_index: u32) -> Option<Entity> {
        if !world.is_alive(model) {
            return None;
        }
        let entity = world.spawn();
        let reference = world.add_reference(entity, model)?;
        world.insert(entity, MeshRequest::new(reference, mesh_index));
        Some(entity)
    }
}

/// Element type of a vertex channel array, tied to its bit in
/// [`ChannelMask`].
pub trait VertexChannel: ArrayElement + Copy {
    const MASK: ChannelMask;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexPosition(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexUv(pub Vec2);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexNormal(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexTangent(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexBitangent(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexColor(pub Vec4);

/// Flattened face indices. Not a channel; every mesh record carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexIndex(pub u32);

impl VertexChannel for VertexPosition {
    const MASK: ChannelMask = ChannelMask::POSITIONS;
}

impl VertexChannel for VertexUv {
    const MASK: ChannelMask = ChannelMask::UVS;
}

impl VertexChannel for VertexNormal {
    const MASK: ChannelMask = ChannelMask::NORMALS;
}

impl VertexChannel for VertexTangent {
    const MASK: ChannelMask = ChannelMask::TANGENTS;
}

impl VertexChannel for VertexBitangent {
    const MASK: ChannelMask = ChannelMask::BITANGENTS;
}

impl VertexChannel for VertexColor {
    const MASK: ChannelMask = ChannelMask::COLORS;
}

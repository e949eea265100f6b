//! Meshport Models - incremental model import
//!
//! Turns [`ModelRequest`] records into a model entity with one child mesh
//! record per mesh of the source scene, and copies meshes onto
//! [`MeshRequest`] records. All writes go through deferred command buffers
//! and unchanged records are skipped, so steady state costs nothing.
//!
//! ```ignore
//! let mut system = ModelImportSystem::with_loader(DataServer::with_base_path("assets"));
//! let model = ModelRequest::new("ship.glb").spawn(&mut world);
//! let hull = MeshRequest::spawn(&mut world, model, 0);
//! system.update(&mut world, delta)?;
//! ```

mod channels;
mod components;
mod error;
mod fanout;
mod identity;
mod reconcile;
mod request;
mod settings;
mod system;
mod version;
mod view;

#[cfg(test)]
mod testing;

pub use components::{
    ChannelMask, FormatHint, Mesh, MeshRequest, Model, ModelMesh, ModelRequest, Name,
    RequestStatus, VertexBitangent, VertexChannel, VertexColor, VertexIndex, VertexNormal,
    VertexPosition, VertexTangent, VertexUv, MAX_FORMAT_LEN,
};
pub use error::ImportError;
pub use settings::{IdentityStrategy, ImportSettings, OrphanPolicy};
pub use system::{ModelImportSystem, TickStats};
pub use version::{FanoutStamp, VersionCache};
pub use view::{MeshView, ModelView};

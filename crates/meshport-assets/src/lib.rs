//! Meshport Assets - scene parsing and byte sources
//!
//! Provides the scene tree handed to the import engine, glTF 2.0 and OBJ
//! parsing behind the [`SceneProvider`] trait, and the polled
//! [`DataLoader`] byte source.

mod error;
mod gltf_loader;
mod obj_loader;
mod provider;
mod scene;
mod server;

pub use error::AssetError;
pub use gltf_loader::parse_gltf;
pub use obj_loader::parse_obj;
pub use provider::{Importer, SceneFormat, SceneProvider};
pub use scene::{Face, Node, Scene, SceneMesh};
pub use server::{DataLoader, DataServer};

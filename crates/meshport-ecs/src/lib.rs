//! Meshport ECS - Entity Component System
//!
//! A small ECS built around generational entities and sparse-set storage.
//! Besides components, entities carry typed variable-length arrays, an
//! optional parent and a list of references to other entities whose slots
//! never move.
//! Structural changes are staged in a [`CommandBuffer`] and applied between
//! query passes.

mod command;
mod component;
mod entity;
mod query;
mod resource;
mod system;
mod world;

pub use command::{Command, CommandBuffer, CommandError, Target, WriteKind};
pub use component::{ArrayElement, Component, Storages};
pub use entity::{Entity, RefIndex};
pub use query::{QueryIter, WorldQuery};
pub use resource::Resources;
pub use system::{System, SystemSchedule};
pub use world::World;

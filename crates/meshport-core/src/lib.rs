//! Meshport Core - Core types and utilities for meshport
//!
//! This crate provides the foundational types shared by the other crates:
//! - Mathematical primitives (re-exported from glam)
//! - Axis-aligned bounds for vertex data
//! - Frame time for tick-driven systems

pub mod time;
pub mod types;

pub use glam::{Vec2, Vec3, Vec4};
pub use time::FrameTime;
pub use types::Bounds;

use meshport_assets::AssetError;
use meshport_ecs::{CommandError, Entity, RefIndex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("model {model} has no live mesh behind {reference}")]
    MissingMeshReference { model: Entity, reference: RefIndex },

    #[error("mesh index {index} is out of range for model {model} with {count} meshes")]
    MeshIndexOutOfRange {
        model: Entity,
        index: u32,
        count: usize,
    },

    #[error("failed to apply staged commands: {0}")]
    Command(#[from] CommandError),
}

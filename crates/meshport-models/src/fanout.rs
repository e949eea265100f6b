//! Copying a model's meshes onto entities that asked for them.

use meshport_ecs::{CommandBuffer, Entity, World};
use tracing::trace;

use crate::channels::MeshData;
use crate::components::{Mesh, MeshRequest, Model, ModelMesh, Name};
use crate::error::ImportError;
use crate::reconcile::upsert;
use crate::version::FanoutStamp;

/// The model behind a mesh request, once it has been imported.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadySource {
    pub model: Entity,
    pub stamp: FanoutStamp,
}

/// Resolve the model a request points at. `None` while the reference does
/// not resolve or the model has not been imported yet.
pub(crate) fn ready_source(
    world: &World,
    entity: Entity,
    request: &MeshRequest,
) -> Option<ReadySource> {
    let model = world.reference(entity, request.model)?;
    let imported = world.get::<Model>(model)?;
    Some(ReadySource {
        model,
        stamp: FanoutStamp {
            request: request.version,
            model: imported.version,
        },
    })
}

/// Stage a copy of the requested mesh onto `entity`.
///
/// The copy carries every channel array, the index array, the name and the
/// mesh header of the source record. The request is then marked loaded.
pub(crate) fn copy_mesh(
    world: &World,
    entity: Entity,
    request: &MeshRequest,
    source: ReadySource,
    buffer: &mut CommandBuffer,
) -> Result<(), ImportError> {
    let meshes = world
        .array::<ModelMesh>(source.model)
        .unwrap_or_default();
    let reference = meshes
        .get(request.mesh_index as usize)
        .ok_or(ImportError::MeshIndexOutOfRange {
            model: source.model,
            index: request.mesh_index,
            count: meshes.len(),
        })?
        .0;
    let missing = ImportError::MissingMeshReference {
        model: source.model,
        reference,
    };
    let Some(record) = world.reference(source.model, reference) else {
        return Err(missing);
    };
    let Some(header) = world.get::<Mesh>(record) else {
        return Err(missing);
    };

    let data = MeshData::from_record(world, record, header.vertex_count as usize);
    buffer.select(entity);
    if let Some(name) = world.get::<Name>(record) {
        upsert(buffer, world, entity, name.clone());
    }
    let staged = data.stage(buffer, world, Some(entity));
    let version = world
        .get::<Mesh>(entity)
        .map_or(1, |mesh| mesh.version.wrapping_add(1));
    upsert(
        buffer,
        world,
        entity,
        Mesh {
            version,
            channels: staged.channels,
            vertex_count: staged.vertex_count,
            index_count: staged.index_count,
        },
    );
    buffer.set_component(MeshRequest {
        source_version: source.stamp.model,
        loaded: true,
        ..*request
    });

    trace!(?entity, ?record, mesh_index = request.mesh_index, "copied mesh");
    Ok(())
}

//! Turns a parsed scene into staged writes against a model entity and its
//! mesh records, reusing records from the previous import where it can.

use meshport_assets::{AssetError, Node, Scene, SceneMesh};
use meshport_ecs::{CommandBuffer, Component, Entity, RefIndex, Target, World};
use tracing::{debug, trace};

use crate::channels::MeshData;
use crate::components::{Mesh, Model, ModelMesh, Name};
use crate::error::ImportError;
use crate::identity::{self, ExistingMesh, MeshIdentity};
use crate::settings::{ImportSettings, OrphanPolicy};

/// Counts from one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Reconciliation {
    pub meshes: usize,
    pub created: usize,
    pub reused: usize,
    pub orphaned: usize,
}

/// Stage the writes that make `model` reflect `scene`.
///
/// Meshes are visited depth first: a node's own meshes in order, then its
/// children in order. Nothing is written to `world`; every change goes
/// through `buffer`.
pub(crate) fn reconcile(
    world: &World,
    model: Entity,
    scene: &Scene,
    declared_version: u32,
    settings: &ImportSettings,
    buffer: &mut CommandBuffer,
) -> Result<Reconciliation, ImportError> {
    let existing = existing_meshes(world, model);
    let had_mesh_list = world.has_array::<ModelMesh>(model);

    let mut walk = Walk {
        world,
        model,
        scene,
        buffer,
        identity: identity::resolver(settings.identity, existing),
        free_slots: world.dead_references(model).into_iter(),
        next_reference: RefIndex(world.reference_count(model) as u32 + 1),
        meshes: Vec::with_capacity(scene.meshes.len()),
        stats: Reconciliation::default(),
    };
    walk.node(&scene.root)?;

    let Walk {
        buffer,
        identity,
        meshes,
        mut stats,
        ..
    } = walk;

    for orphan in identity.unclaimed() {
        stats.orphaned += 1;
        if let (OrphanPolicy::Destroy, Some(entity)) = (settings.orphans, orphan.entity) {
            trace!(?entity, "destroying orphaned mesh");
            buffer.select(entity).destroy();
        }
    }

    stats.meshes = meshes.len();
    buffer.select(model);
    if !had_mesh_list {
        buffer.create_array::<ModelMesh>();
    }
    buffer
        .resize_array::<ModelMesh>(meshes.len())
        .set_array_elements(0, meshes);

    match world.get::<Model>(model) {
        Some(previous) => buffer.set_component(Model {
            version: previous.version.wrapping_add(1),
            imported_version: declared_version,
        }),
        None => buffer.add_component(Model {
            version: 1,
            imported_version: declared_version,
        }),
    };

    debug!(
        ?model,
        meshes = stats.meshes,
        created = stats.created,
        reused = stats.reused,
        orphaned = stats.orphaned,
        "reconciled model"
    );
    Ok(stats)
}

fn existing_meshes(world: &World, model: Entity) -> Vec<ExistingMesh> {
    world
        .array::<ModelMesh>(model)
        .unwrap_or_default()
        .iter()
        .map(|&reference| {
            let entity = world.reference(model, reference.0);
            ExistingMesh {
                reference,
                entity,
                name: entity
                    .and_then(|entity| world.get::<Name>(entity))
                    .map(|name| name.0.clone()),
            }
        })
        .collect()
}

struct Walk<'a> {
    world: &'a World,
    model: Entity,
    scene: &'a Scene,
    buffer: &'a mut CommandBuffer,
    identity: Box<dyn MeshIdentity>,
    /// Model slots whose target died, handed out before appending new ones.
    free_slots: std::vec::IntoIter<RefIndex>,
    /// Slot the next appended reference will land in.
    next_reference: RefIndex,
    meshes: Vec<ModelMesh>,
    stats: Reconciliation,
}

impl Walk<'_> {
    fn node(&mut self, node: &Node) -> Result<(), ImportError> {
        let scene = self.scene;
        for &index in &node.meshes {
            let mesh = scene.meshes.get(index).ok_or_else(|| {
                AssetError::Malformed(format!(
                    "node '{}' references mesh {} of {}",
                    node.name,
                    index,
                    scene.meshes.len()
                ))
            })?;
            self.mesh(mesh);
        }
        for child in &node.children {
            self.node(child)?;
        }
        Ok(())
    }

    fn mesh(&mut self, source: &SceneMesh) {
        let position = self.meshes.len();
        let data = MeshData::from_scene(source);

        match self.identity.claim(position, &source.name) {
            Some(ExistingMesh {
                reference,
                entity: Some(entity),
                ..
            }) => {
                self.buffer.select(entity);
                upsert(self.buffer, self.world, entity, Name(source.name.clone()));
                let staged = data.stage(self.buffer, self.world, Some(entity));
                let version = self
                    .world
                    .get::<Mesh>(entity)
                    .map_or(1, |mesh| mesh.version.wrapping_add(1));
                upsert(
                    self.buffer,
                    self.world,
                    entity,
                    Mesh {
                        version,
                        channels: staged.channels,
                        vertex_count: staged.vertex_count,
                        index_count: staged.index_count,
                    },
                );
                self.meshes.push(reference);
                self.stats.reused += 1;
            }
            _ => {
                self.buffer
                    .clear_selection()
                    .create_entity()
                    .set_parent(self.model)
                    .add_component(Name(source.name.clone()))
                    .select(self.model);
                let reference = match self.free_slots.next() {
                    Some(reference) => {
                        self.buffer.set_reference(reference, Target::Created(0));
                        reference
                    }
                    None => {
                        self.buffer.add_reference(Target::Created(0));
                        let reference = self.next_reference;
                        self.next_reference = reference.next();
                        reference
                    }
                };
                self.buffer.select_created(0);

                let staged = data.stage(self.buffer, self.world, None);
                self.buffer.add_component(Mesh {
                    version: 1,
                    channels: staged.channels,
                    vertex_count: staged.vertex_count,
                    index_count: staged.index_count,
                });
                self.meshes.push(ModelMesh(reference));
                self.stats.created += 1;
            }
        }
    }
}

/// Stage an add or a set for `value` depending on whether the record has
/// the component before the buffer runs. The record must be selected.
pub(crate) fn upsert<T: Component>(
    buffer: &mut CommandBuffer,
    world: &World,
    entity: Entity,
    value: T,
) {
    if world.has::<T>(entity) {
        buffer.set_component(value);
    } else {
        buffer.add_component(value);
    }
}

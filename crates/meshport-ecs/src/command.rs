//! Deferred world mutation.
//!
//! A [`CommandBuffer`] records intents against a selection cursor instead of
//! live entity handles, so an entity created earlier in the same buffer can be
//! edited, parented and referenced before it exists. Nothing touches the world
//! until [`CommandBuffer::apply`], which must only be called while no query
//! iterator over that world is alive.

use std::any::type_name;
use std::fmt;

use tracing::trace;

use crate::component::{ArrayElement, Component};
use crate::entity::{Entity, RefIndex};
use crate::world::World;

/// Errors raised while replaying a command buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("no entity is selected")]
    NoSelection,

    #[error("no entity created {offset} steps back, only {created} created so far")]
    CreatedOutOfRange { offset: usize, created: usize },

    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("entity {entity} has no reference slot {reference}")]
    MissingReference { entity: Entity, reference: RefIndex },

    #[error("entity {entity} already has component {type_name}")]
    ComponentExists {
        entity: Entity,
        type_name: &'static str,
    },

    #[error("entity {entity} has no component {type_name}")]
    MissingComponent {
        entity: Entity,
        type_name: &'static str,
    },

    #[error("entity {entity} already has an array of {type_name}")]
    ArrayExists {
        entity: Entity,
        type_name: &'static str,
    },

    #[error("entity {entity} has no array of {type_name}")]
    MissingArray {
        entity: Entity,
        type_name: &'static str,
    },

    #[error("writing {count} {type_name} at offset {offset} overruns the array of length {len} on {entity}")]
    ElementsOutOfRange {
        entity: Entity,
        type_name: &'static str,
        offset: usize,
        count: usize,
        len: usize,
    },
}

/// An entity a structural command points at: either live, or created earlier
/// in the same buffer (`0` = most recently created).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Entity(Entity),
    Created(usize),
}

impl From<Entity> for Target {
    fn from(entity: Entity) -> Self {
        Target::Entity(entity)
    }
}

/// The typed write a [`Command::Write`] performs on the selected entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    AddComponent,
    SetComponent,
    CreateArray,
    ResizeArray,
    SetArrayElements,
    RemoveArray,
}

type WriteFn = Box<dyn FnOnce(&mut World, Entity) -> Result<(), CommandError>>;

/// One recorded intent.
pub enum Command {
    CreateEntity,
    Select(Entity),
    SelectCreated(usize),
    ClearSelection,
    SetParent(Target),
    AddReference(Target),
    SetReference(RefIndex, Target),
    Destroy,
    Write {
        kind: WriteKind,
        type_name: &'static str,
        write: WriteFn,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CreateEntity => write!(f, "CreateEntity"),
            Command::Select(entity) => write!(f, "Select({entity})"),
            Command::SelectCreated(offset) => write!(f, "SelectCreated({offset})"),
            Command::ClearSelection => write!(f, "ClearSelection"),
            Command::SetParent(target) => write!(f, "SetParent({target:?})"),
            Command::AddReference(target) => write!(f, "AddReference({target:?})"),
            Command::SetReference(reference, target) => {
                write!(f, "SetReference({reference}, {target:?})")
            }
            Command::Destroy => write!(f, "Destroy"),
            Command::Write {
                kind, type_name, ..
            } => write!(f, "{kind:?}<{type_name}>"),
        }
    }
}

/// Ordered, replayable log of world mutations.
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Recorded commands in replay order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drop all recorded commands without applying them.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Move every command of `other` to the end of this buffer, leaving
    /// `other` empty. `Created` offsets inside `other` stay valid as long as
    /// it only refers to entities it creates itself.
    pub fn append(&mut self, other: &mut CommandBuffer) {
        self.commands.append(&mut other.commands);
    }

    /// Spawn a new entity and select it.
    pub fn create_entity(&mut self) -> &mut Self {
        self.push(Command::CreateEntity)
    }

    pub fn select(&mut self, entity: Entity) -> &mut Self {
        self.push(Command::Select(entity))
    }

    /// Select an entity created earlier in this buffer, counting back from
    /// the most recent one.
    pub fn select_created(&mut self, offset: usize) -> &mut Self {
        self.push(Command::SelectCreated(offset))
    }

    pub fn clear_selection(&mut self) -> &mut Self {
        self.push(Command::ClearSelection)
    }

    /// Parent the selected entity to `parent`.
    pub fn set_parent(&mut self, parent: impl Into<Target>) -> &mut Self {
        self.push(Command::SetParent(parent.into()))
    }

    /// Append a reference from the selected entity to `target`.
    pub fn add_reference(&mut self, target: impl Into<Target>) -> &mut Self {
        self.push(Command::AddReference(target.into()))
    }

    /// Rebind an existing reference slot of the selected entity to `target`.
    pub fn set_reference(&mut self, reference: RefIndex, target: impl Into<Target>) -> &mut Self {
        self.push(Command::SetReference(reference, target.into()))
    }

    /// Despawn the selected entity and clear the selection.
    pub fn destroy(&mut self) -> &mut Self {
        self.push(Command::Destroy)
    }

    /// Add a component the selected entity must not have yet.
    pub fn add_component<T: Component>(&mut self, value: T) -> &mut Self {
        self.write::<T>(WriteKind::AddComponent, move |world, entity| {
            if world.has::<T>(entity) {
                return Err(CommandError::ComponentExists {
                    entity,
                    type_name: type_name::<T>(),
                });
            }
            world.insert(entity, value);
            Ok(())
        })
    }

    /// Overwrite a component the selected entity already has.
    pub fn set_component<T: Component>(&mut self, value: T) -> &mut Self {
        self.write::<T>(WriteKind::SetComponent, move |world, entity| {
            let slot = world
                .get_mut::<T>(entity)
                .ok_or(CommandError::MissingComponent {
                    entity,
                    type_name: type_name::<T>(),
                })?;
            *slot = value;
            Ok(())
        })
    }

    /// Create an empty array of `T` on the selected entity.
    pub fn create_array<T: ArrayElement>(&mut self) -> &mut Self {
        self.write::<T>(WriteKind::CreateArray, |world, entity| {
            if world.create_array::<T>(entity) {
                Ok(())
            } else {
                Err(CommandError::ArrayExists {
                    entity,
                    type_name: type_name::<T>(),
                })
            }
        })
    }

    /// Resize the selected entity's array of `T`, filling with defaults.
    pub fn resize_array<T: ArrayElement>(&mut self, len: usize) -> &mut Self {
        self.write::<T>(WriteKind::ResizeArray, move |world, entity| {
            let array = world
                .array_mut::<T>(entity)
                .ok_or(CommandError::MissingArray {
                    entity,
                    type_name: type_name::<T>(),
                })?;
            array.resize(len, T::default());
            Ok(())
        })
    }

    /// Overwrite `values.len()` elements of the selected entity's array of
    /// `T`, starting at `offset`. The array must already be long enough.
    pub fn set_array_elements<T: ArrayElement>(&mut self, offset: usize, values: Vec<T>) -> &mut Self {
        self.write::<T>(WriteKind::SetArrayElements, move |world, entity| {
            let array = world
                .array_mut::<T>(entity)
                .ok_or(CommandError::MissingArray {
                    entity,
                    type_name: type_name::<T>(),
                })?;
            let count = values.len();
            if offset + count > array.len() {
                return Err(CommandError::ElementsOutOfRange {
                    entity,
                    type_name: type_name::<T>(),
                    offset,
                    count,
                    len: array.len(),
                });
            }
            for (slot, value) in array[offset..].iter_mut().zip(values) {
                *slot = value;
            }
            Ok(())
        })
    }

    /// Remove the selected entity's array of `T`.
    pub fn remove_array<T: ArrayElement>(&mut self) -> &mut Self {
        self.write::<T>(WriteKind::RemoveArray, |world, entity| {
            if world.remove_array::<T>(entity) {
                Ok(())
            } else {
                Err(CommandError::MissingArray {
                    entity,
                    type_name: type_name::<T>(),
                })
            }
        })
    }

    /// Replay every command against `world` in order, then reset the buffer.
    ///
    /// Returns the number of commands applied. Replay stops at the first
    /// failing command. Commands before it stay applied, so a failed apply
    /// can leave the world partly updated. The buffer is empty afterwards
    /// either way.
    pub fn apply(&mut self, world: &mut World) -> Result<usize, CommandError> {
        let commands = std::mem::take(&mut self.commands);
        let total = commands.len();
        let mut selection: Option<Entity> = None;
        let mut created: Vec<Entity> = Vec::new();

        for command in commands {
            match command {
                Command::CreateEntity => {
                    let entity = world.spawn();
                    created.push(entity);
                    selection = Some(entity);
                }
                Command::Select(entity) => {
                    if !world.is_alive(entity) {
                        return Err(CommandError::DeadEntity(entity));
                    }
                    selection = Some(entity);
                }
                Command::SelectCreated(offset) => {
                    selection = Some(resolve_created(&created, offset)?);
                }
                Command::ClearSelection => selection = None,
                Command::SetParent(target) => {
                    let child = selection.ok_or(CommandError::NoSelection)?;
                    let parent = resolve(target, &created)?;
                    if !world.set_parent(child, parent) {
                        return Err(CommandError::DeadEntity(parent));
                    }
                }
                Command::AddReference(target) => {
                    let owner = selection.ok_or(CommandError::NoSelection)?;
                    let target = resolve(target, &created)?;
                    world
                        .add_reference(owner, target)
                        .ok_or(CommandError::DeadEntity(target))?;
                }
                Command::SetReference(reference, target) => {
                    let owner = selection.ok_or(CommandError::NoSelection)?;
                    let target = resolve(target, &created)?;
                    if !world.is_alive(target) {
                        return Err(CommandError::DeadEntity(target));
                    }
                    if !world.set_reference(owner, reference, target) {
                        return Err(CommandError::MissingReference {
                            entity: owner,
                            reference,
                        });
                    }
                }
                Command::Destroy => {
                    let entity = selection.take().ok_or(CommandError::NoSelection)?;
                    if !world.despawn(entity) {
                        return Err(CommandError::DeadEntity(entity));
                    }
                }
                Command::Write { write, .. } => {
                    let entity = selection.ok_or(CommandError::NoSelection)?;
                    write(world, entity)?;
                }
            }
        }

        trace!(commands = total, created = created.len(), "applied command buffer");
        Ok(total)
    }

    fn write<T: 'static>(
        &mut self,
        kind: WriteKind,
        write: impl FnOnce(&mut World, Entity) -> Result<(), CommandError> + 'static,
    ) -> &mut Self {
        self.push(Command::Write {
            kind,
            type_name: type_name::<T>(),
            write: Box::new(write),
        })
    }

    fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }
}

fn resolve_created(created: &[Entity], offset: usize) -> Result<Entity, CommandError> {
    created
        .len()
        .checked_sub(offset + 1)
        .map(|index| created[index])
        .ok_or(CommandError::CreatedOutOfRange {
            offset,
            created: created.len(),
        })
}

fn resolve(target: Target, created: &[Entity]) -> Result<Entity, CommandError> {
    match target {
        Target::Entity(entity) => Ok(entity),
        Target::Created(offset) => resolve_created(created, offset),
    }
}

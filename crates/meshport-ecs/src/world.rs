use crate::component::{ArrayElement, Component, ComponentStorage, SparseSet, Storages};
use crate::entity::{Entity, EntityAllocator, RefIndex, ReferenceSlots};
use crate::query::{QueryIter, WorldQuery};
use crate::resource::Resources;

/// The central ECS container. Owns all entities, their components, per-entity
/// arrays, parent links and reference slots, plus singleton resources.
pub struct World {
    pub(crate) entities: EntityAllocator,
    components: Storages,
    arrays: Storages,
    parents: SparseSet<Entity>,
    references: SparseSet<ReferenceSlots>,
    resources: Resources,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: Storages::default(),
            arrays: Storages::default(),
            parents: SparseSet::new(),
            references: SparseSet::new(),
            resources: Resources::new(),
        }
    }

    // ---- Entity management ----

    /// Spawn a new entity with no components.
    pub fn spawn(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Despawn an entity, removing its components, arrays, parent link and
    /// reference slots. Children keep their (now dangling) parent link.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.deallocate(entity) {
            return false;
        }
        self.components.remove_all(entity.index);
        self.arrays.remove_all(entity.index);
        self.parents.take(entity.index);
        self.references.take(entity.index);
        true
    }

    /// Check whether an entity is alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ---- Component management ----

    /// Insert a component on an entity. Replaces any existing component of the
    /// same type. Returns `false` if the entity is dead.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        self.components.get_or_insert::<T>().insert(entity.index, component);
        true
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get::<T>()?.get(entity.index)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get_or_insert::<T>().get_mut(entity.index)
    }

    /// Remove a component from an entity. Returns `true` if it was present.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        self.components.remove::<T>(entity.index)
    }

    /// Check whether an entity has a component of the given type.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    // ---- Arrays ----

    /// Create an empty array of `T` on an entity. Returns `false` if the
    /// entity is dead or already has one.
    pub fn create_array<T: ArrayElement>(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) || self.has_array::<T>(entity) {
            return false;
        }
        self.arrays.get_or_insert::<Vec<T>>().insert(entity.index, Vec::new());
        true
    }

    /// The array of `T` on an entity.
    pub fn array<T: ArrayElement>(&self, entity: Entity) -> Option<&[T]> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.arrays.get::<Vec<T>>()?
            .get(entity.index)
            .map(Vec::as_slice)
    }

    /// Mutable access to the array of `T` on an entity.
    pub fn array_mut<T: ArrayElement>(&mut self, entity: Entity) -> Option<&mut Vec<T>> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.arrays.get_or_insert::<Vec<T>>().get_mut(entity.index)
    }

    /// Length of the array of `T`, or `None` if the entity has no such array.
    pub fn array_len<T: ArrayElement>(&self, entity: Entity) -> Option<usize> {
        self.array::<T>(entity).map(<[T]>::len)
    }

    pub fn has_array<T: ArrayElement>(&self, entity: Entity) -> bool {
        self.array::<T>(entity).is_some()
    }

    /// Remove the array of `T` from an entity. Returns `true` if it existed.
    pub fn remove_array<T: ArrayElement>(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        self.arrays.remove::<Vec<T>>(entity.index)
    }

    // ---- Hierarchy ----

    /// Parent `child` to `parent`, replacing any previous parent.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> bool {
        if !self.entities.is_alive(child) || !self.entities.is_alive(parent) {
            return false;
        }
        self.parents.insert(child.index, parent);
        true
    }

    /// The live parent of an entity.
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.parents
            .get(entity.index)
            .copied()
            .filter(|parent| self.entities.is_alive(*parent))
    }

    /// All live entities whose parent is `parent`, in slot order.
    pub fn children(&self, parent: Entity) -> Vec<Entity> {
        let mut children: Vec<Entity> = self
            .parents
            .entity_indices()
            .iter()
            .filter_map(|&index| self.entities.at(index))
            .filter(|&child| self.parents.get(child.index) == Some(&parent))
            .collect();
        children.sort();
        children
    }

    // ---- References ----

    /// Append a reference from `owner` to `target`, returning its slot.
    pub fn add_reference(&mut self, owner: Entity, target: Entity) -> Option<RefIndex> {
        if !self.entities.is_alive(owner) || !self.entities.is_alive(target) {
            return None;
        }
        Some(
            self.references
                .get_or_insert_with(owner.index, ReferenceSlots::default)
                .push(target),
        )
    }

    /// Resolve a reference slot of `owner`. Dead targets resolve to `None`.
    pub fn reference(&self, owner: Entity, reference: RefIndex) -> Option<Entity> {
        if !self.entities.is_alive(owner) {
            return None;
        }
        self.references
            .get(owner.index)?
            .get(reference)
            .filter(|target| self.entities.is_alive(*target))
    }

    /// Rebind an existing slot of `owner` to `target`. Returns `false` if
    /// either entity is dead or the slot was never handed out.
    pub fn set_reference(&mut self, owner: Entity, reference: RefIndex, target: Entity) -> bool {
        if !self.entities.is_alive(owner) || !self.entities.is_alive(target) {
            return false;
        }
        self.references
            .get_mut(owner.index)
            .is_some_and(|slots| slots.replace(reference, target))
    }

    /// Slots of `owner` whose target has died, lowest first.
    pub fn dead_references(&self, owner: Entity) -> Vec<RefIndex> {
        if !self.entities.is_alive(owner) {
            return Vec::new();
        }
        self.references
            .get(owner.index)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|(_, target)| !self.entities.is_alive(*target))
                    .map(|(reference, _)| reference)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of reference slots ever handed out by `owner`.
    pub fn reference_count(&self, owner: Entity) -> usize {
        if !self.entities.is_alive(owner) {
            return 0;
        }
        self.references
            .get(owner.index)
            .map_or(0, ReferenceSlots::len)
    }

    // ---- Queries ----

    /// Query entities that match the given component pattern.
    ///
    /// Returns an iterator of `(Entity, Q::Item)`.
    ///
    /// # Example
    /// ```ignore
    /// for (entity, (request, name)) in world.query::<(&ModelRequest, Option<&Name>)>() {
    ///     // ...
    /// }
    /// ```
    pub fn query<Q: WorldQuery>(&self) -> QueryIter<'_, Q> {
        QueryIter::new(&self.entities, &self.components)
    }

    // ---- Resources ----

    /// Insert a singleton resource.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) {
        self.resources.insert(value);
    }

    /// Get an immutable reference to a resource.
    pub fn resource<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    /// Get a mutable reference to a resource.
    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.resources.get_mut::<T>()
    }

    /// Remove a resource.
    pub fn remove_resource<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

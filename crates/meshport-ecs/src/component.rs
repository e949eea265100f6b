use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// Marker trait for element types of per-entity arrays.
///
/// Arrays are resized with `Default` values and written by cloning slices.
pub trait ArrayElement: Component + Clone + Default {}

impl<T: Component + Clone + Default> ArrayElement for T {}

/// Type-erased storage interface, shared by component and array storages.
pub(crate) trait ComponentStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, index: u32) -> bool;
    fn has(&self, index: u32) -> bool;
    fn entity_indices(&self) -> &[u32];
}

/// Type-keyed storages of a [`World`](crate::World).
///
/// Opaque outside this crate. Queries receive it through
/// [`WorldQuery::fetch`](crate::WorldQuery::fetch) and read it back through
/// the impls this crate provides.
#[derive(Default)]
pub struct Storages {
    map: HashMap<TypeId, Box<dyn ComponentStorage>>,
}

impl Storages {
    pub(crate) fn get<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    /// The storage of `T`, registering an empty one on first use.
    pub(crate) fn get_or_insert<T: Component>(&mut self) -> &mut SparseSet<T> {
        let storage = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
        match storage.as_any_mut().downcast_mut::<SparseSet<T>>() {
            Some(sparse) => sparse,
            // Storages are keyed by the TypeId of their own element type.
            None => unreachable!("storage registered under a foreign TypeId"),
        }
    }

    pub(crate) fn entity_indices(&self, type_id: &TypeId) -> Option<&[u32]> {
        self.map.get(type_id).map(|s| s.entity_indices())
    }

    /// Remove the value of `T` stored for `index`. Returns `true` if one existed.
    pub(crate) fn remove<T: Component>(&mut self, index: u32) -> bool {
        self.map
            .get_mut(&TypeId::of::<T>())
            .is_some_and(|storage| storage.remove(index))
    }

    /// Remove every value stored for `index`.
    pub(crate) fn remove_all(&mut self, index: u32) {
        for storage in self.map.values_mut() {
            storage.remove(index);
        }
    }
}

/// Sparse-set storage for a single type. O(1) insert/remove/lookup and dense
/// iteration.
pub(crate) struct SparseSet<T> {
    /// Maps entity index to dense index. `None` means the entity has no value.
    sparse: Vec<Option<usize>>,
    dense: Vec<T>,
    /// Entity indices corresponding to each dense slot.
    entities: Vec<u32>,
}

impl<T: Component> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Insert or replace the value for the given entity index.
    pub fn insert(&mut self, index: u32, value: T) {
        let idx = index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        if let Some(dense_idx) = self.sparse[idx] {
            self.dense[dense_idx] = value;
        } else {
            let dense_idx = self.dense.len();
            self.sparse[idx] = Some(dense_idx);
            self.dense.push(value);
            self.entities.push(index);
        }
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.sparse
            .get(index as usize)
            .and_then(|s| s.map(|dense_idx| &self.dense[dense_idx]))
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.sparse
            .get(index as usize)
            .and_then(|s| s.map(|dense_idx| &mut self.dense[dense_idx]))
    }

    /// Get the value for an entity, inserting one built by `init` if absent.
    pub fn get_or_insert_with(&mut self, index: u32, init: impl FnOnce() -> T) -> &mut T {
        if !self.has(index) {
            self.insert(index, init());
        }
        let dense_idx = self.sparse[index as usize].unwrap_or_default();
        &mut self.dense[dense_idx]
    }

    /// Remove and return the value for an entity.
    pub fn take(&mut self, index: u32) -> Option<T> {
        let dense_idx = self.sparse.get_mut(index as usize)?.take()?;
        let last = self.dense.len() - 1;
        if dense_idx != last {
            // Swap-remove: move the last element into the removed slot.
            self.dense.swap(dense_idx, last);
            self.entities.swap(dense_idx, last);
            let moved_entity = self.entities[dense_idx];
            self.sparse[moved_entity as usize] = Some(dense_idx);
        }
        self.entities.pop();
        self.dense.pop()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }
}

impl<T: Component> ComponentStorage for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, index: u32) -> bool {
        self.take(index).is_some()
    }

    fn has(&self, index: u32) -> bool {
        matches!(self.sparse.get(index as usize), Some(Some(_)))
    }

    fn entity_indices(&self) -> &[u32] {
        &self.entities
    }
}

use std::any::TypeId;

use crate::component::{Component, Storages};
use crate::entity::{Entity, EntityAllocator};

/// Trait implemented for read-only query parameter types (`&T`, `Option<&T>`
/// and tuples of those).
///
/// Queries only ever borrow the world immutably. Mutation while iterating is
/// staged through a [`CommandBuffer`](crate::CommandBuffer) and applied after
/// the iterator is dropped.
pub trait WorldQuery {
    type Item<'w>;

    /// The TypeIds of components this query requires (must be present on the entity).
    fn required_type_ids() -> Vec<TypeId>;

    /// Fetch the item for a given entity index, or `None` if a required
    /// component is missing.
    fn fetch<'w>(storages: &'w Storages, index: u32) -> Option<Self::Item<'w>>;
}

impl<T: Component> WorldQuery for &T {
    type Item<'w> = &'w T;

    fn required_type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn fetch<'w>(storages: &'w Storages, index: u32) -> Option<Self::Item<'w>> {
        storages.get::<T>()?.get(index)
    }
}

impl<T: Component> WorldQuery for Option<&T> {
    type Item<'w> = Option<&'w T>;

    fn required_type_ids() -> Vec<TypeId> {
        vec![]
    }

    fn fetch<'w>(storages: &'w Storages, index: u32) -> Option<Self::Item<'w>> {
        Some(storages.get::<T>().and_then(|s| s.get(index)))
    }
}

macro_rules! impl_world_query_tuple {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: WorldQuery),+> WorldQuery for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);

            fn required_type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($name::required_type_ids());)+
                ids
            }

            fn fetch<'w>(storages: &'w Storages, index: u32) -> Option<Self::Item<'w>> {
                Some(($($name::fetch(storages, index)?,)+))
            }
        }
    };
}

impl_world_query_tuple!(A);
impl_world_query_tuple!(A, B);
impl_world_query_tuple!(A, B, C);
impl_world_query_tuple!(A, B, C, D);

/// Iterator returned by `World::query`. Yields `(Entity, Q::Item)` for each matching entity.
pub struct QueryIter<'w, Q: WorldQuery> {
    entities: &'w EntityAllocator,
    storages: &'w Storages,
    candidates: Vec<u32>,
    position: usize,
    _marker: std::marker::PhantomData<Q>,
}

impl<'w, Q: WorldQuery> QueryIter<'w, Q> {
    pub(crate) fn new(entities: &'w EntityAllocator, storages: &'w Storages) -> Self {
        let required = Q::required_type_ids();
        let candidates = if required.is_empty() {
            (0..entities.generations.len() as u32).collect()
        } else {
            // Iterate the smallest required storage; a missing storage matches nothing.
            let smallest = required
                .iter()
                .map(|tid| storages.entity_indices(tid))
                .try_fold(None::<&[u32]>, |best, indices| {
                    let indices = indices?;
                    Some(Some(match best {
                        Some(b) if b.len() <= indices.len() => b,
                        _ => indices,
                    }))
                })
                .flatten();
            smallest.map(<[u32]>::to_vec).unwrap_or_default()
        };

        Self {
            entities,
            storages,
            candidates,
            position: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'w, Q: WorldQuery> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&index) = self.candidates.get(self.position) {
            self.position += 1;
            let Some(entity) = self.entities.at(index) else {
                continue;
            };
            if let Some(item) = Q::fetch(self.storages, index) {
                return Some((entity, item));
            }
        }
        None
    }
}

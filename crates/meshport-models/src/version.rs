//! Per-entity record of what the engine last acted on.

use std::collections::HashMap;

use meshport_ecs::{Entity, World};

/// Version pair a mesh copy was taken at: the request's declared version and
/// the source model's version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FanoutStamp {
    pub request: u32,
    pub model: u32,
}

/// Remembers the last stamp processed for each entity, so unchanged records
/// are skipped.
///
/// The cache is engine state. Entities that never went through the engine
/// are simply unseen, and every unseen entity counts as changed.
#[derive(Debug)]
pub struct VersionCache<V = u32> {
    versions: HashMap<Entity, V>,
}

impl<V> Default for VersionCache<V> {
    fn default() -> Self {
        Self {
            versions: HashMap::new(),
        }
    }
}

impl<V: Copy + PartialEq> VersionCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(&self, entity: Entity, stamp: V) -> bool {
        self.versions.get(&entity) != Some(&stamp)
    }

    pub fn commit(&mut self, entity: Entity, stamp: V) {
        self.versions.insert(entity, stamp);
    }

    pub fn get(&self, entity: Entity) -> Option<V> {
        self.versions.get(&entity).copied()
    }

    pub fn forget(&mut self, entity: Entity) -> Option<V> {
        self.versions.remove(&entity)
    }

    /// Drop entries for entities no longer alive in `world`. Returns how
    /// many were dropped.
    pub fn retain_alive(&mut self, world: &World) -> usize {
        let before = self.versions.len();
        self.versions.retain(|entity, _| world.is_alive(*entity));
        before - self.versions.len()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn clear(&mut self) {
        self.versions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_entities_are_changed() {
        let cache: VersionCache = VersionCache::new();
        assert!(cache.changed(Entity::from_raw(0, 0), 0));
    }

    #[test]
    fn commit_then_compare() {
        let mut cache = VersionCache::new();
        let e = Entity::from_raw(4, 1);
        cache.commit(e, 2);
        assert!(!cache.changed(e, 2));
        assert!(cache.changed(e, 3));
        assert_eq!(cache.get(e), Some(2));
        assert_eq!(cache.forget(e), Some(2));
        assert!(cache.changed(e, 2));
    }

    #[test]
    fn stamps_compare_both_halves() {
        let mut cache = VersionCache::new();
        let e = Entity::from_raw(1, 0);
        cache.commit(e, FanoutStamp { request: 0, model: 1 });
        assert!(!cache.changed(e, FanoutStamp { request: 0, model: 1 }));
        assert!(cache.changed(e, FanoutStamp { request: 1, model: 1 }));
        assert!(cache.changed(e, FanoutStamp { request: 0, model: 2 }));
    }

    #[test]
    fn retain_alive_prunes_despawned() {
        let mut world = World::new();
        let kept = world.spawn();
        let gone = world.spawn();
        let mut cache = VersionCache::new();
        cache.commit(kept, 1);
        cache.commit(gone, 1);
        world.despawn(gone);

        assert_eq!(cache.retain_alive(&world), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(kept), Some(1));
    }
}

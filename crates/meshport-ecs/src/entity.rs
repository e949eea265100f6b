use std::fmt;

/// A generational entity handle. Uses compact u32 index + generation so stale
/// handles to a recycled slot never resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Create an entity from raw parts (mainly for testing).
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index of this entity.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation of this entity (incremented on reuse).
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// 1-based index into an entity's reference slot list. `RefIndex(0)` never
/// resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RefIndex(pub u32);

impl RefIndex {
    pub const NONE: RefIndex = RefIndex(0);

    /// The reference following this one in the same slot list.
    pub fn next(self) -> RefIndex {
        RefIndex(self.0 + 1)
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RefIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref#{}", self.0)
    }
}

/// List of outgoing references held by one entity.
///
/// Slots are never removed or reordered, so a `RefIndex` handed out once stays
/// valid for the lifetime of the owner. A slot may be rebound to a new target.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReferenceSlots {
    targets: Vec<Entity>,
}

impl ReferenceSlots {
    pub fn push(&mut self, target: Entity) -> RefIndex {
        self.targets.push(target);
        RefIndex(self.targets.len() as u32)
    }

    pub fn get(&self, reference: RefIndex) -> Option<Entity> {
        if reference.is_none() {
            return None;
        }
        self.targets.get(reference.0 as usize - 1).copied()
    }

    /// Point an existing slot at `target`. Returns `false` if there is no
    /// such slot.
    pub fn replace(&mut self, reference: RefIndex, target: Entity) -> bool {
        if reference.is_none() {
            return false;
        }
        match self.targets.get_mut(reference.0 as usize - 1) {
            Some(slot) => {
                *slot = target;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RefIndex, Entity)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .map(|(i, &target)| (RefIndex(i as u32 + 1), target))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

/// Allocates and recycles entity slots with generational tracking.
pub struct EntityAllocator {
    pub(crate) generations: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    free_list: Vec<u32>,
    len: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Allocate a new entity, reusing a freed slot if available.
    pub fn allocate(&mut self) -> Entity {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            self.alive[index as usize] = true;
            Entity {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Deallocate an entity. Returns `true` if it was alive.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.index as usize;
        self.alive[idx] = false;
        self.generations[idx] += 1;
        self.free_list.push(entity.index);
        self.len -= 1;
        true
    }

    /// Check if an entity is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        idx < self.alive.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }

    /// Resolve the live entity occupying a slot, if any.
    pub(crate) fn at(&self, index: u32) -> Option<Entity> {
        let idx = index as usize;
        (idx < self.alive.len() && self.alive[idx]).then(|| Entity {
            index,
            generation: self.generations[idx],
        })
    }

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no alive entities.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deallocate_and_reuse() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        let e0_reused = alloc.allocate();
        assert_eq!(e0_reused.index, 0);
        assert_eq!(e0_reused.generation, 1);
        assert_ne!(e0, e0_reused);
        assert!(!alloc.is_alive(e0));
        assert_eq!(alloc.at(0), Some(e0_reused));
    }

    #[test]
    fn double_deallocate_fails() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        assert!(alloc.deallocate(e));
        assert!(!alloc.deallocate(e));
        assert_eq!(alloc.at(e.index), None);
    }

    #[test]
    fn reference_slots_are_one_based() {
        let mut slots = ReferenceSlots::default();
        let a = Entity::from_raw(4, 0);
        let b = Entity::from_raw(7, 2);
        assert_eq!(slots.push(a), RefIndex(1));
        assert_eq!(slots.push(b), RefIndex(2));
        assert_eq!(slots.get(RefIndex(1)), Some(a));
        assert_eq!(slots.get(RefIndex(2)), Some(b));
        assert_eq!(slots.get(RefIndex::NONE), None);
        assert_eq!(slots.get(RefIndex(3)), None);
        assert_eq!(RefIndex(1).next(), RefIndex(2));

        assert!(slots.replace(RefIndex(1), b));
        assert_eq!(slots.get(RefIndex(1)), Some(b));
        assert!(!slots.replace(RefIndex(3), a));
        assert!(!slots.replace(RefIndex::NONE, a));
        assert_eq!(slots.len(), 2);
    }
}

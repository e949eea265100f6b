//! Pairing of freshly parsed meshes with a model's existing mesh records.

use std::collections::{HashMap, VecDeque};

use meshport_ecs::Entity;

use crate::components::ModelMesh;
use crate::settings::IdentityStrategy;

/// One entry of a model's mesh list as it was before the reimport.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExistingMesh {
    pub reference: ModelMesh,
    /// `None` when the reference no longer resolves to a live record.
    pub entity: Option<Entity>,
    pub name: Option<String>,
}

/// Decides which existing record, if any, a parsed mesh reuses.
pub(crate) trait MeshIdentity {
    /// Claim a record for the mesh at traversal `position` named `name`.
    /// Each record is handed out at most once. Entries whose record is gone
    /// are never handed out.
    fn claim(&mut self, position: usize, name: &str) -> Option<ExistingMesh>;

    /// Entries no mesh claimed, in list order.
    fn unclaimed(&self) -> Vec<ExistingMesh>;
}

pub(crate) fn resolver(
    strategy: IdentityStrategy,
    existing: Vec<ExistingMesh>,
) -> Box<dyn MeshIdentity> {
    match strategy {
        IdentityStrategy::Position => Box::new(ByPosition::new(existing)),
        IdentityStrategy::Name => Box::new(ByName::new(existing)),
    }
}

struct Slots {
    existing: Vec<ExistingMesh>,
    claimed: Vec<bool>,
}

impl Slots {
    fn new(existing: Vec<ExistingMesh>) -> Self {
        let claimed = vec![false; existing.len()];
        Self { existing, claimed }
    }

    fn take(&mut self, slot: usize) -> Option<ExistingMesh> {
        let entry = self.existing.get(slot)?;
        if self.claimed[slot] || entry.entity.is_none() {
            return None;
        }
        self.claimed[slot] = true;
        Some(entry.clone())
    }

    fn unclaimed(&self) -> Vec<ExistingMesh> {
        self.existing
            .iter()
            .zip(&self.claimed)
            .filter(|(_, claimed)| !**claimed)
            .map(|(entry, _)| entry.clone())
            .collect()
    }
}

struct ByPosition {
    slots: Slots,
}

impl ByPosition {
    fn new(existing: Vec<ExistingMesh>) -> Self {
        Self {
            slots: Slots::new(existing),
        }
    }
}

impl MeshIdentity for ByPosition {
    fn claim(&mut self, position: usize, _name: &str) -> Option<ExistingMesh> {
        self.slots.take(position)
    }

    fn unclaimed(&self) -> Vec<ExistingMesh> {
        self.slots.unclaimed()
    }
}

struct ByName {
    slots: Slots,
    by_name: HashMap<String, VecDeque<usize>>,
}

impl ByName {
    fn new(existing: Vec<ExistingMesh>) -> Self {
        let mut by_name: HashMap<String, VecDeque<usize>> = HashMap::new();
        for (slot, entry) in existing.iter().enumerate() {
            if let (Some(name), Some(_)) = (&entry.name, entry.entity) {
                by_name.entry(name.clone()).or_default().push_back(slot);
            }
        }
        Self {
            slots: Slots::new(existing),
            by_name,
        }
    }
}

impl MeshIdentity for ByName {
    fn claim(&mut self, _position: usize, name: &str) -> Option<ExistingMesh> {
        let slot = self.by_name.get_mut(name)?.pop_front()?;
        self.slots.take(slot)
    }

    fn unclaimed(&self) -> Vec<ExistingMesh> {
        self.slots.unclaimed()
    }
}

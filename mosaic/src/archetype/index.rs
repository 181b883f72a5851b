//! Maps a component mask to an archetype, creating archetypes lazily on
//! first observation of a mask.

use std::collections::HashMap;

use log::trace;

use super::{Archetype, ArchetypeId, Column};
use crate::component::{ComponentId, Registry as ComponentRegistry};

pub(crate) struct Index {
    archetypes: Vec<Archetype>,
    by_mask: HashMap<u64, ArchetypeId>,
}

impl Index {
    pub(crate) fn new() -> Self {
        let mut archetypes = Vec::new();
        let mut by_mask = HashMap::new();
        archetypes.push(Archetype::empty());
        by_mask.insert(0, 0);
        Index { archetypes, by_mask }
    }

    pub(crate) fn get(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id]
    }

    pub(crate) fn get_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Two distinct, mutable borrows into the archetype vector. Panics if
    /// `a == b`; callers must special-case in-place mutation separately.
    pub(crate) fn get_pair_mut(&mut self, a: ArchetypeId, b: ArchetypeId) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "get_pair_mut requires distinct archetype ids");
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    /// Finds or lazily creates the archetype for `mask`, given the
    /// archetype it is being derived from (`source`) so that new columns
    /// can borrow per-component layout from either the source archetype
    /// or the component registry (for the one id that differs).
    pub(crate) fn get_or_create(
        &mut self,
        mask: u64,
        component_registry: &ComponentRegistry,
    ) -> ArchetypeId {
        if let Some(&id) = self.by_mask.get(&mask) {
            return id;
        }

        let mut component_ids: Vec<ComponentId> = Vec::with_capacity(mask.count_ones() as usize);
        for bit in 0..64u8 {
            if mask & (1u64 << bit) != 0 {
                component_ids.push(bit);
            }
        }
        let columns = component_ids
            .iter()
            .map(|&id| Column::new(component_registry.info(id)))
            .collect();

        let archetype = Archetype::new(mask, component_ids, columns);
        let id = self.archetypes.len();
        trace!("creating archetype {id} for mask {mask:#066b}");
        self.archetypes.push(archetype);
        self.by_mask.insert(mask, id);
        id
    }
}

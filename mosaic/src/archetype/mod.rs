//! Archetypes: a unique combination of component ids, and the lazily
//! created index from component mask to archetype.

mod column;
mod index;

pub(crate) use column::Column;
pub(crate) use index::Index;

use crate::component::ComponentId;
use crate::entity::Entity;

/// Dense index of an archetype within a [`crate::world::World`]. Stable
/// for the world's lifetime; archetypes are never compacted or removed.
pub type ArchetypeId = usize;

/// A unique combination of component ids: owns one [`Column`] per id in
/// the combination, plus the list of entities currently occupying it.
pub(crate) struct Archetype {
    mask: u64,
    component_ids: Vec<ComponentId>,
    columns: Vec<Column>,
    entities: Vec<Entity>,
}

impl Archetype {
    pub(crate) fn empty() -> Self {
        Archetype {
            mask: 0,
            component_ids: Vec::new(),
            columns: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub(crate) fn new(mask: u64, component_ids: Vec<ComponentId>, columns: Vec<Column>) -> Self {
        debug_assert_eq!(component_ids.len(), columns.len());
        debug_assert_eq!(mask.count_ones() as usize, component_ids.len());
        Archetype {
            mask,
            component_ids,
            columns,
            entities: Vec::new(),
        }
    }

    pub(crate) fn mask(&self) -> u64 {
        self.mask
    }

    pub(crate) fn component_ids(&self) -> &[ComponentId] {
        &self.component_ids
    }

    pub(crate) fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }

    fn column_index_of(&self, component_id: ComponentId) -> Option<usize> {
        self.component_ids.iter().position(|&id| id == component_id)
    }

    pub(crate) fn has_component(&self, component_id: ComponentId) -> bool {
        self.mask & (1u64 << component_id) != 0
    }

    pub(crate) fn column_for(&self, component_id: ComponentId) -> Option<&Column> {
        self.column_index_of(component_id).map(|i| &self.columns[i])
    }

    pub(crate) fn column_for_mut(&mut self, component_id: ComponentId) -> Option<&mut Column> {
        self.column_index_of(component_id).map(move |i| &mut self.columns[i])
    }

    /// Appends `entity` to the id list and a zero-initialised row to every
    /// column. Returns the new row index.
    pub(crate) fn append(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        let mut row = None;
        for column in &mut self.columns {
            let r = column.push_default();
            debug_assert!(row.is_none() || row == Some(r));
            row = Some(r);
        }
        row.unwrap_or(self.entities.len() - 1)
    }

    /// Swap-removes row `row` from every column and from the entity list.
    /// Returns the entity that now occupies `row`, if any (the one that
    /// was previously last).
    pub(crate) fn remove_row(&mut self, row: usize) -> Option<Entity> {
        for column in &mut self.columns {
            column.swap_remove_dropping(row);
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Appends a zero-initialised row to every column, for use by the
    /// migration path in [`crate::world::World`], which overwrites or
    /// moves component bytes into the row directly afterwards.
    pub(crate) fn append_uninit(&mut self, entity: Entity) -> usize {
        self.append(entity)
    }

    /// Moves row `row`'s value out without dropping it and shrinks the
    /// archetype by one, syncing the entity list. Returns the entity that
    /// now occupies `row`, if any. Used when a component's bytes have
    /// already been copied into a destination archetype.
    pub(crate) fn forget_row(&mut self, row: usize) -> Option<Entity> {
        for column in &mut self.columns {
            column.swap_truncate(row);
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    pub(crate) fn drop_component_row(&mut self, component_id: ComponentId, row: usize) {
        if let Some(column) = self.column_for_mut(component_id) {
            column.drop_row(row);
        }
    }
}

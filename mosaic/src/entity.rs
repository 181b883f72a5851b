//! Entity handles and the dense entity table: an id/generation split plus
//! a free-id stack for id reuse, generalised to also carry the
//! archetype/row/tag-mask fields a live entity needs.

use crate::archetype::ArchetypeId;

/// An opaque handle: the upper 32 bits are a dense id, the lower 32 bits
/// are a version counter that detects stale handles to freed-and-reused
/// slots. Cheap to copy and compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity(u64);

impl Entity {
    fn pack(id: u32, version: u32) -> Self {
        Entity(((id as u64) << 32) | version as u64)
    }

    pub fn id(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn version(&self) -> u32 {
        self.0 as u32
    }

    pub(crate) fn from_raw(id: u32, version: u32) -> Self {
        Entity::pack(id, version)
    }

    #[cfg(test)]
    pub(crate) fn for_test(id: u32, version: u32) -> Self {
        Entity::pack(id, version)
    }
}

/// Per-id bookkeeping: current version, owning archetype (or `None` if
/// freed or never allocated), and row within that archetype.
#[derive(Clone, Copy)]
struct Record {
    version: u32,
    archetype: Option<ArchetypeId>,
    row: usize,
    tags: u64,
}

impl Default for Record {
    fn default() -> Self {
        Record { version: 0, archetype: None, row: 0, tags: 0 }
    }
}

/// Dense vector of entity records plus a free-id stack. Id `0` is never
/// issued; `records[0]` is an unused sentinel.
pub(crate) struct Table {
    records: Vec<Record>,
    free: Vec<u32>,
    next_id: u32,
    grow_step: usize,
}

impl Table {
    pub(crate) fn new(initial_capacity: usize, grow_step: usize) -> Self {
        Table {
            records: vec![Record::default(); initial_capacity + 1],
            free: Vec::new(),
            next_id: 1,
            grow_step: grow_step.max(1),
        }
    }

    fn allocate_id(&mut self) -> u32 {
        if let Some(id) = self.free.pop() {
            return id;
        }
        if self.next_id as usize >= self.records.len() {
            let new_len = self.records.len() + self.grow_step;
            self.records.resize(new_len, Record::default());
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocates a slot, bumps its version, and returns the fresh handle.
    /// The caller is responsible for placing the entity into the empty
    /// archetype and recording its row via [`Self::set_location`].
    pub(crate) fn allocate(&mut self) -> Entity {
        let id = self.allocate_id();
        let record = &mut self.records[id as usize];
        record.version += 1;
        record.archetype = None;
        record.row = 0;
        record.tags = 0;
        Entity::pack(id, record.version)
    }

    pub(crate) fn is_live(&self, entity: Entity) -> bool {
        match self.records.get(entity.id() as usize) {
            Some(record) => record.version == entity.version() && record.archetype.is_some(),
            None => false,
        }
    }

    pub(crate) fn location(&self, entity: Entity) -> Option<(ArchetypeId, usize)> {
        if !self.is_live(entity) {
            return None;
        }
        let record = &self.records[entity.id() as usize];
        record.archetype.map(|archetype| (archetype, record.row))
    }

    pub(crate) fn set_location(&mut self, entity: Entity, archetype: ArchetypeId, row: usize) {
        debug_assert!(self.records[entity.id() as usize].version == entity.version());
        let record = &mut self.records[entity.id() as usize];
        record.archetype = Some(archetype);
        record.row = row;
    }

    /// Updates the row of whichever live entity currently has id
    /// `entity_id`, regardless of the caller's notion of its version.
    /// Used to re-point a displaced neighbour after a swap-remove.
    pub(crate) fn set_row_by_id(&mut self, entity_id: u32, row: usize) {
        self.records[entity_id as usize].row = row;
    }

    /// Marks the slot as freed. Does not bump the version: the next
    /// `allocate` for this id does that.
    pub(crate) fn clear_location(&mut self, entity: Entity) {
        let id = entity.id();
        self.free.push(id);
        let record = &mut self.records[id as usize];
        record.archetype = None;
        record.row = 0;
        record.tags = 0;
    }

    pub(crate) fn tags(&self, entity: Entity) -> Option<u64> {
        if !self.is_live(entity) {
            return None;
        }
        Some(self.records[entity.id() as usize].tags)
    }

    pub(crate) fn set_tags(&mut self, entity: Entity, tags: u64) {
        self.records[entity.id() as usize].tags = tags;
    }

    /// Highest id ever allocated; used by the tag-only query to scan the
    /// whole table by id rather than by archetype.
    pub(crate) fn max_id(&self) -> u32 {
        self.next_id - 1
    }

    pub(crate) fn is_live_by_id(&self, id: u32) -> bool {
        self.records
            .get(id as usize)
            .is_some_and(|record| record.archetype.is_some())
    }

    pub(crate) fn version_by_id(&self, id: u32) -> u32 {
        self.records[id as usize].version
    }
}

//! The aggregate root: owns the type registries, the archetype index, the
//! entity table, the prefab registry, and the event queues, and exposes
//! every public operation named in the external interface.

use std::mem::ManuallyDrop;

use log::warn;

use crate::archetype::{self, ArchetypeId, Column};
use crate::component::{self, Component, ComponentId};
use crate::entity::{self, Entity};
use crate::event;
use crate::prefab::{self, Initializer, OverrideSet, Overrides};
use crate::query::{ComponentQuery, ComponentSet, ComponentTagQuery, TagQuery};
use crate::tag::{self, Tag, TagId};
use crate::error::Error;

/// Pre-reservation knobs for a world's entity table. See
/// [`World::with_config`].
#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    /// Entity slots pre-reserved at construction.
    pub initial_capacity: usize,
    /// Slots added each time the high-water mark is reached.
    pub grow_step: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            initial_capacity: World::DEFAULT_INITIAL_CAPACITY,
            grow_step: World::DEFAULT_GROW_STEP,
        }
    }
}

pub struct World {
    components: component::Registry,
    tag_registry: tag::Registry,
    archetypes: archetype::Index,
    entities: entity::Table,
    prefabs: prefab::Registry,
    events: event::Queues,
}

impl World {
    pub const DEFAULT_INITIAL_CAPACITY: usize = 1000;
    pub const DEFAULT_GROW_STEP: usize = 1000;

    /// A world with the default configuration (1000 initial slots, 1000
    /// slot grow step).
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        World {
            components: component::Registry::new(),
            tag_registry: tag::Registry::new(),
            archetypes: archetype::Index::new(),
            entities: entity::Table::new(config.initial_capacity, config.grow_step),
            prefabs: prefab::Registry::new(),
            events: event::Queues::new(),
        }
    }

    // -- entity lifecycle ---------------------------------------------

    pub fn add_entity(&mut self) -> Entity {
        let entity = self.entities.allocate();
        let row = self.archetypes.get_mut(0).append(entity);
        self.entities.set_location(entity, 0, row);
        entity
    }

    /// Frees `entity`. A stale or already-freed handle is a silent no-op.
    pub fn free_entity(&mut self, entity: Entity) {
        let Some((archetype, row)) = self.entities.location(entity) else {
            warn!("free_entity called on a stale or already-freed handle: {entity:?}");
            return;
        };
        let displaced = self.archetypes.get_mut(archetype).remove_row(row);
        if let Some(displaced_entity) = displaced {
            self.entities.set_row_by_id(displaced_entity.id(), row);
        }
        self.entities.clear_location(entity);
    }

    pub fn is_live(&self, entity: Entity) -> bool {
        self.entities.is_live(entity)
    }

    // -- components ------------------------------------------------------

    /// Resolves (assigning if necessary) `T`'s component id. Panics on the
    /// 65th distinct component type: capacity exceeded is fatal for the
    /// world, not a per-call recoverable error.
    pub(crate) fn component_id<T: Component>(&mut self) -> ComponentId {
        self.components
            .component_id::<T>()
            .expect("component type capacity exceeded: at most 64 component types per world")
    }

    pub(crate) fn existing_component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components.existing_id::<T>()
    }

    /// Sets `entity`'s `T` to `value`, migrating it to the archetype with
    /// `T` added if it did not already carry the component, or assigning
    /// in place if it did. Returns a short-lived borrow into the backing
    /// column: any subsequent operation on this world that may migrate or
    /// grow a column invalidates it.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        let component_id = self.component_id::<T>();
        let (from_archetype, from_row) = self
            .entities
            .location(entity)
            .expect("add_component on a freed entity");
        let bit = 1u64 << component_id;
        let m0 = self.archetypes.get(from_archetype).mask();

        let (archetype, row) = if m0 & bit != 0 {
            let column = self
                .archetypes
                .get_mut(from_archetype)
                .column_for_mut(component_id)
                .expect("mask bit set implies column exists");
            column.drop_row(from_row);
            write_value(column, from_row, value);
            (from_archetype, from_row)
        } else {
            let (archetype, row) = self.migrate(entity, m0 | bit, None);
            let column = self
                .archetypes
                .get_mut(archetype)
                .column_for_mut(component_id)
                .expect("destination archetype carries the added component");
            write_value(column, row, value);
            (archetype, row)
        };

        let column = self
            .archetypes
            .get_mut(archetype)
            .column_for_mut(component_id)
            .expect("just wrote this column");
        // SAFETY: column was just written with a live `T` at `row`.
        unsafe { &mut *column.row_ptr_mut(row).cast::<T>() }
    }

    /// Adds `T` to `entity` using its all-zero bit pattern, the same
    /// zero-initialised value a freshly grown column's tail is filled
    /// with. Bounded by `bytemuck::Zeroable` rather than `Default`: a
    /// type's `Default` value is not necessarily all zero bits (a health
    /// component defaulting to full health, say), and reinterpreting
    /// zero bytes as an arbitrary `T` without that guarantee would be
    /// unsound. Implement `Zeroable` only for component types whose
    /// all-zero value is actually meaningful.
    pub fn add_component_default<T: Component + bytemuck::Zeroable>(&mut self, entity: Entity) -> &mut T {
        self.add_component(entity, T::zeroed())
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.components.existing_id::<T>()?;
        let (archetype, row) = self.entities.location(entity)?;
        let column = self.archetypes.get(archetype).column_for(id)?;
        // SAFETY: the archetype's mask guarantees this column holds `T` values.
        Some(unsafe { &*column.row_ptr(row).cast::<T>() })
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.components.existing_id::<T>()?;
        let (archetype, row) = self.entities.location(entity)?;
        let column = self.archetypes.get_mut(archetype).column_for_mut(id)?;
        // SAFETY: the archetype's mask guarantees this column holds `T` values.
        Some(unsafe { &mut *column.row_ptr_mut(row).cast::<T>() })
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        let Some(id) = self.components.existing_id::<T>() else {
            return false;
        };
        self.entities
            .location(entity)
            .map(|(archetype, _)| self.archetypes.get(archetype).has_component(id))
            .unwrap_or(false)
    }

    /// Removing an absent component, or removing from a freed entity, is
    /// a silent no-op.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        let Some(component_id) = self.components.existing_id::<T>() else {
            return;
        };
        let Some((from_archetype, _row)) = self.entities.location(entity) else {
            return;
        };
        let m0 = self.archetypes.get(from_archetype).mask();
        let bit = 1u64 << component_id;
        if m0 & bit == 0 {
            return;
        }
        self.migrate(entity, m0 & !bit, Some(component_id));
    }

    /// Moves `entity` from its current archetype to the one for
    /// `to_mask`, copying overlapping component rows and, if `dropped` is
    /// set, running that component's destructor instead of copying it.
    /// Does not write any new component's value; callers that are adding
    /// a component write it into the returned row afterwards.
    fn migrate(&mut self, entity: Entity, to_mask: u64, dropped: Option<ComponentId>) -> (ArchetypeId, usize) {
        let (from_archetype, from_row) = self
            .entities
            .location(entity)
            .expect("entity must be live to migrate");
        let to_archetype = self.archetypes.get_or_create(to_mask, &self.components);

        let to_row = {
            let (from, to) = self.archetypes.get_pair_mut(from_archetype, to_archetype);
            let to_row = to.append_uninit(entity);
            let source_ids: Vec<ComponentId> = from.component_ids().to_vec();
            for component_id in source_ids {
                if Some(component_id) == dropped {
                    from.drop_component_row(component_id, from_row);
                    continue;
                }
                if let Some(dst) = to.column_for_mut(component_id) {
                    let src = from
                        .column_for(component_id)
                        .expect("source archetype carries this id")
                        .row_ptr(from_row);
                    // SAFETY: src and dst columns were created for the same
                    // component id, so they share element layout; both rows
                    // are within bounds.
                    unsafe { dst.write_row(to_row, src) };
                }
            }
            to_row
        };

        let displaced = self.archetypes.get_mut(from_archetype).forget_row(from_row);
        if let Some(displaced_entity) = displaced {
            self.entities.set_row_by_id(displaced_entity.id(), from_row);
        }
        self.entities.set_location(entity, to_archetype, to_row);
        (to_archetype, to_row)
    }

    // -- tags -------------------------------------------------------------

    pub(crate) fn existing_tag_id<T: Tag>(&self) -> Option<TagId> {
        self.tag_registry.existing_id::<T>()
    }

    pub fn add_tag<T: Tag>(&mut self, entity: Entity) {
        let id = self
            .tag_registry
            .tag_id::<T>()
            .expect("tag type capacity exceeded: at most 64 tag types per world");
        if let Some(tags) = self.entities.tags(entity) {
            self.entities.set_tags(entity, tags | (1u64 << id));
        }
    }

    pub fn remove_tag<T: Tag>(&mut self, entity: Entity) {
        let Some(id) = self.tag_registry.existing_id::<T>() else {
            return;
        };
        if let Some(tags) = self.entities.tags(entity) {
            self.entities.set_tags(entity, tags & !(1u64 << id));
        }
    }

    pub fn has_tag<T: Tag>(&self, entity: Entity) -> bool {
        let Some(id) = self.tag_registry.existing_id::<T>() else {
            return false;
        };
        self.entities.tags(entity).map(|tags| tags & (1u64 << id) != 0).unwrap_or(false)
    }

    // -- queries ----------------------------------------------------------

    pub(crate) fn archetype_index(&self) -> &archetype::Index {
        &self.archetypes
    }

    pub(crate) fn entity_table(&self) -> &entity::Table {
        &self.entities
    }

    pub(crate) fn entity_from_raw(&self, id: u32, version: u32) -> Entity {
        entity::Entity::from_raw(id, version)
    }

    pub fn with_component<T: Component>(&self) -> ComponentQuery<'_> {
        ComponentQuery::new(self, self.existing_component_id::<T>().map(|id| 1u64 << id))
    }

    pub fn with_components<Q: ComponentSet>(&self) -> ComponentQuery<'_> {
        ComponentQuery::new(self, Q::mask(self))
    }

    pub fn with_tag<T: Tag>(&self) -> TagQuery<'_> {
        TagQuery::new(self, self.existing_tag_id::<T>())
    }

    pub fn with_component_tag<C: Component, T: Tag>(&self) -> ComponentTagQuery<'_> {
        ComponentTagQuery::new(
            self,
            self.existing_component_id::<C>().map(|id| 1u64 << id),
            self.existing_tag_id::<T>(),
        )
    }

    // -- prefab / spawn -----------------------------------------------

    pub fn register_prefab(&mut self, name: impl Into<String>, initializers: Vec<Box<dyn Initializer>>) {
        self.prefabs.register(name.into(), initializers);
    }

    pub fn spawn(&mut self, name: &str) -> Result<Entity, Error> {
        self.spawn_with(name, ())
    }

    pub fn spawn_with<O: OverrideSet>(&mut self, name: &str, overrides: O) -> Result<Entity, Error> {
        let prefab = self.prefabs.get(name).inspect_err(|_| {
            warn!("spawn requested unknown prefab {name:?}");
        })?;
        let mut resolved = Overrides::new();
        overrides.collect(self, &mut resolved);
        let entity = self.add_entity();
        for initializer in prefab.initializers() {
            initializer.apply(self, entity, &resolved);
        }
        Ok(entity)
    }

    // -- events -------------------------------------------------------

    pub fn register_listener<E: event::Event>(&mut self, listener: impl FnMut(&E) + 'static) {
        self.events.register_listener(listener);
    }

    pub fn send_event<E: event::Event>(&mut self, value: E) {
        self.events.send_event(value);
    }

    pub fn dispatch_event_queue(&mut self) {
        self.events.dispatch_all();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn write_value<T>(column: &mut Column, row: usize, value: T) {
    let boxed = ManuallyDrop::new(value);
    // SAFETY: column was created for T's layout; `boxed` is never dropped
    // here, so ownership of any resources `T` holds moves into the column.
    unsafe { column.write_row(row, (&*boxed as *const T).cast()) };
}

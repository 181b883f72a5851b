//! Query iterators: given one or more component types and optionally a
//! tag type, walk matching archetypes in creation order and yield live
//! entity handles. Five shapes are supported, matching the external
//! interface: by one component, by two/three/four (intersection), by one
//! component plus one tag, and by tag alone. Every streaming iterator has
//! a `_vec` materialising counterpart.

use crate::component::Component;
use crate::entity::Entity;
use crate::tag::TagId;
use crate::world::World;

/// A set of component types whose registered ids combine into a query
/// mask. Implemented for a single component and for tuples of two, three,
/// and four, matching the four component-query shapes the external
/// interface names.
pub trait ComponentSet {
    /// `None` if any member type was never registered: in that case no
    /// archetype can possibly carry it, so the query is trivially empty.
    fn mask(world: &World) -> Option<u64>;
}

impl<T: Component> ComponentSet for T {
    fn mask(world: &World) -> Option<u64> {
        world.existing_component_id::<T>().map(|id| 1u64 << id)
    }
}

macro_rules! impl_component_set_tuple {
    ($($t:ident),+) => {
        impl<$($t: Component),+> ComponentSet for ($($t,)+) {
            fn mask(world: &World) -> Option<u64> {
                let mut mask = 0u64;
                $(
                    mask |= <$t as ComponentSet>::mask(world)?;
                )+
                Some(mask)
            }
        }
    };
}

impl_component_set_tuple!(A, B);
impl_component_set_tuple!(A, B, C);
impl_component_set_tuple!(A, B, C, D);

/// Streaming iterator over entities of every archetype whose mask is a
/// superset of the query mask, visited in archetype-creation order and,
/// within an archetype, in current row order.
pub struct ComponentQuery<'w> {
    world: &'w World,
    mask: Option<u64>,
    archetype: usize,
    row: usize,
}

impl<'w> ComponentQuery<'w> {
    pub(crate) fn new(world: &'w World, mask: Option<u64>) -> Self {
        ComponentQuery { world, mask, archetype: 0, row: 0 }
    }

    pub fn to_vec(self) -> Vec<Entity> {
        self.collect()
    }
}

impl<'w> Iterator for ComponentQuery<'w> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let mask = self.mask?;
        let archetypes = self.world.archetype_index();
        while self.archetype < archetypes.len() {
            let archetype = archetypes.get(self.archetype);
            if archetype.mask() & mask == mask && self.row < archetype.len() {
                let entity = archetype.entities()[self.row];
                self.row += 1;
                return Some(entity);
            }
            self.archetype += 1;
            self.row = 0;
        }
        None
    }
}

/// Streaming iterator over live entities carrying a given tag, scanning
/// the entity table by id rather than by archetype (tags are not
/// archetype state).
pub struct TagQuery<'w> {
    world: &'w World,
    tag_id: Option<TagId>,
    next_id: u32,
}

impl<'w> TagQuery<'w> {
    pub(crate) fn new(world: &'w World, tag_id: Option<TagId>) -> Self {
        TagQuery { world, tag_id, next_id: 1 }
    }

    pub fn to_vec(self) -> Vec<Entity> {
        self.collect()
    }
}

impl<'w> Iterator for TagQuery<'w> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let tag_id = self.tag_id?;
        let max_id = self.world.entity_table().max_id();
        while self.next_id <= max_id {
            let id = self.next_id;
            self.next_id += 1;
            if !self.world.entity_table().is_live_by_id(id) {
                continue;
            }
            let version = self.world.entity_table().version_by_id(id);
            let entity = self.world.entity_from_raw(id, version);
            let tags = self.world.entity_table().tags(entity).unwrap_or(0);
            if tags & (1u64 << tag_id) != 0 {
                return Some(entity);
            }
        }
        None
    }
}

/// Streaming iterator over entities that satisfy both a component filter
/// and a tag filter.
pub struct ComponentTagQuery<'w> {
    components: ComponentQuery<'w>,
    world: &'w World,
    tag_id: Option<TagId>,
}

impl<'w> ComponentTagQuery<'w> {
    pub(crate) fn new(world: &'w World, component_mask: Option<u64>, tag_id: Option<TagId>) -> Self {
        ComponentTagQuery { components: ComponentQuery::new(world, component_mask), world, tag_id }
    }

    pub fn to_vec(self) -> Vec<Entity> {
        self.collect()
    }
}

impl<'w> Iterator for ComponentTagQuery<'w> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let tag_id = self.tag_id?;
        for entity in self.components.by_ref() {
            let tags = self.world.entity_table().tags(entity).unwrap_or(0);
            if tags & (1u64 << tag_id) != 0 {
                return Some(entity);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;
    use crate::world::World;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }
    impl Component for Position {}

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Velocity {
        dx: i32,
        dy: i32,
    }
    impl Component for Velocity {}

    struct Movable;
    impl Tag for Movable {}

    fn make_world() -> (World, Vec<Entity>) {
        let mut world = World::new();
        let mut entities = Vec::new();
        for i in 0..3 {
            let e = world.add_entity();
            world.add_component(e, Position { x: i, y: i });
            entities.push(e);
        }
        for i in 0..2 {
            let e = world.add_entity();
            world.add_component(e, Position { x: i, y: i });
            world.add_component(e, Velocity { dx: 1, dy: 1 });
            entities.push(e);
        }
        (world, entities)
    }

    #[test]
    fn with_component_yields_every_archetype_carrying_it() {
        // Given 3 Position-only entities and 2 Position+Velocity entities
        let (world, entities) = make_world();

        // When querying by Position alone
        let results = world.with_component::<Position>().to_vec();

        // Then all 5 entities are yielded
        assert_eq!(results.len(), 5);
        for e in &entities {
            assert!(results.contains(e));
        }
    }

    #[test]
    fn with_components_intersection_only_yields_matching_archetype() {
        // Given the same mixed world
        let (world, entities) = make_world();

        // When querying by Position and Velocity together
        let results = world.with_components::<(Position, Velocity)>().to_vec();

        // Then only the 2 entities carrying both are yielded
        assert_eq!(results.len(), 2);
        assert!(results.contains(&entities[3]));
        assert!(results.contains(&entities[4]));
    }

    #[test]
    fn with_tag_scans_by_id_not_archetype() {
        // Given an entity with Position and a tag, and one without the tag
        let mut world = World::new();
        let tagged = world.add_entity();
        world.add_component(tagged, Position { x: 0, y: 0 });
        world.add_tag::<Movable>(tagged);
        let untagged = world.add_entity();
        world.add_component(untagged, Position { x: 1, y: 1 });

        // When querying by tag alone
        let results = world.with_tag::<Movable>().to_vec();

        // Then only the tagged entity is returned
        assert_eq!(results, vec![tagged]);
        let _ = untagged;
    }

    #[test]
    fn with_component_tag_combines_both_filters() {
        // Given a tagged Position entity and an untagged Position entity
        let mut world = World::new();
        let tagged = world.add_entity();
        world.add_component(tagged, Position { x: 0, y: 0 });
        world.add_tag::<Movable>(tagged);
        let untagged = world.add_entity();
        world.add_component(untagged, Position { x: 1, y: 1 });

        // When querying by Position + Movable
        let results = world.with_component_tag::<Position, Movable>().to_vec();

        // Then only the entity satisfying both is returned
        assert_eq!(results, vec![tagged]);
    }

    #[test]
    fn querying_unregistered_component_yields_nothing() {
        // Given a world with no Velocity ever registered
        let world = World::new();

        // When querying by Velocity
        let results = world.with_component::<Velocity>().to_vec();

        // Then it yields nothing rather than panicking
        assert!(results.is_empty());
    }
}

//! Named, ordered entity templates. A prefab is a list of per-component
//! initializer closures captured at registration time; `spawn` walks them
//! in declaration order, consulting an override value keyed by the
//! component's registry-assigned id rather than a stringified type name,
//! which would be prone to collisions. Uses the same closure-based
//! type-erasure idiom as [`crate::event`]'s listener lists.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::component::{Component, ComponentId};
use crate::entity::Entity;
use crate::error::Error;
use crate::world::World;

/// Per-spawn override values, keyed by component id once resolved.
pub struct Overrides {
    values: HashMap<ComponentId, Box<dyn Any>>,
}

impl Overrides {
    pub(crate) fn new() -> Self {
        Overrides { values: HashMap::new() }
    }

    fn insert<T: Component>(&mut self, id: ComponentId, value: T) {
        self.values.insert(id, Box::new(value));
    }

    fn get<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.values.get(&id).and_then(|value| value.downcast_ref::<T>())
    }
}

/// A set of per-spawn override values resolvable against a world's
/// component registry. Implemented for a single component value and for
/// tuples of up to three, mirroring [`crate::query::ComponentSet`]'s
/// single/tuple pattern.
pub trait OverrideSet {
    fn collect(self, world: &mut World, into: &mut Overrides);
}

impl OverrideSet for () {
    fn collect(self, _world: &mut World, _into: &mut Overrides) {}
}

impl<T: Component + Clone> OverrideSet for T {
    fn collect(self, world: &mut World, into: &mut Overrides) {
        let id = world.component_id::<T>();
        into.insert(id, self);
    }
}

impl<A: Component + Clone, B: Component + Clone> OverrideSet for (A, B) {
    fn collect(self, world: &mut World, into: &mut Overrides) {
        self.0.collect(world, into);
        self.1.collect(world, into);
    }
}

impl<A: Component + Clone, B: Component + Clone, C: Component + Clone> OverrideSet for (A, B, C) {
    fn collect(self, world: &mut World, into: &mut Overrides) {
        self.0.collect(world, into);
        self.1.collect(world, into);
        self.2.collect(world, into);
    }
}

/// A single initializer: knows one component type, its default value, and
/// how to consult an override map for it. Type-erased so a prefab can
/// hold a heterogeneous, ordered list of them.
pub trait Initializer {
    fn apply(&self, world: &mut World, entity: Entity, overrides: &Overrides);
}

struct TypedInitializer<T: Component + Clone> {
    default: T,
}

impl<T: Component + Clone> Initializer for TypedInitializer<T> {
    fn apply(&self, world: &mut World, entity: Entity, overrides: &Overrides) {
        let id = world.component_id::<T>();
        let value = overrides.get::<T>(id).cloned().unwrap_or_else(|| self.default.clone());
        world.add_component(entity, value);
    }
}

/// Builds a component initializer carrying `default`, for use in
/// [`World::register_prefab`]'s initializer list.
pub fn component<T: Component + Clone>(default: T) -> Box<dyn Initializer> {
    Box::new(TypedInitializer { default })
}

pub(crate) struct Prefab {
    initializers: Vec<Box<dyn Initializer>>,
}

impl Prefab {
    pub(crate) fn initializers(&self) -> &[Box<dyn Initializer>] {
        &self.initializers
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    prefabs: HashMap<String, Rc<Prefab>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, name: String, initializers: Vec<Box<dyn Initializer>>) {
        self.prefabs.insert(name, Rc::new(Prefab { initializers }));
    }

    pub(crate) fn get(&self, name: &str) -> Result<Rc<Prefab>, Error> {
        self.prefabs.get(name).cloned().ok_or_else(|| Error::UnknownPrefab(name.to_string()))
    }
}

//! The component type registry: assigns each distinct component type a
//! dense id in `[0, 64)` on first use and remembers its layout and
//! destructor, collapsed to a single `!Sync` registry since this crate
//! is single-threaded.

use std::alloc::Layout;
use std::any::TypeId;
use std::collections::HashMap;

use crate::error::Error;

/// Marker trait for plain component payloads. Implemented via
/// `#[derive(Component)]` or by hand for types outside this crate.
pub trait Component: 'static {}

/// Dense id assigned to a registered component type, stable for the
/// lifetime of the world that assigned it.
pub type ComponentId = u8;

/// Per-component metadata recorded at first registration: layout and a
/// type-erased destructor, used by [`crate::archetype::Column`] to drop
/// evicted rows without knowing `T` statically.
#[derive(Clone, Copy)]
pub(crate) struct Info {
    layout: Layout,
    drop_fn: unsafe fn(*mut u8),
}

impl Info {
    fn of<T: Component>() -> Self {
        Info {
            layout: Layout::new::<T>(),
            drop_fn: drop_in_place::<T>,
        }
    }

    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }

    pub(crate) fn drop_fn(&self) -> unsafe fn(*mut u8) {
        self.drop_fn
    }

    #[cfg(test)]
    pub(crate) fn for_test(layout: Layout, drop_fn: unsafe fn(*mut u8)) -> Self {
        Info { layout, drop_fn }
    }
}

unsafe fn drop_in_place<T>(ptr: *mut u8) {
    // SAFETY: caller guarantees `ptr` points at a live, properly aligned `T`.
    unsafe { std::ptr::drop_in_place(ptr.cast::<T>()) }
}

/// Assigns dense component ids on first observation of a type.
///
/// A type is identified by its `TypeId`, which sidesteps the stringified
/// name collisions a string-keyed registry would be prone to.
#[derive(Default)]
pub struct Registry {
    ids: HashMap<TypeId, ComponentId>,
    infos: Vec<Info>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `T`'s component id, assigning a fresh one on first call.
    ///
    /// Fails with [`Error::CapacityExceeded`] on the 65th distinct type.
    pub fn component_id<T: Component>(&mut self) -> Result<ComponentId, Error> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        if self.infos.len() >= 64 {
            return Err(Error::CapacityExceeded);
        }
        let id = self.infos.len() as ComponentId;
        self.ids.insert(TypeId::of::<T>(), id);
        self.infos.push(Info::of::<T>());
        Ok(id)
    }

    /// Returns `T`'s component id if it was already registered, without
    /// assigning a new one.
    pub fn existing_id<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    pub(crate) fn info(&self, id: ComponentId) -> Info {
        self.infos[id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position {
        #[allow(dead_code)]
        x: f32,
        #[allow(dead_code)]
        y: f32,
    }
    impl Component for Position {}

    struct Velocity {
        #[allow(dead_code)]
        dx: f32,
        #[allow(dead_code)]
        dy: f32,
    }
    impl Component for Velocity {}

    #[test]
    fn first_registration_assigns_id_zero() {
        // Given a fresh registry
        let mut registry = Registry::new();

        // When a type is registered for the first time
        let id = registry.component_id::<Position>().unwrap();

        // Then it gets the first free id
        assert_eq!(id, 0);
    }

    #[test]
    fn repeated_registration_is_stable() {
        // Given a registry with one type already registered
        let mut registry = Registry::new();
        let first = registry.component_id::<Position>().unwrap();

        // When the same type is registered again
        let second = registry.component_id::<Position>().unwrap();

        // Then the id does not change
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_types_get_distinct_ids() {
        // Given a fresh registry
        let mut registry = Registry::new();

        // When two distinct types are registered
        let a = registry.component_id::<Position>().unwrap();
        let b = registry.component_id::<Velocity>().unwrap();

        // Then their ids differ
        assert_ne!(a, b);
    }

    #[test]
    fn sixty_fifth_registration_fails() {
        // Given a registry with 64 distinct types already registered
        struct Marker<const N: u32>;
        impl<const N: u32> Component for Marker<N> {}
        let mut registry = Registry::new();
        macro_rules! reg {
            ($registry:expr, $($n:expr),*) => {
                $( $registry.component_id::<Marker<$n>>().unwrap(); )*
            };
        }
        reg!(
            registry, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
            21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41,
            42, 43, 44, 45, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63
        );

        // When a 65th distinct type is registered
        let result = registry.component_id::<Marker<64>>();

        // Then it fails with CapacityExceeded
        assert_eq!(result, Err(Error::CapacityExceeded));
    }
}

//! The tag bitmask facility: a per-entity 64-bit flag set, independent of
//! archetypes. Tags churn far more often than an entity's component set
//! does (`IsSelected`, `IsOnFire`), so they are deliberately kept out of
//! the archetype graph: setting or clearing one never migrates a row.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::Error;

/// Marker trait for tag types. Implemented via `#[derive(Tag)]` or by
/// hand; tag types carry no data of their own, only identity.
pub trait Tag: 'static {}

/// Dense id assigned to a registered tag type, stable for the lifetime of
/// the world that assigned it. A separate id space from [`crate::component::ComponentId`].
pub type TagId = u8;

/// Assigns dense tag ids on first observation of a type, capped at 64 so
/// a tag set fits in one `u64` bitmask.
#[derive(Default)]
pub struct Registry {
    ids: HashMap<TypeId, TagId>,
    next: TagId,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag_id<T: Tag>(&mut self) -> Result<TagId, Error> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        if self.next >= 64 {
            return Err(Error::CapacityExceeded);
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    pub fn existing_id<T: Tag>(&self) -> Option<TagId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }
}

//! An archetype-based entity-component-system storage engine: entities
//! are grouped by the exact set of components they carry, each group's
//! component data lives in parallel contiguous column arrays, and queries
//! walk those arrays at close to memory-bandwidth speed.
//!
//! [`world::World`] is the single entry point; start there.

// Lets `#[derive(Component)]` and friends, emitted as `::mosaic::...`
// paths, resolve correctly inside this crate's own tests and doctests.
extern crate self as mosaic;

pub(crate) mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod prefab;
pub mod query;
pub mod tag;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use error::Error;
pub use event::Event;
pub use mosaic_macros::{Component, Event, Tag};
pub use tag::Tag;
pub use world::{World, WorldConfig};

//! Error kinds surfaced across the public API.
//!
//! Most operations in this crate are infallible by design (see the module
//! docs on `world`): misuse of a freed handle or an absent component is
//! expressed with `Option`/no-op semantics, not `Result`. Only the two
//! genuinely recoverable-or-fatal conditions named below produce an error.

use thiserror::Error;

/// Errors returned by [`crate::world::World`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A 65th distinct component or tag type was registered in a single
    /// world. Component and tag ids are each capped at 64 so that a mask
    /// fits in a `u64`; this is fatal for the world, not recoverable.
    #[error("component or tag capacity exceeded: at most 64 distinct types are supported per world")]
    CapacityExceeded,

    /// `spawn` was called with a name that was never passed to
    /// `register_prefab`. Recoverable: the caller's `spawn` call fails,
    /// the world is otherwise unaffected.
    #[error("unknown prefab: {0:?}")]
    UnknownPrefab(String),
}

use thiserror::Error;

use crate::component::ComponentId;

/// Recoverable failures surfaced by [`World`](crate::world::World)
/// operations.
///
/// Contract violations (unsorted component lists, out-of-bounds rows,
/// mismatched value counts) are programming errors and panic instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity is dead or its handle is stale")]
    DeadEntity,

    #[error("component {0:?} is already present")]
    DuplicateComponent(ComponentId),

    #[error("component {0:?} is not present")]
    MissingComponent(ComponentId),

    #[error("component type limit reached")]
    TooManyComponentTypes,
}

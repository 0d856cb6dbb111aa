pub mod archetype;
pub mod bundle;
pub mod component;
pub mod entity;
pub mod error;
pub mod generic;
pub mod mask;
pub mod query;
pub mod store;
pub mod world;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use super::bundle::Bundle;
    pub use super::component::{Component, ComponentId};
    pub use super::entity::Entity;
    pub use super::error::EcsError;
    pub use super::generic::CompMap;
    pub use super::mask::{Mask, MASK_TOTAL_BITS};
    pub use super::query::{ArchetypeMatches, ArchetypeView};
    pub use super::world::{Config, World, WorldId};
    pub use silt_ecs_macros::Component;
}

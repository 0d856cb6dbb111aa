use std::marker::PhantomData;

use crate::{
    component::{Component, ComponentId},
    entity::Entity,
    error::EcsError,
    world::World,
};

/// Type-safe accessor for one component type, with the [`ComponentId`]
/// resolved once at construction instead of on every call.
///
/// Useful in hot loops that touch the same component for many entities.
pub struct CompMap<T: Component> {
    id: ComponentId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> CompMap<T> {
    /// Creates a map for `T`, registering the type if necessary.
    pub fn new(world: &mut World) -> Result<Self, EcsError> {
        Ok(Self {
            id: world.component_init::<T>()?,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[inline]
    pub fn get<'w>(&self, world: &'w World, entity: Entity) -> Option<&'w T> {
        let ptr = world.entity_get_ptr(entity, self.id);
        if ptr.is_null() {
            return None;
        }
        // SAFETY:
        // - `self.id` was registered for `T`, so the row holds a valid `T`
        Some(unsafe { &*(ptr as *const T) })
    }

    #[inline]
    pub fn get_mut<'w>(&self, world: &'w mut World, entity: Entity) -> Option<&'w mut T> {
        let ptr = world.entity_get_ptr(entity, self.id);
        if ptr.is_null() {
            return None;
        }
        // SAFETY:
        // - `self.id` was registered for `T`; the `&mut World` borrow makes
        //   this access exclusive
        Some(unsafe { &mut *(ptr as *mut T) })
    }

    #[inline]
    pub fn has(&self, world: &World, entity: Entity) -> bool {
        world.entity_has(entity, self.id)
    }

    /// Overwrites the component of `entity` in place.
    #[inline]
    pub fn write(&self, world: &mut World, entity: Entity, value: T) -> Result<(), EcsError> {
        // SAFETY:
        // - `value` is a `T`, matching the layout registered for `self.id`
        unsafe { world.entity_write_ptr(entity, self.id, &value as *const T as *const u8) }
    }
}

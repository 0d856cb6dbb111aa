use silt_ecs_macros::foreach_tuple;

use crate::{
    component::{Component, ComponentId, Components},
    error::EcsError,
};

/// [`Bundle`] is implemented for every type implementing [`Component`], as
/// well as for tuples of [`Component`]s. A bundle names a set of components
/// together with one value per component, which is what
/// [`World::entity_create_with`](crate::world::World::entity_create_with) and
/// [`World::entity_set`](crate::world::World::entity_set) consume.
///
/// SAFETY:
/// - `component_ptrs` must yield exactly one pointer per id reported by
///   `component_ids`, in the same order, each valid for the size of its
///   component while `self` is alive
/// - Manual implementations are discouraged
pub unsafe trait Bundle: Send + Sync + 'static {
    /// Registers (if needed) and collects the bundle's component ids, in
    /// declaration order.
    fn component_ids(components: &mut Components) -> Result<Vec<ComponentId>, EcsError>;

    /// Hands `func` a pointer to each component value, in declaration order.
    fn component_ptrs(&self, func: &mut impl FnMut(*const u8));
}

unsafe impl<T: Component> Bundle for T {
    #[inline]
    fn component_ids(components: &mut Components) -> Result<Vec<ComponentId>, EcsError> {
        Ok(vec![components.init::<T>()?])
    }

    #[inline]
    fn component_ptrs(&self, func: &mut impl FnMut(*const u8)) {
        func(self as *const T as *const u8);
    }
}

macro_rules! bundle_tuple_impl {
    ($($c:ident),*) => {
        unsafe impl<$($c: Component),*> Bundle for ($($c,)*) {
            #[inline]
            fn component_ids(components: &mut Components) -> Result<Vec<ComponentId>, EcsError> {
                Ok(vec![$(components.init::<$c>()?),*])
            }

            #[inline]
            fn component_ptrs(&self, func: &mut impl FnMut(*const u8)) {
                #[allow(non_snake_case)]
                let ($($c,)*) = self;
                $(func($c as *const $c as *const u8);)*
            }
        }
    };
}

foreach_tuple!(bundle_tuple_impl, 1, 12, T);

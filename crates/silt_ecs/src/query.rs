use crate::{
    archetype::{Archetype, ArchetypeId},
    component::{Component, ComponentId},
    entity::Entity,
    mask::Mask,
    world::World,
};

/// Iterator over the archetypes whose mask is a superset of `include` and
/// disjoint from `exclude`.
///
/// Matching stops at the archetype level: iterating the rows of a match is
/// the caller's business, via [`ArchetypeView::entities`] and the column
/// accessors.
pub struct ArchetypeMatches<'w> {
    world: &'w World,
    include: Mask,
    exclude: Mask,
    index: usize,
}

impl<'w> ArchetypeMatches<'w> {
    pub(crate) fn new(world: &'w World, include: Mask, exclude: Mask) -> Self {
        Self {
            world,
            include,
            exclude,
            index: 0,
        }
    }
}

impl<'w> Iterator for ArchetypeMatches<'w> {
    type Item = ArchetypeView<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.world.archetypes().len() {
            let archetype = self.world.archetypes().get(ArchetypeId::from_index(self.index));
            self.index += 1;
            if archetype.mask().contains(&self.include)
                && archetype.mask().is_disjoint(&self.exclude)
            {
                return Some(ArchetypeView {
                    world: self.world,
                    archetype,
                });
            }
        }
        None
    }
}

/// Read-only handle to one matched archetype.
///
/// Column pointers taken from a view are invalidated by any structural
/// operation on the world or by growth of this archetype.
pub struct ArchetypeView<'w> {
    world: &'w World,
    archetype: &'w Archetype,
}

impl<'w> ArchetypeView<'w> {
    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.archetype.id()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.archetype.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetype.is_empty()
    }

    #[inline]
    pub fn mask(&self) -> &'w Mask {
        self.archetype.mask()
    }

    #[inline]
    pub fn component_ids(&self) -> &'w [ComponentId] {
        self.archetype.component_ids()
    }

    /// The entity handle of every row, in row order.
    #[inline]
    pub fn entities(&self) -> &'w [Entity] {
        self.archetype.entities()
    }

    /// Base pointer of the column for `id`; null for absent ids and
    /// zero-sized components.
    #[inline]
    pub fn column_ptr(&self, id: ComponentId) -> *mut u8 {
        self.archetype.column_ptr(id)
    }

    /// Element stride of the column for `id`.
    #[inline]
    pub fn item_size(&self, id: ComponentId) -> usize {
        self.archetype.item_size(id)
    }

    /// The column for `T` as a typed slice, or [`None`] if the archetype
    /// does not carry `T`.
    pub fn column<T: Component>(&self) -> Option<&'w [T]> {
        let id = self.world.components().get::<T>()?;
        if !self.archetype.has(id) {
            return None;
        }
        let len = self.archetype.len();
        if std::mem::size_of::<T>() == 0 {
            // Zero-sized components have no backing bytes; a dangling base
            // is the canonical slice pointer for them.
            let base = std::ptr::NonNull::<T>::dangling().as_ptr();
            // SAFETY:
            // - any aligned non-null pointer is valid for a ZST slice
            return Some(unsafe { std::slice::from_raw_parts(base, len) });
        }
        debug_assert!(self.archetype.item_size(id) == std::mem::size_of::<T>());
        let base = self.archetype.column_ptr(id) as *const T;
        // SAFETY:
        // - `id` was registered for `T`, so the column holds `len` valid `T`s
        Some(unsafe { std::slice::from_raw_parts(base, len) })
    }
}

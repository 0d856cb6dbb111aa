use std::{alloc::Layout, collections::HashMap, ptr};

use fxhash::FxBuildHasher;

use crate::{
    component::{ComponentId, Components},
    entity::Entity,
    mask::{Mask, MASK_TOTAL_BITS},
    store::column::Column,
};

/// Index of an archetype (and of its graph node) inside [`Archetypes`].
///
/// Archetypes are never destroyed, so an id stays valid for the lifetime of
/// the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The archetype of entities without any components.
    pub(crate) const EMPTY: ArchetypeId = ArchetypeId(0);

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One entry of the access table: the current base pointer of a component's
/// column and the element stride. Null/zero for ids the archetype does not
/// store bytes for (absent ids and zero-sized components).
#[derive(Clone, Copy)]
struct ColumnRef {
    ptr: *mut u8,
    size: usize,
}

/// Stores every entity that has exactly this set of components, column-major.
///
/// `ids` is strictly sorted; `columns` is parallel to it, and `entities` maps
/// each row back to its handle. The `access` table is indexed directly by
/// component id so the hot read path is one indexed load plus a multiply-add,
/// without searching `ids`.
///
/// Rows are kept dense with swap-remove; the caller is responsible for
/// patching the entity index of a row that got swapped into the removed slot.
pub struct Archetype {
    id: ArchetypeId,
    mask: Mask,
    ids: Vec<ComponentId>,
    columns: Vec<Column>,
    entities: Vec<Entity>,
    access: Box<[ColumnRef]>,
    capacity: usize,
    increment: usize,
}

// SAFETY:
// - The raw pointers in `access` alias allocations owned by `columns`; the
//   archetype is the exclusive owner of those allocations
unsafe impl Send for Archetype {}
unsafe impl Sync for Archetype {}

impl Archetype {
    /// Creates an empty archetype for the given components.
    ///
    /// `components` must be strictly sorted by id; violating this is a
    /// programming error. A non-storage archetype ("holder", a pure graph
    /// vertex) starts with capacity 1 instead of a full increment.
    pub(crate) fn new(
        id: ArchetypeId,
        increment: usize,
        for_storage: bool,
        components: &[(ComponentId, Layout)],
    ) -> Self {
        // Holder archetypes are bare graph vertices; their columns start at
        // and grow by a single row.
        let increment = if for_storage { increment } else { 1 };
        let capacity = increment;

        let mut mask = Mask::default();
        let mut ids = Vec::with_capacity(components.len());
        let mut columns = Vec::with_capacity(components.len());
        let mut access = vec![
            ColumnRef {
                ptr: ptr::null_mut(),
                size: 0,
            };
            MASK_TOTAL_BITS
        ]
        .into_boxed_slice();

        let mut prev: Option<ComponentId> = None;
        for &(component_id, layout) in components {
            assert!(
                prev.map_or(true, |p| p < component_id),
                "component ids must be strictly sorted"
            );
            prev = Some(component_id);

            let column = Column::with_capacity(layout, capacity, increment);
            mask.set(component_id, true);
            access[component_id.index()] = ColumnRef {
                ptr: column.base_ptr(),
                size: column.item_size(),
            };
            ids.push(component_id);
            columns.push(column);
        }

        Self {
            id,
            mask,
            ids,
            columns,
            entities: Vec::with_capacity(capacity),
            access,
            capacity,
            increment,
        }
    }

    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    #[inline]
    pub fn component_ids(&self) -> &[ComponentId] {
        &self.ids
    }

    #[inline]
    pub fn has(&self, id: ComponentId) -> bool {
        self.mask.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[inline]
    pub fn entity_at(&self, row: u32) -> Entity {
        self.entities[row as usize]
    }

    /// Pointer to the component `id` of the entity at `row`.
    ///
    /// Null when the archetype does not carry `id` or the component is
    /// zero-sized; callers treat null as "no bytes here".
    #[inline]
    pub fn get(&self, row: u32, id: ComponentId) -> *mut u8 {
        let column = &self.access[id.index()];
        if column.ptr.is_null() {
            return ptr::null_mut();
        }
        debug_assert!((row as usize) < self.entities.len());
        // SAFETY:
        // - `row` is a live row, the column holds `capacity >= len` elements
        unsafe { column.ptr.add(row as usize * column.size) }
    }

    /// Current base pointer of the column for `id`; null for absent ids and
    /// zero-sized components. Invalidated by any growth of this archetype.
    #[inline]
    pub fn column_ptr(&self, id: ComponentId) -> *mut u8 {
        self.access[id.index()].ptr
    }

    /// Element stride of the column for `id`; zero for absent ids and
    /// zero-sized components.
    #[inline]
    pub fn item_size(&self, id: ComponentId) -> usize {
        self.access[id.index()].size
    }

    /// Appends `entity` with all components zero-initialized. Returns the new
    /// row.
    pub(crate) fn alloc(&mut self, entity: Entity) -> u32 {
        let row = self.entities.len();
        self.extend();
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push_zeroed();
        }
        row as u32
    }

    /// Appends `entity` with one value per component of the archetype.
    ///
    /// `components` must hold exactly one `(id, pointer)` pair per component,
    /// sorted like `ids`; a count mismatch is a programming error.
    ///
    /// SAFETY:
    /// - every pointer must be readable for the size of its component
    pub(crate) unsafe fn add(
        &mut self,
        entity: Entity,
        components: &[(ComponentId, *const u8)],
    ) -> u32 {
        assert!(
            components.len() == self.ids.len(),
            "expected {} component values, got {}",
            self.ids.len(),
            components.len()
        );

        let row = self.entities.len();
        self.extend();
        self.entities.push(entity);
        for (index, &(id, src)) in components.iter().enumerate() {
            debug_assert!(id == self.ids[index]);
            self.columns[index].push_from(src);
        }
        row as u32
    }

    /// Swap-removes `row` from the entities table and every column. Returns
    /// whether a tail row was moved into its place; if so, the caller must
    /// update the entity index of [`Self::entity_at`]`(row)`.
    pub(crate) fn remove(&mut self, row: u32) -> bool {
        let row = row as usize;
        assert!(row < self.entities.len(), "row {row} out of bounds");
        let last = self.entities.len() - 1;
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        row < last
    }

    /// Overwrites the component `id` at `row` with the bytes behind `src`.
    /// No-op for zero-sized components.
    ///
    /// SAFETY:
    /// - `src` must be readable for the component's size
    pub(crate) unsafe fn set(&mut self, row: u32, id: ComponentId, src: *const u8) {
        debug_assert!(self.mask.get(id), "set() of a component the archetype lacks");
        let dst = self.get(row, id);
        if !dst.is_null() {
            ptr::copy_nonoverlapping(src, dst, self.access[id.index()].size);
        }
    }

    // Grows all columns in lockstep once the shared capacity is exhausted and
    // refreshes the access table with the relocated base pointers.
    fn extend(&mut self) {
        if self.capacity > self.entities.len() {
            return;
        }
        let increment = self.increment;
        self.capacity = increment * ((self.capacity + increment) / increment);
        for (index, &id) in self.ids.iter().enumerate() {
            let column = &mut self.columns[index];
            column.reserve(self.capacity);
            self.access[id.index()].ptr = column.base_ptr();
        }
    }
}

/// A node of the archetype graph: for each component id, the archetype
/// reached by adding or removing exactly that id. Edges are filled lazily and
/// stay valid forever because archetypes are never destroyed.
pub(crate) struct ArchetypeNode {
    pub(crate) to_add: Box<[Option<ArchetypeId>]>,
    pub(crate) to_remove: Box<[Option<ArchetypeId>]>,
}

impl ArchetypeNode {
    fn new() -> Self {
        Self {
            to_add: vec![None; MASK_TOTAL_BITS].into_boxed_slice(),
            to_remove: vec![None; MASK_TOTAL_BITS].into_boxed_slice(),
        }
    }
}

/// Owns every archetype and graph node of a world, in index-stable vectors,
/// plus the mask table resolving cold transition lookups.
pub struct Archetypes {
    archetypes: Vec<Archetype>,
    nodes: Vec<ArchetypeNode>,
    by_mask: HashMap<Mask, ArchetypeId, FxBuildHasher>,
    increment: usize,
}

impl Archetypes {
    pub(crate) fn new(increment: usize) -> Self {
        let mut archetypes = Self {
            archetypes: Vec::new(),
            nodes: Vec::new(),
            by_mask: HashMap::default(),
            increment,
        };
        // The empty archetype always exists and roots the graph.
        archetypes.insert(Mask::default(), true, &[]);
        archetypes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    #[inline]
    pub fn get(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id.index()]
    }

    /// Mutable access to two distinct archetypes at once, for row moves.
    pub(crate) fn get_2_mut(
        &mut self,
        first: ArchetypeId,
        second: ArchetypeId,
    ) -> (&mut Archetype, &mut Archetype) {
        let (i, j) = (first.index(), second.index());
        assert!(i != j, "cannot borrow an archetype twice");
        if i < j {
            let (left, right) = self.archetypes.split_at_mut(j);
            (&mut left[i], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(i);
            (&mut right[0], &mut left[j])
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    #[cfg(test)]
    pub(crate) fn node(&self, id: ArchetypeId) -> &ArchetypeNode {
        &self.nodes[id.index()]
    }

    /// Resolves the archetype reached from `from` by adding (or removing)
    /// the single component `id`, creating the target node + archetype on
    /// first use. The edge is cached in both directions.
    pub(crate) fn transition(
        &mut self,
        from: ArchetypeId,
        id: ComponentId,
        add: bool,
        for_storage: bool,
        components: &Components,
    ) -> ArchetypeId {
        let node = &self.nodes[from.index()];
        let cached = if add {
            node.to_add[id.index()]
        } else {
            node.to_remove[id.index()]
        };
        if let Some(target) = cached {
            return target;
        }

        let mask = if add {
            self.archetypes[from.index()].mask().with(id)
        } else {
            self.archetypes[from.index()].mask().without(id)
        };
        let target = match self.by_mask.get(&mask).copied() {
            Some(target) => target,
            None => {
                let layouts: Vec<(ComponentId, Layout)> = mask
                    .ids()
                    .map(|id| (id, components.info(id).layout()))
                    .collect();
                self.insert(mask, for_storage, &layouts)
            }
        };

        if add {
            self.nodes[from.index()].to_add[id.index()] = Some(target);
            self.nodes[target.index()].to_remove[id.index()] = Some(from);
        } else {
            self.nodes[from.index()].to_remove[id.index()] = Some(target);
            self.nodes[target.index()].to_add[id.index()] = Some(from);
        }
        target
    }

    fn insert(
        &mut self,
        mask: Mask,
        for_storage: bool,
        components: &[(ComponentId, Layout)],
    ) -> ArchetypeId {
        let id = ArchetypeId::from_index(self.archetypes.len());
        self.archetypes
            .push(Archetype::new(id, self.increment, for_storage, components));
        self.nodes.push(ArchetypeNode::new());
        self.by_mask.insert(mask, id);
        log::trace!(
            "created archetype {:?} with {} component(s)",
            id,
            components.len()
        );
        id
    }
}

use std::alloc::Layout;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    archetype::{ArchetypeId, Archetypes},
    bundle::Bundle,
    component::{Component, ComponentId, Components},
    entity::{Entities, Entity, EntityLocation},
    error::EcsError,
    mask::Mask,
    query::ArchetypeMatches,
};

/// Uniquely identifies a [`World`]. Multiple [`World`]s can be created, even
/// from different threads, and they'll still have unique [`WorldId`]s.
///
/// # Panics
///
/// Will panic if more than [`usize::MAX`] [`WorldId`]s get created
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct WorldId(usize);

static WORLD_COUNT: AtomicUsize = AtomicUsize::new(0);

impl WorldId {
    pub fn new() -> Self {
        WORLD_COUNT
            // Relaxed ordering is sufficient, the counter is the only state
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_add(1)
            })
            .map(WorldId)
            .expect("too many worlds were created")
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

/// Construction parameters of a [`World`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Granularity archetype columns grow by, in rows.
    pub capacity_increment: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity_increment: 128,
        }
    }
}

/// This is the core structure of an ecs instance: it owns the component
/// registry, the entity index and every archetype, and exposes all
/// operations on [entities](Entity) and their components.
///
/// Structural operations (`entity_create`, `entity_add`, `entity_remove`,
/// `entity_destroy`, ...) take `&mut self`; reads take `&self`. Raw pointers
/// obtained from [`World::entity_get_ptr`] or an
/// [`ArchetypeView`](crate::query::ArchetypeView) stay valid only until the
/// next structural operation or column growth and must not be retained
/// across one.
pub struct World {
    id: WorldId,
    components: Components,
    entities: Entities,
    archetypes: Archetypes,
}

impl World {
    #[inline]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        assert!(
            config.capacity_increment > 0,
            "capacity increment must be non-zero"
        );
        let id = WorldId::new();
        log::trace!("created world {id:?}");
        Self {
            id,
            components: Components::new(),
            entities: Entities::new(),
            archetypes: Archetypes::new(config.capacity_increment),
        }
    }

    /// This [`World`]s [`WorldId`]
    #[inline]
    pub fn id(&self) -> WorldId {
        self.id
    }

    #[inline]
    pub fn components(&self) -> &Components {
        &self.components
    }

    #[inline]
    pub fn archetypes(&self) -> &Archetypes {
        &self.archetypes
    }

    /// Returns the id of component type `T`, registering it first if needed.
    #[inline]
    pub fn component_init<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        self.components.init::<T>()
    }

    /// Registers a component described only by a name and a layout, for
    /// component types that are not Rust types (scripts, ABI boundaries).
    #[inline]
    pub fn component_register(
        &mut self,
        name: &str,
        layout: Layout,
    ) -> Result<ComponentId, EcsError> {
        self.components.register_named(name, layout)
    }

    #[inline]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components.get::<T>()
    }

    /// Instantiates an [`Entity`] carrying the given components, all
    /// zero-initialized. Duplicate ids in `ids` are rejected.
    pub fn entity_create(&mut self, ids: &[ComponentId]) -> Result<Entity, EcsError> {
        let add = Self::sorted_unique(ids)?;
        let target = self.walk(ArchetypeId::EMPTY, &[], &add);

        let archetype = self.archetypes.get_mut(target);
        let row = archetype.len() as u32;
        let entity = self.entities.create(EntityLocation {
            archetype: target,
            row,
        });
        archetype.alloc(entity);
        Ok(entity)
    }

    /// Instantiates an [`Entity`] directly in the archetype of `bundle`,
    /// moving the bundle's values into storage.
    pub fn entity_create_with<B: Bundle>(&mut self, bundle: B) -> Result<Entity, EcsError> {
        let ids = B::component_ids(&mut self.components)?;
        let mut pairs: Vec<(ComponentId, *const u8)> = Vec::with_capacity(ids.len());
        {
            let mut index = 0;
            bundle.component_ptrs(&mut |ptr| {
                pairs.push((ids[index], ptr));
                index += 1;
            });
            debug_assert!(index == ids.len());
        }
        pairs.sort_unstable_by_key(|(id, _)| *id);
        for pair in pairs.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(EcsError::DuplicateComponent(pair[0].0));
            }
        }

        let sorted_ids: Vec<ComponentId> = pairs.iter().map(|(id, _)| *id).collect();
        let target = self.walk(ArchetypeId::EMPTY, &[], &sorted_ids);

        let archetype = self.archetypes.get_mut(target);
        let row = archetype.len() as u32;
        let entity = self.entities.create(EntityLocation {
            archetype: target,
            row,
        });
        // SAFETY:
        // - `pairs` pointers are borrowed from `bundle`, which outlives this
        //   call; one pair per archetype component, sorted
        unsafe { archetype.add(entity, &pairs) };
        Ok(entity)
    }

    /// Destroys an [`Entity`] and discards its components. The handle is
    /// dead afterwards; a later create may reuse its index with a higher
    /// generation.
    pub fn entity_destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        let location = self.entities.destroy(entity)?;
        let archetype = self.archetypes.get_mut(location.archetype);
        if archetype.remove(location.row) {
            let moved = archetype.entity_at(location.row);
            self.entities.relocate(moved, location);
        }
        Ok(())
    }

    #[inline]
    pub fn entity_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Adds the given components to `entity`, zero-initialized.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if an id is repeated or
    /// already present; in that case nothing is mutated.
    pub fn entity_add(&mut self, entity: Entity, ids: &[ComponentId]) -> Result<(), EcsError> {
        let source = self.entities.lookup(entity)?;
        let add = Self::sorted_unique(ids)?;
        if add.is_empty() {
            return Ok(());
        }
        let mask = *self.archetypes.get(source.archetype).mask();
        for &id in &add {
            if mask.get(id) {
                return Err(EcsError::DuplicateComponent(id));
            }
        }

        let target = self.walk(source.archetype, &[], &add);
        self.move_entity(entity, source, target);
        Ok(())
    }

    /// Removes the given components from `entity`.
    ///
    /// Fails with [`EcsError::MissingComponent`] if an id is not present and
    /// [`EcsError::DuplicateComponent`] if one is repeated; in either case
    /// nothing is mutated.
    pub fn entity_remove(&mut self, entity: Entity, ids: &[ComponentId]) -> Result<(), EcsError> {
        let source = self.entities.lookup(entity)?;
        let remove = Self::sorted_unique(ids)?;
        if remove.is_empty() {
            return Ok(());
        }
        let mask = *self.archetypes.get(source.archetype).mask();
        for &id in &remove {
            if !mask.get(id) {
                return Err(EcsError::MissingComponent(id));
            }
        }

        let target = self.walk(source.archetype, &remove, &[]);
        self.move_entity(entity, source, target);
        Ok(())
    }

    /// Adds and removes components in a single archetype move.
    ///
    /// `add` and `remove` must be disjoint; overlapping sets are a
    /// programming error.
    pub fn entity_exchange(
        &mut self,
        entity: Entity,
        add: &[ComponentId],
        remove: &[ComponentId],
    ) -> Result<(), EcsError> {
        let source = self.entities.lookup(entity)?;
        let add = Self::sorted_unique(add)?;
        let remove = Self::sorted_unique(remove)?;
        assert!(
            add.iter().all(|id| !remove.contains(id)),
            "add and remove sets overlap"
        );
        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }

        let mask = *self.archetypes.get(source.archetype).mask();
        for &id in &add {
            if mask.get(id) {
                return Err(EcsError::DuplicateComponent(id));
            }
        }
        for &id in &remove {
            if !mask.get(id) {
                return Err(EcsError::MissingComponent(id));
            }
        }

        let target = self.walk(source.archetype, &remove, &add);
        self.move_entity(entity, source, target);
        Ok(())
    }

    /// Adds the bundle's components to `entity`, moving the bundle's values
    /// into storage in the same step.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if any bundle component
    /// is already present.
    pub fn entity_set<B: Bundle>(&mut self, entity: Entity, bundle: B) -> Result<(), EcsError> {
        let source = self.entities.lookup(entity)?;
        let ids = B::component_ids(&mut self.components)?;

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(EcsError::DuplicateComponent(pair[0]));
            }
        }
        let mask = *self.archetypes.get(source.archetype).mask();
        for &id in &sorted {
            if mask.get(id) {
                return Err(EcsError::DuplicateComponent(id));
            }
        }

        let target = self.walk(source.archetype, &[], &sorted);
        let new_row = self.move_entity(entity, source, target);

        let archetype = self.archetypes.get_mut(target);
        let mut index = 0;
        bundle.component_ptrs(&mut |ptr| {
            // SAFETY:
            // - `ptr` is borrowed from `bundle` and readable for the
            //   component's size; `ids[index]` is its id
            unsafe { archetype.set(new_row, ids[index], ptr) };
            index += 1;
        });
        Ok(())
    }

    /// Overwrites the `T` component of `entity` in place. The entity keeps
    /// its archetype; writing a component the entity does not carry fails
    /// with [`EcsError::MissingComponent`].
    pub fn entity_write<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), EcsError> {
        let id = self.components.init::<T>()?;
        // SAFETY:
        // - `value` is readable for `size_of::<T>()`, which is the size
        //   registered for `id`
        unsafe { self.entity_write_ptr(entity, id, &value as *const T as *const u8) }
    }

    /// Overwrites the component `id` of `entity` with the bytes behind
    /// `src`. No-op for zero-sized components.
    ///
    /// SAFETY:
    /// - `src` must be readable for the size registered for `id`
    pub unsafe fn entity_write_ptr(
        &mut self,
        entity: Entity,
        id: ComponentId,
        src: *const u8,
    ) -> Result<(), EcsError> {
        let location = self.entities.lookup(entity)?;
        let archetype = self.archetypes.get_mut(location.archetype);
        if !archetype.has(id) {
            return Err(EcsError::MissingComponent(id));
        }
        archetype.set(location.row, id, src);
        Ok(())
    }

    /// Shared reference to the `T` component of `entity`. [`None`] for dead
    /// entities, absent components, and zero-sized components (which have no
    /// bytes to point at; use [`World::entity_has`]).
    #[inline]
    pub fn entity_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.components.get::<T>()?;
        let ptr = self.entity_get_ptr(entity, id);
        if ptr.is_null() {
            return None;
        }
        // SAFETY:
        // - `id` was registered for `T`, so the row holds a valid `T`
        Some(unsafe { &*(ptr as *const T) })
    }

    /// Mutable reference to the `T` component of `entity`.
    #[inline]
    pub fn entity_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.components.get::<T>()?;
        let ptr = self.entity_get_ptr(entity, id);
        if ptr.is_null() {
            return None;
        }
        // SAFETY:
        // - `id` was registered for `T`; `&mut self` guarantees exclusivity
        Some(unsafe { &mut *(ptr as *mut T) })
    }

    /// Raw pointer to the component `id` of `entity`; null when the entity
    /// is dead, the archetype does not carry `id`, or the component is
    /// zero-sized. Valid until the next structural operation or column
    /// growth.
    #[inline]
    pub fn entity_get_ptr(&self, entity: Entity, id: ComponentId) -> *mut u8 {
        match self.entities.lookup(entity) {
            Ok(location) => self.archetypes.get(location.archetype).get(location.row, id),
            Err(_) => std::ptr::null_mut(),
        }
    }

    /// Whether `entity` is alive and carries the component `id`.
    #[inline]
    pub fn entity_has(&self, entity: Entity, id: ComponentId) -> bool {
        match self.entities.lookup(entity) {
            Ok(location) => self.archetypes.get(location.archetype).has(id),
            Err(_) => false,
        }
    }

    /// Iterates every archetype whose mask contains `include` and shares no
    /// bit with `exclude`.
    #[inline]
    pub fn query(&self, include: &Mask, exclude: &Mask) -> ArchetypeMatches<'_> {
        ArchetypeMatches::new(self, *include, *exclude)
    }

    // Walks the graph from `start`, toggling one component per step. The
    // sorted `remove` and `add` lists are merged into a single ascending
    // pass so intermediate nodes are shared no matter how the caller split
    // or ordered the ids. Only the final vertex is created as a storage
    // archetype.
    fn walk(&mut self, start: ArchetypeId, remove: &[ComponentId], add: &[ComponentId]) -> ArchetypeId {
        let total = remove.len() + add.len();
        let mut step = 0;
        let mut node = start;
        let (mut r, mut a) = (0, 0);
        while r < remove.len() || a < add.len() {
            let removing = a == add.len() || (r < remove.len() && remove[r] < add[a]);
            let id = if removing {
                r += 1;
                remove[r - 1]
            } else {
                a += 1;
                add[a - 1]
            };
            step += 1;
            node = self
                .archetypes
                .transition(node, id, !removing, step == total, &self.components);
        }
        node
    }

    // Moves `entity` from `source` to a freshly allocated row of `target`,
    // copying the surviving components, and patches the entity index for
    // both the moved entity and the row that swap-remove may have displaced.
    fn move_entity(&mut self, entity: Entity, source: EntityLocation, target: ArchetypeId) -> u32 {
        debug_assert!(source.archetype != target);
        let (src, dst) = self.archetypes.get_2_mut(source.archetype, target);

        let new_row = dst.alloc(entity);
        for &id in src.component_ids() {
            let from = src.get(source.row, id);
            if from.is_null() || !dst.has(id) {
                continue;
            }
            // SAFETY:
            // - both rows are live and share the element size registered for
            //   `id`; the allocations are distinct
            unsafe { dst.set(new_row, id, from) };
        }

        if src.remove(source.row) {
            let moved = src.entity_at(source.row);
            self.entities.relocate(moved, source);
        }
        self.entities.relocate(
            entity,
            EntityLocation {
                archetype: target,
                row: new_row,
            },
        );
        new_row
    }

    fn sorted_unique(ids: &[ComponentId]) -> Result<Vec<ComponentId>, EcsError> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(EcsError::DuplicateComponent(pair[0]));
            }
        }
        Ok(sorted)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

use std::{alloc::Layout, any::TypeId, collections::HashMap};

use bytemuck::Pod;
use fxhash::FxBuildHasher;

use crate::{error::EcsError, mask::MASK_TOTAL_BITS};

/// A [`Component`] is nothing more but data, stored for an
/// [`Entity`](crate::entity::Entity) inside the [`World`](crate::world::World)
/// it lives in. Rows are moved by bitwise copy and new rows start
/// zero-initialized, so components are required to be plain old data; the
/// [`Pod`] bound enforces that. [`Component`] can be derived via
/// `#[derive(Component)]`.
///
/// Zero-sized components ("tags") are allowed. They occupy no column memory
/// but still participate in archetype masks.
pub trait Component: Pod + Send + Sync + 'static {}

/// Dense identifier of a registered component type, assigned from zero on
/// first registration and stable for the lifetime of the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u32);

impl ComponentId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Layout description of a registered component type.
#[derive(Clone, Debug)]
pub struct ComponentInfo {
    layout: Layout,
    name: Box<str>,
}

impl ComponentInfo {
    #[inline]
    fn new(name: &str, layout: Layout) -> Self {
        Self {
            // The padded layout is the element stride of the component's
            // columns.
            layout: layout.pad_to_align(),
            name: name.into(),
        }
    }

    #[inline]
    fn new_from<T: Component>() -> Self {
        Self::new(std::any::type_name::<T>(), Layout::new::<T>())
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(PartialEq, Eq, Hash)]
enum ComponentKey {
    Type(TypeId),
    Named(Box<str>),
}

/// Registry mapping component keys to dense [`ComponentId`]s.
///
/// Keys come in two flavors: Rust types implementing [`Component`], and
/// caller-provided names with an explicit [`Layout`] for components whose
/// shape is only known at run time. Registration is monotonic, ids are never
/// reassigned, and the id space is capped at [`MASK_TOTAL_BITS`].
pub struct Components {
    infos: Vec<ComponentInfo>,
    ids: HashMap<ComponentKey, ComponentId, FxBuildHasher>,
}

impl Components {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            infos: Vec::new(),
            ids: HashMap::default(),
        }
    }

    /// Returns the id of `T`, registering it first if necessary.
    pub fn init<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.ids.get(&ComponentKey::Type(TypeId::of::<T>())) {
            return Ok(*id);
        }
        let id = self.push(ComponentInfo::new_from::<T>())?;
        self.ids.insert(ComponentKey::Type(TypeId::of::<T>()), id);
        Ok(id)
    }

    /// Registers a named component with an explicit layout. Registering the
    /// same name again returns the original id.
    pub fn register_named(&mut self, name: &str, layout: Layout) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.ids.get(&ComponentKey::Named(name.into())) {
            return Ok(*id);
        }
        let id = self.push(ComponentInfo::new(name, layout))?;
        self.ids.insert(ComponentKey::Named(name.into()), id);
        Ok(id)
    }

    fn push(&mut self, info: ComponentInfo) -> Result<ComponentId, EcsError> {
        if self.infos.len() >= MASK_TOTAL_BITS {
            return Err(EcsError::TooManyComponentTypes);
        }
        let id = ComponentId::from_index(self.infos.len());
        self.infos.push(info);
        Ok(id)
    }

    #[inline]
    pub fn get<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&ComponentKey::Type(TypeId::of::<T>())).copied()
    }

    /// Info for a registered id. Panics on an id that was never handed out.
    #[inline]
    pub fn info(&self, id: ComponentId) -> &ComponentInfo {
        &self.infos[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

//! Objects grouped by material.
//!
//! The [`World`] applies each material once per pass and then draws every item
//! filed under it, in insertion order. The order of materials is the order
//! they were added, so draw order is stable across frames.

use crate::{
    context::GraphicsDevice,
    data_structures::{
        instance::InstancedBatch,
        material::{Material, MaterialId},
        object::RenderableObject,
    },
    error::{RenderError, Result},
    render::{Pass, Renderable, Scene},
};

/// Anything the world can hold.
pub enum WorldItem {
    Object(RenderableObject),
    Batch(InstancedBatch),
    Custom(Box<dyn Renderable>),
}

impl std::fmt::Debug for WorldItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldItem::Object(object) => f.debug_tuple("Object").field(&object.label()).finish(),
            WorldItem::Batch(batch) => f.debug_tuple("Batch").field(&batch.len()).finish(),
            WorldItem::Custom(item) => f.debug_tuple("Custom").field(&item.passes()).finish(),
        }
    }
}

impl From<RenderableObject> for WorldItem {
    fn from(object: RenderableObject) -> Self {
        WorldItem::Object(object)
    }
}

impl From<InstancedBatch> for WorldItem {
    fn from(batch: InstancedBatch) -> Self {
        WorldItem::Batch(batch)
    }
}

impl Renderable for WorldItem {
    fn passes(&self) -> Pass {
        match self {
            WorldItem::Object(object) => object.passes(),
            WorldItem::Batch(batch) => batch.passes(),
            WorldItem::Custom(item) => item.passes(),
        }
    }

    fn render(&mut self, device: &mut GraphicsDevice, pass: Pass) -> Result<()> {
        match self {
            WorldItem::Object(object) => object.render(device, pass),
            WorldItem::Batch(batch) => batch.render(device, pass),
            WorldItem::Custom(item) => item.render(device, pass),
        }
    }
}

/// Position of an item inside the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    material: MaterialId,
    index: usize,
}

#[derive(Debug)]
struct Group {
    material: Material,
    items: Vec<WorldItem>,
}

#[derive(Debug, Default)]
pub struct World {
    groups: Vec<Group>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a material and returns its id.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = material.id();
        self.groups.push(Group {
            material,
            items: Vec::new(),
        });
        id
    }

    fn group(&self, id: MaterialId) -> Option<&Group> {
        self.groups.iter().find(|group| group.material.id() == id)
    }

    fn group_mut(&mut self, id: MaterialId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.material.id() == id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.group(id).map(|group| &group.material)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.group_mut(id).map(|group| &mut group.material)
    }

    /// Materials in draw order.
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.groups.iter().map(|group| &group.material)
    }

    /// Files `item` under `material`.
    pub fn add(&mut self, material: MaterialId, item: impl Into<WorldItem>) -> Result<ItemHandle> {
        let group = self.group_mut(material).ok_or_else(|| {
            RenderError::InvalidArgument(format!("{material:?} was never added to the world"))
        })?;
        group.items.push(item.into());
        Ok(ItemHandle {
            material,
            index: group.items.len() - 1,
        })
    }

    pub fn item_mut(&mut self, handle: ItemHandle) -> Option<&mut WorldItem> {
        self.group_mut(handle.material)
            .and_then(|group| group.items.get_mut(handle.index))
    }

    pub fn object_mut(&mut self, handle: ItemHandle) -> Option<&mut RenderableObject> {
        match self.item_mut(handle)? {
            WorldItem::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn batch_mut(&mut self, handle: ItemHandle) -> Option<&mut InstancedBatch> {
        match self.item_mut(handle)? {
            WorldItem::Batch(batch) => Some(batch),
            _ => None,
        }
    }

    /// Number of items over all materials.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases the buffers of every object and batch.
    pub fn dispose(self, device: &mut GraphicsDevice) {
        for group in self.groups {
            for item in group.items {
                match item {
                    WorldItem::Object(object) => object.dispose(device),
                    WorldItem::Batch(batch) => batch.dispose(device),
                    WorldItem::Custom(_) => {}
                }
            }
        }
    }
}

impl Scene for World {
    fn render(&mut self, device: &mut GraphicsDevice, pass: Pass) -> Result<()> {
        for group in &mut self.groups {
            // Skip the material switch when nothing in the group takes part.
            if !group.items.iter().any(|item| pass.intersects(item.passes())) {
                continue;
            }
            device.set_material(&group.material)?;
            for item in &mut group.items {
                item.render(device, pass)?;
            }
        }
        Ok(())
    }
}

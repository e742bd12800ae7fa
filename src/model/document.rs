// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Top-level document: resource registry, build list and metadata

use super::{
    BuildItem, ColorGroup, Component, ComponentsObject, MeshObject, MetadataGroup, PropertyId,
    PropertyRef, Resource, ResourceId, ResourceKind,
};
use crate::error::{ModelError, Result};
use crate::geometry::{Transform, TriangleProperties};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Length unit of the model coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Micron,
    #[default]
    Millimeter,
    Centimeter,
    Inch,
    Foot,
    Meter,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Micron => "micron",
            Self::Millimeter => "millimeter",
            Self::Centimeter => "centimeter",
            Self::Inch => "inch",
            Self::Foot => "foot",
            Self::Meter => "meter",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::Micron,
            Self::Millimeter,
            Self::Centimeter,
            Self::Inch,
            Self::Foot,
            Self::Meter,
        ]
        .into_iter()
        .find(|unit| unit.as_str() == s)
        .ok_or_else(|| ModelError::malformed("model unit", format!("unknown unit '{s}'")))
    }
}

/// Package part carried through a read/write cycle untouched (thumbnails,
/// producer-specific files)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Part name inside the package, without a leading slash
    pub path: String,
    pub content_type: String,
    /// Type of the package-level relationship targeting this part, if any
    pub relationship_type: Option<String>,
    pub data: Vec<u8>,
}

/// In-memory 3MF document.
///
/// Resources are only created through the `add_*` constructors, which hand out
/// fresh, never reused ids starting at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub unit: Unit,
    resources: BTreeMap<ResourceId, Resource>,
    next_id: Option<ResourceId>,
    build_items: Vec<BuildItem>,
    metadata: MetadataGroup,
    attachments: Vec<Attachment>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            unit: Unit::default(),
            resources: BTreeMap::new(),
            next_id: Some(ResourceId::FIRST),
            build_items: Vec::new(),
            metadata: MetadataGroup::new(),
            attachments: Vec::new(),
        }
    }

    /// # Panics
    ///
    /// Panics once every `u32` id has been handed out. Declared ids stop at
    /// [`ResourceId::MAX_DECLARED`], so that takes over 2^31 live allocations.
    fn allocate(&mut self, resource: Resource) -> ResourceId {
        let Some(id) = self.next_id else {
            panic!("resource id space exhausted");
        };
        self.next_id = id.successor();
        self.resources.insert(id, resource);
        id
    }

    pub fn add_mesh_object(&mut self) -> ResourceId {
        self.allocate(Resource::MeshObject(MeshObject::new()))
    }

    pub fn add_components_object(&mut self) -> ResourceId {
        self.allocate(Resource::ComponentsObject(ComponentsObject::new()))
    }

    pub fn add_color_group(&mut self) -> ResourceId {
        self.allocate(Resource::ColorGroup(ColorGroup::new()))
    }

    pub fn add_metadata_group(&mut self) -> ResourceId {
        self.allocate(Resource::MetadataGroup(MetadataGroup::new()))
    }

    /// Insert a mesh built outside the document (e.g. on another thread).
    /// Its property references must resolve in this document.
    pub fn insert_mesh_object(&mut self, mesh: MeshObject) -> Result<ResourceId> {
        if let Some(property) = mesh.default_property() {
            self.check_property(property.resource, &[property.index])?;
        }
        for props in mesh.triangles().iter().filter_map(|t| t.properties()) {
            self.check_property(props.resource, &props.indices)?;
        }
        Ok(self.allocate(Resource::MeshObject(mesh)))
    }

    /// Insert a resource under a given id, as declared in a parsed document
    pub(crate) fn insert_with_id(&mut self, id: ResourceId, resource: Resource) -> Result<()> {
        if id.get() > ResourceId::MAX_DECLARED {
            return Err(ModelError::malformed(
                format!("resource {id}"),
                format!("id exceeds {}", ResourceId::MAX_DECLARED),
            ));
        }
        if self.resources.contains_key(&id) {
            return Err(ModelError::malformed(
                format!("resource {id}"),
                "duplicate resource id",
            ));
        }
        self.resources.insert(id, resource);
        if let (Some(next), Some(after)) = (self.next_id, id.successor()) {
            self.next_id = Some(next.max(after));
        }
        Ok(())
    }

    pub fn resource(&self, id: ResourceId) -> Result<&Resource> {
        self.resources.get(&id).ok_or_else(|| ModelError::not_found(id))
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    pub fn mesh_object(&self, id: ResourceId) -> Result<&MeshObject> {
        self.resource(id)?
            .as_mesh_object()
            .ok_or_else(|| ModelError::wrong_kind(id, ResourceKind::MeshObject.name()))
    }

    pub fn mesh_object_mut(&mut self, id: ResourceId) -> Result<&mut MeshObject> {
        match self.resources.get_mut(&id) {
            Some(Resource::MeshObject(mesh)) => Ok(mesh),
            Some(_) => Err(ModelError::wrong_kind(id, ResourceKind::MeshObject.name())),
            None => Err(ModelError::not_found(id)),
        }
    }

    pub fn components_object(&self, id: ResourceId) -> Result<&ComponentsObject> {
        self.resource(id)?
            .as_components_object()
            .ok_or_else(|| ModelError::wrong_kind(id, ResourceKind::ComponentsObject.name()))
    }

    pub fn components_object_mut(&mut self, id: ResourceId) -> Result<&mut ComponentsObject> {
        match self.resources.get_mut(&id) {
            Some(Resource::ComponentsObject(components)) => Ok(components),
            Some(_) => Err(ModelError::wrong_kind(id, ResourceKind::ComponentsObject.name())),
            None => Err(ModelError::not_found(id)),
        }
    }

    pub fn color_group(&self, id: ResourceId) -> Result<&ColorGroup> {
        self.resource(id)?
            .as_color_group()
            .ok_or_else(|| ModelError::wrong_kind(id, ResourceKind::ColorGroup.name()))
    }

    pub fn color_group_mut(&mut self, id: ResourceId) -> Result<&mut ColorGroup> {
        match self.resources.get_mut(&id) {
            Some(Resource::ColorGroup(group)) => Ok(group),
            Some(_) => Err(ModelError::wrong_kind(id, ResourceKind::ColorGroup.name())),
            None => Err(ModelError::not_found(id)),
        }
    }

    pub fn metadata_group(&self, id: ResourceId) -> Result<&MetadataGroup> {
        self.resource(id)?
            .as_metadata_group()
            .ok_or_else(|| ModelError::wrong_kind(id, ResourceKind::MetadataGroup.name()))
    }

    pub fn metadata_group_mut(&mut self, id: ResourceId) -> Result<&mut MetadataGroup> {
        match self.resources.get_mut(&id) {
            Some(Resource::MetadataGroup(group)) => Ok(group),
            Some(_) => Err(ModelError::wrong_kind(id, ResourceKind::MetadataGroup.name())),
            None => Err(ModelError::not_found(id)),
        }
    }

    /// Append an instance of `object` to components object `components`
    pub fn add_component(
        &mut self,
        components: ResourceId,
        object: ResourceId,
        transform: Transform,
    ) -> Result<()> {
        self.components_object(components)?;
        self.check_geometric(object)?;

        if object == components || self.reaches(object, components) {
            return Err(ModelError::CyclicInstancing {
                parent: components,
                child: object,
            });
        }

        self.components_object_mut(components)?
            .push(Component { object, transform });
        Ok(())
    }

    /// Whether `target` is reachable from `from` through component references
    fn reaches(&self, from: ResourceId, target: ResourceId) -> bool {
        let mut visited = AHashSet::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(Resource::ComponentsObject(components)) = self.resources.get(&id) {
                stack.extend(components.components().iter().map(|c| c.object));
            }
        }
        false
    }

    fn check_geometric(&self, id: ResourceId) -> Result<()> {
        match self.resources.get(&id) {
            Some(resource) if resource.kind().is_geometric() => Ok(()),
            Some(resource) => Err(ModelError::invalid_reference(
                id,
                format!("{} cannot be placed", resource.kind()),
            )),
            None => Err(ModelError::invalid_reference(id, "resource does not exist")),
        }
    }

    fn check_property(&self, resource: ResourceId, indices: &[PropertyId]) -> Result<()> {
        let group = match self.resources.get(&resource) {
            Some(Resource::ColorGroup(group)) => group,
            Some(other) => {
                return Err(ModelError::invalid_reference(
                    resource,
                    format!("{} is not a property group", other.kind()),
                ))
            }
            None => {
                return Err(ModelError::invalid_reference(
                    resource,
                    "property group does not exist",
                ))
            }
        };

        match indices.iter().find(|&&index| !group.contains(index)) {
            Some(index) => Err(ModelError::invalid_reference(
                resource,
                format!("property id {index} is not registered in the group"),
            )),
            None => Ok(()),
        }
    }

    /// Place a mesh or components object in the build
    pub fn add_build_item(&mut self, object: ResourceId, transform: Transform) -> Result<usize> {
        self.check_geometric(object)?;
        self.build_items.push(BuildItem::new(object, transform));
        Ok(self.build_items.len() - 1)
    }

    pub fn remove_build_item(&mut self, index: usize) -> Option<BuildItem> {
        (index < self.build_items.len()).then(|| self.build_items.remove(index))
    }

    pub fn build_items(&self) -> std::slice::Iter<'_, BuildItem> {
        self.build_items.iter()
    }

    pub fn build_item_count(&self) -> usize {
        self.build_items.len()
    }

    pub(crate) fn push_build_item(&mut self, item: BuildItem) -> Result<()> {
        self.check_geometric(item.object)?;
        self.build_items.push(item);
        Ok(())
    }

    /// Assign per-corner properties to one triangle of a mesh
    pub fn set_triangle_properties(
        &mut self,
        mesh: ResourceId,
        triangle: u32,
        properties: TriangleProperties,
    ) -> Result<()> {
        self.check_property(properties.resource, &properties.indices)?;
        self.mesh_object_mut(mesh)?
            .set_triangle_properties(triangle, Some(properties))
    }

    pub fn clear_triangle_properties(&mut self, mesh: ResourceId, triangle: u32) -> Result<()> {
        self.mesh_object_mut(mesh)?
            .set_triangle_properties(triangle, None)
    }

    /// Default property for triangles of `mesh` without their own
    pub fn set_object_level_property(
        &mut self,
        mesh: ResourceId,
        resource: ResourceId,
        index: PropertyId,
    ) -> Result<()> {
        self.check_property(resource, &[index])?;
        self.mesh_object_mut(mesh)?
            .set_default_property(Some(PropertyRef { resource, index }));
        Ok(())
    }

    pub fn clear_object_level_property(&mut self, mesh: ResourceId) -> Result<()> {
        self.mesh_object_mut(mesh)?.set_default_property(None);
        Ok(())
    }

    /// Remove an unreferenced resource
    pub fn remove_resource(&mut self, id: ResourceId) -> Result<Resource> {
        if !self.resources.contains_key(&id) {
            return Err(ModelError::not_found(id));
        }
        if let Some(user) = self.first_user_of(id) {
            return Err(ModelError::ResourceInUse { id, user });
        }
        self.resources
            .remove(&id)
            .ok_or_else(|| ModelError::not_found(id))
    }

    fn first_user_of(&self, id: ResourceId) -> Option<String> {
        if let Some(index) = self.build_items.iter().position(|item| item.object == id) {
            return Some(format!("build item {index}"));
        }
        self.resources.iter().find_map(|(owner, resource)| {
            let uses = match resource {
                Resource::ComponentsObject(components) => components.references(id),
                Resource::MeshObject(mesh) => mesh.references_property_group(id),
                _ => false,
            };
            uses.then(|| format!("{} {owner}", resource.kind()))
        })
    }

    /// Check every property reference; used before serializing
    pub fn validate_references(&self) -> Result<()> {
        for (_, mesh) in self.mesh_objects() {
            if let Some(property) = mesh.default_property() {
                self.check_property(property.resource, &[property.index])?;
            }
            for props in mesh.triangles().iter().filter_map(|t| t.properties()) {
                self.check_property(props.resource, &props.indices)?;
            }
        }
        for (_, components) in self.components_objects() {
            for component in components.components() {
                self.check_geometric(component.object)?;
            }
        }
        for item in &self.build_items {
            self.check_geometric(item.object)?;
        }
        Ok(())
    }

    /// All resources in id order
    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> + '_ {
        self.resources.iter().map(|(id, resource)| (*id, resource))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn mesh_objects(&self) -> impl Iterator<Item = (ResourceId, &MeshObject)> + '_ {
        self.resources()
            .filter_map(|(id, r)| r.as_mesh_object().map(|m| (id, m)))
    }

    pub fn components_objects(&self) -> impl Iterator<Item = (ResourceId, &ComponentsObject)> + '_ {
        self.resources()
            .filter_map(|(id, r)| r.as_components_object().map(|c| (id, c)))
    }

    pub fn color_groups(&self) -> impl Iterator<Item = (ResourceId, &ColorGroup)> + '_ {
        self.resources()
            .filter_map(|(id, r)| r.as_color_group().map(|g| (id, g)))
    }

    pub fn metadata_groups(&self) -> impl Iterator<Item = (ResourceId, &MetadataGroup)> + '_ {
        self.resources()
            .filter_map(|(id, r)| r.as_metadata_group().map(|g| (id, g)))
    }

    /// Document-level metadata
    pub fn metadata(&self) -> &MetadataGroup {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataGroup {
        &mut self.metadata
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Add or replace a pass-through package part
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.retain(|a| a.path != attachment.path);
        self.attachments.push(attachment);
    }
}

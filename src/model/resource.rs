// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Resource identifiers and the closed set of resource kinds

use super::{ColorGroup, ComponentsObject, MeshObject, MetadataGroup};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Identifier of a registry-owned resource. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(NonZeroU32);

impl ResourceId {
    /// Largest id a 3MF package may declare (`ST_ResourceID` is below 2^31)
    pub const MAX_DECLARED: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub(crate) const FIRST: Self = Self(NonZeroU32::MIN);

    /// Id as declared in a package, rejecting zero and values past [`Self::MAX_DECLARED`]
    pub fn declared(value: u32) -> Option<Self> {
        Self::new(value).filter(|_| value <= Self::MAX_DECLARED)
    }

    /// Next id in allocation order, `None` once the id space is used up
    pub(crate) fn successor(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of an entry inside a property group. Zero means "no property".
pub type PropertyId = u32;

/// Discriminant of [`Resource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    MeshObject,
    ComponentsObject,
    ColorGroup,
    MetadataGroup,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MeshObject => "mesh object",
            Self::ComponentsObject => "components object",
            Self::ColorGroup => "color group",
            Self::MetadataGroup => "metadata group",
        }
    }

    /// Whether a build item or component may place this kind
    pub fn is_geometric(&self) -> bool {
        matches!(self, Self::MeshObject | Self::ComponentsObject)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A registry entry
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    MeshObject(MeshObject),
    ComponentsObject(ComponentsObject),
    ColorGroup(ColorGroup),
    MetadataGroup(MetadataGroup),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::MeshObject(_) => ResourceKind::MeshObject,
            Self::ComponentsObject(_) => ResourceKind::ComponentsObject,
            Self::ColorGroup(_) => ResourceKind::ColorGroup,
            Self::MetadataGroup(_) => ResourceKind::MetadataGroup,
        }
    }

    pub fn as_mesh_object(&self) -> Option<&MeshObject> {
        match self {
            Self::MeshObject(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_components_object(&self) -> Option<&ComponentsObject> {
        match self {
            Self::ComponentsObject(components) => Some(components),
            _ => None,
        }
    }

    pub fn as_color_group(&self) -> Option<&ColorGroup> {
        match self {
            Self::ColorGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_metadata_group(&self) -> Option<&MetadataGroup> {
        match self {
            Self::MetadataGroup(group) => Some(group),
            _ => None,
        }
    }

    /// Object name for mesh and components objects
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::MeshObject(mesh) => mesh.name.as_deref(),
            Self::ComponentsObject(components) => components.name.as_deref(),
            _ => None,
        }
    }
}

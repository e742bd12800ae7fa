// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Components objects: instanced placements of other objects

use super::{MetadataGroup, ResourceId};
use crate::geometry::Transform;
use serde::{Deserialize, Serialize};

/// One instance inside a components object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub object: ResourceId,
    pub transform: Transform,
}

/// Ordered list of components.
///
/// Components are added through `Document::add_component`, which checks the
/// reference and the instancing graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentsObject {
    pub name: Option<String>,
    pub metadata: MetadataGroup,
    components: Vec<Component>,
}

impl ComponentsObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn references(&self, id: ResourceId) -> bool {
        self.components.iter().any(|c| c.object == id)
    }

    pub(crate) fn push(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn remove_component(&mut self, index: usize) -> Option<Component> {
        (index < self.components.len()).then(|| self.components.remove(index))
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Build items

use super::ResourceId;
use crate::geometry::Transform;
use serde::{Deserialize, Serialize};

/// Placement of a mesh or components object in the assembled scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildItem {
    pub object: ResourceId,
    pub transform: Transform,
    pub part_number: Option<String>,
}

impl BuildItem {
    pub fn new(object: ResourceId, transform: Transform) -> Self {
        Self {
            object,
            transform,
            part_number: None,
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Serializable document overview used by `polyframe-3mf info`

use super::stl::flatten;
use crate::error::Result;
use crate::model::{Document, Resource};
use serde::Serialize;

/// One resource in the registry
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSummary {
    pub id: u32,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Vertices, colors or metadata entries depending on the kind
    pub entries: usize,
    pub triangles: usize,
    pub beams: usize,
    pub components: usize,
}

/// Whole-document statistics
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub unit: String,
    pub metadata: Vec<(String, String)>,
    pub resources: Vec<ResourceSummary>,
    pub build_items: usize,
    pub attachments: Vec<String>,
    /// Triangles of the flattened build
    pub placed_triangles: usize,
    /// Flattened build bounds [min_x, min_y, min_z, max_x, max_y, max_z]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 6]>,
}

impl DocumentSummary {
    pub fn from_document(document: &Document) -> Result<Self> {
        let resources = document
            .resources()
            .map(|(id, resource)| {
                let mut summary = ResourceSummary {
                    id: id.get(),
                    kind: resource.kind().to_string(),
                    name: resource.name().map(str::to_string),
                    entries: 0,
                    triangles: 0,
                    beams: 0,
                    components: 0,
                };
                match resource {
                    Resource::MeshObject(mesh) => {
                        summary.entries = mesh.vertex_count();
                        summary.triangles = mesh.triangle_count();
                        summary.beams = mesh.beam_lattice().map_or(0, |l| l.beam_count());
                    }
                    Resource::ComponentsObject(object) => {
                        summary.components = object.component_count();
                    }
                    Resource::ColorGroup(group) => summary.entries = group.len(),
                    Resource::MetadataGroup(group) => summary.entries = group.len(),
                }
                summary
            })
            .collect();

        let placed = flatten(document)?;
        let bbox = (!placed.is_empty()).then(|| {
            let bounds = placed.bounding_box();
            [
                bounds.min.x,
                bounds.min.y,
                bounds.min.z,
                bounds.max.x,
                bounds.max.y,
                bounds.max.z,
            ]
        });

        Ok(Self {
            unit: document.unit.to_string(),
            metadata: document
                .metadata()
                .iter()
                .map(|entry| (entry.name.clone(), entry.value.clone()))
                .collect(),
            resources,
            build_items: document.build_item_count(),
            attachments: document
                .attachments()
                .iter()
                .map(|attachment| attachment.path.clone())
                .collect(),
            placed_triangles: placed.triangle_count(),
            bbox,
        })
    }
}

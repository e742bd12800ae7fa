// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene flattening

use crate::error::{ModelError, Result};
use crate::geometry::{Mesh, Transform};
use crate::model::{Document, Resource, ResourceId};

/// Resolve every build item into one world-space mesh.
///
/// Components are expanded depth-first in declaration order, each level
/// composing its placement onto the parent's. Beams, colors and metadata
/// have no flat representation and are dropped.
pub fn flatten(document: &Document) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    let mut path = Vec::new();
    for item in document.build_items() {
        place(document, item.object, &item.transform, &mut path, &mut mesh)?;
    }
    Ok(mesh)
}

fn place(
    document: &Document,
    id: ResourceId,
    placement: &Transform,
    path: &mut Vec<ResourceId>,
    mesh: &mut Mesh,
) -> Result<()> {
    if let Some(&parent) = path.last().filter(|_| path.contains(&id)) {
        return Err(ModelError::CyclicInstancing { parent, child: id });
    }

    match document.resource(id)? {
        Resource::MeshObject(object) => {
            let triangles = object.triangles().iter().map(|t| &t.indices);
            mesh.append_transformed(object.vertices(), triangles, placement)?;
        }
        Resource::ComponentsObject(components) => {
            path.push(id);
            for component in components.components() {
                let composed = Transform::compose(placement, &component.transform);
                place(document, component.object, &composed, path, mesh)?;
            }
            path.pop();
        }
        other => {
            return Err(ModelError::invalid_reference(
                id,
                format!("{} cannot be placed", other.kind()),
            ))
        }
    }
    Ok(())
}

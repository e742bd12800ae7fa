// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL codec: a flat triangle soup with no scene structure

mod flatten;
mod reader;
mod writer;

pub use flatten::flatten;
pub use reader::{decode, read_stl};
pub use writer::{write_ascii, write_binary, write_mesh, write_stl};

use crate::error::Result;
use crate::geometry::{Mesh, Transform, Triangle};
use crate::model::{Document, MeshObject};

/// Wrap an aggregate mesh as a document with one mesh object placed once at
/// the identity transform
pub fn wrap_mesh(mesh: Mesh, name: Option<String>) -> Result<Document> {
    let mut object = MeshObject::new();
    object.name = name;
    let triangles = mesh
        .triangles
        .iter()
        .map(|&[a, b, c]| Triangle::new(a, b, c))
        .collect();
    object.set_geometry(mesh.vertices, triangles)?;

    let mut document = Document::new();
    let id = document.insert_mesh_object(object)?;
    document.add_build_item(id, Transform::identity())?;
    Ok(document)
}

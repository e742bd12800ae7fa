// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - value types, transforms and the aggregate mesh

mod bbox;
mod mesh;
mod primitives;
mod transform;

pub use bbox::BoundingBox;
pub use mesh::Mesh;
pub use primitives::{Beam, BeamCapMode, Triangle, TriangleProperties, Vertex};
pub use transform::Transform;

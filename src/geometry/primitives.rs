// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Vertex, triangle and beam value types

use crate::error::{ModelError, Result};
use crate::model::{PropertyId, ResourceId};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mesh vertex, identified by its position in the owning vertex list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    position: Point3<f64>,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Point3::new(x, y, z),
        }
    }

    pub fn from_point(position: Point3<f64>) -> Self {
        Self { position }
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
    }
}

/// Per-corner property assignment of a triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleProperties {
    /// Property group the indices point into
    pub resource: ResourceId,
    pub indices: [PropertyId; 3],
}

impl TriangleProperties {
    pub fn new(resource: ResourceId, indices: [PropertyId; 3]) -> Self {
        Self { resource, indices }
    }

    /// Same property on all three corners
    pub fn uniform(resource: ResourceId, property: PropertyId) -> Self {
        Self::new(resource, [property; 3])
    }

    pub fn is_uniform(&self) -> bool {
        self.indices[0] == self.indices[1] && self.indices[1] == self.indices[2]
    }
}

/// Triangle defined by three vertex indices in winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [u32; 3],
    properties: Option<TriangleProperties>,
}

impl Triangle {
    pub fn new(v1: u32, v2: u32, v3: u32) -> Self {
        Self {
            indices: [v1, v2, v3],
            properties: None,
        }
    }

    /// Explicit per-triangle property, if any
    pub fn properties(&self) -> Option<&TriangleProperties> {
        self.properties.as_ref()
    }

    pub(crate) fn set_properties(&mut self, properties: Option<TriangleProperties>) {
        self.properties = properties;
    }

    pub(crate) fn with_properties(mut self, properties: Option<TriangleProperties>) -> Self {
        self.properties = properties;
        self
    }

    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.indices;
        a == b || b == c || a == c
    }

    /// First index that is not below `vertex_count`
    pub fn out_of_range_index(&self, vertex_count: usize) -> Option<u32> {
        self.indices
            .iter()
            .copied()
            .find(|&i| i as usize >= vertex_count)
    }
}

/// Cap style at a beam endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamCapMode {
    Sphere,
    HemiSphere,
    Butt,
}

impl BeamCapMode {
    /// Token used by the beam lattice schema
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::HemiSphere => "hemisphere",
            Self::Butt => "butt",
        }
    }
}

impl fmt::Display for BeamCapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeamCapMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        [Self::Sphere, Self::HemiSphere, Self::Butt]
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| ModelError::malformed("beam cap mode", format!("unknown token '{s}'")))
    }
}

/// Strut between two vertices of the owning mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    pub indices: [u32; 2],
    pub radii: [f64; 2],
    pub caps: [BeamCapMode; 2],
}

impl Beam {
    pub fn new(v1: u32, v2: u32, r1: f64, r2: f64, cap1: BeamCapMode, cap2: BeamCapMode) -> Self {
        Self {
            indices: [v1, v2],
            radii: [r1, r2],
            caps: [cap1, cap2],
        }
    }

    /// Uniform radius, spherical caps
    pub fn uniform(v1: u32, v2: u32, radius: f64) -> Self {
        Self::new(v1, v2, radius, radius, BeamCapMode::Sphere, BeamCapMode::Sphere)
    }

    pub fn length(&self, vertices: &[Vertex]) -> Option<f64> {
        let a = vertices.get(self.indices[0] as usize)?;
        let b = vertices.get(self.indices[1] as usize)?;
        Some((b.position() - a.position()).norm())
    }
}

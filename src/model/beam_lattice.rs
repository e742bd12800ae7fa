// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Beam lattice attached to a mesh object.
//!
//! Beams share the vertex list of the owning mesh; every mutation goes through
//! [`MeshObject`](super::MeshObject) so endpoints can be checked against it.

use crate::error::{ModelError, Result};
use crate::geometry::{Beam, BeamCapMode, Vertex};
use serde::{Deserialize, Serialize};

/// Minimum beam length used when none is configured
pub const DEFAULT_MIN_LENGTH: f64 = 0.0001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamLattice {
    beams: Vec<Beam>,
    min_length: f64,
    /// Radius written as the lattice default
    pub default_radius: f64,
    /// Cap mode written as the lattice default
    pub default_cap: BeamCapMode,
}

impl Default for BeamLattice {
    fn default() -> Self {
        Self {
            beams: Vec::new(),
            min_length: DEFAULT_MIN_LENGTH,
            default_radius: 1.0,
            default_cap: BeamCapMode::Sphere,
        }
    }
}

impl BeamLattice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn beam_count(&self) -> usize {
        self.beams.len()
    }

    pub fn min_length(&self) -> f64 {
        self.min_length
    }

    /// Check a beam against `vertices` and the current minimum length
    pub fn validate_beam(&self, beam: &Beam, vertices: &[Vertex]) -> Result<()> {
        validate_beam(beam, vertices, self.min_length)
    }

    pub(crate) fn push(&mut self, beam: Beam) {
        self.beams.push(beam);
    }

    pub(crate) fn replace_beams(&mut self, beams: Vec<Beam>) {
        self.beams = beams;
    }

    pub(crate) fn set_min_length_unchecked(&mut self, min_length: f64) {
        self.min_length = min_length;
    }
}

pub(crate) fn validate_min_length(min_length: f64) -> Result<()> {
    if !min_length.is_finite() || min_length < 0.0 {
        return Err(ModelError::InvalidGeometry(format!(
            "beam minimum length must be finite and non-negative, got {min_length}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_beam(beam: &Beam, vertices: &[Vertex], min_length: f64) -> Result<()> {
    for &index in &beam.indices {
        if index as usize >= vertices.len() {
            return Err(ModelError::GeometryOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
    }

    if beam.indices[0] == beam.indices[1] {
        return Err(ModelError::InvalidGeometry(format!(
            "beam connects vertex {} to itself",
            beam.indices[0]
        )));
    }

    if let Some(radius) = beam.radii.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
        return Err(ModelError::InvalidGeometry(format!(
            "beam radius must be positive, got {radius}"
        )));
    }

    check_beam_length(beam, beam.length(vertices).unwrap_or_default(), min_length)
}

pub(crate) fn check_beam_length(beam: &Beam, length: f64, min_length: f64) -> Result<()> {
    if length < min_length {
        return Err(ModelError::InvalidGeometry(format!(
            "beam {}-{} is {length} long, below the minimum length {min_length}",
            beam.indices[0], beam.indices[1]
        )));
    }
    Ok(())
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh objects
//!
//! Every mutation keeps the mesh valid: triangle and beam indices stay below
//! the vertex count, triangles never repeat an index, and a failed call
//! leaves the object exactly as it was.

use super::beam_lattice::{
    check_beam_length, validate_beam, validate_min_length, DEFAULT_MIN_LENGTH,
};
use super::{BeamLattice, MetadataGroup, PropertyId, ResourceId};
use crate::error::{ModelError, Result};
use crate::geometry::{Beam, BeamCapMode, Triangle, TriangleProperties, Vertex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Object-level default property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRef {
    pub resource: ResourceId,
    pub index: PropertyId,
}

/// Role of an object in the build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    #[default]
    Model,
    Support,
    SolidSupport,
    Surface,
    Other,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Support => "support",
            Self::SolidSupport => "solidsupport",
            Self::Surface => "surface",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::Model,
            Self::Support,
            Self::SolidSupport,
            Self::Surface,
            Self::Other,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| ModelError::malformed("object type", format!("unknown type '{s}'")))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshObject {
    pub name: Option<String>,
    pub object_type: ObjectType,
    pub metadata: MetadataGroup,
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
    default_property: Option<PropertyRef>,
    beam_lattice: Option<BeamLattice>,
}

impl MeshObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<u32> {
        check_vertex(&vertex)?;
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        Ok(index)
    }

    /// Move an existing vertex; beams touching it are re-checked
    pub fn set_vertex(&mut self, index: u32, vertex: Vertex) -> Result<()> {
        check_vertex(&vertex)?;
        if index as usize >= self.vertices.len() {
            return Err(ModelError::GeometryOutOfRange {
                index,
                vertex_count: self.vertices.len(),
            });
        }

        // only the length of beams ending here can change
        if let Some(lattice) = &self.beam_lattice {
            for beam in lattice.beams().iter().filter(|b| b.indices.contains(&index)) {
                let [a, b] = beam.indices;
                let other = if a == index { b } else { a };
                if let Some(end) = self.vertices.get(other as usize) {
                    let length = (end.position() - vertex.position()).norm();
                    check_beam_length(beam, length, lattice.min_length())?;
                }
            }
        }

        self.vertices[index as usize] = vertex;
        Ok(())
    }

    /// Add a triangle and return its index.
    ///
    /// Any properties on `triangle` are dropped. A mesh cannot see the
    /// document's property groups, so they are attached through
    /// [`Document::set_triangle_properties`](super::Document::set_triangle_properties).
    pub fn add_triangle(&mut self, triangle: Triangle) -> Result<u32> {
        check_triangle(&triangle, self.vertices.len())?;
        let index = self.triangles.len() as u32;
        self.triangles.push(triangle.with_properties(None));
        Ok(index)
    }

    /// Replace the whole geometry. Either all of it is valid and installed, or
    /// the mesh is left untouched. Triangle properties are dropped as in
    /// [`add_triangle`](Self::add_triangle).
    pub fn set_geometry(&mut self, vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Result<()> {
        let triangles = triangles
            .into_iter()
            .map(|triangle| triangle.with_properties(None))
            .collect();
        self.set_resolved_geometry(vertices, triangles)
    }

    /// [`set_geometry`](Self::set_geometry) for triangles whose properties
    /// were already resolved against the owning document
    pub(crate) fn set_resolved_geometry(
        &mut self,
        vertices: Vec<Vertex>,
        triangles: Vec<Triangle>,
    ) -> Result<()> {
        vertices.iter().try_for_each(check_vertex)?;
        for triangle in &triangles {
            check_triangle(triangle, vertices.len())?;
        }
        if let Some(lattice) = &self.beam_lattice {
            for beam in lattice.beams() {
                lattice.validate_beam(beam, &vertices)?;
            }
        }

        self.vertices = vertices;
        self.triangles = triangles;
        Ok(())
    }

    pub fn default_property(&self) -> Option<PropertyRef> {
        self.default_property
    }

    /// Property of a triangle, falling back to the object-level default
    pub fn effective_property(&self, triangle: usize) -> Option<TriangleProperties> {
        let triangle = self.triangles.get(triangle)?;
        triangle.properties().copied().or_else(|| {
            self.default_property
                .map(|p| TriangleProperties::uniform(p.resource, p.index))
        })
    }

    pub(crate) fn set_default_property(&mut self, property: Option<PropertyRef>) {
        self.default_property = property;
    }

    pub(crate) fn set_triangle_properties(
        &mut self,
        triangle: u32,
        properties: Option<TriangleProperties>,
    ) -> Result<()> {
        let count = self.triangles.len();
        let target = self.triangles.get_mut(triangle as usize).ok_or_else(|| {
            ModelError::InvalidGeometry(format!(
                "triangle {triangle} does not exist (triangle count {count})"
            ))
        })?;
        target.set_properties(properties);
        Ok(())
    }

    /// Whether this mesh points at property group `id`
    pub fn references_property_group(&self, id: ResourceId) -> bool {
        self.default_property.is_some_and(|p| p.resource == id)
            || self
                .triangles
                .iter()
                .filter_map(Triangle::properties)
                .any(|p| p.resource == id)
    }

    pub fn beam_lattice(&self) -> Option<&BeamLattice> {
        self.beam_lattice.as_ref()
    }

    /// Add a beam to the lattice, creating the lattice on first use
    pub fn add_beam(&mut self, beam: Beam) -> Result<usize> {
        validate_beam(&beam, &self.vertices, self.beam_min_length())?;
        let lattice = self.beam_lattice.get_or_insert_with(BeamLattice::new);
        lattice.push(beam);
        Ok(lattice.beam_count() - 1)
    }

    /// Replace all beams atomically
    pub fn set_beams(&mut self, beams: Vec<Beam>) -> Result<()> {
        let min_length = self.beam_min_length();
        for beam in &beams {
            validate_beam(beam, &self.vertices, min_length)?;
        }
        self.beam_lattice
            .get_or_insert_with(BeamLattice::new)
            .replace_beams(beams);
        Ok(())
    }

    /// Change the minimum beam length. Fails if an existing beam is shorter.
    pub fn set_beam_min_length(&mut self, min_length: f64) -> Result<()> {
        validate_min_length(min_length)?;
        if let Some(lattice) = &self.beam_lattice {
            for beam in lattice.beams() {
                validate_beam(beam, &self.vertices, min_length)?;
            }
        }
        self.beam_lattice
            .get_or_insert_with(BeamLattice::new)
            .set_min_length_unchecked(min_length);
        Ok(())
    }

    fn beam_min_length(&self) -> f64 {
        self.beam_lattice
            .as_ref()
            .map_or(DEFAULT_MIN_LENGTH, BeamLattice::min_length)
    }

    /// Lattice defaults written alongside the beams
    pub fn set_beam_defaults(&mut self, radius: f64, cap: BeamCapMode) -> Result<()> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ModelError::InvalidGeometry(format!(
                "beam radius must be positive, got {radius}"
            )));
        }
        let lattice = self.beam_lattice.get_or_insert_with(BeamLattice::new);
        lattice.default_radius = radius;
        lattice.default_cap = cap;
        Ok(())
    }
}

fn check_vertex(vertex: &Vertex) -> Result<()> {
    if !vertex.is_finite() {
        return Err(ModelError::InvalidGeometry(format!(
            "vertex ({}, {}, {}) is not finite",
            vertex.x(),
            vertex.y(),
            vertex.z()
        )));
    }
    Ok(())
}

fn check_triangle(triangle: &Triangle, vertex_count: usize) -> Result<()> {
    if let Some(index) = triangle.out_of_range_index(vertex_count) {
        return Err(ModelError::GeometryOutOfRange {
            index,
            vertex_count,
        });
    }
    if triangle.is_degenerate() {
        return Err(ModelError::InvalidGeometry(format!(
            "degenerate triangle {:?}",
            triangle.indices
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_vertices() -> Vec<Vertex> {
        let (x, y, z) = (100.0, 200.0, 300.0);
        vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(x, 0.0, 0.0),
            Vertex::new(x, y, 0.0),
            Vertex::new(0.0, y, 0.0),
            Vertex::new(0.0, 0.0, z),
            Vertex::new(x, 0.0, z),
            Vertex::new(x, y, z),
            Vertex::new(0.0, y, z),
        ]
    }

    #[test]
    fn test_add_vertex_and_triangle() {
        let mut mesh = MeshObject::new();
        let a = mesh.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
        let b = mesh.add_vertex(Vertex::new(0.5, 0.0, 0.0)).unwrap();
        let c = mesh.add_vertex(Vertex::new(0.5, 0.5, 1.0)).unwrap();
        assert_eq!((a, b, c), (0, 1, 2));

        assert_eq!(mesh.add_triangle(Triangle::new(a, b, c)).unwrap(), 0);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_add_triangle_rejects_out_of_range_and_degenerate() {
        let mut mesh = MeshObject::new();
        mesh.set_geometry(box_vertices(), vec![Triangle::new(2, 1, 0)]).unwrap();

        let err = mesh.add_triangle(Triangle::new(0, 1, 8)).unwrap_err();
        assert!(matches!(err, ModelError::GeometryOutOfRange { index: 8, vertex_count: 8 }));

        let err = mesh.add_triangle(Triangle::new(0, 1, 1)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidGeometry(_)));
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_triangle_properties_are_not_taken_from_callers() {
        let group = ResourceId::new(42).unwrap();
        let colored =
            Triangle::new(0, 1, 2).with_properties(Some(TriangleProperties::uniform(group, 1)));

        let mut mesh = MeshObject::new();
        mesh.set_geometry(box_vertices(), vec![colored]).unwrap();
        mesh.add_triangle(colored).unwrap();
        assert!(mesh.triangles().iter().all(|t| t.properties().is_none()));
        assert!(!mesh.references_property_group(group));
    }

    #[test]
    fn test_set_geometry_is_atomic() {
        let mut mesh = MeshObject::new();
        mesh.set_geometry(box_vertices(), vec![Triangle::new(2, 1, 0), Triangle::new(0, 3, 2)])
            .unwrap();
        assert_eq!((mesh.vertex_count(), mesh.triangle_count()), (8, 2));

        let err = mesh
            .set_geometry(
                vec![Vertex::new(0.0, 0.0, 0.0); 3],
                vec![Triangle::new(0, 1, 2), Triangle::new(0, 1, 3)],
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::GeometryOutOfRange { index: 3, .. }));
        assert_eq!((mesh.vertex_count(), mesh.triangle_count()), (8, 2));
        assert_eq!(mesh.vertices()[6], Vertex::new(100.0, 200.0, 300.0));
    }

    #[test]
    fn test_non_finite_vertex_rejected() {
        let mut mesh = MeshObject::new();
        assert!(mesh.add_vertex(Vertex::new(f64::NAN, 0.0, 0.0)).is_err());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_beams_validated_against_vertices() {
        let mut mesh = MeshObject::new();
        mesh.set_geometry(box_vertices(), Vec::new()).unwrap();

        let beam = Beam::new(0, 3, 1.0, 1.5, BeamCapMode::Sphere, BeamCapMode::Butt);
        assert_eq!(mesh.add_beam(beam).unwrap(), 0);

        let err = mesh.add_beam(Beam::uniform(0, 9, 1.0)).unwrap_err();
        assert!(matches!(err, ModelError::GeometryOutOfRange { index: 9, .. }));
        assert!(mesh.add_beam(Beam::uniform(0, 1, 0.0)).is_err());
        assert!(mesh.add_beam(Beam::uniform(0, 1, -1.0)).is_err());
        assert!(mesh.add_beam(Beam::uniform(2, 2, 1.0)).is_err());
        assert_eq!(mesh.beam_lattice().map(BeamLattice::beam_count), Some(1));
    }

    #[test]
    fn test_min_length_threshold() {
        let mut mesh = MeshObject::new();
        mesh.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
        mesh.add_vertex(Vertex::new(0.001, 0.0, 0.0)).unwrap();
        mesh.add_vertex(Vertex::new(1.0, 0.0, 0.0)).unwrap();
        mesh.set_beam_min_length(0.005).unwrap();

        let err = mesh.add_beam(Beam::uniform(0, 1, 0.5)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidGeometry(_)));
        mesh.add_beam(Beam::uniform(0, 2, 0.5)).unwrap();

        // raising the threshold above an existing beam fails and keeps the old value
        assert!(mesh.set_beam_min_length(2.0).is_err());
        assert_eq!(mesh.beam_lattice().map(BeamLattice::min_length), Some(0.005));
        assert!(mesh.set_beam_min_length(-1.0).is_err());
    }

    #[test]
    fn test_set_geometry_keeps_beams_valid() {
        let mut mesh = MeshObject::new();
        mesh.set_geometry(box_vertices(), Vec::new()).unwrap();
        mesh.add_beam(Beam::uniform(6, 7, 2.0)).unwrap();

        let err = mesh
            .set_geometry(box_vertices()[..4].to_vec(), Vec::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::GeometryOutOfRange { .. }));
        assert_eq!(mesh.vertex_count(), 8);
    }

    #[test]
    fn test_set_vertex_rechecks_beams() {
        let mut mesh = MeshObject::new();
        mesh.set_geometry(box_vertices(), Vec::new()).unwrap();
        mesh.add_beam(Beam::uniform(0, 1, 1.0)).unwrap();
        mesh.add_beam(Beam::uniform(2, 1, 1.0)).unwrap();

        assert!(mesh.set_vertex(1, Vertex::new(0.0, 0.0, 0.0)).is_err());
        // too close to vertex 2, the second endpoint of the other beam
        assert!(mesh.set_vertex(1, Vertex::new(100.0, 200.0, 0.0)).is_err());
        assert_eq!(mesh.vertices()[1], Vertex::new(100.0, 0.0, 0.0));

        mesh.set_vertex(1, Vertex::new(50.0, 0.0, 0.0)).unwrap();
        assert_eq!(mesh.vertices()[1], Vertex::new(50.0, 0.0, 0.0));
        // vertex 5 has no beams
        mesh.set_vertex(5, Vertex::new(0.0, 0.0, 0.0)).unwrap();
        assert!(mesh.set_vertex(8, Vertex::new(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_object_type_tokens() {
        assert_eq!("solidsupport".parse::<ObjectType>().unwrap(), ObjectType::SolidSupport);
        assert!("widget".parse::<ObjectType>().is_err());
        assert_eq!(ObjectType::default().to_string(), "model");
    }
}

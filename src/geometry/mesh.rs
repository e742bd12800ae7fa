// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Aggregate triangle mesh used by the flat-mesh codec

use super::{BoundingBox, Transform, Vertex};
use crate::error::{ModelError, Result};
use crate::utils::math::calculate_triangle_normal;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// World-space triangle soup with indexed vertices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, indices: [u32; 3]) {
        self.triangles.push(indices);
    }

    /// Append `vertices` placed by `transform`, offsetting `triangles` by the
    /// current vertex count. Nothing is appended on error.
    pub fn append_transformed<'a>(
        &mut self,
        vertices: &[Vertex],
        triangles: impl IntoIterator<Item = &'a [u32; 3]>,
        transform: &Transform,
    ) -> Result<()> {
        let too_large = |_| {
            ModelError::InvalidGeometry(format!("mesh exceeds {} vertices", u32::MAX))
        };
        let offset = u32::try_from(self.vertices.len()).map_err(too_large)?;
        u32::try_from(self.vertices.len() + vertices.len()).map_err(too_large)?;

        let mut shifted = Vec::new();
        for triangle in triangles {
            if let Some(&index) = triangle.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(ModelError::GeometryOutOfRange {
                    index,
                    vertex_count: vertices.len(),
                });
            }
            shifted.push(triangle.map(|i| i + offset));
        }

        self.vertices.extend(
            vertices
                .iter()
                .map(|v| Vertex::from_point(transform.apply(&v.position()))),
        );
        self.triangles.extend(shifted);
        Ok(())
    }

    /// Unit face normal of triangle `index`, zero for degenerate faces
    pub fn face_normal(&self, index: usize) -> Result<Vector3<f64>> {
        let [a, b, c] = self.triangle_positions(index)?;
        Ok(calculate_triangle_normal(&a.position(), &b.position(), &c.position()))
    }

    pub fn triangle_positions(&self, index: usize) -> Result<[Vertex; 3]> {
        let triangle = self.triangles.get(index).ok_or_else(|| {
            ModelError::InvalidGeometry(format!(
                "triangle {index} does not exist (triangle count {})",
                self.triangles.len()
            ))
        })?;
        let vertex = |index: u32| {
            self.vertices
                .get(index as usize)
                .copied()
                .ok_or(ModelError::GeometryOutOfRange {
                    index,
                    vertex_count: self.vertices.len(),
                })
        };
        Ok([vertex(triangle[0])?, vertex(triangle[1])?, vertex(triangle[2])?])
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Vertex::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vertex::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Vertex::new(0.0, 1.0, 0.0));
        mesh.add_triangle([a, b, c]);
        mesh
    }

    #[test]
    fn test_append_transformed_offsets_and_moves() {
        let source = single_triangle();
        let mut mesh = single_triangle();
        mesh.append_transformed(
            &source.vertices,
            &source.triangles,
            &Transform::translation(10.0, 0.0, 0.0),
        )
        .unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangles[1], [3, 4, 5]);
        assert_eq!(mesh.vertices[4], Vertex::new(11.0, 0.0, 0.0));
    }

    #[test]
    fn test_append_transformed_rejects_dangling_index() {
        let source = single_triangle();
        let mut mesh = single_triangle();
        let err = mesh
            .append_transformed(&source.vertices, &[[0, 1, 3]], &Transform::identity())
            .unwrap_err();
        assert!(matches!(err, ModelError::GeometryOutOfRange { index: 3, vertex_count: 3 }));
        assert_eq!((mesh.vertex_count(), mesh.triangle_count()), (3, 1));
    }

    #[test]
    fn test_face_normal() {
        let mesh = single_triangle();
        assert_eq!(mesh.face_normal(0).unwrap(), Vector3::new(0.0, 0.0, 1.0));

        let mut flat = Mesh::new();
        flat.vertices = vec![Vertex::new(0.0, 0.0, 0.0); 3];
        flat.add_triangle([0, 1, 2]);
        assert_eq!(flat.face_normal(0).unwrap(), Vector3::zeros());
    }

    #[test]
    fn test_positions_of_broken_triangle_are_an_error() {
        let mut mesh = single_triangle();
        mesh.add_triangle([0, 1, 7]);
        assert!(matches!(
            mesh.triangle_positions(1),
            Err(ModelError::GeometryOutOfRange { index: 7, vertex_count: 3 })
        ));
        assert!(matches!(mesh.face_normal(2), Err(ModelError::InvalidGeometry(_))));
    }
}

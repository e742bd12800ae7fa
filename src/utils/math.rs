// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Math utilities

use nalgebra::{Point3, Vector3};

/// Calculate the unit normal of a triangle given three vertices.
/// Degenerate triangles yield the zero vector.
pub fn calculate_triangle_normal(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
) -> Vector3<f64> {
    let v1 = p1 - p0;
    let v2 = p2 - p0;
    v1.cross(&v2)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_normal_winding() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(0.0, 1.0, 0.0);
        let c = Point3::new(1.0, 0.0, 0.0);
        assert_eq!(calculate_triangle_normal(&a, &b, &c), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(calculate_triangle_normal(&a, &a, &c), Vector3::zeros());
    }
}

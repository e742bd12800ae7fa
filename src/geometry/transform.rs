// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Affine placement transforms
//!
//! A transform is a 3x3 linear part plus a translation. 3MF stores it as a
//! 4x3 matrix in row-vector convention (`[x y z 1] * M`), so the first three
//! rows of the stored matrix are the columns of the linear part and the last
//! row is the translation.

use crate::error::{ModelError, Result};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Affine transform applied as `linear * p + translation`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub linear: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: Vector3::new(x, y, z),
        }
    }

    pub fn scaling(x: f64, y: f64, z: f64) -> Self {
        Self {
            linear: Matrix3::from_diagonal(&Vector3::new(x, y, z)),
            translation: Vector3::zeros(),
        }
    }

    /// Build from the 3MF field layout (three linear rows, then translation)
    pub fn from_fields(fields: [[f64; 3]; 4]) -> Self {
        let mut linear = Matrix3::zeros();
        for (row, values) in fields.iter().take(3).enumerate() {
            for (col, value) in values.iter().enumerate() {
                linear[(col, row)] = *value;
            }
        }
        let [tx, ty, tz] = fields[3];
        Self {
            linear,
            translation: Vector3::new(tx, ty, tz),
        }
    }

    pub fn fields(&self) -> [[f64; 3]; 4] {
        let mut fields = [[0.0; 3]; 4];
        for (row, values) in fields.iter_mut().take(3).enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = self.linear[(col, row)];
            }
        }
        fields[3] = [self.translation.x, self.translation.y, self.translation.z];
        fields
    }

    /// `outer ∘ inner`: applying the result equals applying `inner`, then `outer`
    pub fn compose(outer: &Transform, inner: &Transform) -> Transform {
        Transform {
            linear: outer.linear * inner.linear,
            translation: outer.linear * inner.translation + outer.translation,
        }
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear * point.coords + self.translation)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn is_finite(&self) -> bool {
        self.linear.iter().chain(self.translation.iter()).all(|v| v.is_finite())
    }

    /// Twelve space separated numbers, as written in the `transform` attribute
    pub fn to_attribute(&self) -> String {
        self.fields()
            .iter()
            .flat_map(|row| row.iter())
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn parse_attribute(value: &str) -> Result<Self> {
        let numbers = value
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|e| {
                    ModelError::malformed("transform", format!("invalid number '{token}': {e}"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if numbers.len() != 12 {
            return Err(ModelError::malformed(
                "transform",
                format!("expected 12 values, found {}", numbers.len()),
            ));
        }

        let mut fields = [[0.0; 3]; 4];
        for (i, value) in numbers.into_iter().enumerate() {
            fields[i / 3][i % 3] = value;
        }

        let transform = Self::from_fields(fields);
        if !transform.is_finite() {
            return Err(ModelError::malformed("transform", "non-finite value"));
        }
        Ok(transform)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

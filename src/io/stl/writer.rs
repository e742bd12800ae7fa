// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL writers

use super::flatten;
use crate::config::StlEncoding;
use crate::error::{ModelError, Result};
use crate::geometry::{Mesh, Vertex};
use crate::model::Document;
use std::io::Write;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};
use tracing::debug;

/// Flatten `document` and write it as STL
pub fn write_stl(document: &Document, output: impl Write, encoding: StlEncoding) -> Result<()> {
    write_mesh(&flatten(document)?, output, encoding)
}

/// Encode an aggregate mesh. The bytes are produced in memory first;
/// `output` only sees a complete stream.
pub fn write_mesh(mesh: &Mesh, mut output: impl Write, encoding: StlEncoding) -> Result<()> {
    let mut buffer = Vec::new();
    match encoding {
        StlEncoding::Binary => write_binary(mesh, &mut buffer)?,
        StlEncoding::Ascii => write_ascii(mesh, &mut buffer)?,
    }
    debug!(
        triangles = mesh.triangle_count(),
        %encoding,
        bytes = buffer.len(),
        "STL encoded"
    );
    output.write_all(&buffer)?;
    output.flush()?;
    Ok(())
}

pub fn write_binary(mesh: &Mesh, output: &mut impl Write) -> Result<()> {
    let triangles = (0..mesh.triangle_count())
        .map(|index| -> Result<StlTriangle> {
            let normal = mesh.face_normal(index)?;
            let [v0, v1, v2] = mesh.triangle_positions(index)?;

            Ok(StlTriangle {
                // unit length, always representable
                normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [
                    StlVertex::new(single_precision(&v0)?),
                    StlVertex::new(single_precision(&v1)?),
                    StlVertex::new(single_precision(&v2)?),
                ],
            })
        })
        .collect::<Result<Vec<_>>>()?;

    stl_io::write_stl(output, triangles.iter())?;
    Ok(())
}

/// Binary records store `f32`; coordinates past its range are rejected
fn single_precision(vertex: &Vertex) -> Result<[f32; 3]> {
    let narrowed = [vertex.x() as f32, vertex.y() as f32, vertex.z() as f32];
    if narrowed.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidGeometry(format!(
            "vertex ({}, {}, {}) is outside the binary STL range",
            vertex.x(),
            vertex.y(),
            vertex.z()
        )));
    }
    Ok(narrowed)
}

pub fn write_ascii(mesh: &Mesh, output: &mut impl Write) -> Result<()> {
    writeln!(output, "solid mesh")?;

    for index in 0..mesh.triangle_count() {
        let normal = mesh.face_normal(index)?;
        writeln!(output, "  facet normal {} {} {}", normal.x, normal.y, normal.z)?;
        writeln!(output, "    outer loop")?;
        for vertex in mesh.triangle_positions(index)? {
            writeln!(
                output,
                "      vertex {} {} {}",
                vertex.x(),
                vertex.y(),
                vertex.z()
            )?;
        }
        writeln!(output, "    endloop")?;
        writeln!(output, "  endfacet")?;
    }

    writeln!(output, "endsolid mesh")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Vertex::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vertex::new(0.0, 1.0, 0.0));
        mesh.add_triangle([0, 1, 2]);
        mesh
    }

    #[test]
    fn test_binary_layout() {
        let mut bytes = Vec::new();
        write_binary(&right_triangle(), &mut bytes).unwrap();
        assert_eq!(bytes.len(), 84 + 50);
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 1);
        // normal z component
        let nz = f32::from_le_bytes([bytes[92], bytes[93], bytes[94], bytes[95]]);
        assert_eq!(nz, 1.0);
    }

    #[test]
    fn test_ascii_records() {
        let mut bytes = Vec::new();
        write_ascii(&right_triangle(), &mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("solid mesh\n"));
        assert!(text.contains("facet normal 0 0 1"));
        assert_eq!(text.matches("vertex ").count(), 3);
        assert!(text.trim_end().ends_with("endsolid mesh"));
    }

    #[test]
    fn test_binary_rejects_coordinates_past_f32() {
        let mut mesh = right_triangle();
        mesh.vertices[2] = Vertex::new(0.0, 1e39, 0.0);
        let mut bytes = Vec::new();
        let err = write_binary(&mesh, &mut bytes).unwrap_err();
        assert!(matches!(err, ModelError::InvalidGeometry(_)));
        assert!(bytes.is_empty());

        // ASCII keeps full precision
        write_ascii(&mesh, &mut bytes).unwrap();
    }

    #[test]
    fn test_degenerate_face_gets_zero_normal() {
        let mut mesh = right_triangle();
        mesh.add_vertex(Vertex::new(2.0, 0.0, 0.0));
        mesh.add_triangle([0, 1, 3]);
        let mut bytes = Vec::new();
        write_ascii(&mesh, &mut bytes).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("facet normal 0 0 0"));
    }
}

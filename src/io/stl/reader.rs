// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL readers
//!
//! A stream is binary when its length is exactly `84 + 50 * n` for the
//! triangle count `n` stored at byte 80, and ASCII when it starts with
//! `solid`. Anything else is malformed. Every facet gets three fresh
//! vertices; nothing is welded.

use super::wrap_mesh;
use crate::error::{ModelError, Result};
use crate::geometry::{Mesh, Vertex};
use crate::model::Document;
use std::io::Read;
use std::str::SplitWhitespace;
use tracing::debug;

/// Binary header size in bytes
const HEADER_SIZE: usize = 80;
/// Header plus the triangle count
const PREAMBLE_SIZE: usize = HEADER_SIZE + 4;
/// Normal, three vertices and the attribute byte count
const TRIANGLE_SIZE: usize = 50;

/// Read an STL stream into a document holding one mesh object placed at the
/// identity transform
pub fn read_stl(mut input: impl Read) -> Result<Document> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let (mesh, name) = decode(&bytes)?;
    debug!(triangles = mesh.triangle_count(), "STL decoded");
    wrap_mesh(mesh, name)
}

/// Decode raw STL bytes, returning the mesh and the ASCII solid name if any
pub fn decode(bytes: &[u8]) -> Result<(Mesh, Option<String>)> {
    if let Some(count) = binary_triangle_count(bytes) {
        return read_binary(bytes, count).map(|mesh| (mesh, None));
    }

    if starts_with_solid(bytes) {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ModelError::malformed("ascii STL", format!("not valid UTF-8: {e}")))?;
        return read_ascii(text);
    }

    if bytes.len() < PREAMBLE_SIZE {
        return Err(ModelError::malformed(
            "binary STL",
            format!("{} bytes is shorter than the {PREAMBLE_SIZE}-byte header", bytes.len()),
        ));
    }
    let declared = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    Err(ModelError::malformed(
        "binary STL",
        format!(
            "header declares {declared} triangles ({} bytes) but the stream has {} bytes",
            PREAMBLE_SIZE + declared * TRIANGLE_SIZE,
            bytes.len()
        ),
    ))
}

/// Triangle count when `bytes` is exactly one well-sized binary block
fn binary_triangle_count(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < PREAMBLE_SIZE {
        return None;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let expected = count.checked_mul(TRIANGLE_SIZE)?.checked_add(PREAMBLE_SIZE)?;
    (expected == bytes.len()).then_some(count)
}

fn starts_with_solid(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"solid")
}

fn read_binary(bytes: &[u8], count: usize) -> Result<Mesh> {
    let mut mesh = Mesh::with_capacity(count * 3, count);

    for (index, record) in bytes[PREAMBLE_SIZE..].chunks_exact(TRIANGLE_SIZE).enumerate() {
        // the stored normal (bytes 0..12) is recomputed on write and ignored here
        let mut corners = [0u32; 3];
        for (corner, offset) in corners.iter_mut().zip([12, 24, 36]) {
            let vertex = read_vertex(&record[offset..offset + 12]);
            if !vertex.is_finite() {
                return Err(ModelError::malformed(
                    format!("binary STL / triangle {index}"),
                    "non-finite vertex coordinate",
                ));
            }
            *corner = mesh.add_vertex(vertex);
        }
        mesh.add_triangle(corners);
    }

    Ok(mesh)
}

fn read_vertex(buf: &[u8]) -> Vertex {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Vertex::new(f64::from(x), f64::from(y), f64::from(z))
}

fn read_ascii(text: &str) -> Result<(Mesh, Option<String>)> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let name = match lines.next() {
        Some((_, header)) => header
            .strip_prefix("solid")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        None => None,
    };

    let mut mesh = Mesh::new();
    loop {
        let Some((number, line)) = lines.next() else {
            return Err(ModelError::malformed("ascii STL", "missing endsolid"));
        };
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("endsolid") => break,
            Some("facet") => {
                expect_keyword(&mut tokens, "normal", number)?;
                read_triple(&mut tokens, number)?;

                expect_line(&mut lines, &["outer", "loop"])?;
                let mut corners = [0u32; 3];
                for corner in &mut corners {
                    let (number, line) = next_line(&mut lines)?;
                    let mut tokens = line.split_whitespace();
                    expect_keyword(&mut tokens, "vertex", number)?;
                    let [x, y, z] = read_triple(&mut tokens, number)?;
                    *corner = mesh.add_vertex(Vertex::new(x, y, z));
                }
                expect_line(&mut lines, &["endloop"])?;
                expect_line(&mut lines, &["endfacet"])?;
                mesh.add_triangle(corners);
            }
            _ => {
                return Err(ModelError::malformed(
                    format!("ascii STL line {number}"),
                    format!("unexpected '{line}'"),
                ))
            }
        }
    }

    Ok((mesh, name))
}

fn next_line<'a>(lines: &mut impl Iterator<Item = (usize, &'a str)>) -> Result<(usize, &'a str)> {
    lines
        .next()
        .ok_or_else(|| ModelError::malformed("ascii STL", "unexpected end of input inside a facet"))
}

fn expect_line<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    words: &[&str],
) -> Result<()> {
    let (number, line) = next_line(lines)?;
    if !line.split_whitespace().eq(words.iter().copied()) {
        return Err(ModelError::malformed(
            format!("ascii STL line {number}"),
            format!("expected '{}', found '{line}'", words.join(" ")),
        ));
    }
    Ok(())
}

fn expect_keyword(tokens: &mut SplitWhitespace<'_>, keyword: &str, number: usize) -> Result<()> {
    match tokens.next() {
        Some(token) if token == keyword => Ok(()),
        other => Err(ModelError::malformed(
            format!("ascii STL line {number}"),
            format!("expected '{keyword}', found '{}'", other.unwrap_or_default()),
        )),
    }
}

fn read_triple(tokens: &mut SplitWhitespace<'_>, number: usize) -> Result<[f64; 3]> {
    let element = || format!("ascii STL line {number}");
    let mut values = [0.0; 3];
    for value in &mut values {
        let token = tokens
            .next()
            .ok_or_else(|| ModelError::malformed(element(), "expected three numbers"))?;
        *value = token.parse::<f64>().map_err(|e| {
            ModelError::malformed(element(), format!("invalid number '{token}': {e}"))
        })?;
        if !value.is_finite() {
            return Err(ModelError::malformed(element(), format!("non-finite value '{token}'")));
        }
    }
    if let Some(extra) = tokens.next() {
        return Err(ModelError::malformed(element(), format!("unexpected '{extra}'")));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_block(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for triangle in triangles {
            bytes.extend_from_slice(&[0u8; 12]);
            for vertex in triangle {
                for coordinate in vertex {
                    bytes.extend_from_slice(&coordinate.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&[0u8; 2]);
        }
        bytes
    }

    const ASCII: &str = "solid wedge
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1 0 0
    endloop
  endfacet
endsolid wedge
";

    #[test]
    fn test_binary_gets_fresh_vertices() {
        let corner = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let (mesh, name) = decode(&binary_block(&[corner, corner])).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [3, 4, 5]]);
        assert!(name.is_none());
    }

    #[test]
    fn test_binary_with_solid_header_is_still_binary() {
        let mut bytes = binary_block(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes[..5].copy_from_slice(b"solid");
        assert_eq!(decode(&bytes).unwrap().0.triangle_count(), 1);
    }

    #[test]
    fn test_wrong_block_size() {
        let mut bytes = binary_block(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes.pop();
        assert!(matches!(decode(&bytes), Err(ModelError::MalformedDocument { .. })));
        assert!(decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_non_finite_binary_vertex() {
        let bytes = binary_block(&[[[f32::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("triangle 0"));
    }

    #[test]
    fn test_ascii_facets() {
        let (mesh, name) = decode(ASCII.as_bytes()).unwrap();
        assert_eq!(name.as_deref(), Some("wedge"));
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.vertices[4], Vertex::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_malformed_ascii() {
        let truncated = &ASCII[..ASCII.find("endloop").unwrap()];
        assert!(decode(truncated.as_bytes()).is_err());

        let bad_number = ASCII.replace("vertex 1 0 0", "vertex 1 zero 0");
        assert!(decode(bad_number.as_bytes()).is_err());

        let infinite = ASCII.replace("vertex 1 0 0", "vertex inf 0 0");
        assert!(decode(infinite.as_bytes()).is_err());

        let no_end = ASCII.replace("endsolid wedge", "");
        assert!(decode(no_end.as_bytes()).is_err());
    }

    #[test]
    fn test_read_wraps_into_document() {
        let document = read_stl(ASCII.as_bytes()).unwrap();
        assert_eq!(document.resource_count(), 1);
        assert_eq!(document.build_item_count(), 1);
        let (_, mesh) = document.mesh_objects().next().unwrap();
        assert_eq!(mesh.name.as_deref(), Some("wedge"));
        assert_eq!(mesh.triangle_count(), 2);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe 3MF
//!
//! An in-memory 3MF document model (meshes, components, beam lattices,
//! colors and metadata), a 3MF package reader and writer with strict and
//! lenient malformation policies, and conversion to and from STL.

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod model;
pub mod utils;

pub use config::{CodecConfig, StlEncoding};
pub use error::{ModelError, Result};
pub use geometry::{Beam, BeamCapMode, Mesh, Transform, Triangle, Vertex};
pub use io::{convert, convert_file, flatten, read_3mf, read_stl, write_3mf, write_stl, Format};
pub use model::{Color, Document, MeshObject, ResourceId};

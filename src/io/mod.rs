// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - 3MF packages, STL files and conversion between them

pub mod convert;
pub mod stl;
mod summary;
pub mod threemf;

pub use convert::{
    convert, convert_file, output_file_name, read_document, ConversionSummary, Format,
};
pub use stl::{flatten, read_stl, write_stl};
pub use summary::{DocumentSummary, ResourceSummary};
pub use threemf::{
    read_3mf, write_3mf, Diagnostic, ReadOutcome, ReaderConfig, ThreeMfReader, THUMBNAIL_RELATIONSHIP,
};

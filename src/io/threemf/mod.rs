// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 3MF package codec
//!
//! A package is a zip container holding `[Content_Types].xml`, the package
//! relationships and the model part. Reading goes through two phases: the
//! model markup is parsed into raw records, which are then assembled into a
//! [`Document`] under the strict or lenient policy.

mod assemble;
mod opc;
mod parser;
mod reader;
mod writer;
mod xml;

pub use opc::{MODEL_PART, THUMBNAIL_RELATIONSHIP};
pub use reader::ThreeMfReader;
pub use writer::write_3mf;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::model::Document;
use serde::Serialize;
use std::fmt;
use std::io::Read;

pub const CORE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
pub const MATERIAL_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/material/2015/02";
pub const BEAM_LATTICE_NS: &str =
    "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02";
/// Extension namespace for standalone metadata group resources
pub const POLYFRAME_NS: &str = "http://schemas.polyframe.ai/3mf/metadata/2025";

/// Options of the 3MF reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    pub strict_mode: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { strict_mode: true }
    }
}

impl From<&CodecConfig> for ReaderConfig {
    fn from(config: &CodecConfig) -> Self {
        Self {
            strict_mode: config.strict_mode,
        }
    }
}

/// Malformation tolerated by a lenient read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub element: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.element, self.message)
    }
}

/// Result of reading a package
#[derive(Debug)]
pub struct ReadOutcome {
    pub document: Document,
    /// Always empty in strict mode
    pub diagnostics: Vec<Diagnostic>,
}

/// Read a package in strict mode
pub fn read_3mf(input: impl Read) -> Result<Document> {
    ThreeMfReader::new(ReaderConfig::default())
        .read(input)
        .map(|outcome| outcome.document)
}

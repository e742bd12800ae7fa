// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion between 3MF packages and STL files

use super::stl::{self, flatten, write_mesh};
use super::threemf::{write_3mf, Diagnostic, ReadOutcome, ThreeMfReader};
use crate::config::CodecConfig;
use crate::error::{ModelError, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// File formats understood by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Format {
    #[serde(rename = "3mf")]
    ThreeMf,
    #[serde(rename = "stl")]
    Stl,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::ThreeMf => "3mf",
            Self::Stl => "stl",
        }
    }

    /// The format a file of this format converts into
    pub fn counterpart(&self) -> Format {
        match self {
            Self::ThreeMf => Self::Stl,
            Self::Stl => Self::ThreeMf,
        }
    }

    /// Identify a file by its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ModelError::UnsupportedFormat(format!("{} has no extension", path.display()))
            })?;
        extension.parse()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = ModelError;

    /// Accepts `3mf` or `stl` in any case, with or without a leading dot
    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "3mf" => Ok(Self::ThreeMf),
            "stl" => Ok(Self::Stl),
            _ => Err(ModelError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Output name for a converted file: same base name, extension of `target`
pub fn output_file_name(input: &Path, target: Format) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        ModelError::UnsupportedFormat(format!("{} has no file name", input.display()))
    })?;
    // the stem keeps any dots of its own
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(target.extension());
    Ok(PathBuf::from(name))
}

/// Outcome of one conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub source: Format,
    pub target: Format,
    /// Triangles written to the output
    pub triangles: usize,
    /// Malformations tolerated by a lenient 3MF read
    pub diagnostics: Vec<Diagnostic>,
}

/// Read a document from a 3MF or STL stream
pub fn read_document(
    input: impl Read,
    format: Format,
    config: &CodecConfig,
) -> Result<ReadOutcome> {
    match format {
        Format::ThreeMf => ThreeMfReader::new(config.into()).read(input),
        Format::Stl => Ok(ReadOutcome {
            document: stl::read_stl(input)?,
            diagnostics: Vec::new(),
        }),
    }
}

/// Convert `input` (in `format`) into the counterpart format on `output`
pub fn convert(
    input: impl Read,
    format: Format,
    output: impl Write,
    config: &CodecConfig,
) -> Result<ConversionSummary> {
    let ReadOutcome {
        document,
        diagnostics,
    } = read_document(input, format, config)?;
    let target = format.counterpart();

    let triangles = match target {
        Format::Stl => {
            let mesh = flatten(&document)?;
            write_mesh(&mesh, output, config.output_encoding)?;
            mesh.triangle_count()
        }
        Format::ThreeMf => {
            write_3mf(&document, output)?;
            document
                .mesh_objects()
                .map(|(_, mesh)| mesh.triangle_count())
                .sum()
        }
    };

    info!(
        source = %format,
        target = %target,
        triangles,
        diagnostics = diagnostics.len(),
        "conversion finished"
    );
    Ok(ConversionSummary {
        source: format,
        target,
        triangles,
        diagnostics,
    })
}

/// Convert a file on disk, writing next to it or into `out_dir`. The output
/// file is only created once the conversion has succeeded.
pub fn convert_file(
    input: &Path,
    out_dir: Option<&Path>,
    config: &CodecConfig,
) -> Result<(PathBuf, ConversionSummary)> {
    let format = Format::from_path(input)?;
    let name = output_file_name(input, format.counterpart())?;
    let output_path = match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    };

    let reader = BufReader::new(File::open(input)?);
    let mut buffer = Vec::new();
    let summary = convert(reader, format, &mut buffer, config)?;
    std::fs::write(&output_path, buffer)?;

    Ok((output_path, summary))
}

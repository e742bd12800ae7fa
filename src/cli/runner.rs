// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Command execution for the CLI

use crate::config::CodecConfig;
use crate::io::{self, ConversionSummary, Diagnostic, DocumentSummary, Format};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Result of a file conversion
pub struct ConvertRun {
    pub output: PathBuf,
    pub summary: ConversionSummary,
    pub duration: Duration,
}

/// Result of inspecting a file
pub struct InfoRun {
    pub summary: DocumentSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub duration: Duration,
}

/// Runs conversions and inspections under one codec configuration
pub struct Runner {
    config: CodecConfig,
}

impl Runner {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Convert `input` into its counterpart format
    pub fn run_convert(&self, input: &Path, out_dir: Option<&Path>) -> Result<ConvertRun> {
        if let Some(dir) = out_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        }

        let start = Instant::now();
        let (output, summary) = io::convert_file(input, out_dir, &self.config)
            .with_context(|| format!("Failed to convert {:?}", input))?;

        Ok(ConvertRun {
            output,
            summary,
            duration: start.elapsed(),
        })
    }

    /// Read `input` and summarize its document
    pub fn run_info(&self, input: &Path) -> Result<InfoRun> {
        let format = Format::from_path(input)?;
        let start = Instant::now();

        let file = File::open(input).with_context(|| format!("Failed to open {:?}", input))?;
        let outcome = io::read_document(BufReader::new(file), format, &self.config)
            .with_context(|| format!("Failed to read {:?}", input))?;
        let summary = DocumentSummary::from_document(&outcome.document)
            .context("Failed to summarize document")?;

        Ok(InfoRun {
            summary,
            diagnostics: outcome.diagnostics,
            duration: start.elapsed(),
        })
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

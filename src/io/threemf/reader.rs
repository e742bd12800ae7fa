// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 3MF package reader

use super::assemble::Assembler;
use super::opc::{
    normalize_part_name, parse_relationships, ContentTypes, CONTENT_TYPES_PART, MODEL_PART,
    PACKAGE_RELS_PART,
};
use super::parser::parse_model;
use super::{ReadOutcome, ReaderConfig};
use crate::error::{ModelError, Result};
use crate::model::Attachment;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// Reads 3MF packages into documents
#[derive(Debug, Clone, Default)]
pub struct ThreeMfReader {
    config: ReaderConfig,
}

impl ThreeMfReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn read(&self, mut input: impl Read) -> Result<ReadOutcome> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let content_types = match read_text(&mut archive, CONTENT_TYPES_PART)? {
            Some(xml) => ContentTypes::parse(&xml)?,
            None => ContentTypes::default(),
        };
        let relationships = match read_text(&mut archive, PACKAGE_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => Vec::new(),
        };

        let model_part = relationships
            .iter()
            .find(|rel| rel.rel_type.ends_with("/3dmodel"))
            .map_or_else(|| MODEL_PART.to_string(), |rel| rel.target.clone());
        debug!(part = %model_part, "reading model part");

        let xml = read_text(&mut archive, &model_part)?
            .ok_or_else(|| ModelError::malformed(&model_part, "model part is missing"))?;
        let raw = parse_model(&xml)?;
        let (mut document, diagnostics) = Assembler::new(self.config.strict_mode).assemble(raw)?;

        let part_names: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect();
        for name in part_names {
            let part = normalize_part_name(&name);
            let reserved = [CONTENT_TYPES_PART, PACKAGE_RELS_PART, model_part.as_str()];
            if reserved.contains(&part.as_str()) {
                continue;
            }
            let Some(data) = read_part(&mut archive, &name)? else {
                continue;
            };
            debug!(part = %part, bytes = data.len(), "keeping attachment");
            document.add_attachment(Attachment {
                content_type: content_types
                    .content_type_for(&part)
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string(),
                relationship_type: relationships
                    .iter()
                    .find(|rel| rel.target == part)
                    .map(|rel| rel.rel_type.clone()),
                path: part,
                data,
            });
        }

        Ok(ReadOutcome {
            document,
            diagnostics,
        })
    }
}

fn read_part(archive: &mut Archive, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

fn read_text(archive: &mut Archive, name: &str) -> Result<Option<String>> {
    let Some(data) = read_part(archive, name)? else {
        return Ok(None);
    };
    let text = String::from_utf8(data).map_err(|e| ModelError::malformed(name, e.to_string()))?;
    Ok(Some(text.trim_start_matches('\u{feff}').to_string()))
}

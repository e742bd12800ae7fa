// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Codec configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default configuration file looked up by [`CodecConfig::load`]
pub const CONFIG_FILE: &str = "polyframe-3mf.toml";

/// Record form used when writing STL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlEncoding {
    #[default]
    Binary,
    #[serde(alias = "text")]
    Ascii,
}

impl fmt::Display for StlEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Ascii => f.write_str("ascii"),
        }
    }
}

impl FromStr for StlEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "ascii" | "text" => Ok(Self::Ascii),
            other => bail!("unknown STL encoding '{other}' (expected binary or ascii)"),
        }
    }
}

/// Options recognized by the 3MF reader and the STL writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Fail the whole 3MF read on the first malformed reference
    pub strict_mode: bool,
    pub output_encoding: StlEncoding,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            output_encoding: StlEncoding::Binary,
        }
    }
}

impl CodecConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: CodecConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `polyframe-3mf.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(strict) = std::env::var("POLYFRAME_3MF_STRICT") {
            self.strict_mode = strict.parse().with_context(|| {
                format!("POLYFRAME_3MF_STRICT must be true or false, got '{strict}'")
            })?;
        }

        if let Ok(encoding) = std::env::var("POLYFRAME_3MF_STL_ENCODING") {
            self.output_encoding = encoding.parse()?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert!(config.strict_mode);
        assert_eq!(config.output_encoding, StlEncoding::Binary);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CodecConfig = toml::from_str("output_encoding = \"text\"").unwrap();
        assert!(config.strict_mode);
        assert_eq!(config.output_encoding, StlEncoding::Ascii);
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let file = NamedTempFile::new()?;
        let config = CodecConfig {
            strict_mode: false,
            output_encoding: StlEncoding::Ascii,
        };
        config.save(file.path())?;
        assert_eq!(CodecConfig::from_file(file.path())?, config);
        Ok(())
    }

    #[test]
    fn test_encoding_tokens() {
        assert_eq!("ASCII".parse::<StlEncoding>().unwrap(), StlEncoding::Ascii);
        assert_eq!("binary".parse::<StlEncoding>().unwrap(), StlEncoding::Binary);
        assert!("xml".parse::<StlEncoding>().is_err());
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Color property groups

use super::PropertyId;
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First property id handed out by a group
pub const FIRST_PROPERTY_ID: PropertyId = 1;

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

impl FromStr for Color {
    type Err = ModelError;

    /// Parses `#RRGGBB` or `#RRGGBBAA`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ModelError::InvalidGeometry(format!("invalid color '{s}'"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

/// Ordered colors addressed by property id (1, 2, 3, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorGroup {
    colors: Vec<Color>,
}

impl ColorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a color and return its property id
    pub fn add_color(&mut self, color: Color) -> PropertyId {
        self.colors.push(color);
        self.colors.len() as PropertyId - 1 + FIRST_PROPERTY_ID
    }

    pub fn color(&self, id: PropertyId) -> Option<Color> {
        self.position(id).map(|i| self.colors[i])
    }

    pub fn set_color(&mut self, id: PropertyId, color: Color) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| ModelError::InvalidGeometry(format!("no color with property id {id}")))?;
        self.colors[index] = color;
        Ok(())
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.position(id).is_some()
    }

    /// Zero-based position of a property id, as written in the markup
    pub fn position(&self, id: PropertyId) -> Option<usize> {
        let index = id.checked_sub(FIRST_PROPERTY_ID)? as usize;
        (index < self.colors.len()).then_some(index)
    }

    /// Property id stored at a zero-based markup position
    pub fn property_at(&self, position: usize) -> Option<PropertyId> {
        (position < self.colors.len()).then(|| position as PropertyId + FIRST_PROPERTY_ID)
    }

    /// `(property id, color)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, Color)> + '_ {
        self.colors
            .iter()
            .enumerate()
            .map(|(i, c)| (i as PropertyId + FIRST_PROPERTY_ID, *c))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

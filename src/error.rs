// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types shared by the document model and the codecs

use crate::model::ResourceId;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised by document construction and by the 3MF/STL codecs
#[derive(Debug, Error)]
pub enum ModelError {
    /// A resource id did not resolve, or resolved to another kind
    #[error("resource {id} not found{}", expected_suffix(.expected))]
    NotFound {
        id: ResourceId,
        expected: Option<&'static str>,
    },

    /// A build item, component or property points at an unusable resource
    #[error("invalid reference to resource {id}: {reason}")]
    InvalidReference { id: ResourceId, reason: String },

    /// Adding the component would make an object instance itself
    #[error("cyclic instancing: resource {parent} cannot contain resource {child}")]
    CyclicInstancing {
        parent: ResourceId,
        child: ResourceId,
    },

    /// A triangle or beam index is beyond the vertex count
    #[error("vertex index {index} out of range (vertex count {vertex_count})")]
    GeometryOutOfRange { index: u32, vertex_count: usize },

    /// Geometry that is in range but otherwise unusable
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The resource is still referenced and cannot be removed
    #[error("resource {id} is in use by {user}")]
    ResourceInUse { id: ResourceId, user: String },

    /// Archive or flat-mesh parse failure
    #[error("malformed document at {element}: {message}")]
    MalformedDocument { element: String, message: String },

    /// Unrecognized extension or format tag
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl ModelError {
    pub fn malformed(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            element: element.into(),
            message: message.into(),
        }
    }

    pub fn not_found(id: ResourceId) -> Self {
        Self::NotFound { id, expected: None }
    }

    pub fn wrong_kind(id: ResourceId, expected: &'static str) -> Self {
        Self::NotFound {
            id,
            expected: Some(expected),
        }
    }

    pub fn invalid_reference(id: ResourceId, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            id,
            reason: reason.into(),
        }
    }
}

fn expected_suffix(expected: &Option<&'static str>) -> String {
    expected
        .map(|kind| format!(" (expected {kind})"))
        .unwrap_or_default()
}

impl From<quick_xml::events::attributes::AttrError> for ModelError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}

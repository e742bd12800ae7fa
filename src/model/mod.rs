// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Document object model - resource registry, scene assembly and metadata

mod beam_lattice;
mod build;
mod color_group;
mod components;
mod document;
mod mesh_object;
mod metadata;
mod resource;

pub use beam_lattice::{BeamLattice, DEFAULT_MIN_LENGTH};
pub use build::BuildItem;
pub use color_group::{Color, ColorGroup, FIRST_PROPERTY_ID};
pub use components::{Component, ComponentsObject};
pub use document::{Attachment, Document, Unit};
pub use mesh_object::{MeshObject, ObjectType, PropertyRef};
pub use metadata::{Metadata, MetadataGroup};
pub use resource::{PropertyId, Resource, ResourceId, ResourceKind};

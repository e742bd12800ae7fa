// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Model part markup to raw records
//!
//! Only syntax is checked here: numbers must parse, coordinates must be
//! finite and ids must be non-zero. Cross references are resolved later by
//! the assembler.

use super::xml::{attribute_map, Attrs};
use super::{BEAM_LATTICE_NS, CORE_NS, MATERIAL_NS, POLYFRAME_NS};
use crate::error::{ModelError, Result};
use crate::geometry::{Transform, Vertex};
use crate::model::{Color, MetadataGroup, ObjectType, ResourceId, Unit};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

#[derive(Debug, Default)]
pub(super) struct RawModel {
    pub unit: Option<Unit>,
    pub metadata: MetadataGroup,
    pub color_groups: Vec<RawColorGroup>,
    pub metadata_groups: Vec<(ResourceId, MetadataGroup)>,
    pub objects: Vec<RawObject>,
    pub build: Vec<RawItem>,
}

#[derive(Debug)]
pub(super) struct RawColorGroup {
    pub id: ResourceId,
    pub colors: Vec<Color>,
}

#[derive(Debug)]
pub(super) struct RawObject {
    pub id: ResourceId,
    pub name: Option<String>,
    pub object_type: ObjectType,
    pub pid: Option<ResourceId>,
    pub pindex: Option<u32>,
    pub metadata: MetadataGroup,
    pub body: RawBody,
}

#[derive(Debug)]
pub(super) enum RawBody {
    Empty,
    Mesh(RawMesh),
    Components(Vec<RawComponent>),
}

#[derive(Debug, Default)]
pub(super) struct RawMesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<RawTriangle>,
    pub lattice: Option<RawLattice>,
}

#[derive(Debug)]
pub(super) struct RawTriangle {
    pub indices: [u32; 3],
    pub pid: Option<ResourceId>,
    /// Zero-based positions inside the property group
    pub positions: [Option<u32>; 3],
}

#[derive(Debug, Default)]
pub(super) struct RawLattice {
    pub min_length: Option<f64>,
    pub radius: Option<f64>,
    pub cap: Option<String>,
    pub beams: Vec<RawBeam>,
}

#[derive(Debug)]
pub(super) struct RawBeam {
    pub indices: [u32; 2],
    pub radii: [Option<f64>; 2],
    pub caps: [Option<String>; 2],
}

#[derive(Debug)]
pub(super) struct RawComponent {
    pub object: ResourceId,
    pub transform: Transform,
}

#[derive(Debug)]
pub(super) struct RawItem {
    pub object: ResourceId,
    pub transform: Transform,
    pub part_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Model,
    Resources,
    Object,
    Mesh,
    Vertices,
    Vertex,
    Triangles,
    Triangle,
    Components,
    Component,
    Build,
    Item,
    Metadata,
    ObjectMetadataGroup,
    ColorGroup,
    Color,
    BeamLattice,
    Beams,
    Beam,
    MetadataGroupResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Core,
    Material,
    BeamLattice,
    Polyframe,
}

impl Tag {
    fn classify(resolved: &ResolveResult<'_>, local: &[u8]) -> Option<Tag> {
        let space = match resolved {
            ResolveResult::Unbound => Space::Core,
            ResolveResult::Bound(Namespace(ns)) if *ns == CORE_NS.as_bytes() => Space::Core,
            ResolveResult::Bound(Namespace(ns)) if *ns == MATERIAL_NS.as_bytes() => Space::Material,
            ResolveResult::Bound(Namespace(ns)) if *ns == BEAM_LATTICE_NS.as_bytes() => {
                Space::BeamLattice
            }
            ResolveResult::Bound(Namespace(ns)) if *ns == POLYFRAME_NS.as_bytes() => {
                Space::Polyframe
            }
            _ => return None,
        };

        let tag = match (space, local) {
            (Space::Core, b"model") => Tag::Model,
            (Space::Core, b"resources") => Tag::Resources,
            (Space::Core, b"object") => Tag::Object,
            (Space::Core, b"mesh") => Tag::Mesh,
            (Space::Core, b"vertices") => Tag::Vertices,
            (Space::Core, b"vertex") => Tag::Vertex,
            (Space::Core, b"triangles") => Tag::Triangles,
            (Space::Core, b"triangle") => Tag::Triangle,
            (Space::Core, b"components") => Tag::Components,
            (Space::Core, b"component") => Tag::Component,
            (Space::Core, b"build") => Tag::Build,
            (Space::Core, b"item") => Tag::Item,
            (Space::Core | Space::Polyframe, b"metadata") => Tag::Metadata,
            (Space::Core, b"metadatagroup") => Tag::ObjectMetadataGroup,
            (Space::Material, b"colorgroup") => Tag::ColorGroup,
            (Space::Material, b"color") => Tag::Color,
            (Space::BeamLattice, b"beamlattice") => Tag::BeamLattice,
            (Space::BeamLattice, b"beams") => Tag::Beams,
            (Space::BeamLattice, b"beam") => Tag::Beam,
            (Space::Polyframe, b"metadatagroup") => Tag::MetadataGroupResource,
            _ => return None,
        };
        Some(tag)
    }

    /// Whether `self` may appear directly below `parent`
    fn fits_under(self, parent: Option<Tag>) -> bool {
        let Some(parent) = parent else {
            return self == Tag::Model;
        };
        match self {
            Tag::Model => false,
            Tag::Resources | Tag::Build => parent == Tag::Model,
            Tag::Metadata => matches!(
                parent,
                Tag::Model | Tag::ObjectMetadataGroup | Tag::MetadataGroupResource
            ),
            Tag::Object | Tag::ColorGroup | Tag::MetadataGroupResource => parent == Tag::Resources,
            Tag::Mesh | Tag::Components | Tag::ObjectMetadataGroup => parent == Tag::Object,
            Tag::Vertices | Tag::Triangles | Tag::BeamLattice => parent == Tag::Mesh,
            Tag::Vertex => parent == Tag::Vertices,
            Tag::Triangle => parent == Tag::Triangles,
            Tag::Beams => parent == Tag::BeamLattice,
            Tag::Beam => parent == Tag::Beams,
            Tag::Component => parent == Tag::Components,
            Tag::Color => parent == Tag::ColorGroup,
            Tag::Item => parent == Tag::Build,
        }
    }
}

/// Parse the model part into raw records
pub(super) fn parse_model(xml: &str) -> Result<RawModel> {
    let mut reader = NsReader::from_str(xml);
    // metadata values keep their surrounding whitespace
    reader.config_mut().trim_text(false);
    let mut parser = ModelParser::default();

    loop {
        let position = reader.buffer_position();
        let (tag, event) = match reader.read_resolved_event() {
            Ok((resolved, event)) => {
                let tag = match &event {
                    Event::Start(e) | Event::Empty(e) => {
                        Tag::classify(&resolved, e.local_name().as_ref())
                    }
                    _ => None,
                };
                (tag, event)
            }
            Err(e) => {
                return Err(ModelError::malformed(
                    format!("model markup at byte {position}"),
                    e.to_string(),
                ))
            }
        };

        match event {
            Event::Start(e) => {
                let entered = match tag {
                    Some(tag) => parser.open(tag, &attribute_map(&e)?)?,
                    None => false,
                };
                match tag {
                    Some(tag) if entered => parser.stack.push(tag),
                    _ => {
                        debug!(
                            element = %String::from_utf8_lossy(e.name().as_ref()),
                            "skipping unsupported element"
                        );
                        reader.read_to_end(e.name())?;
                    }
                }
            }
            Event::Empty(e) => {
                let entered = match tag {
                    Some(tag) => parser.open(tag, &attribute_map(&e)?)?,
                    None => false,
                };
                match tag {
                    Some(tag) if entered => parser.close(tag),
                    _ => debug!(
                        element = %String::from_utf8_lossy(e.name().as_ref()),
                        "skipping unsupported element"
                    ),
                }
            }
            Event::End(_) => {
                if let Some(tag) = parser.stack.pop() {
                    parser.close(tag);
                }
            }
            Event::Text(text) => {
                if let Some(value) = parser.metadata_text() {
                    value.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(value) = parser.metadata_text() {
                    value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !parser.seen_model {
        return Err(ModelError::malformed("model", "no <model> root element"));
    }
    Ok(parser.model)
}

#[derive(Debug, Default)]
struct ModelParser {
    model: RawModel,
    seen_model: bool,
    stack: Vec<Tag>,
    object: Option<RawObject>,
    color_group: Option<RawColorGroup>,
    metadata_group: Option<(ResourceId, MetadataGroup)>,
    entry: Option<(String, String)>,
}

impl ModelParser {
    /// Handle an opening tag. Returns false when the element is out of place
    /// and its subtree should be skipped.
    fn open(&mut self, tag: Tag, attrs: &Attrs) -> Result<bool> {
        if !tag.fits_under(self.stack.last().copied()) {
            return Ok(false);
        }

        match tag {
            Tag::Model => {
                self.seen_model = true;
                self.model.unit = attrs.parse("unit", "model")?;
            }
            Tag::Object => {
                let id = resource_id(attrs, "id", "object")?;
                let element = format!("object {id}");
                self.object = Some(RawObject {
                    id,
                    name: attrs.get("name").map(str::to_string),
                    object_type: attrs.parse("type", &element)?.unwrap_or_default(),
                    pid: optional_resource_id(attrs, "pid", &element)?,
                    pindex: attrs.parse("pindex", &element)?,
                    metadata: MetadataGroup::new(),
                    body: RawBody::Empty,
                });
            }
            Tag::Mesh => match self.object.as_mut() {
                Some(object) if matches!(object.body, RawBody::Empty) => {
                    object.body = RawBody::Mesh(RawMesh::default());
                }
                _ => return Ok(false),
            },
            Tag::Components => match self.object.as_mut() {
                Some(object) if matches!(object.body, RawBody::Empty) => {
                    object.body = RawBody::Components(Vec::new());
                }
                _ => return Ok(false),
            },
            Tag::Vertex => {
                let element = self.object_element("vertex", |mesh| mesh.vertices.len());
                let vertex = Vertex::new(
                    attrs.coordinate("x", &element)?,
                    attrs.coordinate("y", &element)?,
                    attrs.coordinate("z", &element)?,
                );
                match self.mesh() {
                    Some(mesh) => mesh.vertices.push(vertex),
                    None => return Ok(false),
                }
            }
            Tag::Triangle => {
                let element = self.object_element("triangle", |mesh| mesh.triangles.len());
                let triangle = RawTriangle {
                    indices: [
                        attrs.parse_required("v1", &element)?,
                        attrs.parse_required("v2", &element)?,
                        attrs.parse_required("v3", &element)?,
                    ],
                    pid: optional_resource_id(attrs, "pid", &element)?,
                    positions: [
                        attrs.parse("p1", &element)?,
                        attrs.parse("p2", &element)?,
                        attrs.parse("p3", &element)?,
                    ],
                };
                match self.mesh() {
                    Some(mesh) => mesh.triangles.push(triangle),
                    None => return Ok(false),
                }
            }
            Tag::BeamLattice => {
                let element = self.object_element("beamlattice", |_| 0);
                let lattice = RawLattice {
                    min_length: attrs.parse("minlength", &element)?,
                    radius: attrs.parse("radius", &element)?,
                    cap: attrs.get("cap").map(str::to_string),
                    beams: Vec::new(),
                };
                match self.mesh() {
                    Some(mesh) => mesh.lattice = Some(lattice),
                    None => return Ok(false),
                }
            }
            Tag::Beam => {
                let element = self.object_element("beam", |mesh| {
                    mesh.lattice.as_ref().map_or(0, |l| l.beams.len())
                });
                let beam = RawBeam {
                    indices: [
                        attrs.parse_required("v1", &element)?,
                        attrs.parse_required("v2", &element)?,
                    ],
                    radii: [attrs.parse("r1", &element)?, attrs.parse("r2", &element)?],
                    caps: [
                        attrs.get("cap1").map(str::to_string),
                        attrs.get("cap2").map(str::to_string),
                    ],
                };
                match self.mesh().and_then(|mesh| mesh.lattice.as_mut()) {
                    Some(lattice) => lattice.beams.push(beam),
                    None => return Ok(false),
                }
            }
            Tag::Component => {
                let element = match &self.object {
                    Some(object) => format!("object {} / component", object.id),
                    None => return Ok(false),
                };
                let component = RawComponent {
                    object: resource_id(attrs, "objectid", &element)?,
                    transform: transform_attribute(attrs, &element)?,
                };
                match self.object.as_mut().map(|object| &mut object.body) {
                    Some(RawBody::Components(components)) => components.push(component),
                    _ => return Ok(false),
                }
            }
            Tag::ColorGroup => {
                self.color_group = Some(RawColorGroup {
                    id: resource_id(attrs, "id", "colorgroup")?,
                    colors: Vec::new(),
                });
            }
            Tag::Color => {
                let Some(group) = self.color_group.as_mut() else {
                    return Ok(false);
                };
                let element = format!("colorgroup {} / color {}", group.id, group.colors.len());
                let raw = attrs.required("color", &element)?;
                let color = raw
                    .parse::<Color>()
                    .map_err(|e| ModelError::malformed(&element, e.to_string()))?;
                group.colors.push(color);
            }
            Tag::MetadataGroupResource => {
                let id = resource_id(attrs, "id", "metadatagroup")?;
                self.metadata_group = Some((id, MetadataGroup::new()));
            }
            Tag::Metadata => {
                let name = attrs.required("name", "metadata")?;
                self.entry = Some((name.to_string(), String::new()));
            }
            Tag::Item => {
                let element = format!("build / item {}", self.model.build.len());
                self.model.build.push(RawItem {
                    object: resource_id(attrs, "objectid", &element)?,
                    transform: transform_attribute(attrs, &element)?,
                    part_number: attrs.get("partnumber").map(str::to_string),
                });
            }
            Tag::Resources
            | Tag::Vertices
            | Tag::Triangles
            | Tag::Beams
            | Tag::Build
            | Tag::ObjectMetadataGroup => {}
        }
        Ok(true)
    }

    fn close(&mut self, tag: Tag) {
        match tag {
            Tag::Object => {
                if let Some(object) = self.object.take() {
                    self.model.objects.push(object);
                }
            }
            Tag::ColorGroup => {
                if let Some(group) = self.color_group.take() {
                    self.model.color_groups.push(group);
                }
            }
            Tag::MetadataGroupResource => {
                if let Some(group) = self.metadata_group.take() {
                    self.model.metadata_groups.push(group);
                }
            }
            Tag::Metadata => {
                let Some((name, value)) = self.entry.take() else {
                    return;
                };
                let target = match self.stack.last() {
                    Some(Tag::MetadataGroupResource) => {
                        self.metadata_group.as_mut().map(|(_, group)| group)
                    }
                    Some(Tag::ObjectMetadataGroup) => {
                        self.object.as_mut().map(|object| &mut object.metadata)
                    }
                    _ => Some(&mut self.model.metadata),
                };
                if let Some(group) = target {
                    group.add(name, value);
                }
            }
            _ => {}
        }
    }

    /// Value buffer of the metadata entry being read, if any
    fn metadata_text(&mut self) -> Option<&mut String> {
        if self.stack.last() != Some(&Tag::Metadata) {
            return None;
        }
        self.entry.as_mut().map(|(_, value)| value)
    }

    fn mesh(&mut self) -> Option<&mut RawMesh> {
        match self.object.as_mut().map(|object| &mut object.body) {
            Some(RawBody::Mesh(mesh)) => Some(mesh),
            _ => None,
        }
    }

    /// `object <id> / <what> <n>` naming for error messages
    fn object_element(&self, what: &str, index: impl Fn(&RawMesh) -> usize) -> String {
        match &self.object {
            Some(RawObject {
                id,
                body: RawBody::Mesh(mesh),
                ..
            }) => format!("object {id} / {what} {}", index(mesh)),
            Some(object) => format!("object {} / {what}", object.id),
            None => what.to_string(),
        }
    }
}

fn resource_id(attrs: &Attrs, name: &str, element: &str) -> Result<ResourceId> {
    optional_resource_id(attrs, name, element)?
        .ok_or_else(|| ModelError::malformed(element, format!("missing attribute '{name}'")))
}

fn optional_resource_id(attrs: &Attrs, name: &str, element: &str) -> Result<Option<ResourceId>> {
    attrs
        .parse::<u32>(name, element)?
        .map(|raw| {
            ResourceId::declared(raw).ok_or_else(|| {
                ModelError::malformed(
                    element,
                    format!("{name} must be between 1 and {}", ResourceId::MAX_DECLARED),
                )
            })
        })
        .transpose()
}

fn transform_attribute(attrs: &Attrs, element: &str) -> Result<Transform> {
    match attrs.get("transform") {
        Some(raw) => Transform::parse_attribute(raw).map_err(|e| match e {
            ModelError::MalformedDocument { message, .. } => {
                ModelError::malformed(element, message)
            }
            other => other,
        }),
        None => Ok(Transform::identity()),
    }
}

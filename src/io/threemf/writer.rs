// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 3MF package writer

use super::opc::{
    content_types_xml, package_relationships_xml, CONTENT_TYPES_PART, MODEL_PART,
    PACKAGE_RELS_PART,
};
use super::xml::{write_empty, xml_writer};
use super::{BEAM_LATTICE_NS, CORE_NS, MATERIAL_NS, POLYFRAME_NS};
use crate::error::{ModelError, Result};
use crate::geometry::Triangle;
use crate::model::{
    BeamLattice, ColorGroup, ComponentsObject, Document, MeshObject, MetadataGroup, PropertyId,
    Resource, ResourceId,
};
use ahash::AHashSet;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize `document` as a 3MF package.
///
/// The archive is assembled in memory and only handed to `output` once
/// complete, so a failed write never leaves a truncated package behind.
pub fn write_3mf(document: &Document, mut output: impl Write) -> Result<()> {
    document.validate_references()?;
    let model = model_xml(document)?;

    // fixed timestamps and part order keep the bytes stable across writes
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(CONTENT_TYPES_PART, options)?;
    zip.write_all(&content_types_xml(document.attachments())?)?;
    zip.start_file(PACKAGE_RELS_PART, options)?;
    zip.write_all(&package_relationships_xml(document.attachments())?)?;
    zip.start_file(MODEL_PART, options)?;
    zip.write_all(&model)?;

    for attachment in document.attachments() {
        if [CONTENT_TYPES_PART, PACKAGE_RELS_PART, MODEL_PART].contains(&attachment.path.as_str()) {
            warn!(part = %attachment.path, "attachment shadows a reserved part, skipped");
            continue;
        }
        zip.start_file(attachment.path.as_str(), options)?;
        zip.write_all(&attachment.data)?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(
        bytes = bytes.len(),
        resources = document.resource_count(),
        "3MF package assembled"
    );
    output.write_all(&bytes)?;
    output.flush()?;
    Ok(())
}

fn model_xml(document: &Document) -> Result<Vec<u8>> {
    let mut writer = xml_writer();
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", document.unit.as_str()));
    model.push_attribute(("xml:lang", "en-US"));
    model.push_attribute(("xmlns", CORE_NS));
    if document.color_groups().next().is_some() {
        model.push_attribute(("xmlns:m", MATERIAL_NS));
    }
    if document.mesh_objects().any(|(_, mesh)| mesh.beam_lattice().is_some()) {
        model.push_attribute(("xmlns:b", BEAM_LATTICE_NS));
    }
    if document.metadata_groups().next().is_some() {
        model.push_attribute(("xmlns:pf", POLYFRAME_NS));
    }
    writer.write_event(Event::Start(model))?;

    write_metadata_entries(&mut writer, "metadata", document.metadata())?;

    writer.write_event(Event::Start(BytesStart::new("resources")))?;
    for (id, group) in document.color_groups() {
        write_color_group(&mut writer, id, group)?;
    }
    for (id, group) in document.metadata_groups() {
        let mut element = BytesStart::new("pf:metadatagroup");
        element.push_attribute(("id", id.to_string().as_str()));
        writer.write_event(Event::Start(element))?;
        write_metadata_entries(&mut writer, "pf:metadata", group)?;
        writer.write_event(Event::End(BytesEnd::new("pf:metadatagroup")))?;
    }
    for id in object_order(document) {
        match document.resource(id)? {
            Resource::MeshObject(mesh) => write_mesh_object(&mut writer, document, id, mesh)?,
            Resource::ComponentsObject(components) => {
                write_components_object(&mut writer, id, components)?
            }
            _ => {}
        }
    }
    writer.write_event(Event::End(BytesEnd::new("resources")))?;

    writer.write_event(Event::Start(BytesStart::new("build")))?;
    for item in document.build_items() {
        let mut element = BytesStart::new("item");
        element.push_attribute(("objectid", item.object.to_string().as_str()));
        if !item.transform.is_identity() {
            element.push_attribute(("transform", item.transform.to_attribute().as_str()));
        }
        if let Some(part_number) = &item.part_number {
            element.push_attribute(("partnumber", part_number.as_str()));
        }
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new("build")))?;

    writer.write_event(Event::End(BytesEnd::new("model")))?;
    Ok(writer.into_inner().into_inner())
}

/// Geometric objects in dependency order: every object after the objects it
/// instances
fn object_order(document: &Document) -> Vec<ResourceId> {
    fn visit(
        document: &Document,
        id: ResourceId,
        seen: &mut AHashSet<ResourceId>,
        order: &mut Vec<ResourceId>,
    ) {
        if !seen.insert(id) {
            return;
        }
        if let Ok(components) = document.components_object(id) {
            for component in components.components() {
                visit(document, component.object, seen, order);
            }
        }
        order.push(id);
    }

    let mut seen = AHashSet::new();
    let mut order = Vec::new();
    for (id, resource) in document.resources() {
        if resource.kind().is_geometric() {
            visit(document, id, &mut seen, &mut order);
        }
    }
    order
}

fn write_metadata_entries(writer: &mut XmlWriter, tag: &str, group: &MetadataGroup) -> Result<()> {
    for entry in group {
        let mut element = BytesStart::new(tag);
        element.push_attribute(("name", entry.name.as_str()));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Text(BytesText::new(&entry.value)))?;
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }
    Ok(())
}

fn write_color_group(writer: &mut XmlWriter, id: ResourceId, group: &ColorGroup) -> Result<()> {
    let mut element = BytesStart::new("m:colorgroup");
    element.push_attribute(("id", id.to_string().as_str()));
    writer.write_event(Event::Start(element))?;
    for (_, color) in group.iter() {
        write_empty(writer, "m:color", &[("color", color.to_string().as_str())])?;
    }
    writer.write_event(Event::End(BytesEnd::new("m:colorgroup")))?;
    Ok(())
}

fn object_start(id: ResourceId, name: Option<&str>) -> BytesStart<'static> {
    let mut element = BytesStart::new("object");
    element.push_attribute(("id", id.to_string().as_str()));
    if let Some(name) = name {
        element.push_attribute(("name", name));
    }
    element
}

fn write_object_metadata(writer: &mut XmlWriter, metadata: &MetadataGroup) -> Result<()> {
    if metadata.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new("metadatagroup")))?;
    write_metadata_entries(writer, "metadata", metadata)?;
    writer.write_event(Event::End(BytesEnd::new("metadatagroup")))?;
    Ok(())
}

/// Zero-based markup position of a property id inside group `resource`
fn property_position(
    document: &Document,
    resource: ResourceId,
    index: PropertyId,
) -> Result<String> {
    document
        .color_group(resource)?
        .position(index)
        .map(|position| position.to_string())
        .ok_or_else(|| {
            ModelError::invalid_reference(
                resource,
                format!("property id {index} is not registered"),
            )
        })
}

fn write_mesh_object(
    writer: &mut XmlWriter,
    document: &Document,
    id: ResourceId,
    mesh: &MeshObject,
) -> Result<()> {
    let mut element = object_start(id, mesh.name.as_deref());
    element.push_attribute(("type", mesh.object_type.as_str()));
    if let Some(property) = mesh.default_property() {
        element.push_attribute(("pid", property.resource.to_string().as_str()));
        let position = property_position(document, property.resource, property.index)?;
        element.push_attribute(("pindex", position.as_str()));
    }
    writer.write_event(Event::Start(element))?;
    write_object_metadata(writer, &mesh.metadata)?;

    writer.write_event(Event::Start(BytesStart::new("mesh")))?;

    writer.write_event(Event::Start(BytesStart::new("vertices")))?;
    for vertex in mesh.vertices() {
        write_empty(
            writer,
            "vertex",
            &[
                ("x", vertex.x().to_string().as_str()),
                ("y", vertex.y().to_string().as_str()),
                ("z", vertex.z().to_string().as_str()),
            ],
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("vertices")))?;

    writer.write_event(Event::Start(BytesStart::new("triangles")))?;
    for triangle in mesh.triangles() {
        writer.write_event(Event::Empty(triangle_element(document, triangle)?))?;
    }
    writer.write_event(Event::End(BytesEnd::new("triangles")))?;

    if let Some(lattice) = mesh.beam_lattice() {
        write_beam_lattice(writer, lattice)?;
    }

    writer.write_event(Event::End(BytesEnd::new("mesh")))?;
    writer.write_event(Event::End(BytesEnd::new("object")))?;
    Ok(())
}

fn triangle_element(document: &Document, triangle: &Triangle) -> Result<BytesStart<'static>> {
    let mut element = BytesStart::new("triangle");
    let [v1, v2, v3] = triangle.indices;
    element.push_attribute(("v1", v1.to_string().as_str()));
    element.push_attribute(("v2", v2.to_string().as_str()));
    element.push_attribute(("v3", v3.to_string().as_str()));

    if let Some(properties) = triangle.properties() {
        element.push_attribute(("pid", properties.resource.to_string().as_str()));
        let [p1, p2, p3] = properties.indices;
        let position = |index| property_position(document, properties.resource, index);
        element.push_attribute(("p1", position(p1)?.as_str()));
        if !properties.is_uniform() {
            element.push_attribute(("p2", position(p2)?.as_str()));
            element.push_attribute(("p3", position(p3)?.as_str()));
        }
    }
    Ok(element)
}

fn write_beam_lattice(writer: &mut XmlWriter, lattice: &BeamLattice) -> Result<()> {
    let mut element = BytesStart::new("b:beamlattice");
    element.push_attribute(("minlength", lattice.min_length().to_string().as_str()));
    element.push_attribute(("radius", lattice.default_radius.to_string().as_str()));
    element.push_attribute(("cap", lattice.default_cap.as_str()));
    writer.write_event(Event::Start(element))?;

    writer.write_event(Event::Start(BytesStart::new("b:beams")))?;
    for beam in lattice.beams() {
        write_empty(
            writer,
            "b:beam",
            &[
                ("v1", beam.indices[0].to_string().as_str()),
                ("v2", beam.indices[1].to_string().as_str()),
                ("r1", beam.radii[0].to_string().as_str()),
                ("r2", beam.radii[1].to_string().as_str()),
                ("cap1", beam.caps[0].as_str()),
                ("cap2", beam.caps[1].as_str()),
            ],
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("b:beams")))?;

    writer.write_event(Event::End(BytesEnd::new("b:beamlattice")))?;
    Ok(())
}

fn write_components_object(
    writer: &mut XmlWriter,
    id: ResourceId,
    components: &ComponentsObject,
) -> Result<()> {
    writer.write_event(Event::Start(object_start(id, components.name.as_deref())))?;
    write_object_metadata(writer, &components.metadata)?;

    writer.write_event(Event::Start(BytesStart::new("components")))?;
    for component in components.components() {
        let mut element = BytesStart::new("component");
        element.push_attribute(("objectid", component.object.to_string().as_str()));
        if !component.transform.is_identity() {
            element.push_attribute(("transform", component.transform.to_attribute().as_str()));
        }
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new("components")))?;

    writer.write_event(Event::End(BytesEnd::new("object")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Transform, Vertex};

    fn nested_document() -> Document {
        let mut doc = Document::new();
        let outer = doc.add_components_object();
        let mesh = doc.add_mesh_object();
        doc.mesh_object_mut(mesh)
            .unwrap()
            .set_geometry(
                vec![
                    Vertex::new(0.0, 0.0, 0.0),
                    Vertex::new(1.0, 0.0, 0.0),
                    Vertex::new(0.0, 1.0, 0.0),
                ],
                vec![Triangle::new(0, 1, 2)],
            )
            .unwrap();
        doc.add_component(outer, mesh, Transform::translation(1.0, 2.0, 3.0))
            .unwrap();
        doc.add_build_item(outer, Transform::identity()).unwrap();
        doc
    }

    #[test]
    fn test_referenced_objects_written_first() {
        let doc = nested_document();
        let ids: Vec<u32> = object_order(&doc).into_iter().map(ResourceId::get).collect();
        assert_eq!(ids, [2, 1]);

        let xml = String::from_utf8(model_xml(&doc).unwrap()).unwrap();
        let mesh_at = xml.find(r#"<object id="2""#).unwrap();
        let components_at = xml.find(r#"<object id="1""#).unwrap();
        assert!(mesh_at < components_at);
        assert!(xml.contains(r#"transform="1 0 0 0 1 0 0 0 1 1 2 3""#));
        assert!(!xml.contains("xmlns:b"));
    }

    #[test]
    fn test_write_is_byte_stable() {
        let doc = nested_document();
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_3mf(&doc, &mut first).unwrap();
        write_3mf(&doc, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_metadata_text_is_escaped() {
        let mut doc = Document::new();
        doc.metadata_mut().add("Title", "<bracket> & co");
        let xml = String::from_utf8(model_xml(&doc).unwrap()).unwrap();
        assert!(xml.contains("&lt;bracket&gt; &amp; co"));
    }
}

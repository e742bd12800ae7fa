// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 3MF package read/write tests

use anyhow::Result;
use approx::assert_relative_eq;
use polyframe_3mf::geometry::{Beam, BeamCapMode, Transform, Triangle, TriangleProperties, Vertex};
use polyframe_3mf::io::{read_3mf, write_3mf, ReaderConfig, ThreeMfReader, THUMBNAIL_RELATIONSHIP};
use polyframe_3mf::model::{Attachment, Color, Document, Unit};
use polyframe_3mf::{ModelError, ResourceId};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn sample_document() -> Result<Document> {
    let mut doc = Document::new();
    doc.unit = Unit::Centimeter;
    doc.metadata_mut().add("Title", "Lattice & bracket");
    doc.metadata_mut().add("Designer", "polyframe");

    let colors = doc.add_color_group();
    let (red, green, blue) = {
        let group = doc.color_group_mut(colors)?;
        (
            group.add_color(Color::rgb(255, 0, 0)),
            group.add_color(Color::rgba(0, 255, 0, 128)),
            group.add_color(Color::rgb(0, 0, 255)),
        )
    };

    let plate = doc.add_mesh_object();
    {
        let mesh = doc.mesh_object_mut(plate)?;
        mesh.name = Some("plate".into());
        mesh.metadata.add("Material", "PLA");
        mesh.set_geometry(
            vec![
                Vertex::new(0.0, 0.0, 0.0),
                Vertex::new(10.0, 0.0, 0.0),
                Vertex::new(10.0, 10.0, 0.0),
                Vertex::new(0.0, 10.0, 0.25),
            ],
            vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)],
        )?;
        mesh.set_beam_defaults(0.75, BeamCapMode::Butt)?;
        mesh.add_beam(Beam::new(0, 2, 0.5, 0.25, BeamCapMode::Sphere, BeamCapMode::HemiSphere))?;
    }
    doc.set_triangle_properties(plate, 0, TriangleProperties::new(colors, [red, green, blue]))?;
    doc.set_object_level_property(plate, colors, green)?;

    let assembly = doc.add_components_object();
    doc.add_component(assembly, plate, Transform::translation(1.5, 0.0, 0.0))?;
    doc.add_component(assembly, plate, Transform::scaling(1.0, 2.0, 1.0))?;
    doc.add_build_item(assembly, Transform::translation(40.0, 60.0, 80.0))?;
    doc.add_build_item(plate, Transform::identity())?;

    doc.add_attachment(Attachment {
        path: "Metadata/thumbnail.png".into(),
        content_type: "image/png".into(),
        relationship_type: Some(THUMBNAIL_RELATIONSHIP.into()),
        data: vec![0x89, b'P', b'N', b'G'],
    });
    Ok(doc)
}

fn package(model: &str) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("3D/3dmodel.model", SimpleFileOptions::default())?;
    zip.write_all(model.as_bytes())?;
    Ok(zip.finish()?.into_inner())
}

const DANGLING_TRIANGLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
          <vertex x="0" y="0" z="1"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
          <triangle v1="0" v2="1" v3="7"/>
          <triangle v1="1" v2="2" v3="3"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build>
    <item objectid="1"/>
  </build>
</model>
"#;

#[test]
fn test_round_trip_preserves_document() -> Result<()> {
    let original = sample_document()?;
    let mut bytes = Vec::new();
    write_3mf(&original, &mut bytes)?;

    let reread = read_3mf(bytes.as_slice())?;
    assert_eq!(reread.unit, Unit::Centimeter);
    assert_eq!(reread.metadata(), original.metadata());
    assert_eq!(reread.resource_count(), 3);

    let ids: Vec<u32> = reread.resources().map(|(id, _)| id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let (plate_id, plate) = reread.mesh_objects().next().expect("mesh object");
    assert_eq!(plate.name.as_deref(), Some("plate"));
    assert_eq!(plate.metadata.get("Material"), Some("PLA"));
    assert_eq!(plate.vertices(), original.mesh_object(plate_id)?.vertices());
    assert_eq!(plate.triangles(), original.mesh_object(plate_id)?.triangles());
    assert_eq!(plate.default_property(), original.mesh_object(plate_id)?.default_property());

    let lattice = plate.beam_lattice().expect("beam lattice");
    assert_relative_eq!(lattice.default_radius, 0.75);
    assert_eq!(lattice.default_cap, BeamCapMode::Butt);
    assert_eq!(lattice.beams()[0].caps, [BeamCapMode::Sphere, BeamCapMode::HemiSphere]);
    assert_relative_eq!(lattice.beams()[0].radii[1], 0.25);

    let (_, colors) = reread.color_groups().next().expect("color group");
    let corner_colors: Vec<String> = colors.iter().map(|(_, c)| c.to_string()).collect();
    assert_eq!(corner_colors, vec!["#FF0000FF", "#00FF0080", "#0000FFFF"]);

    let (_, assembly) = reread.components_objects().next().expect("components object");
    assert_eq!(assembly.component_count(), 2);
    assert_relative_eq!(assembly.components()[0].transform.fields()[3][0], 1.5);

    let items: Vec<_> = reread.build_items().collect();
    assert_eq!(items.len(), 2);
    assert_relative_eq!(items[0].transform.fields()[3][2], 80.0);
    assert!(items[1].transform.is_identity());

    assert_eq!(reread.attachments(), original.attachments());
    Ok(())
}

#[test]
fn test_rewrite_is_stable() -> Result<()> {
    let mut first = Vec::new();
    write_3mf(&sample_document()?, &mut first)?;
    let mut second = Vec::new();
    write_3mf(&read_3mf(first.as_slice())?, &mut second)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_standalone_metadata_group_round_trip() -> Result<()> {
    let mut doc = sample_document()?;
    let notes = doc.add_metadata_group();
    {
        let group = doc.metadata_group_mut(notes)?;
        group.add("Printer", "MK4 <0.4 nozzle>");
        group.add("Layer", "0.2");
    }

    let mut first = Vec::new();
    write_3mf(&doc, &mut first)?;
    let reread = read_3mf(first.as_slice())?;

    let groups: Vec<_> = reread.metadata_groups().collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, notes);
    assert_eq!(groups[0].1, doc.metadata_group(notes)?);

    let mut second = Vec::new();
    write_3mf(&reread, &mut second)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_metadata_whitespace_survives_round_trip() -> Result<()> {
    let mut doc = sample_document()?;
    doc.metadata_mut().add("Description", "  indented value ");
    doc.metadata_mut().add("Empty", "");
    let plate = doc.mesh_objects().next().map(|(id, _)| id).expect("mesh object");
    doc.mesh_object_mut(plate)?.metadata.add("Note", "\tline one\nline two ");
    let notes = doc.add_metadata_group();
    doc.metadata_group_mut(notes)?.add("Padded", " both ends ");

    let mut bytes = Vec::new();
    write_3mf(&doc, &mut bytes)?;
    let reread = read_3mf(bytes.as_slice())?;

    assert_eq!(reread.metadata(), doc.metadata());
    assert_eq!(reread.metadata().get("Description"), Some("  indented value "));
    assert_eq!(reread.mesh_object(plate)?.metadata, doc.mesh_object(plate)?.metadata);
    assert_eq!(reread.metadata_group(notes)?.get("Padded"), Some(" both ends "));
    Ok(())
}

#[test]
fn test_declared_id_range() -> Result<()> {
    let past = DANGLING_TRIANGLE
        .replace(r#"<object id="1""#, r#"<object id="4294967295""#)
        .replace(r#"objectid="1""#, r#"objectid="4294967295""#);
    let bytes = package(&past)?;
    for strict_mode in [true, false] {
        let result = ThreeMfReader::new(ReaderConfig { strict_mode }).read(bytes.as_slice());
        assert!(matches!(result, Err(ModelError::MalformedDocument { .. })));
    }

    // the highest declared id still leaves room for new resources
    let top = DANGLING_TRIANGLE
        .replace(r#"<object id="1""#, r#"<object id="2147483647""#)
        .replace(r#"objectid="1""#, r#"objectid="2147483647""#)
        .replace(r#"v3="7""#, r#"v3="3""#);
    let mut doc = read_3mf(package(&top)?.as_slice())?;
    let before = doc.resource_count();
    let fresh = doc.add_mesh_object();
    assert_eq!(doc.resource_count(), before + 1);
    assert_ne!(fresh.get(), 2147483647);

    let loaded = ResourceId::new(2147483647).expect("nonzero id");
    assert_eq!(doc.mesh_object(loaded)?.triangle_count(), 3);
    assert_eq!(doc.mesh_object(fresh)?.triangle_count(), 0);
    Ok(())
}

#[test]
fn test_strict_read_rejects_dangling_triangle() -> Result<()> {
    let bytes = package(DANGLING_TRIANGLE)?;
    let err = read_3mf(bytes.as_slice()).unwrap_err();
    assert!(err.to_string().contains("object 1 / triangle 1"), "{err}");
    Ok(())
}

#[test]
fn test_lenient_read_drops_dangling_triangle() -> Result<()> {
    let bytes = package(DANGLING_TRIANGLE)?;
    let reader = ThreeMfReader::new(ReaderConfig { strict_mode: false });
    let outcome = reader.read(bytes.as_slice())?;

    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].element, "object 1 / triangle 1");

    let (_, mesh) = outcome.document.mesh_objects().next().expect("mesh object");
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.triangles()[1].indices, [1, 2, 3]);
    Ok(())
}

#[test]
fn test_syntax_errors_are_fatal_in_both_modes() -> Result<()> {
    let broken = DANGLING_TRIANGLE.replace("x=\"1\"", "x=\"one\"");
    let bytes = package(&broken)?;
    for strict_mode in [true, false] {
        let result = ThreeMfReader::new(ReaderConfig { strict_mode }).read(bytes.as_slice());
        assert!(matches!(result, Err(ModelError::MalformedDocument { .. })));
    }

    assert!(read_3mf(&b"not a zip archive"[..]).is_err());
    Ok(())
}

#[test]
fn test_removed_color_group_is_not_written() -> Result<()> {
    let mut doc = sample_document()?;
    let colors = doc.color_groups().next().map(|(id, _)| id).expect("color group");
    let plate = doc.mesh_objects().next().map(|(id, _)| id).expect("mesh object");
    doc.clear_triangle_properties(plate, 0)?;
    doc.clear_object_level_property(plate)?;
    doc.remove_resource(colors)?;

    let mut bytes = Vec::new();
    write_3mf(&doc, &mut bytes)?;
    assert!(read_3mf(bytes.as_slice())?.color_groups().next().is_none());
    Ok(())
}

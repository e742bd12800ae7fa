// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Open Packaging Conventions parts: content types and relationships

use super::xml::{attribute_map, write_empty, xml_writer};
use crate::error::{ModelError, Result};
use crate::model::Attachment;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Reader;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const MODEL_PART: &str = "3D/3dmodel.model";

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";
pub const MODEL_RELATIONSHIP: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";
pub const THUMBNAIL_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// Parsed `[Content_Types].xml`
#[derive(Debug, Default)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(content: &str) -> Result<Self> {
        let mut types = Self::default();
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                    let attrs = attribute_map(e)?;
                    match e.local_name().as_ref() {
                        b"Default" => {
                            let ext = attrs.get("Extension");
                            if let (Some(ext), Some(ct)) = (ext, attrs.get("ContentType")) {
                                types.defaults.push((ext.to_ascii_lowercase(), ct.to_string()));
                            }
                        }
                        b"Override" => {
                            let part = attrs.get("PartName");
                            if let (Some(part), Some(ct)) = (part, attrs.get("ContentType")) {
                                types.overrides.push((normalize_part_name(part), ct.to_string()));
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ModelError::malformed(CONTENT_TYPES_PART, e.to_string())),
                _ => {}
            }
        }
        Ok(types)
    }

    /// Content type of a part, overrides first
    pub fn content_type_for(&self, part: &str) -> Option<&str> {
        let part = normalize_part_name(part);
        if let Some((_, ct)) = self
            .overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&part))
        {
            return Some(ct);
        }
        let ext = extension_of(&part)?;
        self.defaults
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, ct)| ct.as_str())
    }
}

/// One package relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub target: String,
    pub rel_type: String,
}

pub fn parse_relationships(content: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e) | Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let attrs = attribute_map(e)?;
                let (Some(target), Some(rel_type)) = (attrs.get("Target"), attrs.get("Type")) else {
                    return Err(ModelError::malformed(
                        PACKAGE_RELS_PART,
                        "relationship without Target or Type",
                    ));
                };
                relationships.push(Relationship {
                    id: attrs.get("Id").unwrap_or_default().to_string(),
                    target: normalize_part_name(target),
                    rel_type: rel_type.to_string(),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ModelError::malformed(PACKAGE_RELS_PART, e.to_string())),
            _ => {}
        }
    }
    Ok(relationships)
}

/// `[Content_Types].xml` for the model part plus every attachment
pub fn content_types_xml(attachments: &[Attachment]) -> Result<Vec<u8>> {
    let mut defaults: Vec<(String, &str)> = vec![
        ("rels".to_string(), RELS_CONTENT_TYPE),
        ("model".to_string(), MODEL_CONTENT_TYPE),
    ];
    let mut overrides: Vec<(&str, &str)> = Vec::new();

    for attachment in attachments {
        let content_type = attachment.content_type.as_str();
        let Some(ext) = extension_of(&attachment.path) else {
            overrides.push((attachment.path.as_str(), content_type));
            continue;
        };
        let registered = defaults.iter().find(|(e, _)| *e == ext).map(|(_, ct)| *ct);
        match registered {
            Some(ct) if ct == content_type => {}
            Some(_) => overrides.push((attachment.path.as_str(), content_type)),
            None => defaults.push((ext, content_type)),
        }
    }

    let mut writer = xml_writer();
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut types = BytesStart::new("Types");
    types.push_attribute(("xmlns", CONTENT_TYPES_NS));
    writer.write_event(Event::Start(types))?;

    for (ext, ct) in &defaults {
        write_empty(&mut writer, "Default", &[("Extension", ext.as_str()), ("ContentType", *ct)])?;
    }
    for (path, ct) in &overrides {
        let part_name = format!("/{path}");
        write_empty(
            &mut writer,
            "Override",
            &[("PartName", part_name.as_str()), ("ContentType", *ct)],
        )?;
    }

    writer.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(writer.into_inner().into_inner())
}

/// `_rels/.rels`: the model part first, then attachment relationships
pub fn package_relationships_xml(attachments: &[Attachment]) -> Result<Vec<u8>> {
    let mut writer = xml_writer();
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NS));
    writer.write_event(Event::Start(root))?;

    let model_target = format!("/{MODEL_PART}");
    write_empty(
        &mut writer,
        "Relationship",
        &[
            ("Target", model_target.as_str()),
            ("Id", "rel0"),
            ("Type", MODEL_RELATIONSHIP),
        ],
    )?;

    let related = attachments
        .iter()
        .filter_map(|a| a.relationship_type.as_deref().map(|t| (a, t)));
    for (index, (attachment, rel_type)) in related.enumerate() {
        let target = format!("/{}", attachment.path);
        let id = format!("rel{}", index + 1);
        write_empty(
            &mut writer,
            "Relationship",
            &[("Target", target.as_str()), ("Id", id.as_str()), ("Type", rel_type)],
        )?;
    }

    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(writer.into_inner().into_inner())
}

/// Strip the leading slash of an absolute part name
pub fn normalize_part_name(name: &str) -> String {
    name.trim().trim_start_matches('/').to_string()
}

fn extension_of(part: &str) -> Option<String> {
    let file = part.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumbnail() -> Attachment {
        Attachment {
            path: "Metadata/thumbnail.png".to_string(),
            content_type: "image/png".to_string(),
            relationship_type: Some(THUMBNAIL_RELATIONSHIP.to_string()),
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_content_types_roundtrip() {
        let bytes = content_types_xml(&[thumbnail()]).unwrap();
        let types = ContentTypes::parse(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(types.content_type_for("/3D/3dmodel.model"), Some(MODEL_CONTENT_TYPE));
        assert_eq!(types.content_type_for("Metadata/thumbnail.png"), Some("image/png"));
        assert_eq!(types.content_type_for("data.bin"), None);
    }

    #[test]
    fn test_relationships_roundtrip() {
        let bytes = package_relationships_xml(&[thumbnail()]).unwrap();
        let rels = parse_relationships(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].target, MODEL_PART);
        assert_eq!(rels[0].rel_type, MODEL_RELATIONSHIP);
        assert_eq!(rels[1].target, "Metadata/thumbnail.png");
    }

    #[test]
    fn test_extension_conflict_becomes_override() {
        let odd = Attachment {
            path: "Metadata/notes.model".to_string(),
            content_type: "text/plain".to_string(),
            relationship_type: None,
            data: Vec::new(),
        };
        let bytes = content_types_xml(&[odd]).unwrap();
        let types = ContentTypes::parse(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(types.content_type_for("Metadata/notes.model"), Some("text/plain"));
        assert_eq!(types.content_type_for("3D/3dmodel.model"), Some(MODEL_CONTENT_TYPE));
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Small helpers over quick-xml shared by the package parts

use crate::error::{ModelError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Writer;
use std::fmt::Display;
use std::io::{Cursor, Write};
use std::str::FromStr;

/// Attributes of one element, keyed by local name
#[derive(Debug, Default)]
pub struct Attrs {
    entries: Vec<(String, String)>,
}

impl Attrs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn required(&self, name: &str, element: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ModelError::malformed(element, format!("missing attribute '{name}'")))
    }

    /// Parse an optional attribute; a present but unparsable value is an error
    pub fn parse<T>(&self, name: &str, element: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(name)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    ModelError::malformed(element, format!("attribute {name}=\"{raw}\": {e}"))
                })
            })
            .transpose()
    }

    pub fn parse_required<T>(&self, name: &str, element: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.parse(name, element)?
            .ok_or_else(|| ModelError::malformed(element, format!("missing attribute '{name}'")))
    }

    /// Finite floating point attribute
    pub fn coordinate(&self, name: &str, element: &str) -> Result<f64> {
        let value: f64 = self.parse_required(name, element)?;
        if !value.is_finite() {
            return Err(ModelError::malformed(
                element,
                format!("attribute {name} is not finite"),
            ));
        }
        Ok(value)
    }
}

pub fn attribute_map(element: &BytesStart<'_>) -> Result<Attrs> {
    let mut attrs = Attrs::default();
    for attr in element.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.local_name().as_ref())
            .map_err(|e| ModelError::malformed("attribute name", e.to_string()))?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        attrs.entries.push((key, value));
    }
    Ok(attrs)
}

pub fn xml_writer() -> Writer<Cursor<Vec<u8>>> {
    Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
}

/// Write `<name a="..." .../>`
pub fn write_empty<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &[(&str, &str)],
) -> Result<()> {
    let mut element = BytesStart::new(name);
    for &(key, value) in attributes {
        element.push_attribute((key, value));
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;

    fn first_element(xml: &str) -> Attrs {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => return attribute_map(&e).unwrap(),
                Event::Eof => panic!("no element"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_attribute_lookup_by_local_name() {
        let attrs = first_element(r#"<b:beam xmlns:b="urn:x" b:v1="3" v2="4" r1="0.5"/>"#);
        assert_eq!(attrs.get("v1"), Some("3"));
        assert_eq!(attrs.parse::<u32>("v2", "beam").unwrap(), Some(4));
        assert_eq!(attrs.parse::<f64>("r2", "beam").unwrap(), None);
        assert!(attrs.required("cap1", "beam").is_err());
    }

    #[test]
    fn test_unparsable_and_non_finite_values() {
        let attrs = first_element(r#"<vertex x="1.5" y="abc" z="NaN"/>"#);
        assert_eq!(attrs.coordinate("x", "vertex").unwrap(), 1.5);
        assert!(matches!(
            attrs.coordinate("y", "vertex"),
            Err(ModelError::MalformedDocument { .. })
        ));
        assert!(attrs.coordinate("z", "vertex").is_err());
    }

    #[test]
    fn test_escaped_values_are_decoded() {
        let attrs = first_element(r#"<metadata name="Title" value="A &amp; B"/>"#);
        assert_eq!(attrs.get("value"), Some("A & B"));
    }
}

//! XML helpers on top of quick-xml.
//!
//! Models are written as a root element whose fields are child elements.
//! Bodies that carry fields as root attributes are rewritten to that form
//! by [`attributes_to_elements`] before deserializing.
//!
//! quick-xml binds elements by their local name, so `OS-FLV-EXT-DATA:ephemeral`
//! is seen as `ephemeral`. [`read_shape`] reports local names for the same
//! reason, and models with prefixed wire names declare a serde `alias` for
//! the local part.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Root element name plus the local names of its attributes and direct children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlShape {
    pub root: String,
    pub fields: Vec<String>,
}

/// Local part of a possibly prefixed name.
///
/// ```
/// use cloudcafe::marshalling::xml::local_name;
///
/// assert_eq!(local_name("OS-FLV-EXT-DATA:ephemeral"), "ephemeral");
/// assert_eq!(local_name("ram"), "ram");
/// ```
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Serializes `value` under `root`, prefixed with an XML declaration.
pub fn to_xml<S: Serialize>(root: &str, value: &S) -> Result<String, quick_xml::DeError> {
    let body = quick_xml::se::to_string_with_root(root, value)?;
    Ok(format!("{}{}", XML_DECLARATION, body))
}

pub fn from_xml<D: DeserializeOwned>(body: &str) -> Result<D, quick_xml::DeError> {
    quick_xml::de::from_str(body)
}

fn is_namespace_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

fn qualified_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn element_name(element: &BytesStart<'_>) -> String {
    local_name(&qualified_name(element)).to_string()
}

fn attribute_names(element: &BytesStart<'_>) -> Vec<String> {
    element
        .attributes()
        .filter_map(|attr| attr.ok())
        .map(|attr| String::from_utf8_lossy(attr.key.as_ref()).into_owned())
        .filter(|key| !is_namespace_declaration(key))
        .map(|key| local_name(&key).to_string())
        .collect()
}

/// Reads the root element and its first-level field names.
///
/// Returns `Ok(None)` when the body has no root element.
pub fn read_shape(body: &str) -> Result<Option<XmlShape>, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut shape: Option<XmlShape> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                match depth {
                    0 => {
                        shape = Some(XmlShape {
                            root: element_name(&element),
                            fields: attribute_names(&element),
                        })
                    }
                    1 => push_field(&mut shape, element_name(&element)),
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(element) => match depth {
                0 => {
                    shape = Some(XmlShape {
                        root: element_name(&element),
                        fields: attribute_names(&element),
                    })
                }
                1 => push_field(&mut shape, element_name(&element)),
                _ => {}
            },
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shape)
}

fn push_field(shape: &mut Option<XmlShape>, name: String) {
    if let Some(shape) = shape {
        if !shape.fields.contains(&name) {
            shape.fields.push(name);
        }
    }
}

/// Rewrites attributes of the root element as leading child elements.
///
/// `<flavor id="1" ram="512"/>` becomes
/// `<flavor><id>1</id><ram>512</ram></flavor>`. Namespace declarations stay
/// on the root and nested elements are copied unchanged.
pub fn attributes_to_elements(body: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(element) if depth == 0 => {
                write_root(&mut writer, &element)?;
                depth += 1;
            }
            Event::Empty(element) if depth == 0 => {
                let root = write_root(&mut writer, &element)?;
                writer.write_event(Event::End(BytesEnd::new(root)))?;
            }
            Event::Start(element) => {
                depth += 1;
                writer.write_event(Event::Start(element))?;
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(element))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Writes the opening root tag followed by one child per attribute.
/// Returns the root name for the matching end tag.
fn write_root(writer: &mut Writer<Vec<u8>>, element: &BytesStart<'_>) -> Result<String, quick_xml::Error> {
    let root = qualified_name(element);
    let mut start = BytesStart::new(root.clone());
    let mut children = Vec::new();

    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if is_namespace_declaration(&key) {
            start.push_attribute(attr);
        } else {
            children.push((key, attr.unescape_value()?.into_owned()));
        }
    }

    writer.write_event(Event::Start(start))?;
    for (key, value) in &children {
        writer.write_event(Event::Start(BytesStart::new(key.as_str())))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(key.as_str())))?;
    }

    Ok(root)
}

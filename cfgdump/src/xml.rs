//! Minimal XML element tree used to build and read dump documents.
//!
//! Documents are assembled as plain [`Element`] values and serialized with
//! `quick-xml`. The same tree type is produced by [`parse_document`], which
//! lets callers (the project collector, tests) read XML back without a
//! second data model.

use std::collections::BTreeMap;

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::{Error, Result};

const DECLARATION: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Namespace declarations carried by every metadata object document.
pub const METADATA_NAMESPACES: &[(&str, &str)] = &[
    ("xmlns", "http://v8.1c.ru/8.3/MDClasses"),
    ("xmlns:app", "http://v8.1c.ru/8.2/managed-application/core"),
    ("xmlns:cfg", "http://v8.1c.ru/8.1/data/enterprise/current-config"),
    ("xmlns:cmi", "http://v8.1c.ru/8.2/managed-application/cmi"),
    ("xmlns:ent", "http://v8.1c.ru/8.1/data/enterprise"),
    ("xmlns:lf", "http://v8.1c.ru/8.2/managed-application/logform"),
    ("xmlns:style", "http://v8.1c.ru/8.1/data/ui/style"),
    ("xmlns:sys", "http://v8.1c.ru/8.1/data/ui/fonts/system"),
    ("xmlns:v8", "http://v8.1c.ru/8.1/data/core"),
    ("xmlns:v8ui", "http://v8.1c.ru/8.1/data/ui"),
    ("xmlns:web", "http://v8.1c.ru/8.1/data/ui/colors/web"),
    ("xmlns:win", "http://v8.1c.ru/8.1/data/ui/colors/windows"),
    ("xmlns:xen", "http://v8.1c.ru/8.3/xcf/enums"),
    ("xmlns:xpr", "http://v8.1c.ru/8.3/xcf/predef"),
    ("xmlns:xr", "http://v8.1c.ru/8.3/xcf/readable"),
    ("xmlns:xs", "http://www.w3.org/2001/XMLSchema"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

/// A single XML element with ordered attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name, e.g. `v8:Type`.
    pub name: String,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Text content; `None` renders as an empty element.
    pub text: Option<String>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Sets an attribute, replacing an existing value with the same key.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Returns the value of an attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Appends an empty child and returns it for further filling.
    pub fn append(&mut self, name: impl Into<String>) -> &mut Element {
        self.children.push(Element::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends a child holding `text`. Empty text yields an empty element.
    pub fn append_text(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Element {
        let text = text.into();
        let child = self.append(name);
        if !text.is_empty() {
            child.text = Some(text);
        }
        child
    }

    /// Appends an already built child.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content, or `""` when there is none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Text of the first child named `name`, or `""`.
    pub fn child_text(&self, name: &str) -> &str {
        self.child(name).map(Element::text).unwrap_or("")
    }

    /// Depth-first search for every descendant with the given name.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            found.extend(child.find_all(name));
        }
        found
    }
}

/// A complete XML document with a single root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Creates a `MetaDataObject` document with the standard namespaces.
    pub fn metadata_object(format_version: &str) -> Self {
        let mut root = Element::new("MetaDataObject");
        for (key, value) in METADATA_NAMESPACES {
            root.set_attr(*key, *value);
        }
        root.set_attr("version", format_version);
        Self::new(root)
    }

    /// Serializes the document as tab-indented UTF-8 text.
    pub fn render(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        writer.get_mut().extend_from_slice(DECLARATION);
        write_element(&mut writer, &self.root).map_err(Error::Render)?;
        let mut buf = writer.into_inner();
        buf.push(b'\n');
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &Element) -> std::io::Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text.is_none() && element.children.is_empty() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))
}

/// Parses XML text into an element tree.
///
/// Comments, processing instructions and the declaration are skipped.
/// Text is kept verbatim, except that whitespace-only text of an element
/// with children (indentation) is dropped.
pub fn parse_document(input: &str) -> Result<Document> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from(&start)?),
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| Error::Malformed("closing tag without opening tag".into()))?;
                if !element.children.is_empty()
                    && element.text.as_deref().is_some_and(|t| t.trim().is_empty())
                {
                    element.text = None;
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(quick_xml::Error::from)?;
                push_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::Malformed(format!(
            "unexpected end of input inside <{}>",
            stack[stack.len() - 1].name
        )));
    }
    root.map(Document::new)
        .ok_or_else(|| Error::Malformed("document has no root element".into()))
}

fn element_from(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(Error::Malformed(format!(
                "second root element <{}>",
                element.name
            )));
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.text.get_or_insert_with(String::new).push_str(text);
    }
}

/// Writes a language-code map as `v8:item` entries under `parent`.
///
/// Entries come out in ascending language-code order.
pub fn write_localized(parent: &mut Element, value: &BTreeMap<String, String>) {
    for (lang, content) in value {
        let item = parent.append("v8:item");
        item.append_text("v8:lang", lang.as_str());
        item.append_text("v8:content", content.as_str());
    }
}

/// Reads `v8:item` entries written by [`write_localized`].
pub fn read_localized(element: &Element) -> BTreeMap<String, String> {
    element
        .children_named("v8:item")
        .map(|item| {
            (
                item.child_text("v8:lang").to_string(),
                item.child_text("v8:content").to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_and_text_elements() {
        let mut root = Element::new("Properties");
        root.append_text("Name", "Goods");
        root.append_text("Comment", "");

        let out = Document::new(root).render().unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(out.contains("<Name>Goods</Name>"));
        assert!(out.contains("<Comment/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut root = Element::new("Root");
        root.append_text("Comment", "a < b & c");
        let out = Document::new(root.clone()).render().unwrap();
        assert!(out.contains("a &lt; b &amp; c"));

        let parsed = parse_document(&out).unwrap();
        assert_eq!(parsed.root, root);
    }

    #[test]
    fn test_parse_attributes_and_nesting() {
        let doc = parse_document(
            r#"<?xml version="1.0"?>
            <!-- project -->
            <catalog>
                <id>Goods</id>
                <properties>
                    <property id="Title" version="v1"><type id="std::string" length="150"/></property>
                </properties>
            </catalog>"#,
        )
        .unwrap();

        assert_eq!(doc.root.name, "catalog");
        assert_eq!(doc.root.child_text("id"), "Goods");
        let property = doc.root.child("properties").unwrap().child("property").unwrap();
        assert_eq!(property.attr("id"), Some("Title"));
        assert_eq!(property.attr("version"), Some("v1"));
        assert_eq!(property.child("type").unwrap().attr("length"), Some("150"));
    }

    #[test]
    fn test_parse_rejects_truncated_input() {
        assert!(parse_document("<a><b>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_localized_round_trip() {
        let mut value = BTreeMap::new();
        value.insert("ru".to_string(), "Элемент".to_string());
        value.insert("en".to_string(), "Item".to_string());

        let mut synonym = Element::new("Synonym");
        write_localized(&mut synonym, &value);
        let text = Document::new(synonym).render().unwrap();

        let parsed = parse_document(&text).unwrap();
        assert_eq!(read_localized(&parsed.root), value);
    }

    #[test]
    fn test_padded_text_survives_round_trip() {
        let mut value = BTreeMap::new();
        value.insert("en".to_string(), " Item ".to_string());
        value.insert("ru".to_string(), "\tЭлемент\n".to_string());

        let mut synonym = Element::new("Synonym");
        write_localized(&mut synonym, &value);
        let text = Document::new(synonym).render().unwrap();

        let parsed = parse_document(&text).unwrap();
        assert_eq!(read_localized(&parsed.root), value);
    }

    #[test]
    fn test_indentation_is_not_text() {
        let root = parse_document("<a>\n  <b> x </b>\n  <c>   </c>\n</a>")
            .unwrap()
            .root;
        assert_eq!(root.text, None);
        assert_eq!(root.child_text("b"), " x ");
        assert_eq!(root.child_text("c"), "   ");
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut el = Element::new("x").with_attr("uuid", "a");
        el.set_attr("uuid", "b");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.attr("uuid"), Some("b"));
    }
}

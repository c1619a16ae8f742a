//! # Owned XML Tree
//!
//! METS and PAGE documents are small enough to hold in memory, and every
//! operation on them is a read-modify-write cycle. This module gives them a
//! plain owned tree:
//!
//! - [`Element`] keeps the qualified name as written (`mets:file`) together
//!   with the resolved namespace URI, so lookups go by `(namespace, local name)`
//!   while serialization reproduces the original prefixes.
//! - Namespace declarations (`xmlns`, `xmlns:*`) stay ordinary attributes.
//! - Whitespace-only text is dropped on parse; [`XmlDocument::to_xml_string`]
//!   re-indents with two spaces.
//!
//! Parsing uses `quick_xml::NsReader`.

use quick_xml::{
    NsReader,
    escape::{escape, partial_escape},
    events::{BytesStart, Event},
    name::ResolveResult,
};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("Document has no root element")]
    NoRoot,
    #[error("Unexpected closing tag")]
    UnbalancedEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

impl Element {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Whether this element is `{namespace}local`.
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    /// Value of an attribute without namespace, e.g. `ID` or `USE`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attr_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name() == local)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.name == name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                namespace: None,
                value,
            }),
        }
    }

    /// Set a namespaced attribute. `qualified` is used when the attribute is new.
    pub fn set_attr_ns(&mut self, namespace: &str, qualified: &str, value: impl Into<String>) {
        let value = value.into();
        let local = local_part(qualified);
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name() == local)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: qualified.to_string(),
                namespace: Some(namespace.to_string()),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes
            .retain(|a| !(a.namespace.is_none() && a.name == name));
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    /// First child `{namespace}local`.
    pub fn find(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, local))
    }

    pub fn find_mut(&mut self, namespace: &str, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(namespace, local))
    }

    /// All children `{namespace}local`.
    pub fn find_all<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(namespace, local))
    }

    /// Descendants in document order, not including `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        for child in self.elements() {
            out.push(child);
            child.collect_descendants(out);
        }
    }

    /// First descendant (document order) satisfying `pred`.
    pub fn find_descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_descendant_mut(
        &mut self,
        pred: &dyn Fn(&Element) -> bool,
    ) -> Option<&mut Element> {
        for child in self.elements_mut() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all direct text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|n| !matches!(n, Node::Text(_)));
        self.children.insert(0, Node::Text(text.into()));
    }

    /// Append a child element and return it.
    pub fn append(&mut self, child: Element) -> &mut Element {
        let index = self.children.len();
        self.insert(index, child)
    }

    /// Insert a child element at `index` (among all child nodes) and return it.
    pub fn insert(&mut self, index: usize, child: Element) -> &mut Element {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
        self.element_at_mut(index)
    }

    /// First child element satisfying `pred`, appending `make()` if there is none.
    pub fn get_or_append(
        &mut self,
        pred: impl Fn(&Element) -> bool,
        make: impl FnOnce() -> Element,
    ) -> &mut Element {
        let found = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if pred(e)));
        match found {
            Some(index) => self.element_at_mut(index),
            None => self.append(make()),
        }
    }

    fn element_at_mut(&mut self, index: usize) -> &mut Element {
        match &mut self.children[index] {
            Node::Element(e) => e,
            _ => unreachable!("child {index} is not an element"),
        }
    }

    /// Remove child elements matching `pred`; returns how many were removed.
    pub fn remove_elements(&mut self, pred: impl Fn(&Element) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if pred(e)));
        before - self.children.len()
    }

    /// Index among child nodes of the last child `{namespace}local`.
    pub fn position_of_last(&self, namespace: &str, local: &str) -> Option<usize> {
        self.children
            .iter()
            .rposition(|n| matches!(n, Node::Element(e) if e.is(namespace, local)))
    }

    /// Prefix bound to `namespace` by an `xmlns:*` declaration on this element.
    /// `Some("")` means the namespace is the default namespace.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.attributes.iter().find_map(|a| {
            if a.value != namespace {
                return None;
            }
            if a.name == "xmlns" {
                Some("")
            } else {
                a.name.strip_prefix("xmlns:")
            }
        })
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", attr.name, escape(attr.value.as_str()));
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        if let [Node::Text(text)] = self.children.as_slice() {
            let _ = writeln!(out, ">{}</{}>", partial_escape(text.as_str()), self.name);
            return;
        }
        out.push_str(">\n");
        let inner = "  ".repeat(depth + 1);
        for child in &self.children {
            match child {
                Node::Element(e) => e.write(out, depth + 1),
                Node::Text(t) => {
                    let _ = writeln!(out, "{inner}{}", partial_escape(t.as_str()));
                }
                Node::Comment(c) => {
                    let _ = writeln!(out, "{inner}<!--{c}-->");
                }
            }
        }
        let _ = writeln!(out, "{indent}</{}>", self.name);
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: Element,
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = NsReader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            let ns = namespace_uri(&ns);
            match event {
                Event::Start(start) => {
                    let el = element_from_start(&reader, ns.as_deref(), &start)?;
                    stack.push(el);
                }
                Event::Empty(start) => {
                    let el = element_from_start(&reader, ns.as_deref(), &start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None => root = Some(el),
                    }
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or(XmlError::UnbalancedEnd)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None => root = Some(el),
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if let Some(parent) = stack.last_mut()
                        && !text.trim().is_empty()
                    {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Text(String::from_utf8_lossy(&data).into_owned()));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Comment(String::from_utf8_lossy(&comment).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.map(XmlDocument::new).ok_or(XmlError::NoRoot)
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.root.write(&mut out, 0);
        out
    }

    /// Qualified name for a new element in `namespace`, reusing the prefix the
    /// root declares for it. Declares `preferred_prefix` on the root if the
    /// namespace is not declared yet.
    pub fn qualified_name(&mut self, namespace: &str, preferred_prefix: &str, local: &str) -> String {
        match self.root.prefix_for(namespace) {
            Some("") => local.to_string(),
            Some(prefix) => format!("{prefix}:{local}"),
            None => {
                self.root
                    .set_attr(&format!("xmlns:{preferred_prefix}"), namespace);
                format!("{preferred_prefix}:{local}")
            }
        }
    }

    /// New empty element in `namespace` with a prefix valid for this document.
    pub fn create_element(&mut self, namespace: &str, preferred_prefix: &str, local: &str) -> Element {
        let name = self.qualified_name(namespace, preferred_prefix, local);
        Element::new(name, Some(namespace))
    }
}

fn element_from_start(
    reader: &NsReader<&[u8]>,
    namespace: Option<&str>,
    start: &BytesStart<'_>,
) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut el = Element::new(name, namespace);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let attr_name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let namespace = if attr_name == "xmlns" || attr_name.starts_with("xmlns:") {
            None
        } else {
            let (resolved, _) = reader.resolve_attribute(attr.key);
            namespace_uri(&resolved)
        };
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push(Attribute {
            name: attr_name,
            namespace,
            value,
        });
    }
    Ok(el)
}

fn namespace_uri(ns: &ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

/// Re-indent an XML string the way `xmllint --format` does.
pub fn xmllint_format(xml: &str) -> Result<String, XmlError> {
    Ok(XmlDocument::parse(xml)?.to_xml_string())
}

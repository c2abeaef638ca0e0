//! XML reading and writing helpers.
//!
//! Messages are written with [`XmlWriter`], a minimal element writer that
//! escapes text and attribute values and honours the configured attribute
//! quote character. Incoming documents are parsed with `roxmltree`, which
//! refuses DTDs and therefore entity expansion.

use quick_xml::escape::escape;
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{SamlError, SamlResult};

/// Parses a document. DTDs are rejected.
///
/// # Errors
///
/// Returns [`SamlError::XmlParse`] for malformed XML or a DTD.
pub fn parse(xml: &str) -> SamlResult<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: false,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(xml, options)?)
}

/// Returns true if the node is an element with the given namespace and
/// local name.
#[must_use]
pub fn is_element(node: Node<'_, '_>, ns: &str, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(ns)
}

/// Returns the first child element with the given name.
#[must_use]
pub fn child<'a, 'input>(node: Node<'a, 'input>, ns: &str, local: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_element(*c, ns, local))
}

/// Returns all child elements with the given name, in document order.
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |c| is_element(*c, ns, local))
}

/// Returns the first descendant element (the node itself included) with
/// the given name.
#[must_use]
pub fn descendant<'a, 'input>(
    node: Node<'a, 'input>,
    ns: &str,
    local: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants().find(|c| is_element(*c, ns, local))
}

/// Concatenates the direct text children of an element.
///
/// Returns `None` for a missing node or an element without text.
#[must_use]
pub fn element_text(node: Option<Node<'_, '_>>) -> Option<String> {
    let node = node?;
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Attribute quote character of written documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    /// `name='value'`
    #[default]
    Single,
    /// `name="value"`
    Double,
}

impl Quote {
    /// Picks the quote from the `double_quote_xml_attribute_values` setting.
    #[must_use]
    pub const fn from_setting(double: bool) -> Self {
        if double {
            Self::Double
        } else {
            Self::Single
        }
    }

    const fn char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// Minimal XML element writer.
///
/// Attributes given as `None` are skipped, so optional attributes can be
/// passed straight from settings.
#[derive(Debug)]
pub struct XmlWriter {
    out: String,
    quote: Quote,
}

impl XmlWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new(quote: Quote) -> Self {
        Self {
            out: String::new(),
            quote,
        }
    }

    /// Writes the `<?xml ...?>` declaration.
    pub fn declaration(&mut self) {
        let q = self.quote.char();
        self.out
            .push_str(&format!("<?xml version={q}1.0{q} encoding={q}UTF-8{q}?>"));
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, Option<&str>)]) {
        let q = self.quote.char();
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            if let Some(value) = value {
                self.out.push(' ');
                self.out.push_str(key);
                self.out.push('=');
                self.out.push(q);
                self.out.push_str(&escape(*value));
                self.out.push(q);
            }
        }
    }

    /// Opens an element.
    pub fn open(&mut self, name: &str, attrs: &[(&str, Option<&str>)]) {
        self.start_tag(name, attrs);
        self.out.push('>');
    }

    /// Writes an element without content.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, Option<&str>)]) {
        self.start_tag(name, attrs);
        self.out.push_str("/>");
    }

    /// Writes an element holding only text.
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, Option<&str>)], text: &str) {
        self.open(name, attrs);
        self.out.push_str(&escape(text));
        self.close(name);
    }

    /// Appends an already serialized fragment.
    pub fn raw(&mut self, fragment: &str) {
        self.out.push_str(fragment);
    }

    /// Closes an element.
    pub fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    /// Returns the written document.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}

//! Exclusive XML canonicalization (`xml-exc-c14n#`).
//!
//! Works on a parsed `roxmltree` document so an element can be
//! canonicalized in place, with an optional subtree left out for the
//! enveloped-signature transform. A namespace declaration is emitted only
//! on the elements that visibly use its prefix and only when the nearest
//! output ancestor has not already declared it with the same URI.
//! Namespace declarations come first, sorted by prefix; attributes follow,
//! sorted by namespace URI then local name.

use std::collections::BTreeMap;

use roxmltree::{Node, NodeId};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix to URI map of the declarations already rendered by output
/// ancestors. The default namespace has the empty prefix.
type Rendered = BTreeMap<String, String>;

/// Canonicalizes `apex` and its descendants.
///
/// `source` is the text the document was parsed from; element prefixes are
/// read from it. `exclude` names a subtree to leave out.
pub(crate) fn canonicalize(
    source: &str,
    apex: Node<'_, '_>,
    exclude: Option<NodeId>,
    with_comments: bool,
) -> String {
    let mut out = String::with_capacity(source.len());
    let writer = Writer {
        source,
        exclude,
        with_comments,
    };
    writer.node(&mut out, apex, &Rendered::new());
    out
}

struct Writer<'s> {
    source: &'s str,
    exclude: Option<NodeId>,
    with_comments: bool,
}

struct Attribute {
    uri: String,
    local: String,
    prefix: String,
    value: String,
}

impl Writer<'_> {
    fn node(&self, out: &mut String, node: Node<'_, '_>, rendered: &Rendered) {
        if Some(node.id()) == self.exclude {
            return;
        }
        if node.is_element() {
            self.element(out, node, rendered);
        } else if node.is_text() {
            escape_text(out, node.text().unwrap_or_default());
        } else if node.is_comment() {
            if self.with_comments {
                out.push_str("<!--");
                out.push_str(node.text().unwrap_or_default());
                out.push_str("-->");
            }
        } else if let Some(pi) = node.pi() {
            out.push_str("<?");
            out.push_str(pi.target);
            if let Some(value) = pi.value {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("?>");
        }
    }

    fn element(&self, out: &mut String, node: Node<'_, '_>, rendered: &Rendered) {
        let qname = self.qname(node);
        let prefix = qname.split_once(':').map_or("", |(prefix, _)| prefix);

        let mut used = vec![(
            prefix.to_string(),
            node.tag_name().namespace().unwrap_or_default().to_string(),
        )];
        let mut attributes = Vec::new();
        for attr in node.attributes() {
            let uri = attr.namespace().unwrap_or_default().to_string();
            let attr_prefix = if uri.is_empty() {
                String::new()
            } else if uri == XML_NS {
                "xml".to_string()
            } else {
                let prefix = prefix_for(node, &uri);
                used.push((prefix.clone(), uri.clone()));
                prefix
            };
            attributes.push(Attribute {
                uri,
                local: attr.name().to_string(),
                prefix: attr_prefix,
                value: attr.value().to_string(),
            });
        }

        let mut scope = rendered.clone();
        let mut declarations: Vec<(String, String)> = Vec::new();
        for (prefix, uri) in used {
            let already = rendered.get(&prefix).map_or("", String::as_str);
            if already == uri || declarations.iter().any(|(p, _)| *p == prefix) {
                continue;
            }
            scope.insert(prefix.clone(), uri.clone());
            declarations.push((prefix, uri));
        }
        declarations.sort_unstable();
        attributes.sort_unstable_by(|a, b| (&a.uri, &a.local).cmp(&(&b.uri, &b.local)));

        out.push('<');
        out.push_str(qname);
        for (prefix, uri) in &declarations {
            if prefix.is_empty() {
                out.push_str(" xmlns=\"");
            } else {
                out.push_str(" xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
            }
            escape_attribute(out, uri);
            out.push('"');
        }
        for attr in &attributes {
            out.push(' ');
            if !attr.prefix.is_empty() {
                out.push_str(&attr.prefix);
                out.push(':');
            }
            out.push_str(&attr.local);
            out.push_str("=\"");
            escape_attribute(out, &attr.value);
            out.push('"');
        }
        out.push('>');
        for child in node.children() {
            self.node(out, child, &scope);
        }
        out.push_str("</");
        out.push_str(qname);
        out.push('>');
    }

    /// The element name as written in the source.
    fn qname(&self, node: Node<'_, '_>) -> &str {
        let tag = &self.source[node.range().start + 1..];
        let end = tag
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(tag.len());
        &tag[..end]
    }
}

/// A prefix bound to `uri` in the scope of `node`.
fn prefix_for(node: Node<'_, '_>, uri: &str) -> String {
    node.namespaces()
        .filter(|ns| ns.uri() == uri)
        .find_map(|ns| ns.name())
        .unwrap_or_default()
        .to_string()
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

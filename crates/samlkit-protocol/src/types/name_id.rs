//! SAML Name ID types.

use roxmltree::Node;
use serde::{Deserialize, Serialize};

use super::NameIdFormat;
use crate::xml::{element_text, XmlWriter};

/// SAML Name ID, the identifier of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The identifier value.
    pub value: String,

    /// The format URI of the identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// Creates a transient name ID.
    #[must_use]
    pub fn transient(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Transient.uri())
    }

    /// Sets the format URI.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP name qualifier.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Reads a `saml:NameID` element. An element without text yields an
    /// empty value.
    #[must_use]
    pub fn from_node(node: Node<'_, '_>) -> Self {
        Self {
            value: element_text(Some(node)).unwrap_or_default(),
            format: node.attribute("Format").map(str::to_string),
            name_qualifier: node.attribute("NameQualifier").map(str::to_string),
            sp_name_qualifier: node.attribute("SPNameQualifier").map(str::to_string),
        }
    }

    /// Writes the `saml:NameID` element.
    pub fn write(&self, w: &mut XmlWriter) {
        w.text_element(
            "saml:NameID",
            &[
                ("NameQualifier", self.name_qualifier.as_deref()),
                ("SPNameQualifier", self.sp_name_qualifier.as_deref()),
                ("Format", self.format.as_deref()),
            ],
            &self.value,
        );
    }
}

/// Name ID policy of an authentication request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// The requested name ID format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Whether the IdP may create a new identifier.
    #[serde(default)]
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Writes the `samlp:NameIDPolicy` element.
    pub fn write(&self, w: &mut XmlWriter) {
        w.empty(
            "samlp:NameIDPolicy",
            &[
                ("AllowCreate", self.allow_create.then_some("true")),
                ("Format", self.format.as_deref()),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::constants::SAML_NS;
    use crate::xml::{parse, Quote};

    #[test]
    fn transient_format() {
        let name_id = NameId::transient("_abc");
        assert_eq!(name_id.format.as_deref(), Some(NameIdFormat::Transient.uri()));
    }

    #[test]
    fn reads_qualifiers() {
        let xml = format!(
            r#"<saml:NameID xmlns:saml="{SAML_NS}" NameQualifier="https://idp" SPNameQualifier="https://sp" Format="{}">user@example.com</saml:NameID>"#,
            NameIdFormat::Email.uri()
        );
        let doc = parse(&xml).unwrap();
        let name_id = NameId::from_node(doc.root_element());

        assert_eq!(name_id.value, "user@example.com");
        assert_eq!(name_id.name_qualifier.as_deref(), Some("https://idp"));
        assert_eq!(name_id.sp_name_qualifier.as_deref(), Some("https://sp"));
        assert_eq!(name_id.format.as_deref(), Some(NameIdFormat::Email.uri()));
    }

    #[test]
    fn writes_only_present_attributes() {
        let mut w = XmlWriter::new(Quote::Single);
        NameId::new("jdoe").with_sp_name_qualifier("sp").write(&mut w);
        assert_eq!(
            w.finish(),
            "<saml:NameID SPNameQualifier='sp'>jdoe</saml:NameID>"
        );
    }

    #[test]
    fn policy_allow_create() {
        let mut w = XmlWriter::new(Quote::Double);
        NameIdPolicy {
            format: Some(NameIdFormat::Persistent.uri().to_string()),
            allow_create: true,
        }
        .write(&mut w);
        assert_eq!(
            w.finish(),
            format!(
                r#"<samlp:NameIDPolicy AllowCreate="true" Format="{}"/>"#,
                NameIdFormat::Persistent.uri()
            )
        );
    }
}

//! SAML AuthnRequest message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::{BEARER_CONFIRMATION, SAMLP_NS, SAML_NS, SAML_VERSION};
use super::{NameId, NameIdPolicy};
use crate::utils::format_instant;
use crate::xml::{Quote, XmlWriter};

/// Authentication request sent by a service provider to an identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier of the request.
    pub id: String,

    /// When the request was issued.
    pub issue_instant: DateTime<Utc>,

    /// IdP SSO endpoint the request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Whether the IdP must not interact with the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_passive: Option<bool>,

    /// Binding the response should use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Index into the SP's attribute consuming services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_consuming_service_index: Option<u16>,

    /// Whether the IdP must re-authenticate the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_authn: Option<bool>,

    /// Where the response should be delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// The SP entity ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Subject the SP asks the IdP to authenticate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<NameId>,

    /// Name ID policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_authn_context: Option<RequestedAuthnContext>,
}

impl AuthnRequest {
    /// Creates a request with only the mandatory attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            issue_instant,
            destination: None,
            is_passive: None,
            protocol_binding: None,
            attribute_consuming_service_index: None,
            force_authn: None,
            assertion_consumer_service_url: None,
            issuer: None,
            subject: None,
            name_id_policy: None,
            requested_authn_context: None,
        }
    }

    /// Serialises the request.
    #[must_use]
    pub fn to_xml(&self, quote: Quote) -> String {
        let issue_instant = format_instant(self.issue_instant);
        let index = self.attribute_consuming_service_index.map(|i| i.to_string());

        let mut w = XmlWriter::new(quote);
        w.open(
            "samlp:AuthnRequest",
            &[
                ("xmlns:samlp", Some(SAMLP_NS)),
                ("xmlns:saml", Some(SAML_NS)),
                ("ID", Some(self.id.as_str())),
                ("Version", Some(SAML_VERSION)),
                ("IssueInstant", Some(issue_instant.as_str())),
                ("Destination", self.destination.as_deref()),
                ("IsPassive", self.is_passive.map(bool_str)),
                ("ProtocolBinding", self.protocol_binding.as_deref()),
                ("AttributeConsumingServiceIndex", index.as_deref()),
                ("ForceAuthn", self.force_authn.map(bool_str)),
                (
                    "AssertionConsumerServiceURL",
                    self.assertion_consumer_service_url.as_deref(),
                ),
            ],
        );
        if let Some(issuer) = &self.issuer {
            w.text_element("saml:Issuer", &[], issuer);
        }
        if let Some(subject) = &self.subject {
            w.open("saml:Subject", &[]);
            subject.write(&mut w);
            w.empty(
                "saml:SubjectConfirmation",
                &[("Method", Some(BEARER_CONFIRMATION))],
            );
            w.close("saml:Subject");
        }
        if let Some(policy) = &self.name_id_policy {
            policy.write(&mut w);
        }
        if let Some(context) = &self.requested_authn_context {
            context.write(&mut w);
        }
        w.close("samlp:AuthnRequest");
        w.finish()
    }
}

const fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAuthnContext {
    /// How the IdP compares the requested contexts.
    #[serde(default)]
    pub comparison: AuthnContextComparison,

    /// Authentication context class references.
    #[serde(default)]
    pub class_refs: Vec<String>,

    /// Authentication context declaration references.
    #[serde(default)]
    pub decl_refs: Vec<String>,
}

impl RequestedAuthnContext {
    fn write(&self, w: &mut XmlWriter) {
        w.open(
            "samlp:RequestedAuthnContext",
            &[("Comparison", Some(self.comparison.as_str()))],
        );
        for class_ref in &self.class_refs {
            w.text_element("saml:AuthnContextClassRef", &[], class_ref);
        }
        for decl_ref in &self.decl_refs {
            w.text_element("saml:AuthnContextDeclRef", &[], decl_ref);
        }
        w.close("samlp:RequestedAuthnContext");
    }
}

/// Comparison method for requested authentication contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// At least as strong as specified.
    Minimum,
    /// At most as strong as specified.
    Maximum,
    /// Stronger than specified.
    Better,
}

impl AuthnContextComparison {
    /// Returns the attribute value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }
}

//! Single Logout request and response messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::{SAMLP_NS, SAML_NS, SAML_VERSION};
use super::{NameId, Status};
use crate::utils::format_instant;
use crate::xml::{Quote, XmlWriter};

/// Request to terminate a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Unique identifier of the request.
    pub id: String,

    /// When the request was issued.
    pub issue_instant: DateTime<Utc>,

    /// Endpoint the request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Entity ID of the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Subject whose session ends.
    pub name_id: NameId,

    /// Session indexes to terminate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub session_indexes: Vec<String>,

    /// Time after which the request is no longer valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Reason for the logout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LogoutRequest {
    /// User initiated logout reason.
    pub const REASON_USER: &'static str = "urn:oasis:names:tc:SAML:2.0:logout:user";

    /// Creates a request for the given subject.
    #[must_use]
    pub fn new(id: impl Into<String>, issue_instant: DateTime<Utc>, name_id: NameId) -> Self {
        Self {
            id: id.into(),
            issue_instant,
            destination: None,
            issuer: None,
            name_id,
            session_indexes: Vec::new(),
            not_on_or_after: None,
            reason: None,
        }
    }

    /// Adds a session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Serialises the request.
    #[must_use]
    pub fn to_xml(&self, quote: Quote) -> String {
        let issue_instant = format_instant(self.issue_instant);
        let not_on_or_after = self.not_on_or_after.map(format_instant);

        let mut w = XmlWriter::new(quote);
        w.open(
            "samlp:LogoutRequest",
            &[
                ("xmlns:samlp", Some(SAMLP_NS)),
                ("xmlns:saml", Some(SAML_NS)),
                ("ID", Some(self.id.as_str())),
                ("Version", Some(SAML_VERSION)),
                ("IssueInstant", Some(issue_instant.as_str())),
                ("Destination", self.destination.as_deref()),
                ("NotOnOrAfter", not_on_or_after.as_deref()),
                ("Reason", self.reason.as_deref()),
            ],
        );
        if let Some(issuer) = &self.issuer {
            w.text_element("saml:Issuer", &[], issuer);
        }
        self.name_id.write(&mut w);
        for index in &self.session_indexes {
            w.text_element("samlp:SessionIndex", &[], index);
        }
        w.close("samlp:LogoutRequest");
        w.finish()
    }
}

/// Answer to a logout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Unique identifier of the response.
    pub id: String,

    /// When the response was issued.
    pub issue_instant: DateTime<Utc>,

    /// ID of the request being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// Endpoint the response is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Entity ID of the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Outcome of the logout.
    pub status: Status,
}

impl LogoutResponse {
    /// Creates a response with the given status.
    #[must_use]
    pub fn new(id: impl Into<String>, issue_instant: DateTime<Utc>, status: Status) -> Self {
        Self {
            id: id.into(),
            issue_instant,
            in_response_to: None,
            destination: None,
            issuer: None,
            status,
        }
    }

    /// Serialises the response.
    #[must_use]
    pub fn to_xml(&self, quote: Quote) -> String {
        let issue_instant = format_instant(self.issue_instant);

        let mut w = XmlWriter::new(quote);
        w.open(
            "samlp:LogoutResponse",
            &[
                ("xmlns:samlp", Some(SAMLP_NS)),
                ("xmlns:saml", Some(SAML_NS)),
                ("ID", Some(self.id.as_str())),
                ("Version", Some(SAML_VERSION)),
                ("IssueInstant", Some(issue_instant.as_str())),
                ("Destination", self.destination.as_deref()),
                ("InResponseTo", self.in_response_to.as_deref()),
            ],
        );
        if let Some(issuer) = &self.issuer {
            w.text_element("saml:Issuer", &[], issuer);
        }
        self.status.write(&mut w);
        w.close("samlp:LogoutResponse");
        w.finish()
    }
}

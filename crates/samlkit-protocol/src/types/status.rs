//! SAML status types.

use roxmltree::Node;
use serde::{Deserialize, Serialize};

use super::constants::{status_codes, SAMLP_NS};
use crate::xml::{child, element_text, XmlWriter};

/// Default message of a successful logout response.
pub const DEFAULT_LOGOUT_MESSAGE: &str = "Successfully Signed Out";

/// SAML Status element of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS)
    }

    /// Creates a status with the given top-level code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::new(code),
            status_message: None,
        }
    }

    /// Returns true if the top-level code is Success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Reads a `samlp:Status` element.
    #[must_use]
    pub fn from_node(node: Node<'_, '_>) -> Option<Self> {
        let status_code = StatusCode::from_node(child(node, SAMLP_NS, "StatusCode")?)?;
        Some(Self {
            status_code,
            status_message: element_text(child(node, SAMLP_NS, "StatusMessage")),
        })
    }

    /// Writes the `samlp:Status` element.
    pub fn write(&self, w: &mut XmlWriter) {
        w.open("samlp:Status", &[]);
        self.status_code.write(w);
        if let Some(message) = &self.status_message {
            w.text_element("samlp:StatusMessage", &[], message);
        }
        w.close("samlp:Status");
    }
}

/// SAML status code, optionally nesting a second-level code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// Status code URI.
    pub value: String,

    /// Nested second-level status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a status code.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            sub_status: None,
        }
    }

    /// Adds a second-level status code.
    #[must_use]
    pub fn with_sub_status(mut self, sub: Self) -> Self {
        self.sub_status = Some(Box::new(sub));
        self
    }

    /// Returns true if this is the Success code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the second-level code value, if any.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.sub_status.as_ref().map(|s| s.value.as_str())
    }

    fn from_node(node: Node<'_, '_>) -> Option<Self> {
        let value = node.attribute("Value")?.to_string();
        let sub_status = child(node, SAMLP_NS, "StatusCode")
            .and_then(Self::from_node)
            .map(Box::new);
        Some(Self { value, sub_status })
    }

    fn write(&self, w: &mut XmlWriter) {
        match &self.sub_status {
            None => w.empty("samlp:StatusCode", &[("Value", Some(self.value.as_str()))]),
            Some(sub) => {
                w.open("samlp:StatusCode", &[("Value", Some(self.value.as_str()))]);
                sub.write(w);
                w.close("samlp:StatusCode");
            }
        }
    }
}

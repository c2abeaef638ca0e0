//! Structural validation of protocol messages.
//!
//! Checks the parts of the SAML 2.0 protocol schema that matter for the
//! messages handled here: the root element, the required attributes and
//! their lexical form, and the order and multiplicity of the children in
//! the protocol and assertion namespaces. Content of `Extensions`,
//! `Signature` and assertions is not descended into.

use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Node;

use crate::types::constants::{SAMLP_NS, SAML_NS, XMLDSIG_NS};
use crate::xml::parse;

static NCNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}._\-]*$").expect("NCName pattern is valid")
});

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("dateTime pattern is valid")
});

/// One position of a content model: a set of acceptable elements and how
/// often they may repeat.
struct Particle {
    names: &'static [(&'static str, &'static str)],
    min: usize,
    max: Option<usize>,
}

const fn once(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 1,
        max: Some(1),
    }
}

const fn optional(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 0,
        max: Some(1),
    }
}

const fn any_number(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 0,
        max: None,
    }
}

const ISSUER: Particle = optional(&[(SAML_NS, "Issuer")]);
const SIGNATURE: Particle = optional(&[(XMLDSIG_NS, "Signature")]);
const EXTENSIONS: Particle = optional(&[(SAMLP_NS, "Extensions")]);
const STATUS: Particle = once(&[(SAMLP_NS, "Status")]);

const AUTHN_REQUEST: &[Particle] = &[
    ISSUER,
    SIGNATURE,
    EXTENSIONS,
    optional(&[(SAML_NS, "Subject")]),
    optional(&[(SAMLP_NS, "NameIDPolicy")]),
    optional(&[(SAML_NS, "Conditions")]),
    optional(&[(SAMLP_NS, "RequestedAuthnContext")]),
    optional(&[(SAMLP_NS, "Scoping")]),
];

const LOGOUT_REQUEST: &[Particle] = &[
    ISSUER,
    SIGNATURE,
    EXTENSIONS,
    once(&[
        (SAML_NS, "BaseID"),
        (SAML_NS, "NameID"),
        (SAML_NS, "EncryptedID"),
    ]),
    any_number(&[(SAMLP_NS, "SessionIndex")]),
];

const RESPONSE: &[Particle] = &[
    ISSUER,
    SIGNATURE,
    EXTENSIONS,
    STATUS,
    any_number(&[(SAML_NS, "Assertion"), (SAML_NS, "EncryptedAssertion")]),
];

const LOGOUT_RESPONSE: &[Particle] = &[ISSUER, SIGNATURE, EXTENSIONS, STATUS];

const STATUS_CONTENT: &[Particle] = &[
    once(&[(SAMLP_NS, "StatusCode")]),
    optional(&[(SAMLP_NS, "StatusMessage")]),
    optional(&[(SAMLP_NS, "StatusDetail")]),
];

/// Validates a protocol message.
///
/// # Errors
///
/// Returns every problem found, in document order. Parse failures are
/// reported alone.
pub fn validate_protocol_message(xml: &str) -> Result<(), Vec<String>> {
    let doc = parse(xml).map_err(|e| vec![e.to_string()])?;
    let root = doc.root_element();
    let mut problems = Vec::new();

    let model = match (root.tag_name().namespace(), root.tag_name().name()) {
        (Some(SAMLP_NS), "AuthnRequest") => AUTHN_REQUEST,
        (Some(SAMLP_NS), "LogoutRequest") => LOGOUT_REQUEST,
        (Some(SAMLP_NS), "Response") => RESPONSE,
        (Some(SAMLP_NS), "LogoutResponse") => LOGOUT_RESPONSE,
        (_, name) => {
            return Err(vec![format!(
                "Element '{name}': No matching global declaration available for the validation root."
            )])
        }
    };

    check_common_attributes(root, &mut problems);
    match root.tag_name().name() {
        "AuthnRequest" => check_authn_request_attributes(root, &mut problems),
        "LogoutRequest" => {
            if let Some(value) = root.attribute("NotOnOrAfter") {
                check_date_time(root, "NotOnOrAfter", value, &mut problems);
            }
        }
        _ => {
            if let Some(value) = root.attribute("InResponseTo") {
                check_ncname(root, "InResponseTo", value, &mut problems);
            }
        }
    }
    check_children(root, model, &mut problems);

    if let Some(status) = root
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "Status")
    {
        check_children(status, STATUS_CONTENT, &mut problems);
        for code in status.descendants().filter(|n| {
            n.is_element()
                && n.tag_name().name() == "StatusCode"
                && n.tag_name().namespace() == Some(SAMLP_NS)
        }) {
            if code.attribute("Value").is_none() {
                problems.push(missing_attribute(code, "Value"));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

fn check_common_attributes(root: Node<'_, '_>, problems: &mut Vec<String>) {
    match root.attribute("ID") {
        Some(id) => check_ncname(root, "ID", id, problems),
        None => problems.push(missing_attribute(root, "ID")),
    }
    if root.attribute("Version").is_none() {
        problems.push(missing_attribute(root, "Version"));
    }
    match root.attribute("IssueInstant") {
        Some(value) => check_date_time(root, "IssueInstant", value, problems),
        None => problems.push(missing_attribute(root, "IssueInstant")),
    }
}

fn check_authn_request_attributes(root: Node<'_, '_>, problems: &mut Vec<String>) {
    for name in ["ForceAuthn", "IsPassive"] {
        if let Some(value) = root.attribute(name) {
            if !matches!(value, "true" | "false" | "1" | "0") {
                problems.push(invalid_value(root, name, value, "xs:boolean"));
            }
        }
    }
    for name in [
        "AssertionConsumerServiceIndex",
        "AttributeConsumingServiceIndex",
    ] {
        if let Some(value) = root.attribute(name) {
            if value.parse::<u16>().is_err() {
                problems.push(invalid_value(root, name, value, "xs:unsignedShort"));
            }
        }
    }
}

fn check_ncname(node: Node<'_, '_>, name: &str, value: &str, problems: &mut Vec<String>) {
    if !NCNAME.is_match(value) {
        problems.push(invalid_value(node, name, value, "xs:NCName"));
    }
}

fn check_date_time(node: Node<'_, '_>, name: &str, value: &str, problems: &mut Vec<String>) {
    if !DATE_TIME.is_match(value) {
        problems.push(invalid_value(node, name, value, "xs:dateTime"));
    }
}

/// Matches the element children of `node` against a sequence of
/// particles.
fn check_children(node: Node<'_, '_>, model: &[Particle], problems: &mut Vec<String>) {
    let element = node.tag_name().name();
    let mut children = node.children().filter(Node::is_element).peekable();

    for particle in model {
        let mut count = 0;
        while particle.max.map_or(true, |max| count < max) {
            let Some(next) = children.peek() else { break };
            let matches = particle.names.iter().any(|(ns, local)| {
                next.tag_name().namespace() == Some(*ns) && next.tag_name().name() == *local
            });
            if !matches {
                break;
            }
            children.next();
            count += 1;
        }
        if count < particle.min {
            let expected: Vec<_> = particle.names.iter().map(|(_, local)| *local).collect();
            problems.push(format!(
                "Element '{element}': Missing child element(s). Expected is ( {} ).",
                expected.join(" | ")
            ));
        }
    }

    for unexpected in children {
        problems.push(format!(
            "Element '{}': This element is not expected.",
            unexpected.tag_name().name()
        ));
    }
}

fn missing_attribute(node: Node<'_, '_>, attribute: &str) -> String {
    format!(
        "Element '{}': The attribute '{attribute}' is required but missing.",
        node.tag_name().name()
    )
}

fn invalid_value(node: Node<'_, '_>, attribute: &str, value: &str, kind: &str) -> String {
    format!(
        "Element '{}', attribute '{attribute}': '{value}' is not a valid value of the atomic type '{kind}'.",
        node.tag_name().name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logout_request(attrs: &str, body: &str) -> String {
        format!(
            r#"<samlp:LogoutRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" {attrs}>{body}</samlp:LogoutRequest>"#
        )
    }

    const ATTRS: &str = r#"ID="_a1" Version="2.0" IssueInstant="2024-01-01T00:00:00Z""#;

    #[test]
    fn valid_logout_request() {
        let xml = logout_request(
            ATTRS,
            "<saml:Issuer>i</saml:Issuer><saml:NameID>n</saml:NameID><samlp:SessionIndex>s</samlp:SessionIndex><samlp:SessionIndex>t</samlp:SessionIndex>",
        );
        assert_eq!(validate_protocol_message(&xml), Ok(()));
    }

    #[test]
    fn logout_request_needs_an_identifier() {
        let xml = logout_request(ATTRS, "<saml:Issuer>i</saml:Issuer>");
        let problems = validate_protocol_message(&xml).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("Expected is ( BaseID | NameID | EncryptedID )"));
    }

    #[test]
    fn children_out_of_order() {
        let xml = logout_request(
            ATTRS,
            "<saml:NameID>n</saml:NameID><saml:Issuer>i</saml:Issuer>",
        );
        let problems = validate_protocol_message(&xml).unwrap_err();
        assert!(problems[0].contains("'Issuer': This element is not expected"));
    }

    #[test]
    fn attribute_checks() {
        let xml = logout_request(
            r#"ID="1bad" IssueInstant="yesterday" NotOnOrAfter="2024-01-01T00:00:00""#,
            "<saml:NameID>n</saml:NameID>",
        );
        let problems = validate_protocol_message(&xml).unwrap_err();
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems[0].contains("'1bad' is not a valid value of the atomic type 'xs:NCName'"));
        assert!(problems[1].contains("'Version' is required"));
        assert!(problems[2].contains("xs:dateTime"));
    }

    #[test]
    fn logout_response_status() {
        let ok = format!(
            r#"<samlp:LogoutResponse xmlns:samlp="{SAMLP_NS}" {ATTRS} InResponseTo="_r"><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status></samlp:LogoutResponse>"#
        );
        assert_eq!(validate_protocol_message(&ok), Ok(()));

        let missing = format!(
            r#"<samlp:LogoutResponse xmlns:samlp="{SAMLP_NS}" {ATTRS}><samlp:Status><samlp:StatusMessage>m</samlp:StatusMessage></samlp:Status></samlp:LogoutResponse>"#
        );
        let problems = validate_protocol_message(&missing).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("Expected is ( StatusCode )")));
    }

    #[test]
    fn authn_request_attributes() {
        let xml = format!(
            r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" {ATTRS} IsPassive="maybe" AttributeConsumingServiceIndex="70000"/>"#
        );
        let problems = validate_protocol_message(&xml).unwrap_err();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn foreign_root_and_garbage() {
        let problems = validate_protocol_message("<foo/>").unwrap_err();
        assert!(problems[0].contains("No matching global declaration"));
        assert_eq!(validate_protocol_message("<unclosed>").unwrap_err().len(), 1);
    }
}

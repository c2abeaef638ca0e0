//! Behaviour shared by every SAML message: transport decoding with a size
//! guard, ID and version extraction, and structural validation.

use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use roxmltree::Document;

use crate::bindings::{deflate, inflate};
use crate::error::{SamlError, SamlResult};
use crate::schema;
use crate::types::constants::SAMLP_NS;
use crate::utils::escape;

/// Default upper bound for encoded and decoded messages, in bytes.
pub const DEFAULT_MESSAGE_MAX_BYTESIZE: usize = 250_000;

/// Root elements whose `ID` and `Version` are read.
const PROTOCOL_ROOTS: [&str; 4] = ["AuthnRequest", "Response", "LogoutResponse", "LogoutRequest"];

static BASE64_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A([A-Za-z0-9+/]{4})*([A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?\z")
        .expect("base64 pattern is valid")
});

/// Removes whitespace and literal `\r` / `\n` escape sequences.
fn strip_base64_noise(saml: &str) -> String {
    saml.replace("\\r", "")
        .replace("\\n", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Returns true if the bytes start with `<` after an optional BOM and
/// whitespace.
fn looks_like_xml(data: &[u8]) -> bool {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'<')
}

/// Returns true if the text looks like base64 once whitespace is removed.
#[must_use]
pub fn is_base64_encoded(saml: &str) -> bool {
    BASE64_FORMAT.is_match(&strip_base64_noise(saml))
}

/// Decodes a transported message into XML.
///
/// Text that is not base64 is assumed to be XML already and returned
/// unchanged. Otherwise the encoded size is checked and the base64
/// decoded. Decoded bytes that already start like XML are used as they
/// are; anything else is inflated, and data that does not inflate is taken
/// as uncompressed. The decoded size is checked last.
///
/// # Errors
///
/// Returns a validation error when either size exceeds `max_bytesize`.
pub fn decode_raw_saml(saml: &str, max_bytesize: usize) -> SamlResult<String> {
    if !is_base64_encoded(saml) {
        return Ok(saml.to_string());
    }
    if saml.len() > max_bytesize {
        return Err(SamlError::validation(format!(
            "Encoded SAML Message exceeds {max_bytesize} bytes, so was rejected"
        )));
    }

    let decoded = base64::engine::general_purpose::STANDARD.decode(strip_base64_noise(saml))?;
    let message = if looks_like_xml(&decoded) {
        decoded
    } else {
        match inflate(&decoded, max_bytesize) {
            Ok(inflated) => inflated,
            Err(SamlError::Deflate(reason)) => {
                tracing::trace!(%reason, "message is not deflated");
                decoded
            }
            Err(err) => return Err(err),
        }
    };
    if message.len() > max_bytesize {
        return Err(SamlError::validation(format!(
            "SAML Message exceeds {max_bytesize} bytes, so was rejected"
        )));
    }

    Ok(String::from_utf8_lossy(&message).into_owned())
}

/// Encodes XML for transport: optionally deflated, then base64, then
/// query escaped.
///
/// # Errors
///
/// Returns [`SamlError::Deflate`] if compression fails.
pub fn encode_raw_saml(xml: &str, compress: bool) -> SamlResult<String> {
    let data = if compress {
        deflate(xml.as_bytes())?
    } else {
        xml.as_bytes().to_vec()
    };
    Ok(escape(&base64::engine::general_purpose::STANDARD.encode(data)))
}

fn protocol_root<'a, 'input>(doc: &'a Document<'input>) -> Option<roxmltree::Node<'a, 'input>> {
    let root = doc.root_element();
    let name = root.tag_name();
    (name.namespace() == Some(SAMLP_NS) && PROTOCOL_ROOTS.contains(&name.name())).then_some(root)
}

/// Returns the `ID` attribute of a protocol message root.
#[must_use]
pub fn id(doc: &Document<'_>) -> Option<String> {
    protocol_root(doc)?.attribute("ID").map(str::to_string)
}

/// Returns the `Version` attribute of a protocol message root.
#[must_use]
pub fn version(doc: &Document<'_>) -> Option<String> {
    protocol_root(doc)?.attribute("Version").map(str::to_string)
}

/// Checks a message against the protocol structure rules.
///
/// Returns `Ok(false)` in soft mode when the document does not conform. In
/// strict mode the first problem is returned as a validation error whose
/// message is followed by the document.
///
/// # Errors
///
/// Returns a validation error in strict mode.
pub fn valid_saml(xml: &str, soft: bool) -> SamlResult<bool> {
    match schema::validate_protocol_message(xml) {
        Ok(()) => Ok(true),
        Err(problems) => {
            tracing::debug!(?problems, "message does not match the protocol structure");
            if soft {
                Ok(false)
            } else {
                let first = problems.into_iter().next().unwrap_or_default();
                Err(SamlError::validation(format!("{first}\n\n{xml}")))
            }
        }
    }
}

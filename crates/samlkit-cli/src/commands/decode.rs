//! `decode`: print the XML of a captured message.

use samlkit_protocol::message::decode_raw_saml;
use samlkit_protocol::utils::unescape;
use samlkit_protocol::HttpRedirectBinding;

use crate::cli::DecodeArgs;
use crate::CliConfig;

/// Runs the decode command.
pub fn run_decode(args: &DecodeArgs, config: &CliConfig) -> crate::CliResult<()> {
    let max_bytes = match args.max_bytes {
        Some(max) => max,
        None => config.settings_or_default()?.message_max_bytesize,
    };
    println!("{}", decode(&args.value, max_bytes)?);
    Ok(())
}

/// Decodes a base64 message, or the `SAMLRequest`/`SAMLResponse` of a
/// redirect URL. A value copied out of a query string is unescaped first.
pub fn decode(value: &str, max_bytes: usize) -> crate::CliResult<String> {
    let value = value.trim();
    let message = if value.starts_with("http://") || value.starts_with("https://") {
        let params = HttpRedirectBinding::parse_url(value)?;
        params
            .saml_request
            .or(params.saml_response)
            .ok_or_else(|| {
                crate::CliError::InvalidArgument(
                    "URL carries neither SAMLRequest nor SAMLResponse".to_string(),
                )
            })?
    } else if value.contains('%') {
        unescape(value)
    } else {
        value.to_string()
    };
    Ok(decode_raw_saml(&message, max_bytes)?)
}

#[cfg(test)]
mod tests {
    use samlkit_protocol::message::encode_raw_saml;

    use super::*;

    const XML: &str = "<samlp:LogoutResponse xmlns:samlp='urn:oasis:names:tc:SAML:2.0:protocol'/>";

    #[test]
    fn decodes_deflated_and_plain_values() {
        let deflated = encode_raw_saml(XML, true).unwrap();
        assert_eq!(decode(&deflated, 250_000).unwrap(), XML);
        let plain = encode_raw_saml(XML, false).unwrap();
        assert_eq!(decode(&plain, 250_000).unwrap(), XML);
    }

    #[test]
    fn decodes_from_a_redirect_url() {
        let encoded = encode_raw_saml(XML, true).unwrap();
        let url = format!("https://sp.example.com/sls?SAMLResponse={encoded}&RelayState=x");
        assert_eq!(decode(&url, 250_000).unwrap(), XML);

        let err = decode("https://sp.example.com/sls?RelayState=x", 250_000).unwrap_err();
        assert!(matches!(err, crate::CliError::InvalidArgument(_)));
    }

    #[test]
    fn respects_the_size_limit() {
        let encoded = encode_raw_saml(XML, false).unwrap();
        assert!(decode(&encoded, 10).is_err());
    }
}

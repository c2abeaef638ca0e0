//! AuthnRequest flows.

use samlkit_protocol::message::{decode_raw_saml, valid_saml};
use samlkit_protocol::types::{signature_algorithms, SamlBinding};
use samlkit_protocol::utils::{build_query_from_raw_parts, verify_signature};
use samlkit_protocol::{
    Authrequest, HttpPostBinding, HttpRedirectBinding, RequestParams, SamlMessageType, Settings,
};

use crate::common::{init_tracing, sp_settings, Party};

#[test]
fn redirect_url_for_a_minimal_configuration() {
    init_tracing();
    let settings = Settings {
        idp_sso_service_url: Some("https://idp.example/sso".to_string()),
        compress_request: true,
        ..Settings::default()
    };

    let url = Authrequest::new()
        .create(&settings, &RequestParams::default())
        .unwrap();
    assert!(url.starts_with("https://idp.example/sso?SAMLRequest="));
}

#[test]
fn request_round_trips_through_the_redirect_binding() -> anyhow::Result<()> {
    let settings = sp_settings(None);
    let request = Authrequest::new();
    let url = request.create(&settings, &RequestParams::with_relay_state("/after login"))?;

    let params = HttpRedirectBinding::parse_url(&url)?;
    assert_eq!(params.relay_state.as_deref(), Some("/after login"));
    let xml = decode_raw_saml(params.saml_request.as_deref().unwrap_or_default(), 250_000)?;
    assert!(xml.contains(&format!("ID='{}'", request.request_id())));
    assert!(xml.contains("AssertionConsumerServiceURL='https://sp.example.com/acs'"));
    assert!(valid_saml(&xml, true)?);
    Ok(())
}

#[test]
fn signed_redirect_request_verifies_with_the_sp_certificate() -> anyhow::Result<()> {
    let sp = Party::new("sp.example.com", 30)?;
    let mut settings = sp_settings(None);
    settings.certificate = Some(sp.cert_pem.clone());
    settings.private_key = Some(sp.key_pem.clone());
    settings.security.authn_requests_signed = true;
    settings.security.signature_method = signature_algorithms::RSA_SHA256.to_string();

    let url = Authrequest::new().create(&settings, &RequestParams::with_relay_state("state"))?;
    let params = HttpRedirectBinding::parse_url(&url)?;
    assert_eq!(params.sig_alg.as_deref(), Some(signature_algorithms::RSA_SHA256));

    let raw = params.prepare_raw_get_params(false);
    let query = build_query_from_raw_parts(
        SamlMessageType::Request,
        raw.saml_request.as_deref().unwrap_or_default(),
        raw.relay_state.as_deref(),
        raw.sig_alg.as_deref().unwrap_or_default(),
    );
    assert!(verify_signature(
        &sp.cert,
        params.sig_alg.as_deref().unwrap_or_default(),
        params.signature.as_deref().unwrap_or_default(),
        &query,
    )?);
    Ok(())
}

#[test]
fn post_binding_form_embeds_the_signature() -> anyhow::Result<()> {
    let sp = Party::new("sp.example.com", 30)?;
    let mut settings = sp_settings(None);
    settings.idp_sso_service_binding = Some(SamlBinding::HttpPost.uri().to_string());
    settings.certificate = Some(sp.cert_pem.clone());
    settings.private_key = Some(sp.key_pem.clone());
    settings.security.authn_requests_signed = true;

    let params = Authrequest::new().create_params(&settings, &RequestParams::default())?;
    assert!(params.get("Signature").is_none());
    let xml = decode_raw_saml(params.get("SAMLRequest").unwrap_or_default(), 250_000)?;
    assert!(xml.contains("<ds:SignatureValue>"));

    let form = HttpPostBinding::form("https://idp.example.com/sso", &params);
    assert!(form.contains(r#"action="https://idp.example.com/sso""#));
    assert!(form.contains(r#"name="SAMLRequest""#));
    Ok(())
}

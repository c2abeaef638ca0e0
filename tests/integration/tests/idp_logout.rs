//! IdP-initiated logout: the SP checks the request and answers it.

use samlkit_crypto::BlockCipherAlgorithm;
use samlkit_protocol::message::decode_raw_saml;
use samlkit_protocol::types::{status_codes, SamlBinding, Status};
use samlkit_protocol::{
    HttpRedirectBinding, Logoutrequest, Logoutresponse, RequestParams, SamlError,
    SecuritySettings, Settings, SloLogoutrequest, SloLogoutresponse, ValidationOptions,
};

use crate::common::{
    encrypted_id, idp_side_settings, init_tracing, logout_request_xml, sp_settings, Party,
    IDP_SLO_URL, SP_ENTITY_ID,
};

#[test]
fn unsigned_request_with_known_name_id() -> anyhow::Result<()> {
    init_tracing();
    let xml = logout_request_xml(
        r#"<saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">user@example.com</saml:NameID>"#,
    );
    let settings = sp_settings(None);

    let request = SloLogoutrequest::new(&xml, &settings, ValidationOptions::default())?;
    assert!(request.is_valid()?);
    assert_eq!(request.name_id()?.as_deref(), Some("user@example.com"));
    assert_eq!(request.session_indexes(), ["_session_1"]);
    Ok(())
}

#[test]
fn signed_redirect_request_then_signed_response() -> anyhow::Result<()> {
    let idp = Party::new("idp.example.com", 30)?;
    let sp = Party::new("sp.example.com", 30)?;

    let mut idp_side = idp_side_settings(
        &idp,
        SecuritySettings {
            logout_requests_signed: true,
            ..SecuritySettings::default()
        },
    );
    idp_side.name_identifier_value = Some("user@example.com".to_string());
    idp_side.sessionindex = Some("_session_7".to_string());
    let url = Logoutrequest::new().create(&idp_side, &RequestParams::with_relay_state("rs"))?;

    let mut settings = sp_settings(Some(&idp));
    settings.soft = false;
    settings.certificate = Some(sp.cert_pem.clone());
    settings.private_key = Some(sp.key_pem.clone());
    settings.security.logout_responses_signed = true;

    let params = HttpRedirectBinding::parse_url(&url)?;
    let saml_request = params.saml_request.clone().unwrap_or_default();
    let request = SloLogoutrequest::new(
        &saml_request,
        &settings,
        ValidationOptions::default().with_get_params(params),
    )?;
    request.validate(false)?;
    assert_eq!(request.session_indexes(), ["_session_7"]);

    let response_url = SloLogoutresponse::new().create(
        &settings,
        request.id().as_deref(),
        Status::success(),
        &RequestParams::with_relay_state("rs"),
    )?;
    assert!(response_url.starts_with(&format!("{IDP_SLO_URL}?SAMLResponse=")));
    let response_params = HttpRedirectBinding::parse_url(&response_url)?;
    assert!(response_params.signature.is_some());

    // The IdP checks the answer with the SP certificate.
    let mut idp_checks = Settings {
        idp_entity_id: Some(SP_ENTITY_ID.to_string()),
        idp_cert: Some(sp.cert_pem.clone()),
        sp_entity_id: Some("https://idp.example.com/metadata".to_string()),
        ..Settings::default()
    };
    idp_checks.soft = false;
    let saml_response = response_params.saml_response.clone().unwrap_or_default();
    let response = Logoutresponse::new(
        &saml_response,
        &idp_checks,
        ValidationOptions::default()
            .with_get_params(response_params)
            .matches_request_id(request.id().unwrap_or_default()),
    )?;
    response.validate(false)?;
    assert!(response.success());
    assert_eq!(
        response.status_message().as_deref(),
        Some("Successfully Signed Out")
    );
    Ok(())
}

#[test]
fn forged_signature_is_rejected() -> anyhow::Result<()> {
    let idp = Party::new("idp.example.com", 30)?;
    let attacker = Party::new("idp.example.com", 30)?;
    let attacker_side = idp_side_settings(
        &attacker,
        SecuritySettings {
            logout_requests_signed: true,
            ..SecuritySettings::default()
        },
    );
    let url = Logoutrequest::new().create(&attacker_side, &RequestParams::default())?;

    let mut settings = sp_settings(Some(&idp));
    settings.soft = false;
    let params = HttpRedirectBinding::parse_url(&url)?;
    let saml_request = params.saml_request.clone().unwrap_or_default();
    let request = SloLogoutrequest::new(
        &saml_request,
        &settings,
        ValidationOptions::default().with_get_params(params),
    )?;

    let err = request.validate(false).unwrap_err();
    assert!(matches!(err, SamlError::Validation(_)));
    assert_eq!(err.to_string(), "Invalid Signature on Logout Request");
    Ok(())
}

#[test]
fn embedded_signature_over_post() -> anyhow::Result<()> {
    let idp = Party::new("idp.example.com", 30)?;
    let mut idp_side = idp_side_settings(
        &idp,
        SecuritySettings {
            logout_requests_signed: true,
            ..SecuritySettings::default()
        },
    );
    idp_side.idp_slo_service_binding = Some(SamlBinding::HttpPost.uri().to_string());
    let params = Logoutrequest::new().create_params(&idp_side, &RequestParams::default())?;

    let mut settings = sp_settings(Some(&idp));
    settings.soft = false;
    let request = SloLogoutrequest::new(
        params.get("SAMLRequest").unwrap_or_default(),
        &settings,
        ValidationOptions::default(),
    )?;
    assert!(request.document().contains("<ds:Signature"));
    request.validate(false)?;
    Ok(())
}

#[test]
fn encrypted_name_id_with_rotated_sp_keys() -> anyhow::Result<()> {
    let old = Party::new("sp.example.com", 30)?;
    let current = Party::new("sp.example.com", 365)?;
    let xml = logout_request_xml(&encrypted_id(
        &old.cert,
        "rotated@example.com",
        BlockCipherAlgorithm::Aes256Gcm,
    )?);

    let mut settings = sp_settings(None);
    settings.sp_cert_multi = Some(samlkit_protocol::SpCertMulti {
        signing: Vec::new(),
        encryption: vec![
            samlkit_protocol::SpCertEntry {
                certificate: current.cert_pem.clone(),
                private_key: current.key_pem.clone(),
            },
            samlkit_protocol::SpCertEntry {
                certificate: old.cert_pem.clone(),
                private_key: old.key_pem.clone(),
            },
        ],
    });

    let request = SloLogoutrequest::new(&xml, &settings, ValidationOptions::default())?;
    assert!(request.is_valid()?);
    assert_eq!(request.name_id()?.as_deref(), Some("rotated@example.com"));
    assert_eq!(
        request.name_id_format()?.as_deref(),
        Some("urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress")
    );
    Ok(())
}

#[test]
fn responder_status_is_reported_to_the_idp() -> anyhow::Result<()> {
    let settings = sp_settings(None);
    let params = SloLogoutresponse::new().create_params(
        &settings,
        Some("_idp_logout_1"),
        Status::new(status_codes::RESPONDER).with_message("no such session"),
        &RequestParams::default(),
    )?;
    let xml = decode_raw_saml(params.get("SAMLResponse").unwrap_or_default(), 250_000)?;

    let idp_checks = Settings {
        idp_entity_id: Some(SP_ENTITY_ID.to_string()),
        sp_entity_id: Some("https://idp.example.com/metadata".to_string()),
        ..Settings::default()
    };
    let response = Logoutresponse::new(&xml, &idp_checks, ValidationOptions::default())?;
    assert!(!response.success());
    assert!(!response.is_valid()?);
    assert_eq!(response.in_response_to().as_deref(), Some("_idp_logout_1"));
    let err = response.validate(false).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("The status code of the Logout Response was not Success, was Responder"));
    Ok(())
}

//! SP-initiated logout: request out, response back.

use samlkit_protocol::types::Status;
use samlkit_protocol::{
    HttpRedirectBinding, Logoutrequest, Logoutresponse, RequestParams, SecuritySettings,
    SloLogoutrequest, SloLogoutresponse, ValidationOptions,
};

use crate::common::{idp_side_settings, init_tracing, sp_settings, Party, IDP_ENTITY_ID, SP_ENTITY_ID};

#[test]
fn full_round_trip_with_signed_messages() -> anyhow::Result<()> {
    init_tracing();
    let idp = Party::new("idp.example.com", 30)?;
    let sp = Party::new("sp.example.com", 30)?;

    let mut settings = sp_settings(Some(&idp));
    settings.soft = false;
    settings.certificate = Some(sp.cert_pem.clone());
    settings.private_key = Some(sp.key_pem.clone());
    settings.security.logout_requests_signed = true;
    settings.name_identifier_value = Some("user@example.com".to_string());
    settings.sessionindex = Some("_session_1".to_string());

    let request = Logoutrequest::new();
    let url = request.create(&settings, &RequestParams::with_relay_state("/bye"))?;

    // The IdP reads the request, trusting the SP certificate.
    let mut idp_checks = sp_settings(Some(&sp));
    idp_checks.idp_entity_id = Some(SP_ENTITY_ID.to_string());
    idp_checks.sp_entity_id = Some(IDP_ENTITY_ID.to_string());
    idp_checks.soft = false;
    let params = HttpRedirectBinding::parse_url(&url)?;
    let saml_request = params.saml_request.clone().unwrap_or_default();
    let received = SloLogoutrequest::new(
        &saml_request,
        &idp_checks,
        ValidationOptions::default().with_get_params(params),
    )?;
    received.validate(false)?;
    assert_eq!(received.name_id()?.as_deref(), Some("user@example.com"));
    assert_eq!(received.id().as_deref(), Some(request.request_id()));

    // The IdP answers, signing with its own key.
    let idp_side = idp_side_settings(
        &idp,
        SecuritySettings {
            logout_responses_signed: true,
            ..SecuritySettings::default()
        },
    );
    let response_url = SloLogoutresponse::new().create(
        &idp_side,
        received.id().as_deref(),
        Status::success(),
        &RequestParams::with_relay_state("/bye"),
    )?;

    let params = HttpRedirectBinding::parse_url(&response_url)?;
    assert_eq!(params.relay_state.as_deref(), Some("/bye"));
    let saml_response = params.saml_response.clone().unwrap_or_default();
    let response = Logoutresponse::new(
        &saml_response,
        &settings,
        ValidationOptions::default()
            .with_get_params(params)
            .matches_request_id(request.request_id()),
    )?;
    response.validate(false)?;
    assert!(response.success());
    assert_eq!(response.issuer().as_deref(), Some(IDP_ENTITY_ID));
    Ok(())
}

#[test]
fn mismatched_answer_collects_every_error() -> anyhow::Result<()> {
    let idp_side = samlkit_protocol::Settings {
        idp_slo_service_url: Some("https://attacker.example.com/sls".to_string()),
        sp_entity_id: Some("https://other-idp.example.com".to_string()),
        ..samlkit_protocol::Settings::default()
    };
    let params = SloLogoutresponse::new().create_params(
        &idp_side,
        Some("_unrelated"),
        Status::success(),
        &RequestParams::default(),
    )?;

    let settings = sp_settings(None);
    let response = Logoutresponse::new(
        params.get("SAMLResponse").unwrap_or_default(),
        &settings,
        ValidationOptions::default().matches_request_id("_expected"),
    )?;
    assert!(!response.is_valid()?);

    let errors = response
        .validate(true)
        .unwrap_err()
        .validation_errors()
        .map(|e| e.messages().to_vec())
        .unwrap_or_default();
    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(errors[0].starts_with("The InResponseTo of the Logout Response: _unrelated"));
    assert_eq!(
        errors[1],
        "The LogoutResponse was received at https://attacker.example.com/sls instead of https://sp.example.com/sls"
    );
    assert!(errors[2].contains("issuer"), "{}", errors[2]);
    Ok(())
}

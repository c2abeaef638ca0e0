//! IdP metadata import and SP metadata export.

use samlkit_protocol::types::SamlBinding;
use samlkit_protocol::{
    Authrequest, IdpMetadataParser, ParseOptions, RequestParams, SamlError, Settings, SpMetadata,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{init_tracing, sp_settings, Party};

fn idp_metadata(signing: &str, encryption: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" entityID="https://idp.example.com/metadata">
  <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:KeyDescriptor use="signing">
      <ds:KeyInfo><ds:X509Data><ds:X509Certificate>{signing}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
    </md:KeyDescriptor>
    <md:KeyDescriptor use="encryption">
      <ds:KeyInfo><ds:X509Data><ds:X509Certificate>{encryption}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
    </md:KeyDescriptor>
    <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/slo"/>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress</md:NameIDFormat>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/sso"/>
  </md:IDPSSODescriptor>
</md:EntityDescriptor>"#
    )
}

#[test]
fn distinct_signing_and_encryption_certificates() -> anyhow::Result<()> {
    init_tracing();
    let signing = Party::new("signing.idp.example.com", 30)?.cert_base64()?;
    let encryption = Party::new("encryption.idp.example.com", 30)?.cert_base64()?;

    let metadata = IdpMetadataParser::new()
        .parse_to_hash(&idp_metadata(&signing, &encryption), &ParseOptions::default())?;

    let multi = metadata.idp_cert_multi.expect("certificates by use");
    assert_eq!(multi.signing, [signing]);
    assert_eq!(multi.encryption, [encryption]);
    assert!(metadata.idp_cert.is_none());
    assert!(metadata.idp_cert_fingerprint.is_none());
    Ok(())
}

#[test]
fn imported_settings_drive_the_sp() -> anyhow::Result<()> {
    let idp = Party::new("idp.example.com", 30)?;
    let cert = idp.cert_base64()?;
    let mut settings = sp_settings(None);
    settings.idp_sso_service_url = None;
    settings.idp_entity_id = None;

    IdpMetadataParser::new().parse_into(
        &idp_metadata(&cert, &cert),
        &ParseOptions::default().sso_binding(["redirect"]),
        &mut settings,
    )?;
    assert_eq!(settings.idp_entity_id.as_deref(), Some("https://idp.example.com/metadata"));
    assert_eq!(settings.idp_cert.as_deref(), Some(cert.as_str()));
    assert!(settings.idp_cert_fingerprint.is_some());
    assert_eq!(settings.get_idp_cert()?.map(|c| c.to_der()).transpose()?, Some(idp.cert.to_der()?));

    let url = Authrequest::new().create(&settings, &RequestParams::default())?;
    assert!(url.starts_with("https://idp.example.com/sso?SAMLRequest="));
    Ok(())
}

#[tokio::test]
async fn remote_metadata_is_fetched_and_parsed() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let cert = Party::new("idp.example.com", 30)?.cert_base64()?;
    Mock::given(method("GET"))
        .and(path("/idp/metadata"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/samlmetadata+xml")
                .set_body_string(idp_metadata(&cert, &cert)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = IdpMetadataParser::new()
        .parse_remote(
            &format!("{}/idp/metadata", server.uri()),
            true,
            &ParseOptions::default(),
        )
        .await?;
    assert_eq!(
        settings.idp_slo_service_binding.as_deref(),
        Some(SamlBinding::HttpRedirect.uri())
    );
    assert_eq!(settings.idp_slo_service_url.as_deref(), Some("https://idp.example.com/slo"));
    Ok(())
}

#[tokio::test]
async fn unavailable_metadata_is_an_http_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = IdpMetadataParser::new()
        .parse_remote(&server.uri(), true, &ParseOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SamlError::Http { status: 503, .. }));
    assert_eq!(err.http_status(), 502);
    Ok(())
}

#[test]
fn sp_metadata_publishes_the_sp_certificate() -> anyhow::Result<()> {
    let sp = Party::new("sp.example.com", 30)?;
    let settings = Settings {
        certificate: Some(sp.cert_pem.clone()),
        private_key: Some(sp.key_pem.clone()),
        ..sp_settings(None)
    };
    let metadata = SpMetadata::new().generate(&settings)?;

    assert!(metadata.contains("entityID='https://sp.example.com/metadata'"));
    assert!(metadata.contains(&sp.cert_base64()?));
    assert!(metadata.contains("Location='https://sp.example.com/acs'"));
    Ok(())
}

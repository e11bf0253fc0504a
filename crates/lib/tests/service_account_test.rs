//! # Service Account Credential Tests
//!
//! Exercises the JWT-bearer token exchange against a mock token endpoint.

use anyhow::Result;
use invoice_parser::{
    build_http_client, CachedTokenProvider, CredentialError, ServiceAccountTokenProvider,
    TokenProvider, CLOUD_PLATFORM_SCOPE,
};
use invoice_parser::auth::service_account::AssertionClaims;
use invoice_parser_test_utils::helpers::{
    write_service_account_key, TEST_CLIENT_EMAIL, TEST_PUBLIC_KEY,
};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(key_path: &std::path::Path) -> Result<ServiceAccountTokenProvider> {
    Ok(ServiceAccountTokenProvider::new(
        key_path,
        None,
        build_http_client(None)?,
    ))
}

async fn mock_token_endpoint(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant-type%3Ajwt-bearer"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_exchange_returns_access_token() -> Result<()> {
    // --- Arrange ---
    let server = MockServer::start().await;
    mock_token_endpoint(
        &server,
        200,
        json!({"access_token": "ya29.test-token", "expires_in": 3599, "token_type": "Bearer"}),
    )
    .await;

    let dir = TempDir::new()?;
    let key_path = dir.path().join("googleKey.json");
    let token_uri = format!("{}/token", server.uri());
    write_service_account_key(&key_path, &token_uri)?;

    // --- Act ---
    let token = provider_for(&key_path)?.get_token().await?;

    // --- Assert ---
    assert_eq!(token.secret(), "ya29.test-token");
    assert!(token.is_fresh(chrono::Duration::minutes(50)));

    let requests = server.received_requests().await.expect("recording is enabled");
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8(requests[0].body.clone())?;
    let assertion = body
        .split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .expect("assertion field present");

    let header = decode_header(assertion)?;
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some("test-key-id"));

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[token_uri.as_str()]);
    let claims = decode::<AssertionClaims>(
        assertion,
        &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes())?,
        &validation,
    )?
    .claims;
    assert_eq!(claims.iss, TEST_CLIENT_EMAIL);
    assert_eq!(claims.scope, CLOUD_PLATFORM_SCOPE);
    assert_eq!(claims.exp - claims.iat, 3600);

    Ok(())
}

#[tokio::test]
async fn test_rejected_assertion_is_credential_error() -> Result<()> {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 400, json!({"error": "invalid_grant"})).await;

    let dir = TempDir::new()?;
    let key_path = dir.path().join("googleKey.json");
    write_service_account_key(&key_path, &format!("{}/token", server.uri()))?;

    let err = provider_for(&key_path)?.get_token().await.unwrap_err();

    match err {
        CredentialError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_key_file_is_credential_error() -> Result<()> {
    let dir = TempDir::new()?;
    let err = provider_for(&dir.path().join("absent.json"))?
        .get_token()
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::KeyFile { .. }));
    Ok(())
}

#[tokio::test]
async fn test_malformed_key_file_is_credential_error() -> Result<()> {
    let dir = TempDir::new()?;
    let key_path = dir.path().join("googleKey.json");
    std::fs::write(&key_path, b"{\"client_email\": 42}")?;

    let err = provider_for(&key_path)?.get_token().await.unwrap_err();
    assert!(matches!(err, CredentialError::KeyFormat(_)));
    Ok(())
}

#[tokio::test]
async fn test_cached_provider_exchanges_once() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "ya29.cached", "expires_in": 3600})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let key_path = dir.path().join("googleKey.json");
    write_service_account_key(&key_path, &format!("{}/token", server.uri()))?;

    let provider = CachedTokenProvider::new(provider_for(&key_path)?, chrono::Duration::seconds(60));
    for _ in 0..3 {
        assert_eq!(provider.get_token().await?.secret(), "ya29.cached");
    }

    server.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_lifetime_is_credential_error() -> Result<()> {
    let server = MockServer::start().await;
    mock_token_endpoint(
        &server,
        200,
        json!({"access_token": "ya29.test-token", "expires_in": i64::MAX}),
    )
    .await;

    let dir = TempDir::new()?;
    let key_path = dir.path().join("googleKey.json");
    write_service_account_key(&key_path, &format!("{}/token", server.uri()))?;

    let err = provider_for(&key_path)?.get_token().await.unwrap_err();

    assert!(matches!(err, CredentialError::InvalidLifetime(i64::MAX)));
    Ok(())
}

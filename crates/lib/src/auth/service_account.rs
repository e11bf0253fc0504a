use super::{BearerToken, TokenProvider, CLOUD_PLATFORM_SCOPE};
use crate::errors::CredentialError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// The subset of a service-account JSON key needed for the JWT exchange.
#[derive(Deserialize, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub async fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CredentialError::KeyFile {
                    path: path.to_path_buf(),
                    source,
                })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// The claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

/// Exchanges a service-account key for a bearer token on every call.
#[derive(Clone, Debug)]
pub struct ServiceAccountTokenProvider {
    client: ReqwestClient,
    key_path: PathBuf,
    scope: String,
}

impl ServiceAccountTokenProvider {
    pub fn new(key_path: impl Into<PathBuf>, scope: Option<String>, client: ReqwestClient) -> Self {
        Self {
            client,
            key_path: key_path.into(),
            scope: scope.unwrap_or_else(|| CLOUD_PLATFORM_SCOPE.to_string()),
        }
    }

    /// Signs the RS256 assertion for `key`.
    pub fn sign_assertion(&self, key: &ServiceAccountKey) -> Result<String, CredentialError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: key.client_email.clone(),
            scope: self.scope.clone(),
            aud: key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(encode(&header, &claims, &encoding_key)?)
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    #[instrument(skip(self), fields(key_path = %self.key_path.display()))]
    async fn get_token(&self) -> Result<BearerToken, CredentialError> {
        let key = ServiceAccountKey::from_file(&self.key_path).await?;
        let assertion = self.sign_assertion(&key)?;
        debug!(token_uri = %key.token_uri, "Exchanging signed assertion for an access token.");

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(CredentialError::Exchange)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected { status, body });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(CredentialError::MalformedResponse)?;

        info!(
            client_email = %key.client_email,
            expires_in = token.expires_in,
            "Obtained access token."
        );
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or(CredentialError::InvalidLifetime(token.expires_in))?;
        Ok(BearerToken::new(token.access_token, expires_at))
    }
}

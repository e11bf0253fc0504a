//! # Credential Provider
//!
//! Bearer tokens for the Document AI API. `ServiceAccountTokenProvider` performs
//! the service-account JWT exchange on every call; `CachedTokenProvider` wraps
//! any provider and reuses a token until it is close to expiry.

pub mod cache;
pub mod service_account;

pub use cache::CachedTokenProvider;
pub use service_account::{ServiceAccountKey, ServiceAccountTokenProvider};

use crate::errors::CredentialError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;
use std::fmt::Debug;

/// The OAuth scope granting cloud-platform-level access.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// A short-lived credential authorizing Document AI calls.
#[derive(Clone)]
pub struct BearerToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True if the token is still valid for at least `margin` from now.
    pub fn is_fresh(&self, margin: chrono::Duration) -> bool {
        Utc::now() + margin < self.expires_at
    }
}

impl Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync + Debug + DynClone {
    async fn get_token(&self) -> Result<BearerToken, CredentialError>;
}

dyn_clone::clone_trait_object!(TokenProvider);

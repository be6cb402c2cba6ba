use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ProviderError;

/// Tokens and claims handed back by the identity provider after a
/// successful handshake or refresh.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Decoded claims payload of the access token.
    pub claims: serde_json::Value,
}

/// Seam between the session manager and the external identity provider.
/// Production uses [`crate::KeycloakProvider`]; tests script a fake.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Silently resume an existing session. `Ok(None)` means the provider
    /// has no active session for this client; it is not an error.
    async fn initialize(&self) -> Result<Option<ProviderSession>, ProviderError>;

    /// URL that starts the interactive login flow. The host navigates there;
    /// the provider calls back to the configured redirect URI with a code.
    fn login_url(&self, state: &str) -> String;

    /// Complete the interactive flow with the code delivered to the
    /// redirect URI.
    async fn exchange_code(&self, code: &str) -> Result<ProviderSession, ProviderError>;

    /// Obtain a fresh token when remaining validity is below `min_validity`.
    /// `Ok(None)` means the provider declined the grant (it has expired or
    /// been revoked); the caller must force re-authentication.
    async fn refresh(&self, min_validity: Duration)
        -> Result<Option<ProviderSession>, ProviderError>;

    async fn logout(&self) -> Result<(), ProviderError>;
}

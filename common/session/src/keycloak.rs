use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::claims::decode_payload;
use crate::config::SessionConfig;
use crate::error::ProviderError;
use crate::provider::{IdentityProvider, ProviderSession};

/// Keycloak-style OIDC client. Talks to the realm's
/// `protocol/openid-connect` endpoints and keeps the refresh-token grant
/// internally for the lifetime of the process.
pub struct KeycloakProvider {
    http: Client,
    config: SessionConfig,
    refresh_token: Mutex<Option<String>>,
}

impl KeycloakProvider {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: SessionConfig) -> Self {
        Self {
            http,
            config,
            refresh_token: Mutex::new(None),
        }
    }

    /// Seed a refresh token, for hosts that persist the grant themselves.
    pub fn with_refresh_token(self, token: impl Into<String>) -> Self {
        *self.refresh_token.lock().expect("mutex poisoned") = Some(token.into());
        self
    }

    fn endpoint(&self, leaf: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.config.server_url.trim_end_matches('/'),
            self.config.realm,
            leaf
        )
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().expect("mutex poisoned").clone()
    }

    async fn token_grant(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Option<ProviderSession>, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .form(params)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::Misconfigured(format!(
                "realm '{}' not found at {}",
                self.config.realm, self.config.server_url
            )));
        }
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body: OidcError = response.json().await.unwrap_or_default();
            if body.error == "invalid_grant" {
                debug!("token grant no longer valid");
                self.refresh_token.lock().expect("mutex poisoned").take();
                return Ok(None);
            }
            return Err(ProviderError::Rejected(body.describe()));
        }
        if !status.is_success() {
            return Err(ProviderError::Unreachable(format!(
                "HTTP {status} from token endpoint"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
        let claims = decode_payload(&body.access_token)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
        let expires_at = Utc::now() + chrono::Duration::seconds(body.expires_in);

        if let Some(refresh) = body.refresh_token {
            *self.refresh_token.lock().expect("mutex poisoned") = Some(refresh);
        }

        Ok(Some(ProviderSession {
            access_token: body.access_token,
            expires_at,
            claims,
        }))
    }
}

#[async_trait]
impl IdentityProvider for KeycloakProvider {
    async fn initialize(&self) -> Result<Option<ProviderSession>, ProviderError> {
        let Some(refresh) = self.current_refresh_token() else {
            debug!("no refresh grant held, nothing to resume");
            return Ok(None);
        };
        self.token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ])
        .await
    }

    fn login_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid&state={}",
            self.endpoint("auth"),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderSession, ProviderError> {
        self.token_grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await?
        .ok_or_else(|| ProviderError::Rejected("authorization code was not accepted".into()))
    }

    async fn refresh(
        &self,
        min_validity: Duration,
    ) -> Result<Option<ProviderSession>, ProviderError> {
        debug!(min_validity_secs = min_validity.as_secs(), "refreshing token");
        let Some(refresh) = self.current_refresh_token() else {
            return Ok(None);
        };
        self.token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ])
        .await
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        let refresh = self.refresh_token.lock().expect("mutex poisoned").take();
        let mut params = vec![("client_id", self.config.client_id.clone())];
        if let Some(refresh) = refresh {
            params.push(("refresh_token", refresh));
        }

        let response = self
            .http
            .post(self.endpoint("logout"))
            .form(&params)
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            warn!(status = %response.status(), "provider logout returned an error status");
            Err(ProviderError::Rejected(format!(
                "HTTP {} from logout endpoint",
                response.status()
            )))
        }
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        return ProviderError::Misconfigured(err.to_string());
    }
    if err.is_timeout() {
        return ProviderError::Unreachable(format!("request timed out: {err}"));
    }
    if err.is_connect() {
        if network_is_down(&err) {
            return ProviderError::Offline;
        }
        return ProviderError::Unreachable(err.to_string());
    }
    ProviderError::Unreachable(err.to_string())
}

fn network_is_down(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::NetworkUnreachable
                    | std::io::ErrorKind::NetworkDown
                    | std::io::ErrorKind::HostUnreachable
            );
        }
        source = cause.source();
    }
    false
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OidcError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OidcError {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

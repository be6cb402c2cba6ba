use std::env;
use std::time::Duration;

use crate::error::{SessionError, SessionResult};

/// What an unauthenticated visitor sees. Both behaviors shipped at different
/// points in the product's history, so it stays a deployment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnauthenticatedBehavior {
    /// Show a public landing view with a login action.
    #[default]
    ShowLanding,
    /// Demand login immediately; no view is enabled until it completes.
    EagerLogin,
}

/// Runtime configuration for the identity session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity provider base URL, e.g. `http://localhost:8180`.
    pub server_url: String,
    /// Realm (tenant) under the provider.
    pub realm: String,
    pub client_id: String,
    /// Where the interactive login flow returns to.
    pub redirect_uri: String,
    /// Optional dedicated silent-refresh callback.
    pub silent_refresh_uri: Option<String>,
    /// Refresh fires when remaining token validity drops below this margin,
    /// tolerating clock skew and request latency.
    pub refresh_margin: Duration,
    pub unauthenticated: UnauthenticatedBehavior,
}

impl SessionConfig {
    /// Construct config with a 75 second refresh margin and a landing view
    /// for unauthenticated visitors.
    pub fn new(
        server_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            realm: realm.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            silent_refresh_uri: None,
            refresh_margin: Duration::from_secs(75),
            unauthenticated: UnauthenticatedBehavior::default(),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn with_unauthenticated_behavior(mut self, behavior: UnauthenticatedBehavior) -> Self {
        self.unauthenticated = behavior;
        self
    }

    pub fn with_silent_refresh_uri(mut self, uri: impl Into<String>) -> Self {
        self.silent_refresh_uri = Some(uri.into());
        self
    }
}

/// Load session configuration from the environment. The provider endpoints
/// are deployment-time settings; only the tuning knobs have defaults.
pub fn load_session_config() -> SessionResult<SessionConfig> {
    let server_url = require_env("IDP_SERVER_URL")?;
    let realm = require_env("IDP_REALM")?;
    let client_id = require_env("IDP_CLIENT_ID")?;
    let redirect_uri = require_env("IDP_REDIRECT_URI")?;

    let mut config = SessionConfig::new(server_url, realm, client_id, redirect_uri);

    if let Some(uri) = optional_env("IDP_SILENT_REFRESH_URI") {
        config = config.with_silent_refresh_uri(uri);
    }
    if let Some(raw) = optional_env("SESSION_REFRESH_MARGIN_SECS") {
        let seconds: u64 = raw.parse().map_err(|_| {
            SessionError::Config(format!("invalid SESSION_REFRESH_MARGIN_SECS '{raw}'"))
        })?;
        config = config.with_refresh_margin(Duration::from_secs(seconds));
    }
    if let Some(raw) = optional_env("SESSION_UNAUTHENTICATED") {
        config = config.with_unauthenticated_behavior(parse_unauthenticated(&raw)?);
    }

    Ok(config)
}

fn require_env(key: &str) -> SessionResult<String> {
    optional_env(key).ok_or_else(|| SessionError::Config(format!("{key} is not set")))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_unauthenticated(value: &str) -> SessionResult<UnauthenticatedBehavior> {
    match value.trim().to_ascii_lowercase().as_str() {
        "landing" | "show-landing" => Ok(UnauthenticatedBehavior::ShowLanding),
        "eager" | "eager-login" => Ok(UnauthenticatedBehavior::EagerLogin),
        other => Err(SessionError::Config(format!(
            "unsupported unauthenticated behavior '{other}'. Use show-landing or eager-login."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = SessionConfig::new("http://idp", "shop", "storefront", "http://app");
        assert_eq!(config.refresh_margin, Duration::from_secs(75));
        assert_eq!(config.unauthenticated, UnauthenticatedBehavior::ShowLanding);
        assert!(config.silent_refresh_uri.is_none());
    }

    #[test]
    fn parse_unauthenticated_accepts_both_spellings() {
        assert_eq!(
            parse_unauthenticated("show-landing").unwrap(),
            UnauthenticatedBehavior::ShowLanding
        );
        assert_eq!(
            parse_unauthenticated("Eager-Login").unwrap(),
            UnauthenticatedBehavior::EagerLogin
        );
        assert!(parse_unauthenticated("popup").is_err());
    }

    #[test]
    fn optional_env_treats_blank_as_absent() {
        env::set_var("SESSION_TEST_BLANK", "   ");
        assert_eq!(optional_env("SESSION_TEST_BLANK"), None);
        env::set_var("SESSION_TEST_SET", " value ");
        assert_eq!(optional_env("SESSION_TEST_SET"), Some("value".into()));
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Semaphore;

use storefront_session::error::ProviderError;
use storefront_session::provider::{IdentityProvider, ProviderSession};

/// Route crate logs through the fmt subscriber so `cargo test -- --nocapture`
/// shows manager traces. Only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("storefront_session=debug")
        .with_test_writer()
        .try_init();
}

/// Build a provider session whose claims follow the Keycloak payload shape
/// the manager parses.
pub fn provider_session(
    token: &str,
    valid_for_secs: i64,
    username: &str,
    roles: &[&str],
) -> ProviderSession {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::seconds(valid_for_secs);
    let claims = json!({
        "sub": "7d0a4e52-8b1c-4c7e-9a55-1f2e3d4c5b6a",
        "preferred_username": username,
        "exp": expires_at.timestamp(),
        "iat": now.timestamp(),
        "realm_access": { "roles": roles }
    });
    ProviderSession {
        access_token: token.to_string(),
        expires_at,
        claims,
    }
}

pub enum RefreshOutcome {
    /// Grant a new token valid for the given number of seconds from the
    /// moment the refresh is served.
    Grant {
        token: String,
        valid_for_secs: i64,
        username: String,
        roles: Vec<String>,
    },
    Decline,
    Fail,
}

impl RefreshOutcome {
    pub fn grant(token: &str, valid_for_secs: i64, username: &str, roles: &[&str]) -> Self {
        Self::Grant {
            token: token.to_string(),
            valid_for_secs,
            username: username.to_string(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallLog {
    pub initialize: usize,
    pub refresh: usize,
    pub refresh_completed: usize,
    pub logout: usize,
}

/// Scripted identity provider for driving the session manager in tests.
#[derive(Default)]
pub struct FakeProvider {
    initial: Mutex<Option<ProviderSession>>,
    init_error: Mutex<Option<ProviderError>>,
    exchange: Mutex<Option<ProviderSession>>,
    refresh_outcomes: Mutex<VecDeque<RefreshOutcome>>,
    refresh_gate: Option<Arc<Semaphore>>,
    refresh_instants: Mutex<Vec<tokio::time::Instant>>,
    calls: Mutex<CallLog>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(self, session: ProviderSession) -> Self {
        *self.initial.lock().expect("mutex poisoned") = Some(session);
        self
    }

    pub fn with_init_error(self, err: ProviderError) -> Self {
        *self.init_error.lock().expect("mutex poisoned") = Some(err);
        self
    }

    pub fn with_exchange(self, session: ProviderSession) -> Self {
        *self.exchange.lock().expect("mutex poisoned") = Some(session);
        self
    }

    /// Every refresh call waits for one permit before producing its
    /// outcome, letting tests hold a refresh in flight.
    pub fn with_refresh_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    pub fn queue_refresh(&self, outcome: RefreshOutcome) {
        self.refresh_outcomes
            .lock()
            .expect("mutex poisoned")
            .push_back(outcome);
    }

    pub fn calls(&self) -> CallLog {
        *self.calls.lock().expect("mutex poisoned")
    }

    /// Instants (on the tokio clock) at which refresh calls arrived.
    pub fn refresh_instants(&self) -> Vec<tokio::time::Instant> {
        self.refresh_instants
            .lock()
            .expect("mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn initialize(&self) -> Result<Option<ProviderSession>, ProviderError> {
        self.calls.lock().expect("mutex poisoned").initialize += 1;
        if let Some(err) = self.init_error.lock().expect("mutex poisoned").take() {
            return Err(err);
        }
        Ok(self.initial.lock().expect("mutex poisoned").clone())
    }

    fn login_url(&self, state: &str) -> String {
        format!("http://fake-idp/auth?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderSession, ProviderError> {
        self.exchange
            .lock()
            .expect("mutex poisoned")
            .clone()
            .ok_or_else(|| ProviderError::Rejected(format!("unexpected code '{code}'")))
    }

    async fn refresh(
        &self,
        _min_validity: Duration,
    ) -> Result<Option<ProviderSession>, ProviderError> {
        {
            self.refresh_instants
                .lock()
                .expect("mutex poisoned")
                .push(tokio::time::Instant::now());
            self.calls.lock().expect("mutex poisoned").refresh += 1;
        }

        if let Some(gate) = &self.refresh_gate {
            let permit = gate.acquire().await.expect("semaphore closed");
            permit.forget();
        }

        let outcome = self
            .refresh_outcomes
            .lock()
            .expect("mutex poisoned")
            .pop_front();
        self.calls.lock().expect("mutex poisoned").refresh_completed += 1;

        match outcome {
            Some(RefreshOutcome::Grant {
                token,
                valid_for_secs,
                username,
                roles,
            }) => {
                let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
                Ok(Some(provider_session(
                    &token,
                    valid_for_secs,
                    &username,
                    &roles,
                )))
            }
            Some(RefreshOutcome::Decline) | None => Ok(None),
            Some(RefreshOutcome::Fail) => {
                Err(ProviderError::Unreachable("scripted failure".into()))
            }
        }
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        self.calls.lock().expect("mutex poisoned").logout += 1;
        Ok(())
    }
}

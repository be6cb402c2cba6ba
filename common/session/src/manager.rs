use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::claims::TokenClaims;
use crate::config::SessionConfig;
use crate::error::{InitError, SessionError, SessionResult};
use crate::provider::{IdentityProvider, ProviderSession};
use crate::store::{StoredToken, TokenStore};

/// Read-only snapshot of the authentication state, published through a
/// watch channel so view code can react to transitions without the manager
/// knowing anything about rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub principal_name: Option<String>,
    pub roles: BTreeSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            principal_name: None,
            roles: BTreeSet::new(),
            expires_at: None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Lifecycle phase of the manager. The published [`Session`] is the
/// projection views consume; the phase is for hosts that want to render
/// initialization or refresh progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
    Refreshing,
}

struct State {
    phase: Phase,
    /// Bumped whenever the current token cycle is superseded (new session,
    /// logout, dispose). A refresh completion carrying an older epoch is
    /// stale and must not commit.
    epoch: u64,
    refresh_task: Option<JoinHandle<()>>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn TokenStore>,
    config: SessionConfig,
    state: Mutex<State>,
    tx: watch::Sender<Session>,
}

/// Owns the identity-provider handshake, the persisted bearer token, and the
/// proactive refresh cycle. Constructed explicitly with its collaborators;
/// there is no process-wide instance.
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn TokenStore>,
        config: SessionConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(Session::unauthenticated());
        Self {
            inner: Arc::new(Inner {
                provider,
                store,
                config,
                state: Mutex::new(State {
                    phase: Phase::Uninitialized,
                    epoch: 0,
                    refresh_task: None,
                }),
                tx,
            }),
        }
    }

    /// Drive the provider handshake once. Calling again while initializing
    /// or after completion is a no-op returning the current snapshot; the
    /// host may mount the session from more than one place.
    pub async fn initialize(&self) -> SessionResult<Session> {
        {
            let mut st = self.inner.state.lock().expect("mutex poisoned");
            if st.phase != Phase::Uninitialized {
                debug!(phase = ?st.phase, "initialize called again, returning current session");
                return Ok(self.inner.tx.borrow().clone());
            }
            st.phase = Phase::Initializing;
        }

        match self.inner.provider.initialize().await {
            Ok(Some(provider_session)) => {
                info!("resumed existing identity session");
                Inner::apply_session(&self.inner, provider_session)
            }
            Ok(None) => {
                let mut st = self.inner.state.lock().expect("mutex poisoned");
                st.phase = Phase::Unauthenticated;
                drop(st);
                // Any token left over from a previous process is stale once
                // the provider reports no session.
                self.inner.store.clear();
                let session = Session::unauthenticated();
                self.inner.tx.send_replace(session.clone());
                info!("no existing identity session");
                Ok(session)
            }
            Err(err) => {
                let mut st = self.inner.state.lock().expect("mutex poisoned");
                // Back to uninitialized so the host can retry deliberately;
                // the manager itself never retries.
                st.phase = Phase::Uninitialized;
                drop(st);
                Err(SessionError::Init(InitError::from(err)))
            }
        }
    }

    /// URL that starts the provider's interactive login. Completion arrives
    /// through the redirect callback and [`Self::complete_login`].
    pub fn login_url(&self, state: &str) -> String {
        self.inner.provider.login_url(state)
    }

    /// Exchange the redirect-callback code and apply the resulting session.
    pub async fn complete_login(&self, code: &str) -> SessionResult<Session> {
        let provider_session = self.inner.provider.exchange_code(code).await?;
        Inner::apply_session(&self.inner, provider_session)
    }

    /// Clear local session state, then tell the provider. The local reset
    /// happens first so logout wins over any refresh still in flight.
    pub async fn logout(&self) {
        {
            let mut st = self.inner.state.lock().expect("mutex poisoned");
            Inner::force_unauthenticated(&self.inner, &mut st);
            // The epoch bump turns a sleeping refresh timer into a no-op and
            // makes any in-flight completion stale; the task exits on wake.
            st.refresh_task = None;
        }
        if let Err(err) = self.inner.provider.logout().await {
            warn!(%err, "identity provider logout reported an error");
        }
        info!("logged out");
    }

    /// Cancel background work. The manager is unusable afterwards.
    pub fn dispose(&self) {
        let mut st = self.inner.state.lock().expect("mutex poisoned");
        st.epoch += 1;
        if let Some(task) = st.refresh_task.take() {
            task.abort();
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.tx.subscribe()
    }

    pub fn session(&self) -> Session {
        self.inner.tx.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().expect("mutex poisoned").phase
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.inner.store)
    }
}

impl Inner {
    /// Parse, persist, publish, and schedule for a freshly obtained provider
    /// session. Callers must not hold the state lock.
    fn apply_session(inner: &Arc<Inner>, provider_session: ProviderSession) -> SessionResult<Session> {
        let claims = match TokenClaims::try_from(provider_session.claims.clone()) {
            Ok(claims) => claims,
            Err(err) => {
                let mut st = inner.state.lock().expect("mutex poisoned");
                Inner::force_unauthenticated(inner, &mut st);
                drop(st);
                return Err(err);
            }
        };
        let mut st = inner.state.lock().expect("mutex poisoned");
        let session = Inner::commit_locked(inner, &mut st, claims, provider_session);
        drop(st);
        debug!(roles = ?session.roles, "session applied");
        Ok(session)
    }

    /// Commit a new token cycle while holding the state lock: supersede the
    /// previous cycle, write the store, publish the snapshot, schedule the
    /// next refresh.
    fn commit_locked(
        inner: &Arc<Inner>,
        st: &mut State,
        claims: TokenClaims,
        provider_session: ProviderSession,
    ) -> Session {
        st.epoch += 1;
        let epoch = st.epoch;
        st.phase = Phase::Authenticated;
        inner
            .store
            .set(StoredToken::new(provider_session.access_token));
        // The role set is replaced wholesale on every token change; nothing
        // is merged with the previous session.
        let session = Session {
            authenticated: true,
            principal_name: claims.preferred_username.or(claims.subject),
            roles: claims.roles,
            expires_at: Some(provider_session.expires_at),
        };
        inner.tx.send_replace(session.clone());
        Inner::schedule_refresh(inner, st, epoch, provider_session.expires_at);
        session
    }

    fn schedule_refresh(inner: &Arc<Inner>, st: &mut State, epoch: u64, expires_at: DateTime<Utc>) {
        let margin = chrono::Duration::from_std(inner.config.refresh_margin)
            .unwrap_or_else(|_| chrono::Duration::seconds(75));
        let delay = (expires_at - margin - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(delay_secs = delay.as_secs(), "scheduling proactive token refresh");

        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            Inner::run_refresh(task_inner, epoch, delay).await;
        });
        if let Some(previous) = st.refresh_task.replace(handle) {
            previous.abort();
        }
    }

    async fn run_refresh(inner: Arc<Inner>, epoch: u64, delay: Duration) {
        tokio::time::sleep(delay).await;

        {
            let mut st = inner.state.lock().expect("mutex poisoned");
            if st.epoch != epoch {
                return;
            }
            if inner.store.get().is_none() {
                // Someone cleared durable storage out from under us; the
                // authenticated-implies-token invariant forces a logout.
                warn!("stored token vanished, forcing re-authentication");
                Inner::force_unauthenticated(&inner, &mut st);
                return;
            }
            st.phase = Phase::Refreshing;
        }

        let outcome = inner.provider.refresh(inner.config.refresh_margin).await;

        let mut st = inner.state.lock().expect("mutex poisoned");
        if st.epoch != epoch {
            debug!("discarding refresh completion from a superseded cycle");
            return;
        }
        match outcome {
            Ok(Some(provider_session)) => {
                match TokenClaims::try_from(provider_session.claims.clone()) {
                    Ok(claims) => {
                        Inner::commit_locked(&inner, &mut st, claims, provider_session);
                        debug!("token refreshed");
                    }
                    Err(err) => {
                        warn!(%err, "refreshed token carried unusable claims, forcing re-authentication");
                        Inner::force_unauthenticated(&inner, &mut st);
                    }
                }
            }
            Ok(None) => {
                info!("refresh grant declined, forcing re-authentication");
                Inner::force_unauthenticated(&inner, &mut st);
            }
            Err(err) => {
                // A stale token is worse than a forced login, so the failed
                // cycle tears the session down instead of keeping the old
                // token around.
                warn!(%err, "token refresh failed, forcing re-authentication");
                Inner::force_unauthenticated(&inner, &mut st);
            }
        }
    }

    fn force_unauthenticated(inner: &Inner, st: &mut State) {
        st.epoch += 1;
        st.phase = Phase::Unauthenticated;
        inner.store.clear();
        inner.tx.send_replace(Session::unauthenticated());
    }
}

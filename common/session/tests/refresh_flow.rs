use std::sync::Arc;
use std::time::Duration;

use storefront_session::manager::{Phase, SessionManager};
use storefront_session::store::{MemoryTokenStore, TokenStore};
use storefront_session::{SessionConfig, ROLE_CLIENT};

mod support;
use support::{provider_session, FakeProvider, RefreshOutcome};

fn config_with_margin(margin_secs: u64) -> SessionConfig {
    support::init_tracing();
    SessionConfig::new(
        "http://idp:8180",
        "storefront-realm",
        "storefront-client",
        "http://localhost:3000",
    )
    .with_refresh_margin(Duration::from_secs(margin_secs))
}

async fn settle() {
    // Let spawned refresh tasks run to completion on the paused clock.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn refresh_fires_at_expiry_minus_margin_and_chains() {
    let start = tokio::time::Instant::now();
    let provider = Arc::new(
        FakeProvider::new().with_initial(provider_session("tok-1", 300, "alice", &[ROLE_CLIENT])),
    );
    provider.queue_refresh(RefreshOutcome::grant("tok-2", 300, "alice", &[ROLE_CLIENT]));
    provider.queue_refresh(RefreshOutcome::grant("tok-3", 300, "alice", &[ROLE_CLIENT]));
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::new(provider.clone(), store.clone(), config_with_margin(60));

    manager.initialize().await.expect("initialize");
    assert_eq!(provider.calls().refresh, 0);

    // Token obtained at t0 with 300s validity and a 60s margin: the first
    // refresh fires at t0+240, the chained one at t0+480.
    tokio::time::sleep(Duration::from_secs(241)).await;
    settle().await;
    assert_eq!(provider.calls().refresh, 1);
    assert_eq!(store.get().map(|token| token.value), Some("tok-2".into()));

    tokio::time::sleep(Duration::from_secs(240)).await;
    settle().await;
    assert_eq!(provider.calls().refresh, 2);
    assert_eq!(store.get().map(|token| token.value), Some("tok-3".into()));

    let instants = provider.refresh_instants();
    let first = instants[0].duration_since(start).as_secs();
    let second = instants[1].duration_since(start).as_secs();
    assert!((239..=241).contains(&first), "first refresh at {first}s");
    assert!((479..=482).contains(&second), "second refresh at {second}s");

    assert!(manager.session().authenticated);
    manager.dispose();
}

#[tokio::test(start_paused = true)]
async fn refresh_failure_forces_unauthenticated() {
    let provider = Arc::new(
        FakeProvider::new().with_initial(provider_session("tok-1", 300, "alice", &[ROLE_CLIENT])),
    );
    provider.queue_refresh(RefreshOutcome::Fail);
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::new(provider.clone(), store.clone(), config_with_margin(60));

    manager.initialize().await.expect("initialize");

    tokio::time::sleep(Duration::from_secs(241)).await;
    settle().await;

    assert!(store.get().is_none(), "failed refresh must clear the store");
    assert!(!manager.session().authenticated);
    assert_eq!(manager.phase(), Phase::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn refresh_decline_forces_unauthenticated() {
    let provider = Arc::new(
        FakeProvider::new().with_initial(provider_session("tok-1", 300, "alice", &[ROLE_CLIENT])),
    );
    provider.queue_refresh(RefreshOutcome::Decline);
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::new(provider.clone(), store.clone(), config_with_margin(60));

    manager.initialize().await.expect("initialize");

    tokio::time::sleep(Duration::from_secs(241)).await;
    settle().await;

    assert!(store.get().is_none());
    assert!(!manager.session().authenticated);
}

#[tokio::test(start_paused = true)]
async fn externally_cleared_store_forces_logout_on_refresh_wake() {
    let provider = Arc::new(
        FakeProvider::new().with_initial(provider_session("tok-1", 300, "alice", &[ROLE_CLIENT])),
    );
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::new(provider.clone(), store.clone(), config_with_margin(60));

    manager.initialize().await.expect("initialize");
    store.clear();

    tokio::time::sleep(Duration::from_secs(241)).await;
    settle().await;

    assert_eq!(provider.calls().refresh, 0, "no refresh without a token");
    assert!(!manager.session().authenticated);
}

#[tokio::test(start_paused = true)]
async fn refresh_recomputes_roles_wholesale() {
    let provider = Arc::new(
        FakeProvider::new().with_initial(provider_session("tok-1", 300, "alice", &[ROLE_CLIENT])),
    );
    provider.queue_refresh(RefreshOutcome::grant("tok-2", 300, "alice", &["ADMIN"]));
    let store = Arc::new(MemoryTokenStore::new());
    let manager = SessionManager::new(provider.clone(), store, config_with_margin(60));

    manager.initialize().await.expect("initialize");
    assert!(manager.session().has_role(ROLE_CLIENT));

    tokio::time::sleep(Duration::from_secs(241)).await;
    settle().await;

    let session = manager.session();
    assert!(session.has_role("ADMIN"));
    assert!(
        !session.has_role(ROLE_CLIENT),
        "roles come from the newest token only"
    );
    manager.dispose();
}

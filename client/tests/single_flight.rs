//! Concurrency tests for the refresh coordinator: many simultaneous callers,
//! exactly one network round trip, one shared outcome.

use async_trait::async_trait;
use courseware_client::types::{ApiError, LoginResponse, UserProfile};
use futures::future::join_all;
use courseware_client::{RefreshCoordinator, RefreshTransport, TokenStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

struct GatedTransport {
    calls: AtomicUsize,
    gate: Notify,
    outcome: Result<String, ApiError>,
}

impl GatedTransport {
    fn new(outcome: Result<String, ApiError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
            outcome,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RefreshTransport for GatedTransport {
    async fn refresh(&self) -> Result<LoginResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Stall until the test opens the gate so every caller piles up
        // behind one in-flight refresh.
        self.gate.notified().await;
        self.outcome.clone().map(|token| LoginResponse {
            access_token: token,
            user: UserProfile {
                id: "u1".into(),
                email: "student@example.com".into(),
                full_name: "Student".into(),
                role: "STUDENT".into(),
            },
        })
    }
}

fn coordinator(
    outcome: Result<String, ApiError>,
) -> (Arc<RefreshCoordinator>, Arc<TokenStore>, Arc<GatedTransport>) {
    let store = Arc::new(TokenStore::new());
    let transport = Arc::new(GatedTransport::new(outcome));
    let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), transport.clone()));
    (coordinator, store, transport)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_refresh() {
    let (coordinator, store, transport) = coordinator(Ok("fresh".to_string()));
    store.store("stale".to_string(), false);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(
            async move { coordinator.refresh_access_token().await },
        ));
    }

    // Give every task time to reach the coordinator before releasing the
    // stalled round trip.
    sleep(Duration::from_millis(50)).await;
    transport.gate.notify_one();

    for outcome in join_all(handles).await {
        let token = outcome.unwrap().unwrap();
        assert_eq!(token, "fresh");
    }

    assert_eq!(transport.call_count(), 1);
    assert_eq!(store.current_token().as_deref(), Some("fresh"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_refresh_settles_every_waiter_and_clears_the_session() {
    let (coordinator, store, transport) = coordinator(Err(ApiError::Authentication(
        "refresh token expired".to_string(),
    )));
    store.store("stale".to_string(), true);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(
            async move { coordinator.refresh_access_token().await },
        ));
    }

    sleep(Duration::from_millis(50)).await;
    transport.gate.notify_one();

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            ApiError::Authentication("refresh token expired".to_string())
        );
    }

    assert_eq!(transport.call_count(), 1);
    assert!(store.current_token().is_none());
    assert!(!store.session().is_authenticated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_caller_does_not_wedge_later_refreshes() {
    let (coordinator, store, transport) = coordinator(Ok("fresh".to_string()));
    store.store("stale".to_string(), false);

    // First caller gives up mid-round-trip; the transport gate stays shut so
    // the deadline fires while the refresh is in flight.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        coordinator.refresh_access_token(),
    )
    .await;
    assert!(abandoned.is_err());

    // The detached refresh is still running; a later caller joins it and
    // must settle once the round trip completes.
    let late = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_access_token().await }
    });
    sleep(Duration::from_millis(20)).await;
    transport.gate.notify_one();

    let token = tokio::time::timeout(Duration::from_secs(1), late)
        .await
        .expect("refresh settled despite the cancelled caller")
        .unwrap()
        .unwrap();
    assert_eq!(token, "fresh");
    assert_eq!(transport.call_count(), 1);
    assert_eq!(store.current_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn refreshes_after_settlement_start_a_new_round_trip() {
    let (coordinator, store, transport) = coordinator(Ok("fresh".to_string()));
    store.store("stale".to_string(), false);

    transport.gate.notify_one();
    let first = coordinator.refresh_access_token().await.unwrap();
    assert_eq!(first, "fresh");

    transport.gate.notify_one();
    let second = coordinator.refresh_access_token().await.unwrap();
    assert_eq!(second, "fresh");

    // No lingering in-flight marker: each settled refresh allows the next.
    assert_eq!(transport.call_count(), 2);
}

//! Single-flight refresh coordination.
//!
//! N concurrent calls can all observe an expired token at once. The server
//! invalidates the rotation token on first use, so a second concurrent
//! refresh would fail even though the first succeeded. This coordinator
//! guarantees at most one refresh round trip is in flight per client: the
//! first caller starts the refresh, everyone queues a waiter and receives
//! the shared outcome.
//!
//! The round trip itself runs on a detached task. A caller that gives up
//! (timeout, dropped future) only abandons its own waiter; the refresh still
//! completes and settles everyone else, so the in-flight marker can never be
//! stranded.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

use crate::{token_store::TokenStore, types::ApiError, types::LoginResponse};

/// The one network call the coordinator is allowed to make. Behind a trait
/// so tests can count and stall it.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self) -> Result<LoginResponse, ApiError>;
}

#[derive(Default)]
struct CoordinatorState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Result<String, ApiError>>>,
}

/// Constructed once at startup and shared with the gateway; never ambient
/// module state, so tests can run isolated coordinators.
pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    transport: Arc<dyn RefreshTransport>,
    state: Arc<Mutex<CoordinatorState>>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<TokenStore>, transport: Arc<dyn RefreshTransport>) -> Self {
        Self {
            store,
            transport,
            state: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    /// Obtains a fresh access token, joining an in-flight refresh if one
    /// exists. On failure the stored credential is cleared (once, by the
    /// refresh task) and every participant receives the same error.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        // The enqueue-or-start decision happens under the lock; the network
        // call must not.
        let (tx, rx) = oneshot::channel();
        let start_refresh = {
            let mut state = self.state.lock().await;
            state.waiters.push(tx);
            if state.in_flight {
                false
            } else {
                state.in_flight = true;
                true
            }
        };

        if start_refresh {
            let store = self.store.clone();
            let transport = self.transport.clone();
            let state = self.state.clone();
            tokio::spawn(run_refresh(store, transport, state));
        }

        rx.await
            .unwrap_or_else(|_| Err(ApiError::Network("refresh abandoned".to_string())))
    }

    /// Derived session view, for callers that track auth state.
    pub fn session(&self) -> crate::token_store::Session {
        self.store.session()
    }
}

async fn run_refresh(
    store: Arc<TokenStore>,
    transport: Arc<dyn RefreshTransport>,
    state: Arc<Mutex<CoordinatorState>>,
) {
    let outcome = match transport.refresh().await {
        Ok(response) => {
            store.replace_token(response.access_token.clone());
            log::debug!("access token refreshed");
            Ok(response.access_token)
        }
        Err(err) => {
            // Terminal: full local logout rather than a partial state.
            log::warn!("token refresh failed: {}", err);
            store.clear();
            Err(err)
        }
    };

    // Waiters settle in FIFO enqueue order, all with the same outcome.
    let waiters = {
        let mut state = state.lock().await;
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    };
    for waiter in waiters {
        let _ = waiter.send(outcome.clone());
    }
}

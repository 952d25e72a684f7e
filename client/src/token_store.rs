//! Client-local storage for the access token and the "remember" flag.
//! Pure storage: no network, no verification.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// Derived, non-authoritative view of the stored credential state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    pub is_initialized: bool,
    pub remember: bool,
}

#[derive(Debug, Default)]
struct Inner {
    token: Option<String>,
    remember: bool,
    initialized: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
}

/// Holds the current access token in process memory and, when the caller
/// asked to be remembered, mirrors it to a client-local file so a new
/// process can resume the session.
#[derive(Debug)]
pub struct TokenStore {
    inner: Mutex<Inner>,
    persist_path: Option<PathBuf>,
}

impl TokenStore {
    /// Session-only store: the token never outlives the process.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            persist_path: None,
        }
    }

    /// Store backed by a file used only when "remember" is set.
    pub fn with_persistence(path: PathBuf) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            persist_path: Some(path),
        }
    }

    /// Loads any remembered token from disk. Call once at startup; the
    /// session reports `is_initialized = false` until this has run.
    pub fn initialize(&self) {
        let mut inner = self.inner.lock().expect("token store poisoned");
        if let Some(path) = &self.persist_path {
            if let Ok(raw) = std::fs::read_to_string(path) {
                match serde_json::from_str::<PersistedSession>(&raw) {
                    Ok(persisted) => {
                        inner.token = Some(persisted.access_token);
                        inner.remember = true;
                    }
                    Err(err) => {
                        log::warn!("discarding unreadable persisted session: {}", err);
                        let _ = std::fs::remove_file(path);
                    }
                }
            }
        }
        inner.initialized = true;
    }

    pub fn current_token(&self) -> Option<String> {
        self.inner.lock().expect("token store poisoned").token.clone()
    }

    /// Stores a token obtained from login or register, recording the
    /// caller's lifetime choice.
    pub fn store(&self, token: String, remember: bool) {
        let mut inner = self.inner.lock().expect("token store poisoned");
        inner.token = Some(token.clone());
        inner.remember = remember;
        inner.initialized = true;
        drop(inner);

        if let Some(path) = &self.persist_path {
            if remember {
                let persisted = PersistedSession {
                    access_token: token,
                };
                if let Ok(raw) = serde_json::to_string(&persisted) {
                    if let Err(err) = std::fs::write(path, raw) {
                        log::warn!("failed to persist session: {}", err);
                    }
                }
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    /// Replaces the token after a refresh, keeping the lifetime choice.
    pub fn replace_token(&self, token: String) {
        let remember = {
            let mut inner = self.inner.lock().expect("token store poisoned");
            inner.token = Some(token.clone());
            inner.remember
        };
        if remember {
            self.store(token, true);
        }
    }

    /// Full local logout: forget the token in memory and on disk.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("token store poisoned");
        inner.token = None;
        inner.remember = false;
        drop(inner);

        if let Some(path) = &self.persist_path {
            let _ = std::fs::remove_file(path);
        }
    }

    pub fn session(&self) -> Session {
        let inner = self.inner.lock().expect("token store poisoned");
        Session {
            is_authenticated: inner.token.is_some(),
            is_initialized: inner.initialized,
            remember: inner.remember,
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

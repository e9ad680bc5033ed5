//! Auth gate for the cosmetic "pro" account state. Not an authorization
//! boundary: exports work the same either way.

use std::sync::Arc;

use gptexport_core::LocalStorage;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Storage key holding the [`AuthRecord`].
pub const AUTH_KEY: &str = "auth";

const DEMO_USERNAME: &str = "test";
const DEMO_PASSWORD: &str = "test";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRecord {
    pub username: String,
    /// Epoch milliseconds.
    pub authenticated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub username: String,
    pub is_loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            username: String::new(),
            is_loading: true,
        }
    }
}

pub struct AuthGate {
    storage: Arc<dyn LocalStorage>,
    state: AuthState,
}

impl AuthGate {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            state: AuthState::default(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    /// Read the persisted record once at popup start.
    pub fn load(&mut self) {
        let record = match self.storage.get(AUTH_KEY) {
            Ok(value) => value.and_then(|v| serde_json::from_value::<AuthRecord>(v).ok()),
            Err(e) => {
                error!("Failed to load auth state: {}", e);
                None
            }
        };
        self.state = match record {
            Some(record) => AuthState {
                is_authenticated: true,
                username: record.username,
                is_loading: false,
            },
            None => AuthState {
                is_loading: false,
                ..AuthState::default()
            },
        };
    }

    pub fn sign_in(&mut self, credentials: &Credentials) -> bool {
        self.authenticate(credentials, "Sign in")
    }

    /// Same check as sign-in; there is no account backend.
    pub fn sign_up(&mut self, credentials: &Credentials) -> bool {
        self.authenticate(credentials, "Sign up")
    }

    fn authenticate(&mut self, credentials: &Credentials, action: &str) -> bool {
        if credentials.username != DEMO_USERNAME || credentials.password != DEMO_PASSWORD {
            return false;
        }
        let record = AuthRecord {
            username: credentials.username.clone(),
            authenticated_at: chrono::Utc::now().timestamp_millis(),
        };
        let stored = serde_json::to_value(&record)
            .map_err(gptexport_core::Error::from)
            .and_then(|value| self.storage.set(AUTH_KEY, value));
        if let Err(e) = stored {
            error!("{} failed: {}", action, e);
            return false;
        }
        self.state = AuthState {
            is_authenticated: true,
            username: record.username,
            is_loading: false,
        };
        info!("{} succeeded", action);
        true
    }

    /// Always ends signed out, however many times it runs.
    pub fn sign_out(&mut self) {
        if let Err(e) = self.storage.remove(AUTH_KEY) {
            error!("Sign out failed: {}", e);
        }
        self.state = AuthState {
            is_loading: false,
            ..AuthState::default()
        };
    }
}

use crate::client::{StatusClient, StatusPayload};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Which fetch produced an [`AuthStatus`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Store,
    Direct,
}

/// Authentication status as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub expires_in_seconds: Option<u64>,
    pub needs_refresh: bool,
    pub scopes: Option<BTreeSet<String>>,
    pub last_checked_at: DateTime<Utc>,
    pub source: StatusSource,
}

impl AuthStatus {
    pub fn from_payload(payload: StatusPayload, source: StatusSource) -> Self {
        Self {
            is_authenticated: payload.is_authenticated,
            // A negative remainder means the token already lapsed.
            expires_in_seconds: payload.expires_in_seconds.map(|secs| secs.max(0) as u64),
            needs_refresh: payload.needs_refresh,
            scopes: payload.scopes.map(|scopes| scopes.into_iter().collect()),
            last_checked_at: Utc::now(),
            source,
        }
    }

    /// Whole hours left on the token, for display only.
    pub fn hours_remaining(&self) -> Option<u64> {
        self.expires_in_seconds.map(|secs| secs / 3600)
    }
}

/// What a status reader is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusDisplay {
    Checking,
    Connected { hours_remaining: Option<u64> },
    NotConnected,
    ConnectionError,
}

/// Externally observable status, reconciled from both sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusView {
    pub status: Option<AuthStatus>,
    pub needs_refresh: bool,
    pub connection_error: bool,
    pub last_error: Option<String>,
}

impl StatusView {
    pub fn is_authenticated(&self) -> bool {
        self.status
            .as_ref()
            .map(|status| status.is_authenticated)
            .unwrap_or(false)
    }

    pub fn display(&self) -> StatusDisplay {
        if self.connection_error {
            return StatusDisplay::ConnectionError;
        }
        match &self.status {
            None => StatusDisplay::Checking,
            Some(status) if status.is_authenticated => StatusDisplay::Connected {
                hours_remaining: status.hours_remaining(),
            },
            Some(_) => StatusDisplay::NotConnected,
        }
    }
}

#[derive(Debug, Default)]
struct StatusSlots {
    store: Option<AuthStatus>,
    direct: Option<AuthStatus>,
    connection_error: bool,
    last_error: Option<String>,
}

impl StatusSlots {
    fn view(&self) -> StatusView {
        // `direct` wins whenever it is populated, regardless of recency.
        let status = self.direct.clone().or_else(|| self.store.clone());
        let needs_refresh = self.store.as_ref().is_some_and(|s| s.needs_refresh)
            || self.direct.as_ref().is_some_and(|s| s.needs_refresh);
        StatusView {
            status,
            needs_refresh,
            connection_error: self.connection_error,
            last_error: self.last_error.clone(),
        }
    }
}

/// Single mutation point for authentication state.
///
/// Cloning yields another handle onto the same slots. Readers either poll
/// [`AuthStatusStore::view`] or hold a receiver from
/// [`AuthStatusStore::subscribe`].
#[derive(Clone)]
pub struct AuthStatusStore {
    slots: Arc<RwLock<StatusSlots>>,
    client: Arc<dyn StatusClient>,
    user_id: Arc<str>,
    updates: Arc<watch::Sender<StatusView>>,
}

impl AuthStatusStore {
    pub fn new(client: Arc<dyn StatusClient>, user_id: impl Into<String>) -> Self {
        let (updates, _) = watch::channel(StatusView::default());
        Self {
            slots: Arc::new(RwLock::new(StatusSlots::default())),
            client,
            user_id: Arc::from(user_id.into()),
            updates: Arc::new(updates),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn view(&self) -> StatusView {
        self.slots.read().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.updates.subscribe()
    }

    /// Refresh the `store` slot. Failures keep the last-known value and raise
    /// the connection-error flag until the next check begins.
    pub async fn check_status(&self) {
        self.mutate(|slots| {
            slots.connection_error = false;
            slots.last_error = None;
        });

        match self.client.fetch_status(&self.user_id).await {
            Ok(payload) => {
                let status = AuthStatus::from_payload(payload, StatusSource::Store);
                tracing::debug!(
                    user_id = %self.user_id,
                    authenticated = status.is_authenticated,
                    needs_refresh = status.needs_refresh,
                    "status check succeeded"
                );
                self.mutate(|slots| slots.store = Some(status));
            }
            Err(err) => {
                tracing::warn!(user_id = %self.user_id, %err, "status check failed");
                let detail = err.detail();
                self.mutate(|slots| {
                    slots.connection_error = true;
                    slots.last_error = Some(detail);
                });
            }
        }
    }

    /// Refresh the `direct` slot. Failures leave the slot untouched.
    pub async fn check_direct(&self) {
        match self.client.fetch_status(&self.user_id).await {
            Ok(payload) => {
                let status = AuthStatus::from_payload(payload, StatusSource::Direct);
                self.mutate(|slots| slots.direct = Some(status));
            }
            Err(err) => {
                tracing::debug!(user_id = %self.user_id, %err, "direct status fetch failed");
            }
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut StatusSlots)) {
        let view = {
            let mut slots = self.slots.write();
            apply(&mut slots);
            slots.view()
        };
        self.updates.send_replace(view);
    }

    #[cfg(test)]
    fn seed(&self, store: Option<AuthStatus>, direct: Option<AuthStatus>) {
        self.mutate(|slots| {
            slots.store = store;
            slots.direct = direct;
        });
    }
}

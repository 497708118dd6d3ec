//! Notification center: a 60s unread-count poller, an on-demand full-list
//! fetch, and optimistic mark-as-read flows modelled as explicit two-phase
//! updates (tentative apply, confirm-or-rollback) so rollback on backend
//! failure is a named code path rather than ad hoc patching.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::AppResult;
use crate::poller::{Poller, PollerHandle};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct UnreadCount {
    count: usize,
}

#[derive(Debug, Default)]
struct CenterState {
    unread: usize,
    items: Vec<NotificationItem>,
}

/// Captured prior state for one optimistic mutation. Rolling back restores
/// the unread count and re-flags exactly the items the tentative step read.
#[derive(Debug)]
struct Undo {
    unread: usize,
    unread_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    inner: Arc<RwLock<CenterState>>,
}

impl NotificationCenter {
    pub fn new() -> Self { Self::default() }

    pub fn unread(&self) -> usize { self.inner.read().unread }

    pub fn items(&self) -> Vec<NotificationItem> { self.inner.read().items.clone() }

    /// Badge polling fetches only the unread count; the full list is loaded
    /// on explicit user interaction via `refresh_list`.
    pub fn start_polling(&self, api: &ApiClient, interval: Duration) -> PollerHandle {
        let api = api.clone();
        let center = self.clone();
        Poller::spawn(
            "notifications",
            interval,
            move || {
                let api = api.clone();
                async move { api.get::<UnreadCount>("notifications/unread-count").await }
            },
            move |c| {
                center.inner.write().unread = c.count;
            },
        )
    }

    pub async fn refresh_list(&self, api: &ApiClient) -> AppResult<Vec<NotificationItem>> {
        let items: Vec<NotificationItem> = api.get("notifications").await?;
        let mut st = self.inner.write();
        st.unread = items.iter().filter(|i| !i.is_read).count();
        st.items = items.clone();
        Ok(items)
    }

    // Tentative phase: mark locally, remember what changed.
    fn apply_read(&self, id: &str) -> Undo {
        let mut st = self.inner.write();
        let undo_unread = st.unread;
        let mut unread_ids = Vec::new();
        if let Some(item) = st.items.iter_mut().find(|i| i.id == id && !i.is_read) {
            item.is_read = true;
            unread_ids.push(item.id.clone());
        }
        if !unread_ids.is_empty() {
            st.unread = st.unread.saturating_sub(1);
        }
        Undo { unread: undo_unread, unread_ids }
    }

    fn apply_read_all(&self) -> Undo {
        let mut st = self.inner.write();
        let undo_unread = st.unread;
        let mut unread_ids = Vec::new();
        for item in st.items.iter_mut().filter(|i| !i.is_read) {
            item.is_read = true;
            unread_ids.push(item.id.clone());
        }
        st.unread = 0;
        Undo { unread: undo_unread, unread_ids }
    }

    // Rollback phase: restore exactly the captured state.
    fn rollback(&self, undo: Undo) {
        let mut st = self.inner.write();
        st.unread = undo.unread;
        for id in &undo.unread_ids {
            if let Some(item) = st.items.iter_mut().find(|i| &i.id == id) {
                item.is_read = false;
            }
        }
    }

    /// Optimistic single mark-as-read: local state flips immediately, the
    /// backend confirms; on failure the flip is undone and the error surfaces
    /// to the caller as a transient UI error.
    pub async fn mark_read(&self, api: &ApiClient, id: &str) -> AppResult<()> {
        let undo = self.apply_read(id);
        match api.patch::<()>(&format!("notifications/{}/read", id)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(id = id, err = %e, "notifications.mark_read_rolled_back");
                self.rollback(undo);
                Err(e)
            }
        }
    }

    /// Idempotent: a second call finds nothing unread locally and the repeat
    /// backend call is harmless.
    pub async fn mark_all_read(&self, api: &ApiClient) -> AppResult<()> {
        let undo = self.apply_read_all();
        match api.patch::<()>("notifications/read-all").await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(err = %e, "notifications.mark_all_rolled_back");
                self.rollback(undo);
                Err(e)
            }
        }
    }
}

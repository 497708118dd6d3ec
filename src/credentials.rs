//! Persisted credential store: durable token / user / pending-registration
//! markers behind typed accessors. Pure storage, no policy; the session
//! manager is its only writer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::identity::user::User;

/// Durable marker letting the OTP-verification step resume after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub email: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    pending_email: Option<String>,
    #[serde(default)]
    pending_user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    // Missing or corrupt files read as empty state rather than failing boot.
    fn read(&self) -> StoredState {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), err = %e, "credentials.corrupt_reset");
                StoredState::default()
            }),
            Err(_) => StoredState::default(),
        }
    }

    // Whole-file rewrite via temp-then-rename so a crash mid-write can never
    // leave a token on disk without its user.
    fn write(&self, state: &StoredState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).ok();
            }
        }
        let raw = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("rename into {}", self.path.display()))?;
        Ok(())
    }

    pub fn stored_session(&self) -> Option<(String, User)> {
        let s = self.read();
        match (s.token, s.user) {
            (Some(t), Some(u)) => Some((t, u)),
            // A token without its user (or vice versa) is partial state and
            // is treated as absent.
            _ => None,
        }
    }

    pub fn save_session(&self, token: &str, user: &User) -> Result<()> {
        let mut s = self.read();
        s.token = Some(token.to_string());
        s.user = Some(user.clone());
        self.write(&s)
    }

    pub fn pending(&self) -> Option<PendingRegistration> {
        let s = self.read();
        match (s.pending_email, s.pending_user_id) {
            (Some(email), Some(user_id)) => Some(PendingRegistration { email, user_id }),
            _ => None,
        }
    }

    pub fn save_pending(&self, pending: &PendingRegistration) -> Result<()> {
        let mut s = self.read();
        s.pending_email = Some(pending.email.clone());
        s.pending_user_id = Some(pending.user_id.clone());
        self.write(&s)
    }

    /// Both pending keys are cleared together.
    pub fn clear_pending(&self) -> Result<()> {
        let mut s = self.read();
        s.pending_email = None;
        s.pending_user_id = None;
        self.write(&s)
    }

    /// All four durable keys cleared together (logout / forced teardown).
    pub fn clear_all(&self) -> Result<()> {
        self.write(&StoredState::default())
    }
}

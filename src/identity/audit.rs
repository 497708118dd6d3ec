//! Append-only violation log for denied or anomalous navigation attempts.
//! Diagnostic only: nothing reads this to make a routing decision.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::routing::Route;

const RING_CAP: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    UnauthenticatedAccess,
    NavigationRoleMismatch,
    PharmacyNotApproved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub at: DateTime<Utc>,
    pub kind: ViolationKind,
    pub attempted: Route,
    pub details: String,
}

/// Bounded ring of recent violations; oldest evicted past the cap.
/// Injectable: owned by the client core and passed by reference, never a
/// process-wide static.
#[derive(Debug, Clone, Default)]
pub struct ViolationAuditor {
    ring: Arc<RwLock<VecDeque<ViolationRecord>>>,
}

impl ViolationAuditor {
    pub fn new() -> Self { Self::default() }

    pub fn record(&self, kind: ViolationKind, attempted: Route, details: impl Into<String>) {
        let rec = ViolationRecord { at: Utc::now(), kind, attempted, details: details.into() };
        tracing::warn!(kind = ?rec.kind, attempted = ?rec.attempted, details = %rec.details, "access.violation");
        let mut ring = self.ring.write();
        if ring.len() == RING_CAP {
            ring.pop_front();
        }
        ring.push_back(rec);
    }

    pub fn len(&self) -> usize { self.ring.read().len() }

    pub fn is_empty(&self) -> bool { self.ring.read().is_empty() }

    /// Snapshot of the ring, oldest first.
    pub fn snapshot(&self) -> Vec<ViolationRecord> {
        self.ring.read().iter().cloned().collect()
    }
}

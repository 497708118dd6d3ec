//! Emergency-request ("SOS") feed for approved pharmacy operators: a 30s
//! poller over the nearby radius, a distance-sorted local list driving the
//! badge count, and the accept/reject response call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::AppResult;
use crate::poller::{Poller, PollerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SosStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    pub id: String,
    pub patient_name: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Kilometres from the pharmacy, computed server-side.
    pub distance: f64,
    pub status: SosStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResponse {
    pub sos_requests: Vec<SosRequest>,
    pub pharmacy: GeoPoint,
}

#[derive(Debug, Default)]
struct SosFeedState {
    badge: usize,
    requests: Vec<SosRequest>,
    pharmacy: Option<GeoPoint>,
}

/// Shared read model consumed by the badge and list UI. Written only by the
/// poller tick and by `respond`.
#[derive(Debug, Clone, Default)]
pub struct SosFeed {
    inner: Arc<RwLock<SosFeedState>>,
}

impl SosFeed {
    pub fn new() -> Self { Self::default() }

    pub fn badge(&self) -> usize { self.inner.read().badge }

    /// Nearest first.
    pub fn requests(&self) -> Vec<SosRequest> { self.inner.read().requests.clone() }

    pub fn pharmacy_position(&self) -> Option<GeoPoint> { self.inner.read().pharmacy }

    // Badge count is recomputed from the freshly fetched list length on every
    // tick, never incrementally patched.
    fn apply(&self, mut resp: NearbyResponse) {
        resp.sos_requests
            .sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        let mut st = self.inner.write();
        st.badge = resp.sos_requests.len();
        st.requests = resp.sos_requests;
        st.pharmacy = Some(resp.pharmacy);
    }

    pub fn start_polling(&self, api: &ApiClient, interval: Duration, radius_km: u32) -> PollerHandle {
        let api = api.clone();
        let feed = self.clone();
        let path = format!("pharmacy/sos/nearby?radius={}", radius_km);
        Poller::spawn(
            "sos",
            interval,
            move || {
                let api = api.clone();
                let path = path.clone();
                async move { api.get::<NearbyResponse>(&path).await }
            },
            move |resp| feed.apply(resp),
        )
    }

    /// Accept or reject a request with an optional note; on success the
    /// request leaves the local list immediately.
    pub async fn respond(&self, api: &ApiClient, id: &str, accept: bool, note: Option<&str>) -> AppResult<()> {
        let body = serde_json::json!({
            "action": if accept { "accept" } else { "reject" },
            "note": note,
        });
        api.post::<_, ()>(&format!("pharmacy/sos/{}/respond", id), &body).await?;
        let mut st = self.inner.write();
        st.requests.retain(|r| r.id != id);
        st.badge = st.requests.len();
        Ok(())
    }
}

//! Environment-driven client configuration.
//! Every knob is read once at startup; malformed values fall back to defaults
//! so a bad shell export never prevents boot.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5600/api/";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: Url,
    pub credentials_path: PathBuf,
    pub sos_interval: Duration,
    pub notify_interval: Duration,
    pub sos_radius_km: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let api_base = std::env::var("PHARMALINK_API_BASE").ok()
            .and_then(|s| Url::parse(&ensure_trailing_slash(&s)).ok())
            .unwrap_or_else(|| Url::parse(DEFAULT_API_BASE).unwrap());
        let credentials_path = std::env::var("PHARMALINK_CREDENTIALS_FILE").ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("pharmalink-credentials.json"));
        let sos_interval_sec: u64 = std::env::var("PHARMALINK_SOS_INTERVAL_SEC").ok()
            .and_then(|s| s.parse::<u64>().ok()).filter(|s| *s > 0).unwrap_or(30);
        let notify_interval_sec: u64 = std::env::var("PHARMALINK_NOTIFY_INTERVAL_SEC").ok()
            .and_then(|s| s.parse::<u64>().ok()).filter(|s| *s > 0).unwrap_or(60);
        let sos_radius_km: u32 = std::env::var("PHARMALINK_SOS_RADIUS_KM").ok()
            .and_then(|s| s.parse::<u32>().ok()).filter(|r| *r > 0).unwrap_or(10);
        Self {
            api_base,
            credentials_path,
            sos_interval: Duration::from_secs(sos_interval_sec),
            notify_interval: Duration::from_secs(notify_interval_sec),
            sos_radius_km,
        }
    }
}

// Url::join treats "api" and "api/" differently; endpoints are joined relative
// to the base so the base must end with a slash.
fn ensure_trailing_slash(s: &str) -> String {
    if s.ends_with('/') { s.to_string() } else { format!("{}/", s) }
}

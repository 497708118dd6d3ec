//! HTTP boundary to the marketplace backend. One concrete client, one JSON
//! envelope, and the global 401 contract: any unauthorized response on an
//! authenticated call fires the teardown hook before the error is returned,
//! no matter which subsystem issued the call.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Backend JSON envelope: `{success, data, error}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    // Context for email_not_verified so the caller can resume the OTP flow.
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    token: Arc<RwLock<Option<String>>>,
    on_unauthorized: Arc<RwLock<Option<UnauthorizedHook>>>,
}

impl ApiClient {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
            token: Arc::new(RwLock::new(None)),
            on_unauthorized: Arc::new(RwLock::new(None)),
        }
    }

    /// Install the forced-teardown hook fired on any authenticated 401.
    /// Wired once at core construction.
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self.on_unauthorized.write() = Some(hook);
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn has_token(&self) -> bool { self.token.read().is_some() }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let body = serde_json::to_value(body)
            .map_err(|e| AppError::network(format!("encode request body: {}", e)))?;
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.request(Method::POST, path, None).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.request(Method::PATCH, path, None).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> AppResult<T> {
        let url = self.base.join(path)
            .map_err(|e| AppError::network(format!("bad endpoint {}: {}", path, e)))?;
        let token = self.token.read().clone();
        let authed = token.is_some();

        let mut req = self.http.request(method, url);
        if let Some(t) = &token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let raw = resp.bytes().await?;

        if status == StatusCode::UNAUTHORIZED && authed {
            // Global contract: a revoked/expired token tears the session down
            // regardless of which subsystem noticed first. Unauthenticated
            // calls (e.g. a bad-password login) have nothing to tear down.
            tracing::debug!(path = path, "api.unauthorized_teardown");
            // The token just proved invalid; drop it here so the hook (and
            // any concurrent caller) cannot reuse it.
            *self.token.write() = None;
            if let Some(hook) = self.on_unauthorized.read().clone() {
                hook();
            }
        }

        let envelope: Option<Envelope> = serde_json::from_slice(&raw).ok();
        if status.is_success() {
            let Some(envelope) = envelope else {
                return Err(AppError::network(format!("malformed response from {}", path)));
            };
            if envelope.success {
                return serde_json::from_value(envelope.data)
                    .map_err(|e| AppError::network(format!("decode response from {}: {}", path, e)));
            }
            // A 2xx carrying success:false is still a backend-reported
            // failure; classify it from the envelope it came in.
            return Err(classify_failure(status.as_u16(), Some(&envelope)));
        }
        Err(classify_failure(status.as_u16(), envelope.as_ref()))
    }
}

fn classify_failure(status: u16, envelope: Option<&Envelope>) -> AppError {
    let err = envelope.and_then(|e| e.error.as_ref());
    let code = err.and_then(|e| e.code.as_deref());
    let message = err.and_then(|e| e.message.as_deref());
    if code == Some("email_not_verified") {
        return AppError::email_not_verified(
            err.and_then(|e| e.email.clone()).unwrap_or_default(),
            err.and_then(|e| e.user_id.clone()).unwrap_or_default(),
        );
    }
    AppError::classify(status, code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_error_shapes_decode() {
        let env: Envelope = serde_json::from_str(
            r#"{"success":false,"error":{"code":"email_not_verified","message":"verify first","email":"a@b.c","userId":"u3"}}"#,
        ).unwrap();
        let e = classify_failure(403, Some(&env));
        match e {
            AppError::EmailNotVerified { email, user_id, .. } => {
                assert_eq!(email, "a@b.c");
                assert_eq!(user_id, "u3");
            }
            other => panic!("unexpected: {}", other),
        }
    }

    #[test]
    fn failure_without_envelope_is_classified_by_status() {
        assert_eq!(classify_failure(401, None).code_str(), "unauthorized");
        assert_eq!(classify_failure(429, None).code_str(), "rate_limited");
        assert_eq!(classify_failure(500, None).code_str(), "network_error");
    }
}

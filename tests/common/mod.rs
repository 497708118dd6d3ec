//! In-process mock of the marketplace backend for integration tests: the
//! same `{success, data, error}` envelope, bearer-token auth and failure
//! knobs the client contract depends on.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use parking_lot::RwLock;
use serde_json::{json, Value};

pub const OTP_VALID: &str = "123456";
pub const OTP_EXPIRED: &str = "000000";

#[derive(Default)]
pub struct TestState {
    /// Tokens currently accepted by authenticated endpoints.
    pub tokens: RwLock<HashSet<String>>,
    pub issued: AtomicUsize,
    pub unread: AtomicUsize,
    pub notifications: RwLock<Vec<Value>>,
    pub sos_requests: RwLock<Vec<Value>>,
    pub resend_limited: AtomicBool,
    /// Makes unread-count answer 200 with a `success:false` envelope.
    pub count_degraded: AtomicBool,
    pub fail_mark_read: AtomicBool,
    pub fail_read_all: AtomicBool,
    pub read_all_calls: AtomicUsize,
}

impl TestState {
    pub fn revoke_all_tokens(&self) {
        self.tokens.write().clear();
    }
}

pub struct MockBackend {
    pub base: String,
    pub state: Arc<TestState>,
}

fn ok(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn err(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "success": false, "error": { "code": code, "message": message } })),
    )
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

fn patient_json(id: &str, email: &str) -> Value {
    json!({ "id": id, "email": email, "name": "Pat", "roleId": 3 })
}

fn pharmacy_json(status: &str) -> Value {
    json!({
        "id": "ph1", "email": "ph@x.com", "name": "Corner", "roleId": 2,
        "status": status,
        "pharmacy": { "name": "Corner Pharmacy", "latitude": 6.5, "longitude": 3.3 }
    })
}

fn user_for_email(email: &str) -> Option<Value> {
    match email {
        "pat@x.com" => Some(patient_json("u-pat", "pat@x.com")),
        "ph@x.com" => Some(pharmacy_json("APPROVED")),
        "pending@x.com" => Some(pharmacy_json("PENDING")),
        _ => None,
    }
}

fn guard(st: &TestState, headers: &HeaderMap) -> Result<String, (StatusCode, Json<Value>)> {
    match bearer(headers) {
        Some(t) if st.tokens.read().contains(&t) => Ok(t),
        _ => Err(err(StatusCode::UNAUTHORIZED, "unauthorized", "token revoked")),
    }
}

async fn login(State(st): State<Arc<TestState>>, Json(body): Json<Value>) -> impl IntoResponse {
    let email = body.get("email").and_then(|v| v.as_str()).unwrap_or("");
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    if email == "new@x.com" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": {
                    "code": "email_not_verified",
                    "message": "verify your email first",
                    "email": "new@x.com",
                    "userId": "u-new"
                }
            })),
        );
    }
    let Some(user) = user_for_email(email) else {
        return err(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid email or password");
    };
    if password != "pw" {
        return err(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid email or password");
    }
    let n = st.issued.fetch_add(1, Ordering::SeqCst);
    let token = format!("tok-{}-{}", email, n);
    st.tokens.write().insert(token.clone());
    ok(json!({ "token": token, "user": user }))
}

async fn register(State(st): State<Arc<TestState>>, Json(body): Json<Value>) -> impl IntoResponse {
    if body.get("email").and_then(|v| v.as_str()).unwrap_or("").is_empty() {
        return err(StatusCode::BAD_REQUEST, "validation_error", "email required");
    }
    let n = st.issued.fetch_add(1, Ordering::SeqCst);
    ok(json!({ "userId": format!("u-reg-{}", n) }))
}

async fn verify_otp(State(st): State<Arc<TestState>>, Json(body): Json<Value>) -> impl IntoResponse {
    let email = body.get("email").and_then(|v| v.as_str()).unwrap_or("");
    match body.get("otp").and_then(|v| v.as_str()).unwrap_or("") {
        OTP_VALID => {
            let n = st.issued.fetch_add(1, Ordering::SeqCst);
            let token = format!("tok-{}-{}", email, n);
            st.tokens.write().insert(token.clone());
            let user = user_for_email(email).unwrap_or_else(|| patient_json("u-new", email));
            ok(json!({ "token": token, "user": user }))
        }
        OTP_EXPIRED => err(StatusCode::GONE, "otp_expired", "the code has expired"),
        _ => err(StatusCode::UNPROCESSABLE_ENTITY, "invalid_otp", "wrong code"),
    }
}

async fn resend_otp(State(st): State<Arc<TestState>>) -> impl IntoResponse {
    if st.resend_limited.load(Ordering::SeqCst) {
        return err(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "wait 60 seconds before requesting another code",
        );
    }
    ok(Value::Null)
}

async fn refresh(State(st): State<Arc<TestState>>, headers: HeaderMap) -> impl IntoResponse {
    let old = match guard(&st, &headers) {
        Ok(t) => t,
        Err(e) => return e,
    };
    st.tokens.write().remove(&old);
    let n = st.issued.fetch_add(1, Ordering::SeqCst);
    let token = format!("tok-rotated-{}", n);
    st.tokens.write().insert(token.clone());
    ok(json!({ "token": token, "user": patient_json("u-pat", "pat@x.com") }))
}

async fn me(State(st): State<Arc<TestState>>, headers: HeaderMap) -> impl IntoResponse {
    let token = match guard(&st, &headers) {
        Ok(t) => t,
        Err(e) => return e,
    };
    // Token encodes the email it was issued for.
    let email = token
        .strip_prefix("tok-")
        .and_then(|rest| rest.rsplit_once('-').map(|(e, _)| e))
        .unwrap_or("pat@x.com");
    ok(user_for_email(email).unwrap_or_else(|| patient_json("u-pat", email)))
}

async fn logout(State(st): State<Arc<TestState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(t) = bearer(&headers) {
        st.tokens.write().remove(&t);
    }
    ok(Value::Null)
}

async fn sos_nearby(
    State(st): State<Arc<TestState>>,
    Query(_q): Query<std::collections::HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(e) = guard(&st, &headers) {
        return e;
    }
    let requests = st.sos_requests.read().clone();
    ok(json!({ "sosRequests": requests, "pharmacy": { "lat": 6.5, "lng": 3.3 } }))
}

async fn sos_respond(
    State(st): State<Arc<TestState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(e) = guard(&st, &headers) {
        return e;
    }
    ok(Value::Null)
}

async fn unread_count(State(st): State<Arc<TestState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(e) = guard(&st, &headers) {
        return e;
    }
    if st.count_degraded.load(Ordering::SeqCst) {
        return (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "error": { "code": "validation_error", "message": "counts unavailable" }
            })),
        );
    }
    ok(json!({ "count": st.unread.load(Ordering::SeqCst) }))
}

async fn list_notifications(State(st): State<Arc<TestState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(e) = guard(&st, &headers) {
        return e;
    }
    ok(Value::Array(st.notifications.read().clone()))
}

async fn mark_read(
    State(st): State<Arc<TestState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(e) = guard(&st, &headers) {
        return e;
    }
    if st.fail_mark_read.load(Ordering::SeqCst) {
        return err(StatusCode::INTERNAL_SERVER_ERROR, "internal", "boom");
    }
    ok(Value::Null)
}

async fn read_all(State(st): State<Arc<TestState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(e) = guard(&st, &headers) {
        return e;
    }
    st.read_all_calls.fetch_add(1, Ordering::SeqCst);
    if st.fail_read_all.load(Ordering::SeqCst) {
        return err(StatusCode::INTERNAL_SERVER_ERROR, "internal", "boom");
    }
    st.unread.store(0, Ordering::SeqCst);
    ok(Value::Null)
}

pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(TestState::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/resend-otp", post(resend_otp))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/pharmacy/sos/nearby", get(sos_nearby))
        .route("/api/pharmacy/sos/{id}/respond", post(sos_respond))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/read-all", patch(read_all))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockBackend { base: format!("http://{}/api/", addr), state }
}

//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the auth flows, the
//! HTTP boundary and the pollers, along with classification helpers that map
//! backend status/code pairs into the taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    InvalidCredentials { message: String },
    EmailNotVerified { email: String, user_id: String, message: String },
    InvalidOtp { message: String },
    OtpExpired { message: String },
    RateLimited { message: String },
    Unauthorized { message: String },
    NetworkError { message: String },
    ValidationError { field: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials { .. } => "invalid_credentials",
            AppError::EmailNotVerified { .. } => "email_not_verified",
            AppError::InvalidOtp { .. } => "invalid_otp",
            AppError::OtpExpired { .. } => "otp_expired",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Unauthorized { .. } => "unauthorized",
            AppError::NetworkError { .. } => "network_error",
            AppError::ValidationError { .. } => "validation_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidCredentials { message }
            | AppError::EmailNotVerified { message, .. }
            | AppError::InvalidOtp { message }
            | AppError::OtpExpired { message }
            | AppError::RateLimited { message }
            | AppError::Unauthorized { message }
            | AppError::NetworkError { message }
            | AppError::ValidationError { message, .. } => message.as_str(),
        }
    }

    pub fn invalid_credentials<S: Into<String>>(msg: S) -> Self { AppError::InvalidCredentials { message: msg.into() } }
    pub fn email_not_verified<S: Into<String>>(email: S, user_id: S) -> Self {
        AppError::EmailNotVerified {
            email: email.into(),
            user_id: user_id.into(),
            message: "email not verified; complete OTP verification first".into(),
        }
    }
    pub fn invalid_otp<S: Into<String>>(msg: S) -> Self { AppError::InvalidOtp { message: msg.into() } }
    pub fn otp_expired<S: Into<String>>(msg: S) -> Self { AppError::OtpExpired { message: msg.into() } }
    pub fn rate_limited<S: Into<String>>(msg: S) -> Self { AppError::RateLimited { message: msg.into() } }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { AppError::Unauthorized { message: msg.into() } }
    pub fn network<S: Into<String>>(msg: S) -> Self { AppError::NetworkError { message: msg.into() } }
    pub fn validation<S: Into<String>>(field: S, msg: S) -> Self { AppError::ValidationError { field: field.into(), message: msg.into() } }

    /// HTTP status this error corresponds to when it originated at the backend.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidCredentials { .. } => 401,
            AppError::EmailNotVerified { .. } => 403,
            AppError::InvalidOtp { .. } => 422,
            AppError::OtpExpired { .. } => 410,
            AppError::RateLimited { .. } => 429,
            AppError::Unauthorized { .. } => 401,
            AppError::NetworkError { .. } => 503,
            AppError::ValidationError { .. } => 400,
        }
    }

    /// Classify a backend failure from its HTTP status and envelope error code.
    /// 429 always wins with a human-readable message so sensitive endpoints
    /// (OTP resend, password reset) never show a generic failure. Codes that
    /// need extra context (email_not_verified) are assembled at the call site,
    /// not here.
    pub fn classify(status: u16, code: Option<&str>, message: Option<&str>) -> Self {
        let msg = |fallback: &str| message.unwrap_or(fallback).to_string();
        if status == 429 {
            return AppError::RateLimited {
                message: msg("too many attempts, please wait a moment before retrying"),
            };
        }
        match code {
            Some("invalid_credentials") => AppError::InvalidCredentials { message: msg("invalid email or password") },
            Some("invalid_otp") => AppError::InvalidOtp { message: msg("the code entered is not valid") },
            Some("otp_expired") => AppError::OtpExpired { message: msg("the code has expired, request a new one") },
            Some("validation_error") => AppError::ValidationError { field: String::new(), message: msg("invalid request") },
            _ if status == 401 => AppError::Unauthorized { message: msg("session expired") },
            Some(other) => AppError::NetworkError { message: format!("{}: {}", other, msg("request failed")) },
            None => AppError::NetworkError { message: format!("HTTP {}: {}", status, msg("request failed")) },
        }
    }

    pub fn is_unauthorized(&self) -> bool { matches!(self, AppError::Unauthorized { .. }) }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures only; HTTP error statuses are classified
        // at the envelope layer before this conversion can run.
        AppError::NetworkError { message: err.to_string() }
    }
}

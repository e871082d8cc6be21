//! Feed error taxonomy.
//!
//! Every failure a caller can observe funnels through [`FeedError`]. Transport
//! failures and non-success statuses are mapped exactly once, at the feed
//! boundary; credential refresh failures are surfaced unmapped as
//! [`FeedError::CredentialRefresh`].

use std::fmt::{Display, Formatter};

use serde::Deserialize;
use thiserror::Error;

/// Categorical error code derived from the upstream HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    BadRequest,
    Forbidden,
    NotFound,
    RequestEntityTooLarge,
    UnsupportedMedia,
    TooManyRequests,
    InternalServerError,
    NotImplemented,
    ServiceUnavailable,
    Unknown,
}

impl FaultCode {
    /// Fixed status table; anything outside it maps to `Unknown`.
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            413 => Self::RequestEntityTooLarge,
            415 => Self::UnsupportedMedia,
            429 => Self::TooManyRequests,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            503 => Self::ServiceUnavailable,
            _ => Self::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            // Wire constant kept as upstream emits it.
            Self::RequestEntityTooLarge => "REQUEST_ENTITY_TO_LARGE",
            Self::UnsupportedMedia => "UNSUPPORTED_MEDIA",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl Display for FaultCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream error code; providers emit numbers or strings interchangeably.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(code) => write!(f, "{code}"),
            Self::Text(code) => f.write_str(code),
        }
    }
}

impl From<u16> for ErrorCode {
    fn from(status: u16) -> Self {
        Self::Number(i64::from(status))
    }
}

/// Structured detail row propagated from an upstream error body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub message: String,
}

/// Top-level error type for feed operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedError {
    /// Transport failure or non-success status, mapped through the fixed
    /// status table. `code` defaults to 500 when the transport supplies none.
    #[error("{name} [{code}]: {message}")]
    Transport {
        name: FaultCode,
        code: ErrorCode,
        message: String,
        target: Option<String>,
        details: Vec<ErrorDetail>,
    },

    /// A success response carried a null or empty body.
    #[error("response body was empty")]
    EmptyResponse,

    /// Construction-time validation; no network call was attempted.
    #[error("a base URL is required")]
    MissingBaseUrl,

    /// Credential refresh failed; surfaced unmapped from the provider.
    #[error("credential refresh failed: {0}")]
    CredentialRefresh(#[from] AuthError),

    /// The body parsed, but not into the shape the operation requires.
    #[error("unexpected payload shape: {0}")]
    UnexpectedPayload(String),

    /// A server-issued next-page link could not be split into path and query.
    #[error("next link could not be parsed: {0}")]
    InvalidNextLink(String),
}

/// OData-style error envelope: `{"error": {"code", "message", "target", "details"}}`.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamError,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: Option<String>,
    target: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

impl FeedError {
    /// Maps a non-success status plus its raw body into one categorized error.
    /// The upstream error body is consulted for message, target and details;
    /// the categorical name and `code` always follow the numeric status, even
    /// when the body carries its own `error.code`.
    pub fn from_status(status: u16, body: &str) -> Self {
        let upstream = serde_json::from_str::<UpstreamErrorBody>(body)
            .ok()
            .map(|envelope| envelope.error);

        let message = upstream
            .as_ref()
            .and_then(|error| error.message.clone())
            .unwrap_or_else(|| format!("upstream returned status {status}"));

        Self::Transport {
            name: FaultCode::from_status(status),
            code: ErrorCode::from(status),
            message,
            target: upstream.as_ref().and_then(|error| error.target.clone()),
            details: upstream.map(|error| error.details).unwrap_or_default(),
        }
    }

    /// Maps a transport-level failure (no status available) to the
    /// service-unavailable category.
    pub fn from_transport(error: crate::http_client::HttpError) -> Self {
        Self::Transport {
            name: FaultCode::ServiceUnavailable,
            code: ErrorCode::Number(503),
            message: error.message().to_owned(),
            target: None,
            details: Vec::new(),
        }
    }
}

/// Errors raised by the credential provider. These never pass through the
/// status table; the feed wraps them verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token endpoint request failed: {0}")]
    Transport(String),

    #[error("token endpoint returned status {status}: {body}")]
    TokenEndpointStatus { status: u16, body: String },

    #[error("token response could not be parsed: {0}")]
    MalformedTokenResponse(String),

    #[error("credential holds no token")]
    MissingToken,
}

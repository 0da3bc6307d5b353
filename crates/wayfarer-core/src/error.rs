//! Gateway error types.
//!
//! [`ConnectivityError`] covers a health probe that never got a usable
//! answer. [`ChatError`] is returned by every failed chat request. Both keep
//! their causes as text so they can cross task boundaries and be compared in
//! tests.

/// The backend could not be reached, or it answered the health probe with
/// something other than a readiness report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectivityError {
    /// No HTTP response at all (refused connection, DNS failure, reset).
    #[error("Cannot connect to backend server. Make sure it's running on {base_url}")]
    Network { base_url: String, reason: String },

    /// The health endpoint answered with a non-2xx status.
    #[error("Backend server is not responding properly")]
    BadStatus(u16),

    /// The health endpoint answered 2xx with a body that is not a readiness report.
    #[error("Backend server is not responding properly")]
    Malformed(String),
}

/// Failure of a single chat request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Non-2xx answer, with the server's `detail` when it supplied one.
    #[error("{}", request_failed_message(.status, .detail))]
    RequestFailed { status: u16, detail: Option<String> },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(String),

    /// 2xx answer whose body does not carry a `response` text.
    #[error("Invalid response from backend: {0}")]
    MalformedResponse(String),
}

fn request_failed_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("Request failed with status {}", status),
    }
}

// ABOUTME: Structured error types for the WHOOP retrieval layer
// ABOUTME: Maps HTTP statuses to a small taxonomy with distinct process exit codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the retrieval layer.
//!
//! Transient statuses (429/5xx) are retried inside the request executor and
//! only surface here once retries are exhausted. Pagination-cap truncation is
//! deliberately a warning, not an error: a partial result set is still valid.

use crate::constants::RETRYABLE_STATUS_CODES;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit code for general failures
pub const EXIT_GENERAL: i32 = 1;
/// Process exit code for authentication failures
pub const EXIT_AUTH: i32 = 2;
/// Process exit code for rate limiting
pub const EXIT_RATE_LIMIT: i32 = 3;

/// Errors surfaced by the WHOOP client and its collaborators
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable local session; the caller should run the login flow
    #[error("no WHOOP session available: {reason}")]
    AuthRequired {
        /// Why a token could not be produced
        reason: String,
    },

    /// HTTP 401 from the API; never retried
    #[error("authentication failed: access token expired or invalid")]
    AuthenticationFailed,

    /// HTTP 429 persisting after retries were exhausted
    #[error("rate limit exceeded - try again later")]
    RateLimitExceeded,

    /// Any other non-2xx status, or a retryable status after exhausted retries
    #[error("API request failed with status {status}")]
    RequestFailed {
        /// HTTP status code observed on the final attempt
        status: u16,
    },

    /// Transport failure or undecodable response body
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Caller-supplied input that could not be interpreted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected internal failure (e.g. a fetch task panicked)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a non-2xx status observed on the final attempt
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            429 => Self::RateLimitExceeded,
            _ => Self::RequestFailed { status },
        }
    }

    /// Whether a status is transient and worth another attempt
    #[must_use]
    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUS_CODES.contains(&status)
    }

    /// Distinct process exit code per user-visible error kind
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::AuthRequired { .. } | Self::AuthenticationFailed => EXIT_AUTH,
            Self::RateLimitExceeded => EXIT_RATE_LIMIT,
            Self::RequestFailed { .. }
            | Self::Http(_)
            | Self::InvalidArgument(_)
            | Self::Internal(_) => EXIT_GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            Error::from_status(401),
            Error::AuthenticationFailed
        ));
        assert!(matches!(Error::from_status(429), Error::RateLimitExceeded));
        assert!(matches!(
            Error::from_status(404),
            Error::RequestFailed { status: 404 }
        ));
    }

    #[test]
    fn retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(Error::is_retryable_status(status), "{status} should retry");
        }
        for status in [400, 401, 403, 404, 501] {
            assert!(
                !Error::is_retryable_status(status),
                "{status} should not retry"
            );
        }
    }

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        assert_eq!(Error::AuthenticationFailed.exit_code(), EXIT_AUTH);
        assert_eq!(
            Error::AuthRequired {
                reason: "no credentials file".to_owned()
            }
            .exit_code(),
            EXIT_AUTH
        );
        assert_eq!(Error::RateLimitExceeded.exit_code(), EXIT_RATE_LIMIT);
        assert_eq!(Error::RequestFailed { status: 500 }.exit_code(), EXIT_GENERAL);
    }
}

// ABOUTME: API constants and environment-based configuration for the WHOOP client
// ABOUTME: Endpoint paths, retry tuning, pagination cap, and day-boundary convention
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constants for the WHOOP developer API and the retrieval layer's tuning knobs.

/// Production base URL for the WHOOP developer API (v1)
pub const DEFAULT_BASE_URL: &str = "https://api.prod.whoop.com/developer/v1";

/// OAuth token endpoint used by the file-backed token store for refreshes
pub const DEFAULT_TOKEN_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/token";

/// Fixed client-identifier header sent with every request
pub const USER_AGENT: &str = "whoop-sync/1.0";

/// HTTP statuses that are retried with exponential backoff
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Additional attempts after the first failed request (4 attempts total)
pub const MAX_RETRIES: u32 = 3;

/// Base backoff delay in milliseconds, doubled after each retry
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

/// Hard cap on pages fetched per domain, regardless of server cursors
pub const MAX_PAGES: u32 = 50;

/// Default page size when the caller does not specify a limit
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// WHOOP's physiological day starts at 04:00 UTC, not calendar midnight
pub const WHOOP_DAY_BOUNDARY_HOUR: u32 = 4;

/// Default request timeout in seconds for the shared HTTP client
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds for the shared HTTP client
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Read and revocation endpoint paths, relative to the API base URL
pub mod endpoints {
    /// User profile (singleton)
    pub const PROFILE: &str = "user/profile/basic";
    /// Body measurements (singleton)
    pub const BODY: &str = "user/measurement/body";
    /// Sleep activities (paginated)
    pub const SLEEP: &str = "activity/sleep";
    /// Recovery scores (paginated)
    pub const RECOVERY: &str = "recovery";
    /// Workouts (paginated)
    pub const WORKOUT: &str = "activity/workout";
    /// Physiological cycles (paginated)
    pub const CYCLE: &str = "cycle";
    /// Access revocation (DELETE)
    pub const REVOKE: &str = "user/access";

    /// Single sleep record by UUID
    #[must_use]
    pub fn sleep_by_id(id: &str) -> String {
        format!("{SLEEP}/{id}")
    }

    /// Single workout record by UUID
    #[must_use]
    pub fn workout_by_id(id: &str) -> String {
        format!("{WORKOUT}/{id}")
    }

    /// Single cycle record by integer ID
    #[must_use]
    pub fn cycle_by_id(id: i64) -> String {
        format!("{CYCLE}/{id}")
    }

    /// Sleep record linked to a cycle
    #[must_use]
    pub fn cycle_sleep(cycle_id: i64) -> String {
        format!("{CYCLE}/{cycle_id}/sleep")
    }

    /// Recovery record linked to a cycle
    #[must_use]
    pub fn cycle_recovery(cycle_id: i64) -> String {
        format!("{CYCLE}/{cycle_id}/recovery")
    }
}

/// Environment-based configuration with defaults
pub mod env_config {
    use std::env;

    /// API base URL override, falling back to the production URL
    #[must_use]
    pub fn base_url() -> String {
        env::var("WHOOP_API_BASE_URL").unwrap_or_else(|_| super::DEFAULT_BASE_URL.to_owned())
    }

    /// OAuth token endpoint override, used by the token store for refreshes
    #[must_use]
    pub fn token_url() -> String {
        env::var("WHOOP_TOKEN_URL").unwrap_or_else(|_| super::DEFAULT_TOKEN_URL.to_owned())
    }

    /// Request timeout in seconds
    #[must_use]
    pub fn request_timeout_secs() -> u64 {
        env::var("WHOOP_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(super::DEFAULT_TIMEOUT_SECS)
    }

    /// Connection timeout in seconds
    #[must_use]
    pub fn connect_timeout_secs() -> u64 {
        env::var("WHOOP_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(super::DEFAULT_CONNECT_TIMEOUT_SECS)
    }
}

// ABOUTME: WHOOP API client: request executor with retry/backoff, paginator, and orchestrator
// ABOUTME: Fans one fetch task out per requested domain and merges results into a snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The resilient retrieval layer.
//!
//! [`WhoopClient::request`] performs one authenticated call with bounded
//! retry and exponential backoff. [`WhoopClient::fetch_all_pages`] drives it
//! across continuation tokens up to a hard page cap. [`WhoopClient::fetch`]
//! spawns one task per requested domain, waits for all of them, and merges
//! the outputs into a [`Snapshot`]. Any unrecovered per-domain error fails
//! the composite fetch; partial sibling results are discarded.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::auth::TokenSource;
use crate::constants::{
    self, endpoints, env_config, DEFAULT_PAGE_LIMIT, MAX_PAGES, MAX_RETRIES, RETRY_BASE_DELAY_MS,
};
use crate::errors::{Error, Result};
use crate::models::{
    BodyMeasurement, Cycle, Domain, PaginatedResponse, Recovery, SleepActivity, Snapshot,
    UserProfile, Workout,
};
use crate::range::QueryWindow;

/// Retry tuning for the request executor.
///
/// Defaults match the API contract (4 attempts, 1 s base backoff); tests
/// shrink the base delay instead of mocking the clock.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each attempt
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

/// Per-call options for composite fetches
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Page size requested from the API; must be positive
    pub limit: u32,
    /// Follow continuation tokens to exhaustion (subject to the page cap)
    pub fetch_all: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            fetch_all: true,
        }
    }
}

/// Output of one domain fetch task, tagged so the merge is exhaustive
enum DomainPayload {
    Profile(UserProfile),
    Body(BodyMeasurement),
    Sleep(Vec<SleepActivity>),
    Recovery(Vec<Recovery>),
    Workout(Vec<Workout>),
    Cycle(Vec<Cycle>),
}

/// Authenticated WHOOP API client.
///
/// Cheap to clone: the HTTP client pools connections internally and the
/// token source is shared behind an `Arc`. Cloning is how the orchestrator
/// hands the client to per-domain tasks.
#[derive(Clone)]
pub struct WhoopClient {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn TokenSource>,
    retry: RetryConfig,
}

impl WhoopClient {
    /// Create a client against the configured base URL with default retry tuning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] when the underlying HTTP client cannot be built.
    pub fn new(auth: Arc<dyn TokenSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(env_config::request_timeout_secs()))
            .connect_timeout(Duration::from_secs(env_config::connect_timeout_secs()))
            .build()?;

        Ok(Self {
            client,
            base_url: env_config::base_url(),
            auth,
            retry: RetryConfig::default(),
        })
    }

    /// Override the API base URL (tests point this at a mock server)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override retry tuning
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Execute one authenticated GET with bounded retry and backoff.
    ///
    /// The bearer token is acquired once per call (not per attempt); retries
    /// reuse it. Statuses 429/500/502/503/504 are retried up to the
    /// configured limit with doubling delays; 401 is never retried.
    ///
    /// # Errors
    ///
    /// [`Error::AuthenticationFailed`] on 401, [`Error::RateLimitExceeded`]
    /// on a final-attempt 429, [`Error::RequestFailed`] for other non-2xx
    /// statuses, [`Error::Http`] for transport or decode failures.
    #[instrument(skip(self, window))]
    pub async fn request<T>(&self, endpoint: &str, window: Option<&QueryWindow>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let token = self.auth.access_token().await?;
        let url = self.url_for(endpoint);

        let mut delay = self.retry.base_delay;
        let mut attempt: u32 = 0;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(USER_AGENT, constants::USER_AGENT)
                .header(CONTENT_TYPE, "application/json");
            if let Some(window) = window {
                request = request.query(&window.query_pairs());
            }

            let response = request.send().await?;
            let status = response.status();
            debug!(status = status.as_u16(), attempt, "WHOOP API response");

            if status.is_success() {
                return Ok(response.json().await?);
            }

            let code = status.as_u16();
            if Error::is_retryable_status(code) && attempt < self.retry.max_retries {
                attempt += 1;
                warn!(
                    status = code,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient API failure - backing off before retry"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                continue;
            }

            return Err(Error::from_status(code));
        }
    }

    /// Execute one authenticated DELETE; 204 and any other 2xx are success.
    ///
    /// # Errors
    ///
    /// [`Error::RequestFailed`] for any non-2xx status.
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        let token = self.auth.access_token().await?;
        let url = self.url_for(endpoint);

        let response = self
            .client
            .delete(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(USER_AGENT, constants::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Error::RequestFailed {
            status: status.as_u16(),
        })
    }

    /// Assemble a full result set for one paginated endpoint.
    ///
    /// Threads the server's continuation token through successive calls,
    /// appending records in arrival order. Stops when `fetch_all` is false
    /// (first page only), the server omits a token, or the hard page cap is
    /// reached - the cap logs a truncation warning and returns the partial
    /// accumulation rather than failing, so a misbehaving backend cannot
    /// drive an unbounded loop.
    ///
    /// # Errors
    ///
    /// Propagates the first unrecovered executor error.
    pub async fn fetch_all_pages<T>(
        &self,
        endpoint: &str,
        window: &QueryWindow,
        fetch_all: bool,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages: u32 = 0;

        loop {
            if pages >= MAX_PAGES {
                warn!(
                    endpoint,
                    pages = MAX_PAGES,
                    "pagination cap reached - returning partial result"
                );
                break;
            }

            let mut page_window = window.clone();
            page_window.next_token = next_token.take();

            let page: PaginatedResponse<T> = self.request(endpoint, Some(&page_window)).await?;
            records.extend(page.records);
            pages += 1;

            next_token = if fetch_all { page.next_token } else { None };
            if next_token.is_none() {
                break;
            }
        }

        Ok(records)
    }

    /// Fetch the user profile (single record)
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_profile(&self) -> Result<UserProfile> {
        self.request(Domain::Profile.endpoint(), None).await
    }

    /// Fetch body measurements (single record)
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_body(&self) -> Result<BodyMeasurement> {
        self.request(Domain::Body.endpoint(), None).await
    }

    /// Fetch sleep activities over a window
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::fetch_all_pages`].
    pub async fn get_sleep(
        &self,
        window: &QueryWindow,
        fetch_all: bool,
    ) -> Result<Vec<SleepActivity>> {
        self.fetch_all_pages(Domain::Sleep.endpoint(), window, fetch_all)
            .await
    }

    /// Fetch recovery records over a window
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::fetch_all_pages`].
    pub async fn get_recovery(
        &self,
        window: &QueryWindow,
        fetch_all: bool,
    ) -> Result<Vec<Recovery>> {
        self.fetch_all_pages(Domain::Recovery.endpoint(), window, fetch_all)
            .await
    }

    /// Fetch workouts over a window
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::fetch_all_pages`].
    pub async fn get_workout(&self, window: &QueryWindow, fetch_all: bool) -> Result<Vec<Workout>> {
        self.fetch_all_pages(Domain::Workout.endpoint(), window, fetch_all)
            .await
    }

    /// Fetch physiological cycles over a window
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::fetch_all_pages`].
    pub async fn get_cycle(&self, window: &QueryWindow, fetch_all: bool) -> Result<Vec<Cycle>> {
        self.fetch_all_pages(Domain::Cycle.endpoint(), window, fetch_all)
            .await
    }

    /// Fetch a single sleep record by UUID
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_sleep_by_id(&self, id: &str) -> Result<SleepActivity> {
        self.request(&endpoints::sleep_by_id(id), None).await
    }

    /// Fetch a single workout by UUID
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_workout_by_id(&self, id: &str) -> Result<Workout> {
        self.request(&endpoints::workout_by_id(id), None).await
    }

    /// Fetch a single cycle by integer ID
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_cycle_by_id(&self, id: i64) -> Result<Cycle> {
        self.request(&endpoints::cycle_by_id(id), None).await
    }

    /// Fetch the sleep record linked to a cycle
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_sleep_for_cycle(&self, cycle_id: i64) -> Result<SleepActivity> {
        self.request(&endpoints::cycle_sleep(cycle_id), None).await
    }

    /// Fetch the recovery record linked to a cycle
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::request`].
    pub async fn get_recovery_for_cycle(&self, cycle_id: i64) -> Result<Recovery> {
        self.request(&endpoints::cycle_recovery(cycle_id), None).await
    }

    /// Revoke this client's API access (DELETE, succeeds on 204/2xx)
    ///
    /// # Errors
    ///
    /// See [`WhoopClient::delete`].
    pub async fn revoke_access(&self) -> Result<()> {
        self.delete(endpoints::REVOKE).await
    }

    /// Composite fetch: one concurrent task per requested domain, join-all,
    /// merged into a timestamped [`Snapshot`].
    ///
    /// Single-record domains issue exactly one call; collection domains run
    /// through the paginator with the options' `limit` and `fetch_all`.
    /// Domains are deduplicated; unrequested snapshot fields stay unset.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the limit is zero, before any request
    /// is issued. Otherwise fails as a whole if any domain task fails - the
    /// first unrecovered error (in a fixed domain order) propagates and
    /// partial sibling results are discarded. A caller never receives a
    /// snapshot silently missing a requested domain.
    #[instrument(skip(self, domains, window, options), fields(domain_count = domains.len()))]
    pub async fn fetch(
        &self,
        domains: &[Domain],
        window: &QueryWindow,
        options: &FetchOptions,
    ) -> Result<Snapshot> {
        if options.limit == 0 {
            return Err(Error::InvalidArgument(
                "limit must be a positive integer".to_owned(),
            ));
        }

        let window = window.clone().with_limit(options.limit);
        let fetch_all = options.fetch_all;

        let mut handles = Vec::with_capacity(domains.len());
        for domain in Domain::ALL {
            if !domains.contains(&domain) {
                continue;
            }
            let client = self.clone();
            let window = window.clone();
            handles.push((
                domain,
                tokio::spawn(async move { client.fetch_domain(domain, &window, fetch_all).await }),
            ));
        }

        // Wait for every task to settle before inspecting any outcome
        let (domains, joins): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let outcomes = join_all(joins).await;

        let mut snapshot = Snapshot::stamped_now();
        for (domain, outcome) in domains.into_iter().zip(outcomes) {
            let payload = outcome
                .map_err(|e| Error::Internal(format!("{} fetch task failed: {e}", domain.as_str())))??;
            match payload {
                DomainPayload::Profile(profile) => snapshot.profile = Some(profile),
                DomainPayload::Body(body) => snapshot.body = Some(body),
                DomainPayload::Sleep(sleep) => snapshot.sleep = Some(sleep),
                DomainPayload::Recovery(recovery) => snapshot.recovery = Some(recovery),
                DomainPayload::Workout(workout) => snapshot.workout = Some(workout),
                DomainPayload::Cycle(cycle) => snapshot.cycle = Some(cycle),
            }
        }

        snapshot.fetched_at = chrono::Utc::now();
        Ok(snapshot)
    }

    /// Fetch one domain; the closed enum keeps this dispatch exhaustive
    async fn fetch_domain(
        &self,
        domain: Domain,
        window: &QueryWindow,
        fetch_all: bool,
    ) -> Result<DomainPayload> {
        match domain {
            Domain::Profile => Ok(DomainPayload::Profile(self.get_profile().await?)),
            Domain::Body => Ok(DomainPayload::Body(self.get_body().await?)),
            Domain::Sleep => Ok(DomainPayload::Sleep(self.get_sleep(window, fetch_all).await?)),
            Domain::Recovery => Ok(DomainPayload::Recovery(
                self.get_recovery(window, fetch_all).await?,
            )),
            Domain::Workout => Ok(DomainPayload::Workout(
                self.get_workout(window, fetch_all).await?,
            )),
            Domain::Cycle => Ok(DomainPayload::Cycle(self.get_cycle(window, fetch_all).await?)),
        }
    }
}

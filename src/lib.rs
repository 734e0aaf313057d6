// ABOUTME: Library root for the whoop-sync WHOOP API client
// ABOUTME: Exposes the retrieval layer (executor, paginator, orchestrator) and its collaborators
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilient retrieval and aggregation layer for WHOOP health data.
//!
//! The interesting machinery lives in [`client`]: an authenticated request
//! executor with bounded retry/backoff, a cursor-threading paginator with a
//! hard page cap, and a composite orchestrator that fans one fetch task out
//! per requested domain and merges the results into a single [`models::Snapshot`].
//!
//! Token acquisition is delegated to an injected [`auth::TokenSource`] so the
//! HTTP layer never touches the credential store directly.

pub mod auth;
pub mod client;
pub mod constants;
pub mod errors;
pub mod models;
pub mod range;

pub use client::{FetchOptions, RetryConfig, WhoopClient};
pub use errors::{Error, Result};
pub use models::{Domain, Snapshot};
pub use range::{QueryWindow, RangeSelector};

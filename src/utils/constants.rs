//! Shared configuration constants for the extraction pipeline
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Identifying user agent sent with every page load
///
/// Pages see a regular desktop Chrome so that servers do not hand a stripped
/// "bot" variant of their markup to the extractor.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Preferred content language header sent with every page load
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Default per-page navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default number of extractions allowed to run at once against the shared browser
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default lifetime of a cached successful result (1 hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default upper bound on cached results before eviction kicks in
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Request body cap for the HTTP API (50 MB)
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Rate limit: requests allowed per client IP per window
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;

/// Rate limit window (15 minutes)
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

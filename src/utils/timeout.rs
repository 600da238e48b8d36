//! Timeout validation utilities for browser operations

use std::time::Duration;

use super::errors::ConfigError;

/// Maximum timeout for browser navigation operations (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000; // 5 minutes

/// Validate timeout for page navigation
///
/// # Arguments
/// * `timeout_ms` - Optional timeout in milliseconds
/// * `default_ms` - Default timeout if None provided
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(ConfigError)` - If timeout is zero or exceeds MAX_NAVIGATION_TIMEOUT_MS
///
/// # Example
/// ```rust
/// use metatag_scraper::utils::validate_navigation_timeout;
///
/// let timeout = validate_navigation_timeout(Some(45000), 30000).unwrap();
/// assert_eq!(timeout.as_millis(), 45000);
/// ```
pub fn validate_navigation_timeout(
    timeout_ms: Option<u64>,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let ms = timeout_ms.unwrap_or(default_ms);

    if ms == 0 {
        return Err(ConfigError::Invalid {
            field: "scrape.navigation_timeout_ms",
            reason: "timeout must be greater than zero".to_string(),
        });
    }

    if ms > MAX_NAVIGATION_TIMEOUT_MS {
        return Err(ConfigError::Invalid {
            field: "scrape.navigation_timeout_ms",
            reason: format!(
                "timeout cannot exceed {}ms ({} minutes). Received: {}ms ({:.1} minutes)",
                MAX_NAVIGATION_TIMEOUT_MS,
                MAX_NAVIGATION_TIMEOUT_MS / 60_000,
                ms,
                ms as f64 / 60_000.0
            ),
        });
    }

    Ok(Duration::from_millis(ms))
}

//! URL normalization for incoming batches
//!
//! Every raw string from a request is parsed as an absolute URL and replaced
//! by its canonical serialization. Anything that does not parse is dropped
//! without surfacing an error; the caller simply gets a shorter batch.

use std::fmt;

use serde::Serialize;
use tracing::debug;
use url::Url;

/// Schemes that reach local or browser-internal content; never navigated to
pub const BLOCKED_SCHEMES: [&str; 6] = ["file", "javascript", "data", "about", "blob", "chrome"];

/// A validated, canonical absolute URL
///
/// The canonical string is the sole cache and dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Parse a single raw string, returning `None` when it is not a usable URL
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw.trim()).ok()?;
        if BLOCKED_SCHEMES.contains(&url.scheme()) {
            return None;
        }
        Some(Self(url.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a batch of raw strings, preserving order
///
/// Invalid entries are dropped. Duplicates are kept; deduplication is the
/// coordinator's job.
pub fn normalize_urls<I, S>(raw: I) -> Vec<NormalizedUrl>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| {
            let parsed = NormalizedUrl::parse(s.as_ref());
            if parsed.is_none() {
                debug!(raw = s.as_ref(), "Dropping invalid URL");
            }
            parsed
        })
        .collect()
}

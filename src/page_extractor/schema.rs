//! Extraction result types
//!
//! `ExtractionResult` is a sum type so the per-URL failure contract is part of
//! the signature. On the wire it keeps the flat shape clients expect:
//!
//! ```json
//! { "url": "...", "status": "success", "metaTags": [{ "name": "title", "content": "..." }] }
//! { "url": "...", "status": "error", "metaTags": [], "error": "HTTP error: 404" }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One extracted name/content pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

impl MetaTag {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Outcome of extracting one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Success { url: String, meta_tags: Vec<MetaTag> },
    Error { url: String, error: String },
}

impl ExtractionResult {
    pub fn success(url: impl Into<String>, meta_tags: Vec<MetaTag>) -> Self {
        Self::Success {
            url: url.into(),
            meta_tags,
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            url: url.into(),
            error: error.into(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Success { url, .. } | Self::Error { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Extracted tags; always empty for errors
    pub fn meta_tags(&self) -> &[MetaTag] {
        match self {
            Self::Success { meta_tags, .. } => meta_tags,
            Self::Error { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct WireRef<'a> {
    url: &'a str,
    status: Status,
    #[serde(rename = "metaTags")]
    meta_tags: &'a [MetaTag],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct WireOwned {
    url: String,
    status: Status,
    #[serde(rename = "metaTags", default)]
    meta_tags: Vec<MetaTag>,
    #[serde(default)]
    error: Option<String>,
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let status = if self.is_success() {
            Status::Success
        } else {
            Status::Error
        };
        WireRef {
            url: self.url(),
            status,
            meta_tags: self.meta_tags(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExtractionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireOwned::deserialize(deserializer)?;
        match wire.status {
            Status::Success => Ok(Self::success(wire.url, wire.meta_tags)),
            Status::Error => {
                if !wire.meta_tags.is_empty() {
                    return Err(serde::de::Error::custom(
                        "error result must not carry metaTags",
                    ));
                }
                let error = wire
                    .error
                    .ok_or_else(|| serde::de::Error::missing_field("error"))?;
                Ok(Self::failure(wire.url, error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn success_omits_error_field() {
        let result = ExtractionResult::success(
            "https://example.com/",
            vec![MetaTag::new("title", "Example")],
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "url": "https://example.com/",
                "status": "success",
                "metaTags": [{ "name": "title", "content": "Example" }]
            })
        );
    }

    #[test]
    fn error_has_empty_tags_and_message() {
        let result = ExtractionResult::failure("https://example.com/", "HTTP error: 404");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "url": "https://example.com/",
                "status": "error",
                "metaTags": [],
                "error": "HTTP error: 404"
            })
        );
        assert!(result.meta_tags().is_empty());
    }

    #[test]
    fn rejects_error_without_message() {
        let value = json!({ "url": "https://x/", "status": "error", "metaTags": [] });
        assert!(serde_json::from_value::<ExtractionResult>(value).is_err());
    }

    #[test]
    fn rejects_error_with_tags() {
        let value = json!({
            "url": "https://x/",
            "status": "error",
            "metaTags": [{ "name": "title", "content": "t" }],
            "error": "boom"
        });
        assert!(serde_json::from_value::<ExtractionResult>(value).is_err());
    }

    #[test]
    fn parses_client_payload() {
        let value = json!({
            "url": "https://x/",
            "status": "success",
            "metaTags": [{ "name": "og:title", "content": "OG" }]
        });
        let parsed: ExtractionResult = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.meta_tags(), &[MetaTag::new("og:title", "OG")]);
        assert_eq!(parsed.error(), None);
    }
}

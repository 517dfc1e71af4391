use serde::{Deserialize, Serialize};

/// Configuration for the S3 object store.
#[derive(Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// AWS region (e.g. `"us-east-1"`).
    pub region: String,

    /// Bucket holding file payloads.
    pub bucket: String,

    /// Optional prefix prepended to every object key (e.g. `"depot/"`).
    #[serde(default)]
    pub prefix: Option<String>,

    /// Endpoint override for S3-compatible services (`MinIO`, `LocalStack`).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing. Required by most S3-compatible services.
    #[serde(default)]
    pub force_path_style: bool,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl S3Config {
    /// Create a new `S3Config` for the given region and bucket.
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            prefix: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Point the client at an S3-compatible endpoint, enabling path-style addressing.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }

    /// Apply the configured prefix to a key.
    pub(crate) fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_owned(),
        }
    }

    /// Strip the configured prefix from a listed object key.
    pub(crate) fn strip_prefix<'a>(&self, object_key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => object_key.strip_prefix(prefix.as_str()),
            None => Some(object_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_prefix() {
        let cfg = S3Config::new("us-east-1", "files");
        assert_eq!(cfg.object_key("files/abc"), "files/abc");
        assert!(!cfg.force_path_style);
    }

    #[test]
    fn prefix_applied_and_stripped() {
        let cfg = S3Config::new("us-east-1", "b").with_prefix("depot/");
        assert_eq!(cfg.object_key("files/abc"), "depot/files/abc");
        assert_eq!(cfg.strip_prefix("depot/files/abc"), Some("files/abc"));
        assert_eq!(cfg.strip_prefix("other/files/abc"), None);
    }

    #[test]
    fn endpoint_enables_path_style() {
        let cfg = S3Config::new("us-east-1", "b").with_endpoint_url("http://localhost:9000");
        assert!(cfg.force_path_style);
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn deserialize_minimal() {
        let cfg: S3Config =
            serde_json::from_str(r#"{"region":"eu-west-1","bucket":"uploads"}"#).unwrap();
        assert_eq!(cfg.bucket, "uploads");
        assert!(cfg.prefix.is_none());
        assert!(!cfg.force_path_style);
    }
}

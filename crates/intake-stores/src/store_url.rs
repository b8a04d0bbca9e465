//! Bucket/path addressing for store objects

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, StoreError};

const GCS_HOST_SUFFIX: &str = ".storage.googleapis.com";
const GCS_HOST: &str = "storage.googleapis.com";

fn bucket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9\-_.]{2,221}[a-z0-9]$").expect("bucket pattern is valid")
    })
}

/// A parsed store location: a bucket and an optional object path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreUrl {
    /// Bucket name
    pub bucket: String,
    /// Object path (or listing prefix) inside the bucket
    pub path: Option<String>,
}

impl StoreUrl {
    /// Parse `gs://bucket/path`, `bucket/path` or a storage.googleapis.com URL
    pub fn parse(raw: &str) -> Result<Self> {
        let (bucket, path) = if raw.contains("://") {
            let parsed =
                ::url::Url::parse(raw).map_err(|e| StoreError::InvalidUrl(format!("{raw}: {e}")))?;
            let host = parsed
                .host_str()
                .ok_or_else(|| StoreError::InvalidUrl(format!("{raw}: missing bucket")))?;
            let object = parsed.path().trim_start_matches('/').to_string();

            match parsed.scheme() {
                "gs" => (host.to_string(), object),
                "http" | "https" if host == GCS_HOST => match object.split_once('/') {
                    Some((bucket, rest)) => (bucket.to_string(), rest.to_string()),
                    None => (object.clone(), String::new()),
                },
                "http" | "https" => match host.strip_suffix(GCS_HOST_SUFFIX) {
                    Some(bucket) => (bucket.to_string(), object),
                    None => return Err(StoreError::InvalidUrl(format!("{raw}: not a store URL"))),
                },
                other => {
                    return Err(StoreError::InvalidUrl(format!(
                        "{raw}: unsupported scheme '{other}'"
                    )))
                }
            }
        } else {
            match raw.split_once('/') {
                Some((bucket, rest)) => (bucket.to_string(), rest.to_string()),
                None => (raw.to_string(), String::new()),
            }
        };

        if !bucket_pattern().is_match(&bucket) {
            return Err(StoreError::InvalidUrl(format!("invalid bucket name: {bucket}")));
        }

        Ok(Self {
            bucket,
            path: if path.is_empty() { None } else { Some(path) },
        })
    }

    /// Object path, or an error when the URL only names a bucket
    pub fn object(&self) -> Result<&str> {
        self.path
            .as_deref()
            .ok_or_else(|| StoreError::InvalidUrl(format!("{self} does not name an object")))
    }

    /// Listing prefix normalized to a directory (`a/b/`), empty for bucket root
    pub fn dir_prefix(&self) -> String {
        match self.path.as_deref() {
            Some(p) if p.ends_with('/') => p.to_string(),
            Some(p) => format!("{p}/"),
            None => String::new(),
        }
    }

    /// Location of an object in the same bucket
    pub fn with_object(&self, object: impl Into<String>) -> Self {
        Self {
            bucket: self.bucket.clone(),
            path: Some(object.into()),
        }
    }

    /// Last path segment, if any
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .as_deref()
            .and_then(|p| p.trim_end_matches('/').rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "gs://{}/{}", self.bucket, path),
            None => write!(f, "gs://{}", self.bucket),
        }
    }
}

//! Metadata client interface.
//!
//! The admission core never talks to a vulnerability backend directly; it
//! consumes per-digest snapshots through [`MetadataFetcher`]. Backends
//! (Grafeas, Container Analysis, ...) live behind this trait.

mod http;

pub use http::HttpMetadataFetcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::Severity;

/// A single vulnerability occurrence attached to an image digest.
///
/// Identity is the CVE id; the remaining fields are immutable per fetch.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub cve: String,
    pub severity: Severity,
    #[serde(default)]
    pub has_fix_available: bool,
}

/// Provenance of a build record: which project produced the image and who
/// triggered the build.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildProvenance {
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub creator: String,
}

/// A build record for an image digest. Provenance may be absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(default)]
    pub provenance: Option<BuildProvenance>,
}

/// Errors surfaced by metadata backends.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata response malformed: {0}")]
    Malformed(String),

    #[error("{0}")]
    Backend(String),
}

/// Abstract fetcher returning vulnerability and build metadata for a digest.
///
/// Implementations must be safe for concurrent use by distinct requests. A
/// cancelled fetch must return an error, never an empty snapshot.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// All vulnerability occurrences known for `image`.
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>, MetadataError>;

    /// All build records known for `image`.
    async fn builds(&self, image: &str) -> Result<Vec<Build>, MetadataError>;
}

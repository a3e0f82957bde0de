//! HTTP metadata service client.
//!
//! Speaks a minimal REST shape to any service exposing per-image
//! vulnerability and build listings: `GET /v1/vulnerabilities?image=<ref>`
//! and `GET /v1/builds?image=<ref>`, each returning a JSON array. Concrete
//! backend adapters (Grafeas, Container Analysis) terminate elsewhere and
//! expose this shape to the controller.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{Build, MetadataError, MetadataFetcher, Vulnerability};

pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataFetcher {
    /// `base_url` is the service root, e.g. `https://metadata.internal:8443`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        image: &str,
    ) -> Result<Vec<T>, MetadataError> {
        let url = format!("{}/v1/{}", self.base_url, path);
        let rsp = self
            .client
            .get(url)
            .query(&[("image", image)])
            .send()
            .await?;

        match rsp.status() {
            StatusCode::OK => {}
            // An image the backend has never scanned has no occurrences.
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status => {
                let body = rsp.text().await.unwrap_or_default();
                return Err(MetadataError::Backend(format!(
                    "metadata service returned {status} for {path}: {body}"
                )));
            }
        }

        rsp.json().await.map_err(|e| {
            MetadataError::Malformed(format!("decoding {path} listing: {e}"))
        })
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>, MetadataError> {
        self.get_list("vulnerabilities", image).await
    }

    async fn builds(&self, image: &str) -> Result<Vec<Build>, MetadataError> {
        self.get_list("builds", image).await
    }
}

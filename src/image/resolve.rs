//! Digest resolution for tagged image references.
//!
//! References that already carry a digest pass through untouched. Tagged
//! references are resolved against the registry's manifest endpoint; the
//! returned reference is always `registry/repository@sha256:...`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use thiserror::Error;

use super::{Reference, has_digest, parse_reference};

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.docker.distribution.manifest.v2+json";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("registry request for {image} failed: {source}")]
    Transport {
        image: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry returned {status} for {image}")]
    Registry { image: String, status: u16 },

    #[error("registry returned no content digest for {image}")]
    MissingDigest { image: String },
}

/// Resolves tagged references to content digests.
#[async_trait]
pub trait DigestResolver: Send + Sync {
    async fn resolve(&self, image: &str) -> Result<String, ResolveError>;
}

/// Resolver backed by the registry HTTP API.
///
/// A `HEAD` on the manifest endpoint returns the content digest in the
/// `Docker-Content-Digest` header without transferring the manifest body.
/// References without a registry host are returned unchanged; evaluation
/// rejects them as unqualified.
pub struct RegistryDigestResolver {
    client: reqwest::Client,
}

impl RegistryDigestResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for RegistryDigestResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DigestResolver for RegistryDigestResolver {
    async fn resolve(&self, image: &str) -> Result<String, ResolveError> {
        if has_digest(image) {
            return Ok(image.to_string());
        }
        let Some(Reference {
            registry,
            repository,
            tag,
        }) = parse_reference(image)
        else {
            return Ok(image.to_string());
        };

        let url = format!("https://{registry}/v2/{repository}/manifests/{tag}");
        let rsp = self
            .client
            .head(url)
            .header(ACCEPT, HeaderValue::from_static(MANIFEST_ACCEPT))
            .send()
            .await
            .map_err(|source| ResolveError::Transport {
                image: image.to_string(),
                source,
            })?;

        if !rsp.status().is_success() {
            return Err(ResolveError::Registry {
                image: image.to_string(),
                status: rsp.status().as_u16(),
            });
        }

        let digest = rsp
            .headers()
            .get("Docker-Content-Digest")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ResolveError::MissingDigest {
                image: image.to_string(),
            })?;

        Ok(format!("{registry}/{repository}@{digest}"))
    }
}

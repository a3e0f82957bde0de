//! Policy source interface.
//!
//! ISPs are read-only snapshots obtained per request; the reviewer never
//! watches or caches them.

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};
use thiserror::Error;

use crate::crd::ImageSecurityPolicy;

#[derive(Debug, Error)]
pub enum PolicyFetchError {
    #[error("listing ImageSecurityPolicies in {namespace}: {source}")]
    List {
        namespace: String,
        #[source]
        source: kube::Error,
    },
}

/// Returns the ISPs applicable to a namespace.
#[async_trait]
pub trait PolicyFetcher: Send + Sync {
    async fn policies_in(
        &self,
        namespace: &str,
    ) -> Result<Vec<ImageSecurityPolicy>, PolicyFetchError>;
}

/// Fetcher backed by the cluster API: lists the ISP custom resources present
/// in the namespace at admission time.
pub struct KubePolicyFetcher {
    client: Client,
}

impl KubePolicyFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyFetcher for KubePolicyFetcher {
    async fn policies_in(
        &self,
        namespace: &str,
    ) -> Result<Vec<ImageSecurityPolicy>, PolicyFetchError> {
        let api: Api<ImageSecurityPolicy> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| PolicyFetchError::List {
                namespace: namespace.to_string(),
                source,
            })?;
        Ok(list.items)
    }
}

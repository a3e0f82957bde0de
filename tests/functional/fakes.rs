//! Fake collaborators for pipeline tests.
//!
//! Each fake records how often it was consulted so tests can assert that
//! shortcuts (breakglass, update skip, unknown kinds) really bypass the
//! downstream stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;

use image_policy_controller::attestor::NoAttestors;
use image_policy_controller::crd::{ImageSecurityPolicy, ImageSecurityPolicySpec};
use image_policy_controller::image::{DigestResolver, ResolveError};
use image_policy_controller::metadata::{Build, MetadataError, MetadataFetcher, Vulnerability};
use image_policy_controller::policy::{PolicyFetchError, PolicyFetcher, Severity};
use image_policy_controller::ViolationMode;
use image_policy_controller::webhooks::{WebhookState, create_webhook_router};

#[derive(Default)]
pub struct CountingPolicies {
    pub isps: Vec<ImageSecurityPolicy>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PolicyFetcher for CountingPolicies {
    async fn policies_in(
        &self,
        _namespace: &str,
    ) -> Result<Vec<ImageSecurityPolicy>, PolicyFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.isps.clone())
    }
}

#[derive(Default)]
pub struct CountingMetadata {
    pub vulnz: Vec<Vulnerability>,
    pub builds: Vec<Build>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl MetadataFetcher for CountingMetadata {
    async fn vulnerabilities(&self, _image: &str) -> Result<Vec<Vulnerability>, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vulnz.clone())
    }

    async fn builds(&self, _image: &str) -> Result<Vec<Build>, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.builds.clone())
    }
}

pub struct PassthroughResolver;

#[async_trait]
impl DigestResolver for PassthroughResolver {
    async fn resolve(&self, image: &str) -> Result<String, ResolveError> {
        Ok(image.to_string())
    }
}

/// A webhook state over fakes, with handles kept for assertions.
pub struct TestHarness {
    pub policies: Arc<CountingPolicies>,
    pub metadata: Arc<CountingMetadata>,
    state: Arc<WebhookState>,
}

impl TestHarness {
    pub fn new(mode: ViolationMode, isps: Vec<ImageSecurityPolicy>, vulnz: Vec<Vulnerability>) -> Self {
        let policies = Arc::new(CountingPolicies {
            isps,
            calls: AtomicUsize::new(0),
        });
        let metadata = Arc::new(CountingMetadata {
            vulnz,
            builds: Vec::new(),
            calls: AtomicUsize::new(0),
        });
        let state = Arc::new(WebhookState {
            policies: policies.clone(),
            metadata: metadata.clone(),
            resolver: Arc::new(PassthroughResolver),
            attestors: Arc::new(NoAttestors),
            strategy: mode.strategy(),
            health: None,
        });
        Self {
            policies,
            metadata,
            state,
        }
    }

    pub fn router(&self) -> Router {
        create_webhook_router(self.state.clone())
    }

    pub fn policy_calls(&self) -> usize {
        self.policies.calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata.calls.load(Ordering::SeqCst)
    }
}

pub fn isp_with_max_severity(max: &str) -> ImageSecurityPolicy {
    ImageSecurityPolicy::new(
        "isp",
        ImageSecurityPolicySpec {
            maximum_severity: max.to_string(),
            ..Default::default()
        },
    )
}

pub fn vuln(cve: &str, severity: Severity, has_fix_available: bool) -> Vulnerability {
    Vulnerability {
        cve: cve.to_string(),
        severity,
        has_fix_available,
    }
}
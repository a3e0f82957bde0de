//! Request-scoped review orchestration.
//!
//! The reviewer evaluates every `(policy, image)` pair, aggregates the
//! violations in deterministic order, and hands the list to the configured
//! strategy. The returned error is what the admission pipeline converts into
//! a denial.

mod strategy;

pub use strategy::{BlockingStrategy, Denied, LoggingStrategy, ViolationStrategy};

use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use thiserror::Error;
use tracing::debug;

use crate::attestor::AttestorLookup;
use crate::crd::ImageSecurityPolicy;
use crate::metadata::MetadataFetcher;
use crate::policy::{self, EvaluateError, Violation};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("evaluating policy: {0}")]
    Evaluate(#[from] EvaluateError),

    #[error(transparent)]
    Denied(#[from] Denied),
}

pub struct Reviewer {
    metadata: Arc<dyn MetadataFetcher>,
    attestors: Arc<dyn AttestorLookup>,
    strategy: Arc<dyn ViolationStrategy>,
}

impl Reviewer {
    pub fn new(
        metadata: Arc<dyn MetadataFetcher>,
        attestors: Arc<dyn AttestorLookup>,
        strategy: Arc<dyn ViolationStrategy>,
    ) -> Self {
        Self {
            metadata,
            attestors,
            strategy,
        }
    }

    /// Review resolved images against the namespace's policies.
    ///
    /// `pod` is present only for Pod admissions and is passed through to the
    /// strategy for logging context. Policies are walked in slice order and
    /// images in input order; evaluation is sequential, so the violation list
    /// order is deterministic.
    pub async fn review(
        &self,
        images: &[String],
        isps: &[ImageSecurityPolicy],
        pod: Option<&Pod>,
    ) -> Result<(), ReviewError> {
        let mut violations: Vec<Violation> = Vec::new();
        for isp in isps {
            for image in images {
                let found = policy::evaluate(
                    isp,
                    image,
                    self.metadata.as_ref(),
                    self.attestors.as_ref(),
                )
                .await?;
                if !found.is_empty() {
                    debug!(%image, count = found.len(), "image violates policy");
                }
                violations.extend(found);
            }
        }
        self.strategy.handle_violations(pod, &violations)?;
        Ok(())
    }
}

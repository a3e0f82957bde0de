//! Violation strategies.
//!
//! A strategy sees the full violation list for a request exactly once and
//! decides whether it becomes a denial. Selection is process-level
//! configuration; there is no runtime reconfiguration.

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::policy::Violation;

/// The admission verdict produced by a blocking strategy.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct Denied(pub String);

/// Decides what happens to accumulated violations.
pub trait ViolationStrategy: Send + Sync {
    fn handle_violations(&self, pod: Option<&Pod>, violations: &[Violation]) -> Result<(), Denied>;
}

/// Logs every violation and admits the workload. The audit trail is the
/// enforcement.
pub struct LoggingStrategy;

impl ViolationStrategy for LoggingStrategy {
    fn handle_violations(&self, pod: Option<&Pod>, violations: &[Violation]) -> Result<(), Denied> {
        let pod_name = pod.map(|p| p.name_any());
        for violation in violations {
            if violation.kind.is_informational() {
                info!(pod = ?pod_name, %violation, "policy note");
            } else {
                warn!(pod = ?pod_name, %violation, "policy violation");
            }
        }
        Ok(())
    }
}

/// Logs every violation and denies on the first enforcing one.
pub struct BlockingStrategy;

impl ViolationStrategy for BlockingStrategy {
    fn handle_violations(&self, pod: Option<&Pod>, violations: &[Violation]) -> Result<(), Denied> {
        LoggingStrategy.handle_violations(pod, violations)?;
        match violations.iter().find(|v| !v.kind.is_informational()) {
            Some(violation) => Err(Denied(violation.to_string())),
            None => Ok(()),
        }
    }
}

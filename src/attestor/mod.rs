//! Attestation authority lookup seam.
//!
//! Signature verification is performed by an external signer; the evaluator
//! only asks whether a named authority holds a valid attestation for an
//! image. Lookup failures are fatal to the request, never violations.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttestorError {
    #[error("attestation authority {authority} lookup failed: {message}")]
    Lookup { authority: String, message: String },
}

/// Queries attestation authorities configured on a policy.
#[async_trait]
pub trait AttestorLookup: Send + Sync {
    /// True iff `authority` holds a valid attestation for `image`.
    async fn has_valid_attestation(
        &self,
        authority: &str,
        image: &str,
    ) -> Result<bool, AttestorError>;
}

/// Lookup used when no signer integration is deployed: no authority ever
/// attests, so evaluation always proceeds past the attestation shortcut.
pub struct NoAttestors;

#[async_trait]
impl AttestorLookup for NoAttestors {
    async fn has_valid_attestation(
        &self,
        _authority: &str,
        _image: &str,
    ) -> Result<bool, AttestorError> {
        Ok(false)
    }
}

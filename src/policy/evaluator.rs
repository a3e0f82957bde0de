//! Image Security Policy evaluation.
//!
//! `evaluate` is a pure function of the policy, the image reference, and the
//! metadata snapshots returned by the fetcher: identical inputs yield an
//! identical violation list. Fetcher and attestor failures are errors, never
//! violations, and an error never carries a partial violation list.

use thiserror::Error;
use tracing::{debug, trace};

use crate::attestor::{AttestorError, AttestorLookup};
use crate::crd::ImageSecurityPolicy;
use crate::image;
use crate::metadata::{MetadataError, MetadataFetcher};
use crate::policy::{ParseSeverityError, Severity, Violation};

#[derive(Debug, Error)]
pub enum EvaluateError {
    /// The policy itself is malformed (unparseable severity threshold).
    #[error("invalid {field} in ImageSecurityPolicy: {source}")]
    Policy {
        field: &'static str,
        #[source]
        source: ParseSeverityError,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Attestor(#[from] AttestorError),
}

/// Evaluate one `(policy, image)` pair against fetched metadata.
///
/// Preconditions are checked in order and the first match short-circuits:
/// unqualified image, image allowlist, attestation shortcut. Past those, the
/// build-provenance and vulnerability checks accumulate violations.
pub async fn evaluate(
    isp: &ImageSecurityPolicy,
    image: &str,
    metadata: &dyn MetadataFetcher,
    attestors: &dyn AttestorLookup,
) -> Result<Vec<Violation>, EvaluateError> {
    let max_severity =
        Severity::parse_or(&isp.spec.maximum_severity, Severity::Critical).map_err(|source| {
            EvaluateError::Policy {
                field: "maximumSeverity",
                source,
            }
        })?;
    let max_fix_unavailable = Severity::parse_or(
        &isp.spec.maximum_fix_unavailable_severity,
        Severity::AllowAll,
    )
    .map_err(|source| EvaluateError::Policy {
        field: "maximumFixUnavailableSeverity",
        source,
    })?;

    if !image::is_qualified(image) {
        return Ok(vec![Violation::unqualified_image(image)]);
    }

    if isp.spec.image_allowlist.iter().any(|a| a == image) {
        debug!(%image, "image is allowlisted, skipping evaluation");
        return Ok(Vec::new());
    }

    for authority in &isp.spec.attestation_authority_names {
        if attestors.has_valid_attestation(authority, image).await? {
            debug!(%image, %authority, "image carries a valid attestation");
            return Ok(Vec::new());
        }
    }

    let mut violations = Vec::new();

    if !isp.spec.built_project_ids.is_empty() {
        let builds = metadata.builds(image).await?;
        let matched = builds.iter().any(|b| {
            b.provenance
                .as_ref()
                .is_some_and(|p| isp.spec.built_project_ids.contains(&p.project_id))
        });
        if !matched {
            let offending = builds.first().and_then(|b| b.provenance.clone());
            violations.push(Violation::build_project_id(
                image,
                offending,
                &isp.spec.built_project_ids,
            ));
        }
    }

    for vuln in metadata.vulnerabilities(image).await? {
        if isp.spec.allowlist_cves.contains(&vuln.cve) {
            trace!(%image, cve = %vuln.cve, "CVE is allowlisted");
            continue;
        }
        if vuln.has_fix_available {
            if vuln.severity.exceeds(max_severity) {
                violations.push(Violation::fixes_available(image, &vuln, max_severity));
            }
        } else if vuln.severity.exceeds(max_fix_unavailable) {
            violations.push(Violation::fixes_unavailable(image, &vuln, max_fix_unavailable));
        }
    }

    Ok(violations)
}

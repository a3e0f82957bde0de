//! Violation value objects.
//!
//! A violation is one reason an image fails a policy. Violations are values:
//! the evaluator produces them, the reviewer aggregates them, and the
//! configured strategy converts them into an error at most once.

use std::fmt;

use crate::metadata::{BuildProvenance, Vulnerability};
use crate::policy::Severity;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// The image reference carries neither a digest nor a registry host.
    UnqualifiedImage,
    /// A fixable vulnerability exceeds the maximum severity.
    FixesAvailable,
    /// An unfixable vulnerability exceeds the fix-unavailable maximum.
    FixesUnavailable,
    /// Informational: a CVE was suppressed by the policy allowlist.
    AllowlistedCve,
    /// No build provenance matched the policy's allowed project ids.
    BuildProjectId,
    /// Reserved for attestation-enforcing strategies.
    MissingAttestation,
}

impl ViolationKind {
    /// Informational kinds are logged but never turned into a denial.
    pub fn is_informational(self) -> bool {
        matches!(self, ViolationKind::AllowlistedCve)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::UnqualifiedImage => "UnqualifiedImage",
            ViolationKind::FixesAvailable => "FixesAvailable",
            ViolationKind::FixesUnavailable => "FixesUnavailable",
            ViolationKind::AllowlistedCve => "AllowlistedCve",
            ViolationKind::BuildProjectId => "BuildProjectId",
            ViolationKind::MissingAttestation => "MissingAttestation",
        };
        f.write_str(s)
    }
}

/// Evidence attached to a violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationDetails {
    Vulnerability(Vulnerability),
    Provenance(BuildProvenance),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    /// The image reference the violation is about.
    pub image: String,
    pub details: Option<ViolationDetails>,
    /// Human-readable description, used verbatim in denial messages.
    pub reason: String,
}

impl Violation {
    pub fn unqualified_image(image: &str) -> Self {
        Self {
            kind: ViolationKind::UnqualifiedImage,
            image: image.to_string(),
            details: None,
            reason: format!("{image} is not a fully qualified image"),
        }
    }

    pub fn fixes_available(image: &str, vuln: &Vulnerability, max: Severity) -> Self {
        Self {
            kind: ViolationKind::FixesAvailable,
            image: image.to_string(),
            reason: format!(
                "found CVE {} in {} with severity {} exceeding the maximum allowed {}, and a fix is available",
                vuln.cve, image, vuln.severity, max
            ),
            details: Some(ViolationDetails::Vulnerability(vuln.clone())),
        }
    }

    pub fn fixes_unavailable(image: &str, vuln: &Vulnerability, max: Severity) -> Self {
        Self {
            kind: ViolationKind::FixesUnavailable,
            image: image.to_string(),
            reason: format!(
                "found CVE {} in {} with severity {} exceeding the maximum allowed {} for vulnerabilities without a fix",
                vuln.cve, image, vuln.severity, max
            ),
            details: Some(ViolationDetails::Vulnerability(vuln.clone())),
        }
    }

    pub fn build_project_id(
        image: &str,
        offending: Option<BuildProvenance>,
        allowed: &[String],
    ) -> Self {
        let reason = match &offending {
            Some(p) => format!(
                "{image} was built in project {} which is not one of the allowed build projects [{}]",
                p.project_id,
                allowed.join(", ")
            ),
            None => format!(
                "no build provenance found for {image}; policy requires a build from one of [{}]",
                allowed.join(", ")
            ),
        };
        Self {
            kind: ViolationKind::BuildProjectId,
            image: image.to_string(),
            details: offending.map(ViolationDetails::Provenance),
            reason,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.reason)
    }
}

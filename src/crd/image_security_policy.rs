//! ImageSecurityPolicy Custom Resource Definition.
//!
//! An ISP is namespace-scoped: every workload admitted into the namespace is
//! evaluated against all ISPs found there. Severity fields are kept as
//! strings on the wire; empty means the field's documented default and
//! parsing happens once at evaluation entry.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ImageSecurityPolicy gates workload images on vulnerability severity,
/// CVE and image allowlists, and build provenance.
///
/// Example:
/// ```yaml
/// apiVersion: imagepolicy.io/v1beta1
/// kind: ImageSecurityPolicy
/// metadata:
///   name: strict
///   namespace: prod
/// spec:
///   maximumSeverity: MEDIUM
///   maximumFixUnavailableSeverity: HIGH
///   allowlistCVEs:
///     - CVE-2017-1000082
///   builtProjectIDs:
///     - trusted-builds
///   imageAllowlist:
///     - gcr.io/trusted/debugger@sha256:0f68c6333a90d79096a1e17d62fc4f27cfcceb9d9a37fdba3e2a6810202b5d5a
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "imagepolicy.io",
    version = "v1beta1",
    kind = "ImageSecurityPolicy",
    plural = "imagesecuritypolicies",
    shortname = "isp",
    namespaced,
    printcolumn = r#"{"name":"MaxSeverity", "type":"string", "jsonPath":".spec.maximumSeverity"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSecurityPolicySpec {
    /// Exact image references exempt from this policy entirely.
    #[serde(default)]
    pub image_allowlist: Vec<String>,

    /// Maximum tolerated severity for vulnerabilities with a fix available.
    /// One of LOW, MEDIUM, HIGH, CRITICAL, ALLOW_ALL, BLOCK_ALL.
    /// Empty means CRITICAL.
    #[serde(default)]
    pub maximum_severity: String,

    /// Maximum tolerated severity for vulnerabilities without a fix.
    /// Empty means ALLOW_ALL.
    #[serde(default)]
    pub maximum_fix_unavailable_severity: String,

    /// CVE ids suppressed from vulnerability evaluation.
    #[serde(default, rename = "allowlistCVEs")]
    pub allowlist_cves: Vec<String>,

    /// When non-empty, at least one build provenance must come from one of
    /// these project ids.
    #[serde(default, rename = "builtProjectIDs")]
    pub built_project_ids: Vec<String>,

    /// Attestation authorities whose valid attestation admits the image
    /// without further evaluation.
    #[serde(default)]
    pub attestation_authority_names: Vec<String>,
}

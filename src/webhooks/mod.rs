//! Admission webhook pipeline.
//!
//! Decodes `AdmissionReview` requests, dispatches by workload kind, applies
//! the breakglass and update-skip shortcuts, and converts review outcomes
//! into admission responses.

mod server;

pub use server::{
    BREAKGLASS_ANNOTATION, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError,
    WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};

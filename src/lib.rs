//! image-policy-controller library crate
//!
//! An admission controller that gates workload creation and mutation on
//! namespace-scoped Image Security Policies: images are resolved to digests,
//! vulnerability and build metadata is fetched per digest, and the metadata
//! is evaluated against the namespace's policies.

pub mod attestor;
pub mod config;
pub mod crd;
pub mod health;
pub mod image;
pub mod metadata;
pub mod policy;
pub mod review;
pub mod webhooks;

pub use config::{Config, ViolationMode};
pub use health::HealthState;
pub use webhooks::{
    BREAKGLASS_ANNOTATION, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError,
    WebhookState, run_webhook_server,
};

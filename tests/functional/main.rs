// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Functional tests for the admission pipeline.
//!
//! These tests drive the webhook router end to end with fake collaborators
//! and no Kubernetes cluster: requests go in as JSON bodies and come back as
//! `AdmissionReview` responses.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run a specific test
//! cargo test --test functional test_breakglass_overrides_any_policy
//! ```

mod fakes;
mod pipeline_tests;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use fakes::TestHarness;

/// POST a raw body to the webhook router and return (status, parsed body).
pub async fn post_review(
    harness: &TestHarness,
    body: Vec<u8>,
) -> (StatusCode, Option<serde_json::Value>) {
    let router = harness.router();
    let request = Request::builder()
        .method("POST")
        .uri("/review")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

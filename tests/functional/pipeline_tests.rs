//! End-to-end admission pipeline behavior over the webhook router.

use axum::http::StatusCode;
use serde_json::json;

use image_policy_controller::ViolationMode;
use image_policy_controller::policy::Severity;
use image_policy_controller::webhooks::BREAKGLASS_ANNOTATION;

use crate::fakes::{TestHarness, isp_with_max_severity, vuln};
use crate::post_review;

const UID: &str = "705ab4f5-6393-11e8-b7cc-42010a800002";

fn review_body(
    kind: &str,
    group: &str,
    operation: &str,
    object: serde_json::Value,
    old_object: serde_json::Value,
) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": UID,
            "kind": {"group": group, "version": "v1", "kind": kind},
            "resource": {"group": group, "version": "v1", "resource": kind.to_lowercase() + "s"},
            "namespace": "prod",
            "operation": operation,
            "userInfo": {},
            "object": object,
            "oldObject": old_object,
        }
    }))
    .unwrap()
}

fn pod_object(image: &str, annotations: serde_json::Value) -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": "web",
            "namespace": "prod",
            "annotations": annotations,
        },
        "spec": {
            "containers": [{"name": "app", "image": image}]
        }
    })
}

fn replica_set_object(image: &str, replicas: u32) -> serde_json::Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "ReplicaSet",
        "metadata": {"name": "web", "namespace": "prod"},
        "spec": {
            "replicas": replicas,
            "selector": {},
            "template": {
                "spec": {
                    "containers": [{"name": "app", "image": image}]
                }
            }
        }
    })
}

fn allowed(review: &serde_json::Value) -> bool {
    review["response"]["allowed"].as_bool().unwrap()
}

#[tokio::test]
async fn test_clean_pod_is_admitted_and_uid_is_echoed() {
    let harness = TestHarness::new(ViolationMode::Block, vec![isp_with_max_severity("HIGH")], vec![]);
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        pod_object("gcr.io/p/app@sha256:aa", json!({})),
        serde_json::Value::Null,
    );
    let (status, review) = post_review(&harness, body).await;
    let review = review.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(allowed(&review));
    assert_eq!(review["response"]["uid"], json!(UID));
}

#[tokio::test]
async fn test_critical_vulnerability_is_denied_in_block_mode() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![isp_with_max_severity("HIGH")],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        pod_object("gcr.io/p/app@sha256:aa", json!({})),
        serde_json::Value::Null,
    );
    let (status, review) = post_review(&harness, body).await;
    let review = review.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(!allowed(&review));
    assert_eq!(review["response"]["uid"], json!(UID));
    assert_eq!(review["response"]["status"]["status"], json!("Failure"));
    assert!(
        review["response"]["status"]["message"]
            .as_str()
            .unwrap()
            .contains("CVE c")
    );
}

#[tokio::test]
async fn test_log_mode_admits_violating_workloads() {
    let harness = TestHarness::new(
        ViolationMode::LogOnly,
        vec![isp_with_max_severity("HIGH")],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        pod_object("gcr.io/p/app@sha256:aa", json!({})),
        serde_json::Value::Null,
    );
    let (_, review) = post_review(&harness, body).await;
    assert!(allowed(&review.unwrap()));
}

#[tokio::test]
async fn test_breakglass_overrides_any_policy() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![isp_with_max_severity("BLOCK_ALL")],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        pod_object(
            "gcr.io/p/app@sha256:aa",
            json!({BREAKGLASS_ANNOTATION: "true"}),
        ),
        serde_json::Value::Null,
    );
    let (_, review) = post_review(&harness, body).await;

    assert!(allowed(&review.unwrap()));
    // The shortcut fires before policies are even fetched.
    assert_eq!(harness.policy_calls(), 0);
    assert_eq!(harness.metadata_calls(), 0);
}

#[tokio::test]
async fn test_scale_only_update_skips_review() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![isp_with_max_severity("BLOCK_ALL")],
        vec![vuln("c", Severity::Critical, true)],
    );
    // Scale to zero with an unchanged image set, as issued before delete.
    let body = review_body(
        "ReplicaSet",
        "apps",
        "UPDATE",
        replica_set_object("gcr.io/p/app@sha256:aa", 0),
        replica_set_object("gcr.io/p/app@sha256:aa", 3),
    );
    let (_, review) = post_review(&harness, body).await;

    assert!(allowed(&review.unwrap()));
    assert_eq!(harness.policy_calls(), 0);
}

#[tokio::test]
async fn test_update_with_new_image_is_reviewed() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![isp_with_max_severity("HIGH")],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "ReplicaSet",
        "apps",
        "UPDATE",
        replica_set_object("gcr.io/p/app@sha256:bb", 3),
        replica_set_object("gcr.io/p/app@sha256:aa", 3),
    );
    let (_, review) = post_review(&harness, body).await;

    assert!(!allowed(&review.unwrap()));
    assert_eq!(harness.policy_calls(), 1);
}

#[tokio::test]
async fn test_pod_update_is_always_reviewed() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![isp_with_max_severity("HIGH")],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "Pod",
        "",
        "UPDATE",
        pod_object("gcr.io/p/app@sha256:aa", json!({})),
        pod_object("gcr.io/p/app@sha256:aa", json!({})),
    );
    let (_, review) = post_review(&harness, body).await;
    assert!(!allowed(&review.unwrap()));
}

#[tokio::test]
async fn test_namespace_without_policies_admits() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        pod_object("gcr.io/p/app@sha256:aa", json!({})),
        serde_json::Value::Null,
    );
    let (_, review) = post_review(&harness, body).await;

    assert!(allowed(&review.unwrap()));
    // Policies were consulted, metadata never was.
    assert_eq!(harness.policy_calls(), 1);
    assert_eq!(harness.metadata_calls(), 0);
}

#[tokio::test]
async fn test_unknown_kind_passes_through_untouched() {
    let harness = TestHarness::new(
        ViolationMode::Block,
        vec![isp_with_max_severity("BLOCK_ALL")],
        vec![vuln("c", Severity::Critical, true)],
    );
    let body = review_body(
        "StatefulSet",
        "apps",
        "CREATE",
        json!({"metadata": {"name": "db", "namespace": "prod"}}),
        serde_json::Value::Null,
    );
    let (status, review) = post_review(&harness, body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(allowed(&review.unwrap()));
    assert_eq!(harness.policy_calls(), 0);
}

#[tokio::test]
async fn test_unqualified_image_is_denied_with_reason() {
    let harness = TestHarness::new(ViolationMode::Block, vec![isp_with_max_severity("HIGH")], vec![]);
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        pod_object("image", json!({})),
        serde_json::Value::Null,
    );
    let (_, review) = post_review(&harness, body).await;
    let review = review.unwrap();

    assert!(!allowed(&review));
    assert!(
        review["response"]["status"]["message"]
            .as_str()
            .unwrap()
            .contains("image is not a fully qualified image")
    );
}

#[tokio::test]
async fn test_malformed_body_is_denied_with_http_200() {
    let harness = TestHarness::new(ViolationMode::Block, vec![], vec![]);
    let (status, review) = post_review(&harness, b"{not json".to_vec()).await;
    let review = review.unwrap();

    // The platform requires a valid AdmissionReview envelope, never a 4xx.
    assert_eq!(status, StatusCode::OK);
    assert!(!allowed(&review));
}

#[tokio::test]
async fn test_empty_review_is_denied_with_http_200() {
    let harness = TestHarness::new(ViolationMode::Block, vec![], vec![]);
    let body = serde_json::to_vec(&json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview"
    }))
    .unwrap();
    let (status, review) = post_review(&harness, body).await;
    let review = review.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(!allowed(&review));
}

#[tokio::test]
async fn test_garbage_workload_payload_is_a_server_error() {
    let harness = TestHarness::new(ViolationMode::Block, vec![isp_with_max_severity("HIGH")], vec![]);
    let body = review_body(
        "Pod",
        "",
        "CREATE",
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web"},
            "spec": {"containers": "not-a-list"}
        }),
        serde_json::Value::Null,
    );
    let (status, _) = post_review(&harness, body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

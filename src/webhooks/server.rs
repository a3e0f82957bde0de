//! Admission webhook server.
//!
//! Serves the Kubernetes validating-webhook endpoint. Every response is a
//! well-formed `AdmissionReview`: malformed requests are answered with HTTP
//! 200 and `allowed=false` (the platform requires a valid review envelope,
//! never a 4xx); only workload payload decode failures surface as HTTP 500.
//!
//! To enable the webhook:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a ValidatingWebhookConfiguration for pods, deployments, and
//!    replicasets pointing at `/review`
//! 3. Mount the TLS certificate secret at /etc/webhook/certs/

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use kube::core::response::StatusSummary;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::attestor::AttestorLookup;
use crate::health::HealthState;
use crate::image::{self, DigestResolver, extract};
use crate::metadata::MetadataFetcher;
use crate::policy::PolicyFetcher;
use crate::review::{Reviewer, ViolationStrategy};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;

/// Annotation key that bypasses policy enforcement for a single object.
/// Presence alone is sufficient; the value is never inspected.
pub const BREAKGLASS_ANNOTATION: &str = "imagepolicy.io/breakglass";

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type Request = AdmissionRequest<DynamicObject>;

/// Collaborators shared by webhook handlers. All are safe for concurrent use
/// by distinct requests; the pipeline itself holds no locks.
pub struct WebhookState {
    pub policies: Arc<dyn PolicyFetcher>,
    pub metadata: Arc<dyn MetadataFetcher>,
    pub resolver: Arc<dyn DigestResolver>,
    pub attestors: Arc<dyn AttestorLookup>,
    pub strategy: Arc<dyn ViolationStrategy>,
    pub health: Option<Arc<HealthState>>,
}

/// Errors inside a workload handler. These are server bugs or garbage
/// payloads, not admission verdicts, and map to HTTP 500 with a generic
/// message.
#[derive(Debug, Error)]
enum HandlerError {
    #[error("decoding {kind} payload: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("admission request carries no {kind} object")]
    MissingObject { kind: &'static str },
}

/// Allow response with the request UID echoed and an explicit Success status.
fn allow(request: &Request) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    response.result.status = Some(StatusSummary::Success);
    response
}

/// Denial response with an explicit Failure status and the given message.
fn deny(request: &Request, message: String) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result.status = Some(StatusSummary::Failure);
    response
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/review", post(review_handler))
        .with_state(state)
}

/// Admission review endpoint.
async fn review_handler(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let review: Review = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(error) => {
            warn!(%error, "failed to parse admission review body");
            return (
                StatusCode::OK,
                Json(AdmissionResponse::invalid(error.to_string()).into_review()),
            )
                .into_response();
        }
    };

    let request: Request = match review.try_into() {
        Ok(request) => request,
        Err(error) => {
            warn!(%error, "invalid admission request");
            return (
                StatusCode::OK,
                Json(AdmissionResponse::invalid(error.to_string()).into_review()),
            )
                .into_response();
        }
    };

    let kind = request.kind.kind.clone();
    debug!(
        uid = %request.uid,
        %kind,
        operation = ?request.operation,
        namespace = ?request.namespace,
        "processing admission request"
    );

    let started = std::time::Instant::now();
    match admit(&state, &request).await {
        Ok(response) => {
            if let Some(health) = &state.health {
                health.metrics.record_review(
                    &kind,
                    response.allowed,
                    started.elapsed().as_secs_f64(),
                );
            }
            (StatusCode::OK, Json(response.into_review())).into_response()
        }
        Err(error) => {
            error!(%error, uid = %request.uid, "admission handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal admission handler error",
            )
                .into_response()
        }
    }
}

/// Dispatch one decoded admission request to its workload handler.
///
/// Unknown kinds keep the default allow response; only the declared workload
/// kinds are enforced.
async fn admit(state: &WebhookState, request: &Request) -> Result<AdmissionResponse, HandlerError> {
    // Object payloads are absent on delete; there is nothing to review.
    if request.operation == Operation::Delete {
        return Ok(allow(request));
    }

    match request.kind.kind.as_str() {
        "Pod" => admit_pod(state, request).await,
        "Deployment" => admit_deployment(state, request).await,
        "ReplicaSet" => admit_replica_set(state, request).await,
        _ => Ok(allow(request)),
    }
}

async fn admit_pod(
    state: &WebhookState,
    request: &Request,
) -> Result<AdmissionResponse, HandlerError> {
    let pod: Pod = decode_object(request.object.as_ref(), "Pod")?;
    info!(name = ?pod.metadata.name, "handling pod");

    // Pods are always fully reviewed; there is no template to diff.
    if has_breakglass(&pod.metadata) {
        info!(name = ?pod.metadata.name, "breakglass annotation found, admitting");
        return Ok(allow(request));
    }
    let images = extract::pod_images(&pod);
    let namespace = workload_namespace(&pod.metadata, request);
    Ok(review_images(state, request, &images, &namespace, Some(&pod)).await)
}

async fn admit_deployment(
    state: &WebhookState,
    request: &Request,
) -> Result<AdmissionResponse, HandlerError> {
    let deployment: Deployment = decode_object(request.object.as_ref(), "Deployment")?;
    info!(name = ?deployment.metadata.name, "handling deployment");

    if request.operation == Operation::Update {
        let old: Deployment = decode_object(request.old_object.as_ref(), "Deployment")?;
        // Updates that add no image are admitted unreviewed: the platform
        // scales to zero replicas before delete and that update must pass.
        if !extract::has_new_image(
            &extract::deployment_images(&deployment),
            &extract::deployment_images(&old),
        ) {
            info!(name = ?deployment.metadata.name, "no new image on update, admitting");
            return Ok(allow(request));
        }
    }

    if has_breakglass(&deployment.metadata) {
        info!(name = ?deployment.metadata.name, "breakglass annotation found, admitting");
        return Ok(allow(request));
    }
    let images = extract::deployment_images(&deployment);
    let namespace = workload_namespace(&deployment.metadata, request);
    Ok(review_images(state, request, &images, &namespace, None).await)
}

async fn admit_replica_set(
    state: &WebhookState,
    request: &Request,
) -> Result<AdmissionResponse, HandlerError> {
    let replica_set: ReplicaSet = decode_object(request.object.as_ref(), "ReplicaSet")?;
    info!(name = ?replica_set.metadata.name, "handling replica set");

    if request.operation == Operation::Update {
        let old: ReplicaSet = decode_object(request.old_object.as_ref(), "ReplicaSet")?;
        if !extract::has_new_image(
            &extract::replica_set_images(&replica_set),
            &extract::replica_set_images(&old),
        ) {
            info!(name = ?replica_set.metadata.name, "no new image on update, admitting");
            return Ok(allow(request));
        }
    }

    if has_breakglass(&replica_set.metadata) {
        info!(name = ?replica_set.metadata.name, "breakglass annotation found, admitting");
        return Ok(allow(request));
    }
    let images = extract::replica_set_images(&replica_set);
    let namespace = workload_namespace(&replica_set.metadata, request);
    Ok(review_images(state, request, &images, &namespace, None).await)
}

/// Fetch policies, resolve digests, and run the review. Every collaborator
/// failure fails closed into a denial carrying the error message.
async fn review_images(
    state: &WebhookState,
    request: &Request,
    images: &[String],
    namespace: &str,
    pod: Option<&Pod>,
) -> AdmissionResponse {
    info!(%namespace, ?images, "reviewing images");

    let isps = match state.policies.policies_in(namespace).await {
        Ok(isps) => isps,
        Err(error) => {
            let message = format!("error getting image security policies: {error}");
            error!(%message);
            return deny(request, message);
        }
    };
    if isps.is_empty() {
        warn!(%namespace, "no ImageSecurityPolicy in namespace, skipping review");
        return allow(request);
    }
    debug!(count = isps.len(), "found policies to review against");

    let mut resolved = Vec::with_capacity(images.len());
    for img in images {
        match state.resolver.resolve(img).await {
            Ok(digest_ref) => {
                if !image::has_digest(img) {
                    debug!(image = %img, resolved = %digest_ref, "resolved tagged image");
                }
                resolved.push(digest_ref);
            }
            Err(error) => {
                let message = format!("error resolving image to digest: {error}");
                error!(%message);
                return deny(request, message);
            }
        }
    }

    let reviewer = Reviewer::new(
        state.metadata.clone(),
        state.attestors.clone(),
        state.strategy.clone(),
    );
    if let Err(error) = reviewer.review(&resolved, &isps, pod).await {
        info!(%namespace, ?resolved, %error, "denying workload");
        return deny(request, error.to_string());
    }

    allow(request)
}

fn decode_object<T: DeserializeOwned>(
    obj: Option<&DynamicObject>,
    kind: &'static str,
) -> Result<T, HandlerError> {
    let obj = obj.ok_or(HandlerError::MissingObject { kind })?;
    let value =
        serde_json::to_value(obj).map_err(|source| HandlerError::Decode { kind, source })?;
    serde_json::from_value(value).map_err(|source| HandlerError::Decode { kind, source })
}

fn has_breakglass(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .is_some_and(|a: &BTreeMap<String, String>| a.contains_key(BREAKGLASS_ANNOTATION))
}

fn workload_namespace(meta: &ObjectMeta, request: &Request) -> String {
    meta.namespace
        .clone()
        .or_else(|| request.namespace.clone())
        .unwrap_or_else(|| "default".to_string())
}

/// Errors that can occur when running the webhook server
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("webhook server error: {0}")]
    Server(String),
}

/// Run the webhook server with TLS.
///
/// Binds to 0.0.0.0:9443 and serves the /review endpoint. TLS certificates
/// are loaded from the paths specified.
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    cert_path: &str,
    key_path: &str,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(PathBuf::from(cert_path), PathBuf::from(key_path))
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], WEBHOOK_PORT));
    info!(port = WEBHOOK_PORT, "webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}

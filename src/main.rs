//! image-policy-controller - a Kubernetes admission controller gating
//! workloads on Image Security Policies.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Builds the process configuration and collaborators
//! - Starts the health server and the TLS admission webhook server

use std::path::Path;
use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use image_policy_controller::attestor::NoAttestors;
use image_policy_controller::config::Config;
use image_policy_controller::health::{HealthState, run_health_server};
use image_policy_controller::image::RegistryDigestResolver;
use image_policy_controller::policy::KubePolicyFetcher;
use image_policy_controller::webhooks::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WebhookState, run_webhook_server,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("image_policy_controller=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting image-policy-controller");

    // Building the collaborator set is infrastructure-critical: any failure
    // here terminates the process before the webhook starts answering.
    let config = Config::from_env()?;
    info!(mode = ?config.violation_mode, "Loaded configuration");

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());

    let state = Arc::new(WebhookState {
        policies: Arc::new(KubePolicyFetcher::new(client)),
        metadata: config.metadata_backend.fetcher(),
        resolver: Arc::new(RegistryDigestResolver::new()),
        attestors: Arc::new(NoAttestors),
        strategy: config.violation_mode.strategy(),
        health: Some(health_state.clone()),
    });

    // Start health server immediately (probes should work before TLS is up)
    let health_handle = {
        let health_state = health_state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state).await {
                error!("Health server error: {}", e);
            }
        })
    };

    if !Path::new(WEBHOOK_CERT_PATH).exists() || !Path::new(WEBHOOK_KEY_PATH).exists() {
        return Err(format!(
            "webhook TLS material missing: expected {WEBHOOK_CERT_PATH} and {WEBHOOK_KEY_PATH}"
        )
        .into());
    }

    let webhook_handle = tokio::spawn(async move {
        if let Err(e) = run_webhook_server(state, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH).await {
            error!("Webhook server error: {}", e);
        }
    });

    health_state.set_ready(true).await;
    info!("Admission controller ready");

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        result = webhook_handle => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
            health_state.set_ready(false).await;
        }
    }

    info!("Controller stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the controller cannot shut
/// down gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

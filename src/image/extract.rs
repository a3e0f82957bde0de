//! Image extraction from workload payloads.
//!
//! The admission pipeline reads only the container and init-container image
//! fields of a workload spec. Deployments and ReplicaSets nest the pod spec
//! under `spec.template.spec`.

use std::collections::HashSet;

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Pod, PodSpec};

/// Ordered, de-duplicated image references of a pod spec: containers first,
/// then init containers.
pub fn pod_spec_images(spec: &PodSpec) -> Vec<String> {
    let mut images = Vec::new();
    let containers = spec
        .containers
        .iter()
        .chain(spec.init_containers.iter().flatten());
    for container in containers {
        if let Some(image) = &container.image {
            if !images.contains(image) {
                images.push(image.clone());
            }
        }
    }
    images
}

pub fn pod_images(pod: &Pod) -> Vec<String> {
    pod.spec.as_ref().map(pod_spec_images).unwrap_or_default()
}

pub fn deployment_images(deployment: &Deployment) -> Vec<String> {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(pod_spec_images)
        .unwrap_or_default()
}

pub fn replica_set_images(replica_set: &ReplicaSet) -> Vec<String> {
    replica_set
        .spec
        .as_ref()
        .and_then(|s| s.template.as_ref())
        .and_then(|t| t.spec.as_ref())
        .map(pod_spec_images)
        .unwrap_or_default()
}

/// True iff `new` contains an image absent from `old`.
///
/// Updates that only scale replicas keep the image set unchanged and can
/// skip re-review; the platform issues an update-to-zero before delete.
pub fn has_new_image(new: &[String], old: &[String]) -> bool {
    let old: HashSet<&str> = old.iter().map(String::as_str).collect();
    new.iter().any(|image| !old.contains(image.as_str()))
}

//! Container image reference handling.
//!
//! A reference is "qualified" when it names a registry host
//! (`host[:port]/path[:tag][@digest]`) or already carries a content digest.
//! Everything the policy engine admits must be qualified; resolution turns
//! tagged references into digest form.

pub mod extract;
mod resolve;

pub use resolve::{DigestResolver, RegistryDigestResolver, ResolveError};

/// True iff the reference carries an `@sha256:<hex>` suffix.
pub fn has_digest(image: &str) -> bool {
    match image.rsplit_once('@') {
        Some((_, digest)) => match digest.strip_prefix("sha256:") {
            Some(hex) => !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()),
            None => false,
        },
        None => false,
    }
}

/// True iff the reference names a registry host explicitly.
///
/// The first path component is a host when it contains a dot or a port, or is
/// `localhost`. A bare `image` or `library/image` names no registry.
pub fn is_registry_qualified(image: &str) -> bool {
    let Some((host, _)) = image.split_once('/') else {
        return false;
    };
    !host.is_empty() && (host.contains('.') || host.contains(':') || host == "localhost")
}

/// True iff the reference is fully qualified: digest-pinned or
/// registry-qualified.
pub fn is_qualified(image: &str) -> bool {
    has_digest(image) || is_registry_qualified(image)
}

/// A tagged reference split into its registry coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

/// Split a registry-qualified reference into registry, repository, and tag.
///
/// Any digest suffix is ignored; a missing tag defaults to `latest`. Returns
/// `None` for references without a registry host.
pub fn parse_reference(image: &str) -> Option<Reference> {
    if !is_registry_qualified(image) {
        return None;
    }
    let name = image.rsplit_once('@').map_or(image, |(name, _)| name);
    let (registry, rest) = name.split_once('/')?;

    // The tag separator is a ':' after the last '/'.
    let (repository, tag) = match rest.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo, tag),
        _ => (rest, "latest"),
    };
    if repository.is_empty() {
        return None;
    }
    Some(Reference {
        registry: registry.to_string(),
        repository: repository.to_string(),
        tag: tag.to_string(),
    })
}

//! Artifact persistence.
//!
//! This module contains the artifact lifecycle types:
//! - Local store with a fixed directory layout and digest manifest
//! - Remote object-store interface used for downloads and mirroring

mod local;
mod remote;

pub use local::{layout, sha256_hex, ArtifactStore, ManifestEntry};
#[cfg(test)]
pub use remote::MockRemoteStore;
pub use remote::{content_md5, mirror_artifact, HttpObjectStore, RemoteStore};

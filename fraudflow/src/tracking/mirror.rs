//! Remote artifact mirroring as a publishing sink.

use crate::errors::PublishWarning;
use crate::store::{ArtifactStore, RemoteStore};
use crate::tracking::{RunRecord, RunSink};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const SINK_NAME: &str = "remote_mirror";

/// Uploads every artifact the manifest knows to the remote object store.
///
/// Individual upload failures are tallied and reported as one warning so a
/// flaky remote cannot abort the run or hide how much of the mirror landed.
pub struct RemoteMirrorSink {
    store: Arc<ArtifactStore>,
    remote: Arc<dyn RemoteStore>,
}

impl RemoteMirrorSink {
    /// Creates a mirror sink between the local store and a remote.
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { store, remote }
    }
}

#[async_trait]
impl RunSink for RemoteMirrorSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn publish(&self, _record: &RunRecord) -> Result<(), PublishWarning> {
        let entries = self.store.entries();
        let mut failed = 0usize;
        let mut first_error: Option<String> = None;

        for entry in &entries {
            let bytes = match self.store.get_bytes(&entry.path) {
                Ok(bytes) => bytes,
                Err(error) => {
                    warn!(artifact = %entry.path, %error, "artifact unreadable, skipping mirror");
                    failed += 1;
                    first_error.get_or_insert(error.to_string());
                    continue;
                }
            };
            if let Err(error) = self.remote.upload(&entry.path, &bytes).await {
                warn!(artifact = %entry.path, %error, "artifact upload failed");
                failed += 1;
                first_error.get_or_insert(error.to_string());
            }
        }

        if failed > 0 {
            let detail = first_error.unwrap_or_default();
            return Err(PublishWarning::new(
                SINK_NAME,
                format!("{failed} of {} upload(s) failed: {detail}", entries.len()),
            ));
        }

        debug!(
            artifacts = entries.len(),
            remote = %self.remote.location(),
            "mirror complete"
        );
        Ok(())
    }
}

impl fmt::Debug for RemoteMirrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMirrorSink")
            .field("remote", &self.remote.location())
            .finish_non_exhaustive()
    }
}

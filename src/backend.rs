//! Contract with the media-extraction backend.
//!
//! The orchestrator never parses site protocols itself; it talks to a
//! [`MediaBackend`], which classifies links, fetches pre-download manifests
//! and performs the transfer, reporting progress through a [`TransferSink`].

use async_trait::async_trait;

use crate::error::Result;
use crate::policy::PostProcessing;

/// Result of a flat (non-recursive) classification query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Whether the link addresses a collection (playlist).
    pub is_collection: bool,
    /// Number of entries; 1 for single items.
    pub item_count: usize,
    /// Collection title, or the item title for single items.
    pub title: String,
}

/// Pre-download metadata for a single item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaManifest {
    /// Media title as reported by the backend.
    pub title: String,
    /// Uploader / channel name.
    pub uploader: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Backend-rendered duration (e.g. "4:05").
    pub duration_string: Option<String>,
    /// Exact or approximate size in bytes for the selected format.
    pub size: Option<u64>,
    /// Height of the resolved video stream.
    pub height: Option<u32>,
}

/// Everything the backend needs to perform a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Format selector expression.
    pub selector: String,
    /// Full output path template (may contain backend placeholders).
    pub output_template: String,
    /// Container/codec post-processing.
    pub post_processing: PostProcessing,
}

/// A low-level transfer event emitted by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// Bytes are flowing for the named item.
    Downloading {
        /// Title of the item currently transferring.
        item_title: String,
        /// Total size if known or estimated.
        total_bytes: Option<u64>,
        /// Bytes transferred so far for the current stream.
        downloaded_bytes: u64,
        /// Backend-rendered percentage, possibly with terminal escapes.
        percent: String,
        /// Seconds remaining, if the backend can estimate it.
        eta_seconds: Option<u64>,
    },
    /// A stream finished transferring.
    Finished {
        /// File written by the backend.
        filename: String,
    },
}

/// Receiver for [`TransferEvent`]s during a download.
///
/// The sink is exclusively borrowed for the duration of the download call.
pub trait TransferSink: Send {
    /// Called for each event, in order.
    fn on_event(&mut self, event: TransferEvent);
}

/// The extraction/download backend.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Classifies a link without resolving individual collection entries.
    async fn classify(&self, url: &str) -> Result<Classification>;

    /// Fetches metadata for a single item under the given selector.
    async fn fetch_manifest(&self, url: &str, selector: &str) -> Result<MediaManifest>;

    /// Downloads the link, feeding progress events to `sink`.
    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        sink: &mut dyn TransferSink,
    ) -> Result<()>;

    /// Verifies the external transcoder is present.
    async fn ensure_transcoder(&self) -> Result<()>;
}

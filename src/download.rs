//! Per-link download orchestration.
//!
//! One [`Orchestrator`] drives every mode: classify the link, resolve the
//! format policy, confirm with the user, download with a progress tracker
//! attached, and fall back to the unconstrained selector where the mode
//! allows it. The orchestrator is the error boundary: every per-link failure
//! becomes a [`LinkOutcome`] and the batch moves on.

use std::path::{Path, PathBuf};

use crate::backend::{Classification, DownloadOptions, MediaBackend, MediaManifest};
use crate::classify::classify;
use crate::config::PathConfig;
use crate::error::Result;
use crate::format::{format_duration, format_size};
use crate::naming::{
    EXT_FIELD, HEIGHT_FIELD, TITLE_FIELD, labeled_name, plain_name, sanitize_title,
};
use crate::policy::{FormatPolicy, Mode, resolve};
use crate::progress::{ProgressRenderer, ProgressTracker};
use crate::stats::{BatchResult, LinkOutcome};

/// One link to process under one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// The link as entered by the user.
    pub url: String,
    /// What to download.
    pub mode: Mode,
}

impl DownloadRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(url: impl Into<String>, mode: Mode) -> Self {
        Self {
            url: url.into(),
            mode,
        }
    }
}

/// What the user is shown before a single-item download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Media title.
    pub title: String,
    /// Uploader, or "Unknown".
    pub uploader: String,
    /// Rendered duration, or "Unknown".
    pub duration: String,
    /// Quality label of the effective policy.
    pub format_label: String,
    /// Rendered approximate size.
    pub size: String,
    /// Final output path.
    pub destination: PathBuf,
}

impl DownloadSummary {
    fn new(manifest: &MediaManifest, policy: &FormatPolicy, destination: PathBuf) -> Self {
        let duration = manifest
            .duration_string
            .clone()
            .or_else(|| manifest.duration.map(format_duration))
            .unwrap_or_else(|| "Unknown".to_string());
        Self {
            title: manifest.title.clone(),
            uploader: manifest
                .uploader
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            duration,
            format_label: policy.label.clone(),
            size: format_size(manifest.size),
            destination,
        }
    }
}

/// User-facing side of the orchestrator: confirmations and notices.
///
/// Notice methods default to no-ops.
pub trait Interaction: Send {
    /// Asks whether to download a whole collection.
    fn confirm_collection(&mut self, title: &str, item_count: usize) -> bool;

    /// Asks whether to download a single item.
    fn confirm_download(&mut self, summary: &DownloadSummary) -> bool;

    /// Reports a recoverable problem (e.g. a fallback).
    fn warn(&mut self, _message: &str) {}

    /// Reports a per-link failure.
    fn error(&mut self, _message: &str) {}

    /// Reports progress through the run.
    fn info(&mut self, _message: &str) {}
}

/// Confirms everything and stays silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Interaction for AutoConfirm {
    fn confirm_collection(&mut self, _title: &str, _item_count: usize) -> bool {
        true
    }

    fn confirm_download(&mut self, _summary: &DownloadSummary) -> bool {
        true
    }
}

/// Drives links through classification, confirmation and download.
pub struct Orchestrator<B: MediaBackend, I: Interaction, R: ProgressRenderer> {
    backend: B,
    interaction: I,
    renderer: R,
    paths: PathConfig,
}

impl<B: MediaBackend, I: Interaction, R: ProgressRenderer> Orchestrator<B, I, R> {
    /// Creates an orchestrator writing under `paths`.
    #[must_use]
    pub const fn new(backend: B, interaction: I, renderer: R, paths: PathConfig) -> Self {
        Self {
            backend,
            interaction,
            renderer,
            paths,
        }
    }

    /// Returns the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the interaction handler.
    #[must_use]
    pub const fn interaction(&self) -> &I {
        &self.interaction
    }

    /// Returns the progress renderer.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Processes every link in order under one mode.
    ///
    /// Never stops early: each link's outcome is recorded and the next one
    /// is started regardless.
    pub async fn run(&mut self, links: &[String], mode: &Mode) -> BatchResult {
        let mut result = BatchResult::new();
        for (i, url) in links.iter().enumerate() {
            log::info!("Processing link {}/{}: {url}", i + 1, links.len());
            self.interaction.info(&format!("Processing: {url}"));
            let outcome = self.process(&DownloadRequest::new(url.clone(), mode.clone())).await;
            result.record(&outcome);
        }
        log::info!("{}", result.summary_line());
        result
    }

    /// Processes one link to a final outcome.
    pub async fn process(&mut self, request: &DownloadRequest) -> LinkOutcome {
        match self.try_process(request).await {
            Ok(outcome) => {
                if matches!(outcome, LinkOutcome::Declined) {
                    self.interaction.info("Download cancelled.");
                }
                outcome
            }
            Err(e) => {
                log::error!("Failed to process {}: {e}", request.url);
                self.interaction
                    .error(&format!("Error processing {}: {e}", request.url));
                LinkOutcome::Failed(e)
            }
        }
    }

    async fn try_process(&mut self, request: &DownloadRequest) -> Result<LinkOutcome> {
        if request.mode.post_processing().needs_transcoder() {
            self.backend.ensure_transcoder().await?;
        }

        let found = classify(&self.backend, &request.url).await?;
        let policy = resolve(&request.mode);
        let dir = self.paths.dir_for(&request.mode).to_path_buf();

        if found.is_collection {
            self.process_collection(request, &found, &policy, &dir).await
        } else {
            self.process_single(request, policy, &dir).await
        }
    }

    async fn process_collection(
        &mut self,
        request: &DownloadRequest,
        found: &Classification,
        policy: &FormatPolicy,
        dir: &Path,
    ) -> Result<LinkOutcome> {
        if !self
            .interaction
            .confirm_collection(&found.title, found.item_count)
        {
            return Ok(LinkOutcome::Declined);
        }

        let options = DownloadOptions {
            selector: policy.primary.clone(),
            output_template: template_in(dir, &collection_name(&request.mode, policy)),
            post_processing: request.mode.post_processing(),
        };
        self.download(request, &options, Some(found.item_count)).await?;
        Ok(LinkOutcome::Downloaded {
            used_fallback: false,
        })
    }

    async fn process_single(
        &mut self,
        request: &DownloadRequest,
        policy: FormatPolicy,
        dir: &Path,
    ) -> Result<LinkOutcome> {
        let (policy, manifest, used_fallback) = self.fetch_manifest(request, policy).await?;

        let title = sanitize_title(&manifest.title);
        let label = single_label(&request.mode, &policy, manifest.height);
        let shown_name = single_name(&request.mode, &title, &label, display_ext(&request.mode));
        let destination = dir.join(shown_name);
        let summary = DownloadSummary::new(&manifest, &policy, destination);
        if !self.interaction.confirm_download(&summary) {
            return Ok(LinkOutcome::Declined);
        }

        let options = DownloadOptions {
            selector: policy.primary.clone(),
            output_template: template_in(
                dir,
                &single_name(&request.mode, &title, &label, EXT_FIELD),
            ),
            post_processing: request.mode.post_processing(),
        };
        let err = match self.download(request, &options, None).await {
            Ok(()) => return Ok(LinkOutcome::Downloaded { used_fallback }),
            Err(e) => e,
        };

        let may_retry = request.mode.retries_download() && !used_fallback && err.is_retryable();
        let Some(relaxed) = policy.relaxed().filter(|_| may_retry) else {
            return Err(err);
        };

        self.interaction.warn(&format!(
            "Download failed ({err}). Retrying with best available format..."
        ));
        let retry_label = manifest
            .height
            .map_or_else(|| "best".to_string(), |h| format!("{h}p"));
        let options = DownloadOptions {
            selector: relaxed.primary,
            output_template: template_in(dir, &labeled_name(&title, &retry_label, EXT_FIELD)),
            ..options
        };
        self.download(request, &options, None).await?;
        Ok(LinkOutcome::Downloaded {
            used_fallback: true,
        })
    }

    /// Fetches the manifest under the primary selector, falling back once to
    /// the relaxed policy when the selector cannot be satisfied.
    async fn fetch_manifest(
        &mut self,
        request: &DownloadRequest,
        policy: FormatPolicy,
    ) -> Result<(FormatPolicy, MediaManifest, bool)> {
        let err = match self
            .backend
            .fetch_manifest(&request.url, &policy.primary)
            .await
        {
            Ok(manifest) => return Ok((policy, manifest, false)),
            Err(e) => e,
        };
        let relaxed = policy.relaxed().filter(|_| err.is_format_failure());
        let Some(relaxed) = relaxed else {
            return Err(err);
        };

        log::warn!("Selector {} unavailable for {}: {err}", policy.primary, request.url);
        self.interaction.warn(&format!(
            "Requested quality {} not available. Falling back to best available quality...",
            policy.label
        ));
        let manifest = self
            .backend
            .fetch_manifest(&request.url, &relaxed.primary)
            .await?;
        Ok((relaxed, manifest, true))
    }

    async fn download(
        &mut self,
        request: &DownloadRequest,
        options: &DownloadOptions,
        collection_size: Option<usize>,
    ) -> Result<()> {
        log::debug!(
            "Downloading {} with selector {} to {}",
            request.url,
            options.selector,
            options.output_template
        );
        let noun = request.mode.item_noun();
        let mut tracker = match collection_size {
            Some(count) => ProgressTracker::collection(&mut self.renderer, noun, count),
            None => ProgressTracker::single(&mut self.renderer, noun),
        };
        let result = self
            .backend
            .download(&request.url, options, &mut tracker)
            .await;
        match result {
            Ok(()) => tracker.finish(),
            Err(_) => tracker.abandon(),
        }
        result
    }
}

fn template_in(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

/// Quality label used in a single item's filename.
fn single_label(mode: &Mode, policy: &FormatPolicy, height: Option<u32>) -> String {
    match (mode, height) {
        (Mode::Video(_), Some(h)) if policy.is_best() => format!("{h}p"),
        _ => policy.label.clone(),
    }
}

fn single_name(mode: &Mode, title: &str, label: &str, ext: &str) -> String {
    match mode {
        Mode::Video(_) | Mode::Audio(_) => labeled_name(title, label, ext),
        Mode::Advanced(_) => plain_name(title, ext),
    }
}

/// Per-item template for collections, whose entries are not enumerated up front.
fn collection_name(mode: &Mode, policy: &FormatPolicy) -> String {
    match mode {
        Mode::Video(_) => labeled_name(TITLE_FIELD, &format!("{HEIGHT_FIELD}p"), EXT_FIELD),
        Mode::Audio(_) => labeled_name(TITLE_FIELD, &policy.label, EXT_FIELD),
        Mode::Advanced(_) => plain_name(TITLE_FIELD, EXT_FIELD),
    }
}

/// Extension shown in the confirmation summary.
const fn display_ext(mode: &Mode) -> &'static str {
    match mode {
        Mode::Audio(_) => "mp3",
        Mode::Video(_) | Mode::Advanced(_) => "mp4",
    }
}

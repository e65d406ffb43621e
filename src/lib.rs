//! ytgrab - a library for interactive video and audio downloads via yt-dlp.
//!
//! The core is independent of any terminal: a [`MediaBackend`] resolves and
//! transfers media, a [`ProgressRenderer`] draws progress, and an
//! [`Interaction`] answers confirmations. The [`Orchestrator`] ties them
//! together for a batch of links under one [`Mode`].
//!
//! # Example
//!
//! ```no_run
//! use ytgrab::{AutoConfirm, BackendConfig, Mode, NoRender, Orchestrator, PathConfig, VideoQuality, YtDlp};
//!
//! # async fn example() {
//! let backend = YtDlp::new(BackendConfig::from_env());
//! let mut orchestrator = Orchestrator::new(backend, AutoConfirm, NoRender, PathConfig::default());
//!
//! let links = vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()];
//! let result = orchestrator.run(&links, &Mode::Video(VideoQuality::MaxHeight(720))).await;
//! println!("{}", result.summary_line());
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod classify;
pub mod config;
pub mod download;
pub mod error;
pub mod format;
pub mod naming;
pub mod policy;
pub mod progress;
pub mod stats;
pub mod url;
pub mod ytdlp;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use backend::{
    Classification, DownloadOptions, MediaBackend, MediaManifest, TransferEvent, TransferSink,
};
pub use classify::classify;
pub use config::{
    AppConfig, BackendConfig, DownloadType, PathConfig, TRANSCODER_ENV, UserDefaults, YTDLP_ENV,
};
pub use download::{AutoConfirm, DownloadRequest, DownloadSummary, Interaction, Orchestrator};
pub use error::{Error, Result};
pub use format::{format_duration, format_eta, format_rate, format_size};
pub use naming::sanitize_title;
pub use policy::{
    AdvancedOptions, AudioQuality, FormatPolicy, Mode, PostProcessing, VideoQuality, resolve,
};
pub use progress::{NoRender, ProgressRenderer, ProgressState, ProgressTracker};
pub use stats::{BatchResult, LinkOutcome};
pub use url::{dedup_links, extract_links};
pub use ytdlp::YtDlp;

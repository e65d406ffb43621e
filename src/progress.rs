//! Progress tracking for in-flight downloads.
//!
//! [`ProgressTracker`] turns the backend's raw [`TransferEvent`] stream into a
//! bounded per-item [`ProgressState`] and drives a [`ProgressRenderer`]. The
//! backend gives no explicit "next item" signal, so a change of item title is
//! treated as the collection boundary.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::backend::{TransferEvent, TransferSink};
use crate::format::format_eta;

/// Minimum wall-clock spacing between rendered samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Floor for the rate denominator, so the first sample cannot blow up.
pub const MIN_RATE_WINDOW: Duration = Duration::from_millis(100);

/// Maximum characters of an item title shown in a progress label.
pub const LABEL_TITLE_CHARS: usize = 30;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("valid regex")
});

/// How an item's progress is measured. Fixed when the item is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Byte counts against a known total.
    Bytes {
        /// Total size in bytes.
        total: u64,
    },
    /// Percentage on a 0-100 scale.
    Percent,
}

impl DisplayMode {
    /// Chooses bytes mode when a positive total is known.
    #[must_use]
    pub fn for_total(total: Option<u64>) -> Self {
        match total {
            Some(total) if total > 0 => Self::Bytes { total },
            _ => Self::Percent,
        }
    }

    /// Position of a full bar.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn maximum(self) -> f64 {
        match self {
            Self::Bytes { total } => total as f64,
            Self::Percent => 100.0,
        }
    }
}

/// Lifecycle phase of a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Transfer in progress.
    Downloading,
    /// Bar forced to maximum and closed.
    Finished,
}

/// Live state of the item currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    /// 1-based position of the item within the run.
    pub index: usize,
    /// Rendered label.
    pub label: String,
    /// Current phase.
    pub phase: Phase,
    /// Measurement mode chosen at open time.
    pub display: DisplayMode,
    /// Current bar position (bytes or percent, per `display`).
    pub current: f64,
    /// When the last sample was admitted.
    pub last_sample_at: Option<Instant>,
    /// Downloaded bytes at the last admitted sample.
    pub last_sample_bytes: u64,
}

impl ProgressState {
    /// Whether the total size was known when the item opened.
    #[must_use]
    pub const fn total_known(&self) -> bool {
        matches!(self.display, DisplayMode::Bytes { .. })
    }
}

/// An admitted progress sample, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Bar position (bytes or percent).
    pub position: f64,
    /// Parsed completion percentage.
    pub percent: f64,
    /// Transfer rate in bytes per second since the previous sample.
    pub rate: f64,
    /// Rendered ETA, e.g. "ETA 01:23".
    pub eta: String,
}

/// Visual side of progress reporting.
pub trait ProgressRenderer: Send {
    /// Opens a new bar.
    fn open(&mut self, label: &str, display: DisplayMode);

    /// Redraws the open bar.
    fn update(&mut self, sample: &Sample);

    /// Forces the open bar to its maximum and finalizes it.
    fn close(&mut self, maximum: f64);

    /// Drops the open bar without completing it.
    fn abandon(&mut self) {}

    /// Emits the completion line for a written file.
    fn completed(&mut self, _filename: &str) {}
}

/// A renderer that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRender;

impl ProgressRenderer for NoRender {
    fn open(&mut self, _label: &str, _display: DisplayMode) {}
    fn update(&mut self, _sample: &Sample) {}
    fn close(&mut self, _maximum: f64) {}
}

/// Parses a backend percent string such as `"\x1b[0;94m 42.5%\x1b[0m"`.
///
/// Returns 0.0 when the string does not hold a number.
#[must_use]
pub fn parse_percent(raw: &str) -> f64 {
    let stripped = ANSI_RE.replace_all(raw, "");
    stripped
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

/// Builds the on-screen label for an item.
#[must_use]
pub fn item_label(noun: &str, index: usize, collection_size: Option<usize>, title: &str) -> String {
    let short: String = title.chars().take(LABEL_TITLE_CHARS).collect();
    match collection_size {
        Some(count) => format!("{noun} {index}/{count}: {short}"),
        None => short,
    }
}

/// Converts transfer events into rendered per-item progress.
pub struct ProgressTracker<'r, R: ProgressRenderer + ?Sized> {
    renderer: &'r mut R,
    noun: &'static str,
    collection_size: Option<usize>,
    state: Option<ProgressState>,
    current_title: Option<String>,
    items_seen: usize,
    rendered: usize,
}

impl<'r, R: ProgressRenderer + ?Sized> ProgressTracker<'r, R> {
    /// Creates a tracker for a single item.
    pub fn single(renderer: &'r mut R, noun: &'static str) -> Self {
        Self::new(renderer, noun, None)
    }

    /// Creates a tracker for a collection of `count` items.
    pub fn collection(renderer: &'r mut R, noun: &'static str, count: usize) -> Self {
        Self::new(renderer, noun, Some(count))
    }

    fn new(renderer: &'r mut R, noun: &'static str, collection_size: Option<usize>) -> Self {
        Self {
            renderer,
            noun,
            collection_size,
            state: None,
            current_title: None,
            items_seen: 0,
            rendered: 0,
        }
    }

    /// State of the most recently opened item, if any.
    #[must_use]
    pub const fn state(&self) -> Option<&ProgressState> {
        self.state.as_ref()
    }

    /// Number of distinct items seen so far.
    #[must_use]
    pub const fn items_seen(&self) -> usize {
        self.items_seen
    }

    /// Number of samples that were rendered.
    #[must_use]
    pub const fn rendered(&self) -> usize {
        self.rendered
    }

    /// Handles an event stamped with the given wall-clock instant.
    pub fn handle_at(&mut self, event: TransferEvent, now: Instant) {
        match event {
            TransferEvent::Downloading {
                item_title,
                total_bytes,
                downloaded_bytes,
                percent,
                eta_seconds,
            } => {
                if self.current_title.as_deref() != Some(item_title.as_str()) {
                    self.items_seen += 1;
                    self.open(&item_title, total_bytes);
                    self.current_title = Some(item_title);
                } else if !self.is_downloading() {
                    // Another stream of the same item (e.g. audio after video).
                    self.open(&item_title, total_bytes);
                }
                self.sample(now, downloaded_bytes, &percent, eta_seconds);
            }
            TransferEvent::Finished { filename } => {
                self.finish();
                self.renderer.completed(&filename);
            }
        }
    }

    /// Forces the open item to `Finished`. No-op if nothing is open.
    pub fn finish(&mut self) {
        if let Some(state) = self.state.as_mut().filter(|s| s.phase == Phase::Downloading) {
            state.current = state.display.maximum();
            state.phase = Phase::Finished;
            self.renderer.close(state.current);
        }
    }

    /// Drops the open item without completing it (used when a download fails).
    pub fn abandon(&mut self) {
        if let Some(state) = self.state.as_mut().filter(|s| s.phase == Phase::Downloading) {
            state.phase = Phase::Finished;
            self.renderer.abandon();
        }
    }

    fn is_downloading(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.phase == Phase::Downloading)
    }

    fn open(&mut self, title: &str, total_bytes: Option<u64>) {
        self.finish();
        let index = self.items_seen.max(1);
        let label = item_label(self.noun, index, self.collection_size, title);
        let display = DisplayMode::for_total(total_bytes);
        log::debug!("Opening progress for item {index}: {title} ({display:?})");
        self.renderer.open(&label, display);
        self.state = Some(ProgressState {
            index,
            label,
            phase: Phase::Downloading,
            display,
            current: 0.0,
            last_sample_at: None,
            last_sample_bytes: 0,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    fn sample(&mut self, now: Instant, downloaded: u64, percent: &str, eta: Option<u64>) {
        let Some(state) = self.state.as_mut().filter(|s| s.phase == Phase::Downloading) else {
            return;
        };
        let window = match state.last_sample_at {
            Some(last) => {
                let since = now.saturating_duration_since(last);
                if since < SAMPLE_INTERVAL {
                    return;
                }
                since.max(MIN_RATE_WINDOW)
            }
            None => MIN_RATE_WINDOW,
        };

        let percent = parse_percent(percent);
        let rate = downloaded.saturating_sub(state.last_sample_bytes) as f64 / window.as_secs_f64();
        let position = match state.display {
            DisplayMode::Bytes { total } => downloaded.min(total) as f64,
            DisplayMode::Percent => percent.clamp(0.0, 100.0),
        };

        state.current = position;
        state.last_sample_at = Some(now);
        state.last_sample_bytes = downloaded;
        self.rendered += 1;
        self.renderer.update(&Sample {
            position,
            percent,
            rate,
            eta: format_eta(eta),
        });
    }
}

impl<R: ProgressRenderer + ?Sized> TransferSink for ProgressTracker<'_, R> {
    fn on_event(&mut self, event: TransferEvent) {
        self.handle_at(event, Instant::now());
    }
}

//! Progress bars and summary blocks for the terminal.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::download::DownloadSummary;
use crate::format::format_rate;
use crate::progress::{DisplayMode, ProgressRenderer, Sample};
use crate::stats::BatchResult;

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Percent-mode bars count in tenths of a percent.
const PERCENT_SCALE: f64 = 10.0;

fn make_bytes_bar(total: u64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{prefix:30} [{bar:40.cyan/blue}] {bytes}/{total_bytes} [{elapsed_precise}, {msg}]",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar.set_prefix(label.to_string());
    bar
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn make_percent_bar(label: &str) -> ProgressBar {
    let bar = ProgressBar::new((100.0 * PERCENT_SCALE) as u64);
    bar.set_style(
        ProgressStyle::with_template("{prefix:30} [{bar:40.cyan/blue}] {msg}")
            .expect("progress template is valid")
            .progress_chars("━━╌"),
    );
    bar.set_prefix(label.to_string());
    bar
}

/// Renders item progress with indicatif, one bar at a time.
#[derive(Default)]
pub struct IndicatifRenderer {
    bar: Option<(ProgressBar, DisplayMode)>,
}

impl IndicatifRenderer {
    /// Creates a renderer with no open bar.
    #[must_use]
    pub const fn new() -> Self {
        Self { bar: None }
    }
}

impl ProgressRenderer for IndicatifRenderer {
    fn open(&mut self, label: &str, display: DisplayMode) {
        let bar = match display {
            DisplayMode::Bytes { total } => make_bytes_bar(total, label),
            DisplayMode::Percent => make_percent_bar(label),
        };
        bar.enable_steady_tick(Duration::from_millis(250));
        self.bar = Some((bar, display));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn update(&mut self, sample: &Sample) {
        let Some((bar, display)) = &self.bar else {
            return;
        };
        let rate = format_rate(sample.rate);
        match display {
            DisplayMode::Bytes { .. } => {
                bar.set_position(sample.position as u64);
                bar.set_message(format!("{:.1}%, {}, {rate}", sample.percent, sample.eta));
            }
            DisplayMode::Percent => {
                bar.set_position((sample.position * PERCENT_SCALE).round() as u64);
                bar.set_message(format!(
                    "{:.1}/100 [{}, {rate}]",
                    sample.position, sample.eta
                ));
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn close(&mut self, maximum: f64) {
        if let Some((bar, display)) = self.bar.take() {
            let position = match display {
                DisplayMode::Bytes { .. } => maximum,
                DisplayMode::Percent => maximum * PERCENT_SCALE,
            };
            bar.set_position(position.round() as u64);
            bar.finish();
        }
    }

    fn abandon(&mut self) {
        if let Some((bar, _)) = self.bar.take() {
            bar.abandon();
        }
    }

    fn completed(&mut self, filename: &str) {
        println!(
            "{}",
            style(format!("✅ Download complete: {filename}")).green()
        );
    }
}

/// Prints the pre-download information block.
pub fn print_download_info(summary: &DownloadSummary) {
    println!("\n{SEPARATOR}");
    println!("{}", style("Download Info").yellow().bold());
    println!("{SEPARATOR}");
    println!("  Title:          {}", summary.title);
    println!("  Uploader:       {}", summary.uploader);
    println!("  Duration:       {}", summary.duration);
    println!("  Chosen format:  {}", summary.format_label);
    println!("  Size:           {}", summary.size);
    println!("  Destination:    {}", summary.destination.display());
    println!("{SEPARATOR}");
}

/// Prints the collection header shown before confirming a playlist.
pub fn print_collection(title: &str, item_count: usize) {
    println!("{}", style(format!("🎥 Playlist: {title}")).blue());
    println!("{}", style(format!("📋 Number of videos: {item_count}")).blue());
}

/// Prints the end-of-run summary.
pub fn print_batch_summary(result: &BatchResult, elapsed: Duration) {
    println!("\n{SEPARATOR}");
    println!("{}", style(result.summary_line()).green());
    println!("{SEPARATOR}");
    if result.fell_back > 0 {
        println!("  Best available: {}", result.fell_back);
    }
    if result.declined > 0 {
        println!("  Declined:       {}", result.declined);
    }
    if result.failed > 0 {
        println!("  Failed:         {}", result.failed);
    }
    println!("  Total time:     {:.1}s", elapsed.as_secs_f64());
}

//! Interactive terminal front end for ytgrab.

mod progress;

use std::io::{self, BufRead, IsTerminal};

use console::{Term, style};

use crate::config::{AppConfig, DownloadType, UserDefaults};
use crate::download::{DownloadSummary, Interaction, Orchestrator};
use crate::error::Result;
use crate::policy::{AdvancedOptions, AudioQuality, Mode, VideoQuality};
use crate::stats::BatchTimer;
use crate::url::dedup_links;
use crate::ytdlp::YtDlp;

pub use progress::{IndicatifRenderer, print_batch_summary, print_collection, print_download_info};

/// Answers supplied on the command line instead of at the prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Links given as positional arguments.
    pub links: Vec<String>,
    /// Download type (`-m`).
    pub mode: Option<DownloadType>,
    /// Quality tier (`-q`).
    pub quality: Option<String>,
    /// Raw format expression (`-f`); implies advanced mode.
    pub format: Option<String>,
    /// Persist this run's choices as the new defaults.
    pub save_defaults: bool,
}

// ============================================================================
// Input parsing
// ============================================================================

/// Parses the download type menu. Empty input picks `default`.
#[must_use]
pub fn parse_type_choice(input: &str, default: DownloadType) -> Option<DownloadType> {
    let input = input.trim();
    if input.is_empty() {
        Some(default)
    } else {
        DownloadType::from_choice(input)
    }
}

/// Parses the video menu: a menu number or a tier name. Anything else picks `default`.
#[must_use]
pub fn parse_video_choice(input: &str, default: VideoQuality) -> VideoQuality {
    let tiers = VideoQuality::all();
    menu_pick(input, &tiers)
        .or_else(|| input.parse().ok())
        .unwrap_or(default)
}

/// Parses the audio menu: a menu number or a tier name. Anything else picks `default`.
#[must_use]
pub fn parse_audio_choice(input: &str, default: AudioQuality) -> AudioQuality {
    let tiers = AudioQuality::all();
    menu_pick(input, &tiers)
        .or_else(|| input.parse().ok())
        .unwrap_or(default)
}

fn menu_pick<T: Copy>(input: &str, entries: &[T]) -> Option<T> {
    let n: usize = input.trim().parse().ok()?;
    n.checked_sub(1).and_then(|i| entries.get(i)).copied()
}

/// Parses a y/n answer. Empty or unrecognised input picks `default`.
#[must_use]
pub fn parse_yes_no(input: &str, default: bool) -> bool {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

const fn yes_no_hint(default: bool) -> &'static str {
    if default { "y" } else { "n" }
}

// ============================================================================
// Prompts
// ============================================================================

fn ask(term: &Term, text: &str) -> io::Result<String> {
    term.write_str(&format!("{} ", style(format!("➤ {text}")).cyan()))?;
    if term.is_term() && io::stdin().is_terminal() {
        term.read_line()
    } else {
        let line = read_piped_line(&mut io::stdin().lock())?;
        term.write_line("")?;
        Ok(line)
    }
}

/// Reads one answer from redirected input. EOF reads as an empty answer.
fn read_piped_line(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn heading(text: &str) {
    println!("{}", style(text).blue());
}

fn entry(text: &str) {
    println!("{}", style(text).green());
}

fn prompt_links(term: &Term) -> io::Result<String> {
    entry("Enter YouTube video or playlist links (separated by space):");
    ask(term, "")
}

fn prompt_download_type(term: &Term, defaults: &UserDefaults) -> io::Result<DownloadType> {
    heading("Choose download type:");
    entry("1. Video (MP4)");
    entry("2. Audio (MP3)");
    entry("3. Advanced (custom format & options)");
    let default = defaults.download_type();
    loop {
        let input = ask(
            term,
            &format!("Enter choice (1-3, default: {}):", default.choice()),
        )?;
        if let Some(choice) = parse_type_choice(&input, default) {
            return Ok(choice);
        }
        println!("{}", style("Invalid choice. Please select 1, 2, or 3.").red());
    }
}

fn prompt_video_quality(term: &Term, defaults: &UserDefaults) -> io::Result<VideoQuality> {
    heading("Available video qualities:");
    for (i, tier) in VideoQuality::all().iter().enumerate() {
        let name = match tier {
            VideoQuality::Best => "Best Quality available".to_string(),
            VideoQuality::MaxHeight(h) => format!("{h}p"),
        };
        entry(&format!("{}. {name}", i + 1));
    }
    let default = defaults.video_quality();
    let input = ask(term, &format!("Select quality (1-7, default: {default}):"))?;
    Ok(parse_video_choice(&input, default))
}

fn prompt_audio_quality(term: &Term, defaults: &UserDefaults) -> io::Result<AudioQuality> {
    heading("Available audio qualities (MP3):");
    for (i, tier) in AudioQuality::all().iter().enumerate() {
        let name = match tier {
            AudioQuality::Best => "Best Quality Available".to_string(),
            AudioQuality::Kbps(k) => format!("{k} kbps"),
        };
        entry(&format!("{}. {name}", i + 1));
    }
    let default = defaults.audio_quality();
    let input = ask(term, &format!("Select quality (1-5, default: {default}):"))?;
    Ok(parse_audio_choice(&input, default))
}

fn prompt_advanced(term: &Term, defaults: &UserDefaults) -> io::Result<AdvancedOptions> {
    heading("Advanced download options:");
    let base = defaults.advanced_options();
    let format = ask(
        term,
        &format!("Enter custom yt-dlp format (default: {}):", base.format),
    )?;
    let format = match format.trim() {
        "" => base.format,
        custom => custom.to_string(),
    };
    let toggle = |question: &str, default: bool| -> io::Result<bool> {
        let input = ask(
            term,
            &format!("{question} (y/n, default: {}):", yes_no_hint(default)),
        )?;
        Ok(parse_yes_no(&input, default))
    };
    Ok(AdvancedOptions {
        format,
        subtitles: toggle("Download subtitles?", base.subtitles)?,
        thumbnails: toggle("Download thumbnails?", base.thumbnails)?,
        metadata: toggle("Embed metadata?", base.metadata)?,
    })
}

/// Picks the mode from flags, prompting for whatever is missing.
fn choose_mode(term: &Term, defaults: &UserDefaults, args: &CliArgs) -> io::Result<Mode> {
    let download_type = match (args.mode, &args.format) {
        (Some(t), _) => t,
        (None, Some(_)) => DownloadType::Advanced,
        (None, None) => prompt_download_type(term, defaults)?,
    };

    Ok(match download_type {
        DownloadType::Video => Mode::Video(match &args.quality {
            Some(q) => parse_video_choice(q, defaults.video_quality()),
            None => prompt_video_quality(term, defaults)?,
        }),
        DownloadType::Audio => Mode::Audio(match &args.quality {
            Some(q) => parse_audio_choice(q, defaults.audio_quality()),
            None => prompt_audio_quality(term, defaults)?,
        }),
        DownloadType::Advanced => Mode::Advanced(match &args.format {
            Some(format) => AdvancedOptions {
                format: format.clone(),
                ..defaults.advanced_options()
            },
            None => prompt_advanced(term, defaults)?,
        }),
    })
}

// ============================================================================
// Console interaction
// ============================================================================

/// Confirms through the terminal and prints notices in color.
pub struct ConsoleInteraction {
    term: Term,
    assume_yes: bool,
}

impl ConsoleInteraction {
    /// Creates an interaction; with `assume_yes` every confirmation passes.
    #[must_use]
    pub const fn new(term: Term, assume_yes: bool) -> Self {
        Self { term, assume_yes }
    }

    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            println!("{}", style(format!("➤ {question} (y/n): y")).cyan());
            return true;
        }
        match ask(&self.term, &format!("{question} (y/n):")) {
            Ok(input) => parse_yes_no(&input, false),
            Err(e) => {
                log::warn!("Failed to read confirmation: {e}");
                false
            }
        }
    }
}

impl Interaction for ConsoleInteraction {
    fn confirm_collection(&mut self, title: &str, item_count: usize) -> bool {
        print_collection(title, item_count);
        self.confirm("Proceed with downloading playlist?")
    }

    fn confirm_download(&mut self, summary: &DownloadSummary) -> bool {
        print_download_info(summary);
        self.confirm("Proceed?")
    }

    fn warn(&mut self, message: &str) {
        println!("{}", style(message).yellow());
    }

    fn error(&mut self, message: &str) {
        println!("{}", style(message).red());
    }

    fn info(&mut self, message: &str) {
        println!("{}", style(message).yellow().dim());
    }
}

/// Runs an interactive session.
///
/// # Errors
///
/// Returns an error if the destination directories cannot be created or the
/// terminal cannot be read. Per-link failures are reported, not returned.
pub async fn run(config: AppConfig, args: CliArgs) -> Result<()> {
    let term = Term::stdout();

    let (mut defaults, problem) = UserDefaults::load_or_default(&config.paths.config_file);
    if let Some(e) = problem {
        println!("{}", style(format!("Error: {e}. Using default settings.")).red());
    }
    config.paths.ensure_dirs()?;

    let raw = if args.links.is_empty() {
        prompt_links(&term)?
    } else {
        args.links.join(" ")
    };
    let (links, dropped) = dedup_links(&raw);
    if dropped > 0 {
        println!(
            "{}",
            style(format!("Ignoring {dropped} duplicate link(s).")).yellow()
        );
    }
    if links.is_empty() {
        println!("{}", style("No valid URLs provided. Exiting.").red());
        return Ok(());
    }

    let mode = choose_mode(&term, &defaults, &args)?;
    if args.save_defaults {
        defaults.remember(&mode);
        match defaults.save(&config.paths.config_file) {
            Ok(()) => log::info!("Saved defaults to {}", config.paths.config_file.display()),
            Err(e) => println!("{}", style(format!("Could not save defaults: {e}")).red()),
        }
    }

    let interaction = ConsoleInteraction::new(term, config.assume_yes);
    let mut orchestrator = Orchestrator::new(
        YtDlp::new(config.backend.clone()),
        interaction,
        IndicatifRenderer::new(),
        config.paths.clone(),
    );

    let timer = BatchTimer::start();
    let result = orchestrator.run(&links, &mode).await;
    print_batch_summary(&result, timer.elapsed());
    Ok(())
}

//! Download modes, quality tiers and the format resolver.
//!
//! A [`Mode`] is what the user picked; [`resolve`] turns it into a
//! [`FormatPolicy`] (the concrete selector expressions plus a display label)
//! and [`Mode::post_processing`] into the transcode/embedding options handed
//! to the backend.

use std::fmt;
use std::str::FromStr;

/// Unconstrained "best available" selector used as the fallback everywhere.
pub const BEST_AVAILABLE: &str = "bestvideo+bestaudio/best";

/// Selector for audio downloads: best audio-only stream, else best muxed.
pub const BEST_AUDIO: &str = "bestaudio/best";

/// Video heights offered as quality tiers.
pub const VIDEO_HEIGHTS: [u32; 6] = [360, 480, 720, 1080, 1440, 2160];

/// Audio bitrates (kbps) offered as quality tiers.
pub const AUDIO_BITRATES: [u32; 4] = [128, 192, 256, 320];

/// Bitrate used when the audio tier is "best".
pub const BEST_AUDIO_KBPS: u32 = 320;

/// Error returned when a quality tier string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTier(pub String);

impl fmt::Display for UnknownTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown quality tier '{}'", self.0)
    }
}

impl std::error::Error for UnknownTier {}

/// Video quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoQuality {
    /// Best video+audio available.
    Best,
    /// Best video no taller than the given height, plus best audio.
    MaxHeight(u32),
}

impl VideoQuality {
    /// All tiers in menu order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        std::iter::once(Self::Best)
            .chain(VIDEO_HEIGHTS.iter().map(|&h| Self::MaxHeight(h)))
            .collect()
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => f.write_str("best"),
            Self::MaxHeight(h) => write!(f, "{h}p"),
        }
    }
}

impl FromStr for VideoQuality {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("best") {
            return Ok(Self::Best);
        }
        s.strip_suffix('p')
            .unwrap_or(s)
            .parse::<u32>()
            .ok()
            .filter(|h| VIDEO_HEIGHTS.contains(h))
            .map(Self::MaxHeight)
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Audio quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioQuality {
    /// Best available, transcoded at [`BEST_AUDIO_KBPS`].
    Best,
    /// Fixed transcode bitrate in kbps.
    Kbps(u32),
}

impl AudioQuality {
    /// All tiers in menu order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        std::iter::once(Self::Best)
            .chain(AUDIO_BITRATES.iter().map(|&k| Self::Kbps(k)))
            .collect()
    }

    /// Target bitrate for the transcode step.
    #[must_use]
    pub const fn target_kbps(self) -> u32 {
        match self {
            Self::Best => BEST_AUDIO_KBPS,
            Self::Kbps(k) => k,
        }
    }

    /// Label used in filenames and prompts, e.g. `"320kbps"`.
    #[must_use]
    pub fn label(self) -> String {
        format!("{}kbps", self.target_kbps())
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => f.write_str("best"),
            Self::Kbps(k) => write!(f, "{k}"),
        }
    }
}

impl FromStr for AudioQuality {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("best") {
            return Ok(Self::Best);
        }
        s.trim_end_matches("kbps")
            .parse::<u32>()
            .ok()
            .filter(|k| AUDIO_BITRATES.contains(k))
            .map(Self::Kbps)
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Options for a raw-selector download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedOptions {
    /// User-supplied format expression, passed through verbatim.
    pub format: String,
    /// Write subtitle files.
    pub subtitles: bool,
    /// Write thumbnail images.
    pub thumbnails: bool,
    /// Embed metadata into the container.
    pub metadata: bool,
}

/// What the user asked to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Video merged into MP4.
    Video(VideoQuality),
    /// Audio transcoded to MP3.
    Audio(AudioQuality),
    /// Raw format expression with optional extras.
    Advanced(AdvancedOptions),
}

impl Mode {
    /// Noun used for items in progress labels ("Video 2/5: ...").
    #[must_use]
    pub const fn item_noun(&self) -> &'static str {
        match self {
            Self::Audio(_) => "Audio",
            Self::Video(_) | Self::Advanced(_) => "Video",
        }
    }

    /// Whether a failed single-item download is retried with the fallback selector.
    #[must_use]
    pub const fn retries_download(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// Post-processing options passed alongside the selector.
    #[must_use]
    pub fn post_processing(&self) -> PostProcessing {
        match self {
            Self::Video(_) => PostProcessing {
                merge_format: Some("mp4"),
                ..PostProcessing::default()
            },
            Self::Audio(quality) => PostProcessing {
                audio: Some(AudioExtraction {
                    codec: "mp3",
                    bitrate_kbps: quality.target_kbps(),
                }),
                ..PostProcessing::default()
            },
            Self::Advanced(opts) => PostProcessing {
                merge_format: Some("mp4"),
                write_subtitles: opts.subtitles,
                write_thumbnail: opts.thumbnails,
                embed_thumbnail: opts.thumbnails && opts.metadata,
                add_metadata: opts.metadata,
                ..PostProcessing::default()
            },
        }
    }
}

/// Audio extraction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioExtraction {
    /// Target codec, e.g. `"mp3"`.
    pub codec: &'static str,
    /// Target bitrate in kbps.
    pub bitrate_kbps: u32,
}

/// Container/codec post-processing applied by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessing {
    /// Container to merge separate video/audio streams into.
    pub merge_format: Option<&'static str>,
    /// Extract and transcode audio.
    pub audio: Option<AudioExtraction>,
    /// Write subtitle files.
    pub write_subtitles: bool,
    /// Write thumbnail image.
    pub write_thumbnail: bool,
    /// Embed thumbnail into the output.
    pub embed_thumbnail: bool,
    /// Embed metadata into the output.
    pub add_metadata: bool,
    /// Never clobber an existing destination during post-processing.
    pub no_post_overwrites: bool,
}

impl Default for PostProcessing {
    fn default() -> Self {
        Self {
            merge_format: None,
            audio: None,
            write_subtitles: false,
            write_thumbnail: false,
            embed_thumbnail: false,
            add_metadata: false,
            no_post_overwrites: true,
        }
    }
}

impl PostProcessing {
    /// Whether an external transcoder is needed to honour these options.
    #[must_use]
    pub const fn needs_transcoder(&self) -> bool {
        self.merge_format.is_some() || self.audio.is_some() || self.embed_thumbnail
    }
}

/// Concrete format selection for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Selector tried first.
    pub primary: String,
    /// Relaxed selector for the one-shot retry; `None` means failures are terminal.
    pub fallback: Option<String>,
    /// Stable, filesystem-friendly label ("720p", "320kbps", "best").
    pub label: String,
}

impl FormatPolicy {
    /// Returns the policy adopted after falling back: the fallback selector
    /// becomes primary, no further fallback remains, and the label is "best".
    #[must_use]
    pub fn relaxed(&self) -> Option<Self> {
        self.fallback.as_ref().map(|fallback| Self {
            primary: fallback.clone(),
            fallback: None,
            label: "best".to_string(),
        })
    }

    /// Whether the label names the unconstrained tier.
    #[must_use]
    pub fn is_best(&self) -> bool {
        self.label == "best"
    }
}

/// Maps a mode and its quality tier to a [`FormatPolicy`].
#[must_use]
pub fn resolve(mode: &Mode) -> FormatPolicy {
    match mode {
        Mode::Video(VideoQuality::Best) => FormatPolicy {
            primary: BEST_AVAILABLE.to_string(),
            fallback: Some(BEST_AVAILABLE.to_string()),
            label: "best".to_string(),
        },
        Mode::Video(VideoQuality::MaxHeight(h)) => FormatPolicy {
            primary: format!("bv*[height<={h}]+ba/best"),
            fallback: Some(BEST_AVAILABLE.to_string()),
            label: format!("{h}p"),
        },
        Mode::Audio(quality) => FormatPolicy {
            primary: BEST_AUDIO.to_string(),
            fallback: None,
            label: quality.label(),
        },
        Mode::Advanced(opts) => FormatPolicy {
            primary: opts.format.clone(),
            fallback: None,
            label: opts.format.clone(),
        },
    }
}

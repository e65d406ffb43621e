//! Configuration: persisted user defaults, paths and backend binaries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::policy::{AdvancedOptions, AudioQuality, BEST_AVAILABLE, Mode, VideoQuality};

/// Name of the persisted defaults file in the home directory.
pub const CONFIG_FILE_NAME: &str = ".yt_dlp_config.json";

/// Environment variable overriding the yt-dlp binary.
pub const YTDLP_ENV: &str = "YTGRAB_YTDLP";

/// Environment variable overriding the transcoder binary.
pub const TRANSCODER_ENV: &str = "YTGRAB_FFMPEG";

/// Download type picked from the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadType {
    /// Menu entry 1.
    Video,
    /// Menu entry 2.
    Audio,
    /// Menu entry 3.
    Advanced,
}

impl DownloadType {
    /// Parses a menu choice ("1", "2" or "3").
    #[must_use]
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::Video),
            "2" => Some(Self::Audio),
            "3" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Parses a mode name as given on the command line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "video" | "v" | "1" => Some(Self::Video),
            "audio" | "a" | "2" => Some(Self::Audio),
            "advanced" | "adv" | "3" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// The menu choice string for this type.
    #[must_use]
    pub const fn choice(self) -> &'static str {
        match self {
            Self::Video => "1",
            Self::Audio => "2",
            Self::Advanced => "3",
        }
    }
}

/// Persisted user defaults, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDefaults {
    /// Default menu choice: "1" video, "2" audio, "3" advanced.
    pub download_type: String,
    /// Default video tier ("best", "720p", ...).
    pub video_quality: String,
    /// Default audio tier ("best", "320", ...).
    pub audio_quality: String,
    /// Default raw format expression for advanced mode.
    pub advanced_format: String,
    /// Default for writing subtitles.
    pub subtitles: bool,
    /// Default for writing thumbnails.
    pub thumbnails: bool,
    /// Default for embedding metadata.
    pub metadata: bool,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            download_type: "1".to_string(),
            video_quality: "best".to_string(),
            audio_quality: "320".to_string(),
            advanced_format: BEST_AVAILABLE.to_string(),
            subtitles: false,
            thumbnails: false,
            metadata: false,
        }
    }
}

impl UserDefaults {
    /// Loads defaults from `path`. A missing file yields built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptConfig`] if the file cannot be parsed, or an
    /// I/O error if it exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| Error::CorruptConfig {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads defaults, substituting built-ins on any failure.
    ///
    /// The failure, if any, is returned alongside so the caller can report it.
    #[must_use]
    pub fn load_or_default(path: &Path) -> (Self, Option<Error>) {
        match Self::load(path) {
            Ok(defaults) => (defaults, None),
            Err(e) => {
                log::error!("Failed to load config: {e}");
                (Self::default(), Some(e))
            }
        }
    }

    /// Saves defaults to `path` atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Default download type; unknown values fall back to video.
    #[must_use]
    pub fn download_type(&self) -> DownloadType {
        DownloadType::from_choice(&self.download_type).unwrap_or(DownloadType::Video)
    }

    /// Default video tier; unknown values fall back to best.
    #[must_use]
    pub fn video_quality(&self) -> VideoQuality {
        self.video_quality.parse().unwrap_or(VideoQuality::Best)
    }

    /// Default audio tier; unknown values fall back to best.
    #[must_use]
    pub fn audio_quality(&self) -> AudioQuality {
        self.audio_quality.parse().unwrap_or(AudioQuality::Best)
    }

    /// Default advanced options.
    #[must_use]
    pub fn advanced_options(&self) -> AdvancedOptions {
        AdvancedOptions {
            format: self.advanced_format.clone(),
            subtitles: self.subtitles,
            thumbnails: self.thumbnails,
            metadata: self.metadata,
        }
    }

    /// Records `mode` as the new default, leaving other modes' settings alone.
    pub fn remember(&mut self, mode: &Mode) {
        match mode {
            Mode::Video(quality) => {
                self.download_type = DownloadType::Video.choice().to_string();
                self.video_quality = quality.to_string();
            }
            Mode::Audio(quality) => {
                self.download_type = DownloadType::Audio.choice().to_string();
                self.audio_quality = quality.to_string();
            }
            Mode::Advanced(opts) => {
                self.download_type = DownloadType::Advanced.choice().to_string();
                self.advanced_format.clone_from(&opts.format);
                self.subtitles = opts.subtitles;
                self.thumbnails = opts.thumbnails;
                self.metadata = opts.metadata;
            }
        }
    }
}

/// Destination and config file locations.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Directory for video and advanced downloads.
    pub video_dir: PathBuf,
    /// Directory for audio downloads.
    pub audio_dir: PathBuf,
    /// Persisted defaults file.
    pub config_file: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let root = home.join("Downloads").join("YT-DLP");

        Self {
            video_dir: root.join("Videos"),
            audio_dir: root.join("Audios"),
            config_file: home.join(CONFIG_FILE_NAME),
        }
    }
}

impl PathConfig {
    /// Creates the destination directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.video_dir)?;
        std::fs::create_dir_all(&self.audio_dir)?;
        Ok(())
    }

    /// Destination directory for a mode.
    #[must_use]
    pub fn dir_for(&self, mode: &Mode) -> &Path {
        match mode {
            Mode::Audio(_) => &self.audio_dir,
            Mode::Video(_) | Mode::Advanced(_) => &self.video_dir,
        }
    }
}

/// External binaries used by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// yt-dlp executable (name on PATH or full path).
    pub ytdlp_binary: PathBuf,
    /// Transcoder executable (name on PATH or full path).
    pub transcoder_binary: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ytdlp_binary: PathBuf::from("yt-dlp"),
            transcoder_binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl BackendConfig {
    /// Defaults overridden by [`YTDLP_ENV`] and [`TRANSCODER_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(bin) = std::env::var(YTDLP_ENV) {
            config.ytdlp_binary = PathBuf::from(bin);
        }
        if let Ok(bin) = std::env::var(TRANSCODER_ENV) {
            config.transcoder_binary = PathBuf::from(bin);
        }
        config
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Path configuration.
    pub paths: PathConfig,
    /// Backend binaries.
    pub backend: BackendConfig,
    /// Auto-confirm every prompt.
    pub assume_yes: bool,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from defaults and the environment.
    #[must_use]
    pub fn load() -> Self {
        Self::new().with_backend(BackendConfig::from_env())
    }

    /// Sets the backend configuration.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Sets whether prompts are auto-confirmed.
    #[must_use]
    pub const fn with_assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_user_defaults() {
        let defaults = UserDefaults::default();
        assert_eq!(defaults.download_type, "1");
        assert_eq!(defaults.video_quality, "best");
        assert_eq!(defaults.audio_quality, "320");
        assert_eq!(defaults.advanced_format, "bestvideo+bestaudio/best");
        assert!(!defaults.subtitles && !defaults.thumbnails && !defaults.metadata);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = UserDefaults::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, UserDefaults::default());
    }

    #[test]
    fn corrupted_file_is_reported_and_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            UserDefaults::load(&path),
            Err(Error::CorruptConfig { .. })
        ));
        let (defaults, warning) = UserDefaults::load_or_default(&path);
        assert_eq!(defaults, UserDefaults::default());
        assert!(matches!(warning, Some(Error::CorruptConfig { .. })));
    }

    #[test]
    fn partial_record_fills_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"download_type": "2", "audio_quality": "192"}"#).unwrap();

        let loaded = UserDefaults::load(&path).unwrap();
        assert_eq!(loaded.download_type(), DownloadType::Audio);
        assert_eq!(loaded.audio_quality(), AudioQuality::Kbps(192));
        assert_eq!(loaded.video_quality(), VideoQuality::Best);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let defaults = UserDefaults {
            video_quality: "720p".into(),
            subtitles: true,
            ..UserDefaults::default()
        };
        defaults.save(&path).unwrap();
        assert_eq!(UserDefaults::load(&path).unwrap(), defaults);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn unknown_values_fall_back() {
        let defaults = UserDefaults {
            download_type: "9".into(),
            video_quality: "999p".into(),
            audio_quality: "loud".into(),
            ..UserDefaults::default()
        };
        assert_eq!(defaults.download_type(), DownloadType::Video);
        assert_eq!(defaults.video_quality(), VideoQuality::Best);
        assert_eq!(defaults.audio_quality(), AudioQuality::Best);
    }

    #[test]
    fn remember_updates_only_the_chosen_mode() {
        let mut defaults = UserDefaults::default();
        defaults.remember(&Mode::Audio(AudioQuality::Kbps(192)));
        assert_eq!(defaults.download_type, "2");
        assert_eq!(defaults.audio_quality, "192");
        assert_eq!(defaults.video_quality, "best");

        defaults.remember(&Mode::Advanced(AdvancedOptions {
            format: "137+140".into(),
            subtitles: true,
            thumbnails: false,
            metadata: true,
        }));
        assert_eq!(defaults.download_type(), DownloadType::Advanced);
        assert_eq!(defaults.advanced_format, "137+140");
        assert!(defaults.subtitles && defaults.metadata);
        assert_eq!(defaults.audio_quality(), AudioQuality::Kbps(192));
    }

    #[test]
    fn download_type_parsing() {
        assert_eq!(DownloadType::from_choice("2"), Some(DownloadType::Audio));
        assert_eq!(DownloadType::from_choice("4"), None);
        assert_eq!(DownloadType::from_name("Advanced"), Some(DownloadType::Advanced));
        assert_eq!(DownloadType::Video.choice(), "1");
    }

    #[test]
    fn default_path_config() {
        let paths = PathConfig::default();
        assert!(paths.video_dir.ends_with("Downloads/YT-DLP/Videos"));
        assert!(paths.audio_dir.ends_with("Downloads/YT-DLP/Audios"));
        assert!(paths.config_file.ends_with(CONFIG_FILE_NAME));
        assert_eq!(paths.dir_for(&Mode::Audio(AudioQuality::Best)), paths.audio_dir);
        assert_eq!(paths.dir_for(&Mode::Video(VideoQuality::Best)), paths.video_dir);
    }

    #[test]
    fn ensure_dirs_creates_destinations() {
        let dir = TempDir::new().unwrap();
        let paths = PathConfig {
            video_dir: dir.path().join("v"),
            audio_dir: dir.path().join("a"),
            config_file: dir.path().join("c.json"),
        };
        paths.ensure_dirs().unwrap();
        assert!(paths.video_dir.is_dir());
        assert!(paths.audio_dir.is_dir());
    }

    #[test]
    fn app_config_builder_pattern() {
        let config = AppConfig::new()
            .with_backend(BackendConfig {
                ytdlp_binary: "/opt/yt-dlp".into(),
                transcoder_binary: "/opt/ffmpeg".into(),
            })
            .with_assume_yes(true);
        assert!(config.assume_yes);
        assert_eq!(config.backend.ytdlp_binary, PathBuf::from("/opt/yt-dlp"));
    }
}

//! [`MediaBackend`] implementation driving the `yt-dlp` executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::backend::{
    Classification, DownloadOptions, MediaBackend, MediaManifest, TransferEvent, TransferSink,
};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::policy::PostProcessing;

/// Marker prefixed to every progress line we ask yt-dlp to print.
const PROGRESS_MARKER: &str = "[ytgrab]";

/// Tab-separated progress record. Title goes last so stray separators in it
/// are harmless.
const PROGRESS_FIELDS: &str = "%(progress.status)s\t%(progress.downloaded_bytes)s\t\
%(progress.total_bytes)s\t%(progress.total_bytes_estimate)s\t%(info.filesize)s\t\
%(info.filesize_approx)s\t%(progress.eta)s\t%(progress._percent_str)s\t\
%(progress.filename)s\t%(info.title)s";

const FORMAT_UNAVAILABLE: &[&str] = &[
    "requested format is not available",
    "requested format not available",
    "no video formats found",
];

const LINK_UNRESOLVABLE: &[&str] = &[
    "unsupported url",
    "is not a valid url",
    "video unavailable",
    "incomplete youtube id",
    "http error 404",
    "private video",
    "this video is private",
    "does not exist",
];

#[derive(Debug, Deserialize)]
struct FlatInfo {
    title: Option<String>,
    entries: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ManifestInfo {
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    duration_string: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    height: Option<u32>,
}

/// The `yt-dlp` command-line backend.
#[derive(Debug, Clone, Default)]
pub struct YtDlp {
    config: BackendConfig,
}

impl YtDlp {
    /// Creates a backend using the given binaries.
    #[must_use]
    pub const fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.ytdlp_binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: &std::io::Error) -> Error {
        Error::Backend(format!(
            "failed to run {}: {e}",
            self.config.ytdlp_binary.display()
        ))
    }

    /// Runs yt-dlp to completion and returns stdout, or the stderr diagnostic.
    async fn run(&self, args: &[String]) -> std::result::Result<String, Failure> {
        log::debug!("yt-dlp {}", args.join(" "));
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| Failure::Spawn(self.spawn_error(&e)))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(Failure::Exit(String::from_utf8_lossy(&output.stderr).into_owned()))
        }
    }

    fn ffmpeg_location(&self) -> Option<&Path> {
        let bin = self.config.transcoder_binary.as_path();
        bin.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|_| bin)
    }
}

/// Why a yt-dlp invocation failed.
enum Failure {
    Spawn(Error),
    Exit(String),
}

impl Failure {
    fn into_error(
        self,
        url: &str,
        selector: Option<&str>,
        unknown: impl FnOnce(String) -> Error,
    ) -> Error {
        match self {
            Self::Spawn(e) => e,
            Self::Exit(stderr) => classify_failure(url, selector, &stderr, unknown),
        }
    }
}

#[async_trait]
impl MediaBackend for YtDlp {
    async fn classify(&self, url: &str) -> Result<Classification> {
        let args = vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            url.to_string(),
        ];
        let stdout = self.run(&args).await.map_err(|f| {
            f.into_error(url, None, |reason| Error::InvalidLink {
                url: url.to_string(),
                reason,
            })
        })?;
        parse_classification(&stdout)
    }

    async fn fetch_manifest(&self, url: &str, selector: &str) -> Result<MediaManifest> {
        let args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "-f".to_string(),
            selector.to_string(),
            url.to_string(),
        ];
        let stdout = self.run(&args).await.map_err(|f| {
            f.into_error(url, Some(selector), |reason| Error::InvalidLink {
                url: url.to_string(),
                reason,
            })
        })?;
        parse_manifest(&stdout)
    }

    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        sink: &mut dyn TransferSink,
    ) -> Result<()> {
        let mut args = vec![
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!("download:{PROGRESS_MARKER}{PROGRESS_FIELDS}"),
            "-f".to_string(),
            options.selector.clone(),
            "-o".to_string(),
            options.output_template.clone(),
        ];
        args.extend(post_processing_args(&options.post_processing));
        if let Some(location) = self.ffmpeg_location() {
            args.push("--ffmpeg-location".to_string());
            args.push(location.display().to_string());
        }
        args.push(url.to_string());
        log::debug!("yt-dlp {}", args.join(" "));

        let mut child = self
            .command()
            .args(&args)
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Backend("yt-dlp stdout unavailable".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| Error::Backend("yt-dlp stderr unavailable".to_string()))?;
        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_progress_line(&line) {
                Some(event) => sink.on_event(event),
                None => log::trace!("yt-dlp: {line}"),
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_reader.await.unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(classify_download_failure(&options.selector, &stderr))
        }
    }

    async fn ensure_transcoder(&self) -> Result<()> {
        let bin = &self.config.transcoder_binary;
        if find_executable(bin).is_some() {
            Ok(())
        } else {
            Err(Error::MissingTranscoder(bin.display().to_string()))
        }
    }
}

/// Builds yt-dlp flags for the given post-processing options.
#[must_use]
pub fn post_processing_args(post: &PostProcessing) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(container) = post.merge_format {
        args.extend(["--merge-output-format".to_string(), container.to_string()]);
    }
    if let Some(audio) = post.audio {
        args.extend([
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            audio.codec.to_string(),
            "--audio-quality".to_string(),
            format!("{}K", audio.bitrate_kbps),
        ]);
    }
    if post.write_subtitles {
        args.push("--write-subs".to_string());
    }
    if post.write_thumbnail {
        args.push("--write-thumbnail".to_string());
    }
    if post.embed_thumbnail {
        args.push("--embed-thumbnail".to_string());
    }
    if post.add_metadata {
        args.push("--embed-metadata".to_string());
    }
    if post.no_post_overwrites {
        args.push("--no-post-overwrites".to_string());
    }
    args
}

/// Parses the output of a flat `--dump-single-json` query.
///
/// # Errors
///
/// Returns [`Error::Json`] if the output is not valid JSON.
pub fn parse_classification(json: &str) -> Result<Classification> {
    let info: FlatInfo = serde_json::from_str(json)?;
    Ok(match info.entries {
        Some(entries) => Classification {
            is_collection: true,
            item_count: entries.len(),
            title: info
                .title
                .unwrap_or_else(|| "Unknown Playlist".to_string()),
        },
        None => Classification {
            is_collection: false,
            item_count: 1,
            title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        },
    })
}

/// Parses the output of a `--dump-single-json -f <selector>` query.
///
/// # Errors
///
/// Returns [`Error::Json`] if the output is not valid JSON.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_manifest(json: &str) -> Result<MediaManifest> {
    let info: ManifestInfo = serde_json::from_str(json)?;
    let size = info
        .filesize
        .or(info.filesize_approx)
        .filter(|s| *s > 0.0)
        .map(|s| s as u64);
    Ok(MediaManifest {
        title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        uploader: info.uploader,
        duration: info.duration,
        duration_string: info.duration_string,
        size,
        height: info.height,
    })
}

fn field(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    (!raw.is_empty() && raw != "NA" && raw != "None").then_some(raw)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn number(raw: &str) -> Option<u64> {
    field(raw)?
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}

/// Parses one line of our progress template into an event.
///
/// Lines without the marker, or with an unknown status, yield `None`.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<TransferEvent> {
    let record = line.trim_end_matches(['\r', '\n']);
    let record = record.strip_prefix(PROGRESS_MARKER)?;
    let parts: Vec<&str> = record.splitn(10, '\t').collect();
    let [status, downloaded, total, estimate, info_size, info_approx, eta, percent, filename, title] =
        parts.as_slice()
    else {
        return None;
    };

    match status.trim() {
        "downloading" => Some(TransferEvent::Downloading {
            item_title: field(title).unwrap_or("Unknown").to_string(),
            total_bytes: [total, estimate, info_size, info_approx]
                .into_iter()
                .find_map(|raw| number(raw).filter(|n| *n > 0)),
            downloaded_bytes: number(downloaded).unwrap_or(0),
            percent: (*percent).to_string(),
            eta_seconds: number(eta),
        }),
        "finished" => Some(TransferEvent::Finished {
            filename: field(filename).unwrap_or("Unknown").to_string(),
        }),
        _ => None,
    }
}

/// Maps yt-dlp's stderr to an error kind.
///
/// `unknown` builds the error for diagnostics that match no known pattern.
pub fn classify_failure(
    url: &str,
    selector: Option<&str>,
    stderr: &str,
    unknown: impl FnOnce(String) -> Error,
) -> Error {
    let reason = error_reason(stderr);
    let lower = reason.to_lowercase();

    if let Some(selector) = selector
        && FORMAT_UNAVAILABLE.iter().any(|p| lower.contains(p))
    {
        return Error::UnsatisfiableFormat {
            selector: selector.to_string(),
            reason,
        };
    }
    if LINK_UNRESOLVABLE.iter().any(|p| lower.contains(p)) {
        return Error::InvalidLink {
            url: url.to_string(),
            reason,
        };
    }
    unknown(reason)
}

/// Maps the stderr of a failed transfer.
///
/// The link has already resolved by then, so anything but a format failure
/// is a backend error.
#[must_use]
pub fn classify_download_failure(selector: &str, stderr: &str) -> Error {
    let reason = error_reason(stderr);
    let lower = reason.to_lowercase();
    if FORMAT_UNAVAILABLE.iter().any(|p| lower.contains(p)) {
        Error::UnsatisfiableFormat {
            selector: selector.to_string(),
            reason,
        }
    } else {
        Error::Backend(reason)
    }
}

/// The last `ERROR` line, or the whole trimmed output when there is none.
fn error_reason(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .trim()
        .to_string()
}

/// Locates an executable by path or on `PATH`.
#[must_use]
pub fn find_executable(bin: &Path) -> Option<PathBuf> {
    if bin.components().count() > 1 {
        return bin.is_file().then(|| bin.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(bin);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AdvancedOptions, AudioQuality, Mode, VideoQuality};

    #[test]
    fn parses_downloading_line() {
        let line = "[ytgrab]downloading\t512\t1024\tNA\tNA\tNA\t3\t\x1b[0;94m 50.0%\x1b[0m\t/tmp/clip.f137.mp4\tMy Clip";
        let event = parse_progress_line(line).unwrap();
        assert_eq!(
            event,
            TransferEvent::Downloading {
                item_title: "My Clip".into(),
                total_bytes: Some(1024),
                downloaded_bytes: 512,
                percent: "\x1b[0;94m 50.0%\x1b[0m".into(),
                eta_seconds: Some(3),
            }
        );
    }

    #[test]
    fn total_falls_back_to_estimates() {
        let line = "[ytgrab]downloading\t10\tNA\t2048.7\tNA\t9999\tNA\t1.0%\t/tmp/a\tA";
        let Some(TransferEvent::Downloading {
            total_bytes,
            eta_seconds,
            ..
        }) = parse_progress_line(line)
        else {
            panic!("expected downloading event");
        };
        assert_eq!(total_bytes, Some(2048));
        assert_eq!(eta_seconds, None);
    }

    #[test]
    fn title_may_contain_tabs() {
        let line = "[ytgrab]downloading\t1\tNA\tNA\tNA\tNA\tNA\t0.1%\t/tmp/a\tPart\tTwo";
        let Some(TransferEvent::Downloading { item_title, .. }) = parse_progress_line(line) else {
            panic!("expected downloading event");
        };
        assert_eq!(item_title, "Part\tTwo");
    }

    #[test]
    fn parses_finished_line() {
        let line = "[ytgrab]finished\t1024\t1024\tNA\tNA\tNA\tNA\t100.0%\t/tmp/clip.mp4\tMy Clip";
        assert_eq!(
            parse_progress_line(line),
            Some(TransferEvent::Finished {
                filename: "/tmp/clip.mp4".into()
            })
        );
    }

    #[test]
    fn ignores_foreign_lines() {
        assert_eq!(parse_progress_line("[download] Destination: x.mp4"), None);
        assert_eq!(parse_progress_line("[ytgrab]downloading\t1\t2"), None);
        assert_eq!(
            parse_progress_line("[ytgrab]error\t1\tNA\tNA\tNA\tNA\tNA\t0%\tx\tt"),
            None
        );
    }

    #[test]
    fn classifies_format_failures() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Requested format is not available. Use --list-formats\n";
        let selector = "bv*[height<=1080]+ba/best";
        let err = classify_failure("u", Some(selector), stderr, Error::Backend);
        assert!(matches!(err, Error::UnsatisfiableFormat { selector: ref s, .. } if s == selector));
    }

    #[test]
    fn classifies_unresolvable_links() {
        let err = classify_failure(
            "https://x.test/nope",
            None,
            "ERROR: Unsupported URL: https://x.test/nope\n",
            Error::Backend,
        );
        assert!(matches!(err, Error::InvalidLink { .. }));
    }

    #[test]
    fn unknown_failures_use_fallback_kind() {
        let stderr = "ERROR: Postprocessing: boom\n";
        let err = classify_failure("u", Some("best"), stderr, Error::Backend);
        assert!(matches!(err, Error::Backend(ref r) if r.contains("Postprocessing")));
    }

    #[test]
    fn transfer_failures_never_blame_the_link() {
        let err = classify_download_failure(
            "bv*[height<=1080]+ba/best",
            "ERROR: unable to download video data: HTTP Error 404: Not Found\n",
        );
        assert!(matches!(err, Error::Backend(ref r) if r.contains("HTTP Error 404")));
        assert!(err.is_retryable());

        let err = classify_download_failure(
            "bv*[height<=1080]+ba/best",
            "ERROR: [youtube] v: Requested format is not available\n",
        );
        assert!(err.is_format_failure());
    }

    #[test]
    fn flat_playlist_is_collection() {
        let json = r#"{"_type":"playlist","title":"Mix","entries":[{"id":"a"},{"id":"b"},{"id":"c"}]}"#;
        let found = parse_classification(json).unwrap();
        assert!(found.is_collection);
        assert_eq!(found.item_count, 3);
        assert_eq!(found.title, "Mix");
    }

    #[test]
    fn flat_video_is_single() {
        let found = parse_classification(r#"{"_type":"video","title":"Clip"}"#).unwrap();
        assert!(!found.is_collection);
        assert_eq!(found.item_count, 1);
    }

    #[test]
    fn manifest_prefers_exact_size() {
        let json = r#"{"title":"Clip","uploader":"Chan","duration":245.0,"duration_string":"4:05","filesize":null,"filesize_approx":1048576.4,"height":720}"#;
        let manifest = parse_manifest(json).unwrap();
        assert_eq!(manifest.title, "Clip");
        assert_eq!(manifest.uploader.as_deref(), Some("Chan"));
        assert_eq!(manifest.size, Some(1_048_576));
        assert_eq!(manifest.height, Some(720));
        assert_eq!(manifest.duration_string.as_deref(), Some("4:05"));
    }

    #[test]
    fn manifest_rejects_garbage() {
        assert!(matches!(parse_manifest("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn video_post_processing_flags() {
        let args = post_processing_args(&Mode::Video(VideoQuality::Best).post_processing());
        assert_eq!(
            args,
            vec!["--merge-output-format", "mp4", "--no-post-overwrites"]
        );
    }

    #[test]
    fn audio_post_processing_flags() {
        let args = post_processing_args(&Mode::Audio(AudioQuality::Best).post_processing());
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "320K"]));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.contains(&"--extract-audio".to_string()));
    }

    #[test]
    fn advanced_post_processing_flags() {
        let mode = Mode::Advanced(AdvancedOptions {
            format: "best".into(),
            subtitles: true,
            thumbnails: true,
            metadata: true,
        });
        let args = post_processing_args(&mode.post_processing());
        for flag in [
            "--write-subs",
            "--write-thumbnail",
            "--embed-thumbnail",
            "--embed-metadata",
        ] {
            assert!(args.contains(&flag.to_string()), "missing {flag}");
        }
    }

    #[test]
    fn find_executable_by_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("ffmpeg");
        std::fs::write(&bin, "").unwrap();
        assert_eq!(find_executable(&bin), Some(bin.clone()));
        assert_eq!(find_executable(&dir.path().join("absent")), None);
    }

    #[tokio::test]
    async fn missing_transcoder_is_reported() {
        let backend = YtDlp::new(BackendConfig {
            ytdlp_binary: "yt-dlp".into(),
            transcoder_binary: "/definitely/not/here/ffmpeg".into(),
        });
        let err = backend.ensure_transcoder().await.unwrap_err();
        assert!(matches!(err, Error::MissingTranscoder(_)));
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        #[derive(Default)]
        struct Collect(Vec<TransferEvent>);

        impl TransferSink for Collect {
            fn on_event(&mut self, event: TransferEvent) {
                self.0.push(event);
            }
        }

        fn fake_ytdlp(dir: &TempDir, script: &str) -> YtDlp {
            let path = dir.path().join("yt-dlp");
            std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            YtDlp::new(BackendConfig {
                ytdlp_binary: path,
                transcoder_binary: "ffmpeg".into(),
            })
        }

        fn options() -> DownloadOptions {
            DownloadOptions {
                selector: "bv*[height<=720]+ba/best".into(),
                output_template: "/tmp/Clip (720p).%(ext)s".into(),
                post_processing: PostProcessing::default(),
            }
        }

        #[tokio::test]
        async fn streams_progress_events_in_order() {
            let dir = TempDir::new().unwrap();
            let backend = fake_ytdlp(
                &dir,
                r"printf '[ytgrab]downloading\t512\t1024\tNA\tNA\tNA\t3\t 50.0%%\t/tmp/c.mp4\tClip\n'
echo '[download] unrelated'
printf '[ytgrab]finished\t1024\t1024\tNA\tNA\tNA\tNA\t100%%\t/tmp/c.mp4\tClip\n'",
            );
            let mut sink = Collect::default();
            backend
                .download("https://x.test/v", &options(), &mut sink)
                .await
                .unwrap();
            assert_eq!(sink.0.len(), 2);
            assert!(matches!(sink.0[0], TransferEvent::Downloading { downloaded_bytes: 512, .. }));
            assert!(matches!(sink.0[1], TransferEvent::Finished { .. }));
        }

        #[tokio::test]
        async fn failed_download_maps_stderr() {
            let dir = TempDir::new().unwrap();
            let backend = fake_ytdlp(
                &dir,
                "echo 'ERROR: [youtube] v: Requested format is not available' >&2\nexit 1",
            );
            let err = backend
                .download("https://x.test/v", &options(), &mut Collect::default())
                .await
                .unwrap_err();
            assert!(err.is_format_failure());
        }

        #[tokio::test]
        async fn failed_transfer_is_a_backend_error() {
            let dir = TempDir::new().unwrap();
            let backend = fake_ytdlp(
                &dir,
                "echo 'ERROR: unable to download video data: HTTP Error 404: Not Found' >&2\nexit 1",
            );
            let err = backend
                .download("https://x.test/v", &options(), &mut Collect::default())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Backend(_)));
        }

        #[tokio::test]
        async fn classify_reads_flat_json() {
            let dir = TempDir::new().unwrap();
            let backend = fake_ytdlp(
                &dir,
                r#"echo '{"title":"Mix","entries":[{"id":"a"},{"id":"b"}]}'"#,
            );
            let found = backend.classify("https://x.test/list").await.unwrap();
            assert!(found.is_collection);
            assert_eq!(found.item_count, 2);
        }

        #[tokio::test]
        async fn unknown_manifest_failures_are_invalid_links() {
            let dir = TempDir::new().unwrap();
            let backend = fake_ytdlp(&dir, "echo 'ERROR: network down' >&2\nexit 1");
            let err = backend
                .fetch_manifest("https://x.test/v", "best")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidLink { .. }));
        }
    }
}

//! ytgrab - interactive video and audio downloader.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::env;

use ytgrab::cli::CliArgs;
use ytgrab::{AppConfig, DownloadType, TRANSCODER_ENV, YTDLP_ENV};

struct Options {
    args: CliArgs,
    assume_yes: bool,
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    args.get(*i).cloned().unwrap_or_else(|| {
        eprintln!("Error: {flag} requires a value");
        std::process::exit(1);
    })
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut cli = CliArgs::default();
    let mut assume_yes = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-m" | "--mode" => {
                let value = take_value(&args, &mut i, "--mode");
                let Some(mode) = DownloadType::from_name(&value) else {
                    eprintln!("Unknown mode: {value} (expected video, audio or advanced)");
                    std::process::exit(1);
                };
                cli.mode = Some(mode);
            }
            "-q" | "--quality" => cli.quality = Some(take_value(&args, &mut i, "--quality")),
            "-f" | "--format" => cli.format = Some(take_value(&args, &mut i, "--format")),
            "-y" | "--yes" => assume_yes = true,
            "-s" | "--save-defaults" => cli.save_defaults = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => cli.links.push(arg.to_string()),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    Options {
        args: cli,
        assume_yes,
    }
}

fn print_usage() {
    eprintln!("Usage: ytgrab [OPTIONS] [url]...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [url]                 Video or playlist links (prompted for when omitted)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -m, --mode <MODE>     video, audio or advanced");
    eprintln!("  -q, --quality <Q>     Quality tier (e.g. best, 720p, 192)");
    eprintln!("  -f, --format <EXPR>   Raw yt-dlp format expression (implies advanced)");
    eprintln!("  -y, --yes             Confirm every prompt automatically");
    eprintln!("  -s, --save-defaults   Remember this run's choices as the new defaults");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {YTDLP_ENV:<21} yt-dlp executable (default: yt-dlp)");
    eprintln!("  {TRANSCODER_ENV:<21} ffmpeg executable (default: ffmpeg)");
    eprintln!("  RUST_LOG              Log filter (default: warn)");
}

#[tokio::main]
async fn main() -> ytgrab::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = parse_args();
    let config = AppConfig::load().with_assume_yes(options.assume_yes);
    ytgrab::cli::run(config, options.args).await
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use caption_fetch::transcript::OutputFormat;

#[derive(Parser)]
#[command(
    name = "caption-fetch",
    about = "Caption Fetch - Video Transcript Extraction",
    long_about = "Extracts caption data for a video through several independent strategies, caches the result, and exports it as plain text, SRT or WebVTT.",
    after_help = "EXAMPLES:\n    # Print the transcript of a video\n    caption-fetch fetch https://www.youtube.com/watch?v=dQw4w9WgXcQ\n\n    # Save it as SRT using the default file name\n    caption-fetch fetch dQw4w9WgXcQ --format srt --save\n\n    # Plain text with [MM:SS] prefixes\n    caption-fetch fetch dQw4w9WgXcQ --timestamps\n\n    # See which extraction strategies work for a video\n    caption-fetch probe dQw4w9WgXcQ\n\n    # Start the HTTP service and ask it from another shell\n    caption-fetch serve\n    caption-fetch fetch dQw4w9WgXcQ --server-url http://localhost:8080"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "serve")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
    #[command(name = "fetch")]
    Fetch {
        /// Video id or watch URL
        video: String,

        #[arg(long, short = 'f', default_value = "text")]
        format: OutputFormat,

        /// Prefix plain-text lines with [MM:SS]
        #[arg(long, short = 't')]
        timestamps: bool,

        #[arg(long, short = 'o', conflicts_with = "save")]
        output: Option<PathBuf>,

        /// Write to youtube_transcript_<id>.<ext> in the current directory
        #[arg(long)]
        save: bool,

        #[arg(long, conflicts_with = "server_url")]
        no_cache: bool,

        /// Ask a running `caption-fetch serve` instead of extracting locally
        #[arg(long)]
        server_url: Option<String>,

        /// Seconds to wait for connectivity, 0 waits forever
        #[arg(long, conflicts_with = "server_url")]
        online_timeout: Option<u64>,

        #[arg(long, conflicts_with = "server_url")]
        language: Option<String>,
    },
    #[command(name = "probe")]
    Probe {
        video: String,
    },
    #[command(name = "cache")]
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show where the cache lives and how many transcripts it holds
    Info,
    /// Drop every cached transcript
    Clear,
    /// Drop the cached transcript of one video
    Remove { video: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_with_format() {
        let cli = Cli::try_parse_from(["caption-fetch", "fetch", "abc", "--format", "srt", "--save"]).unwrap();
        match cli.command {
            Commands::Fetch { video, format, save, .. } => {
                assert_eq!(video, "abc");
                assert_eq!(format, OutputFormat::Srt);
                assert!(save);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn output_and_save_conflict() {
        let parsed = Cli::try_parse_from(["caption-fetch", "fetch", "abc", "-o", "out.srt", "--save"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn local_only_options_conflict_with_server_url() {
        for extra in [["--language", "de"], ["--online-timeout", "5"]] {
            let mut args = vec!["caption-fetch", "fetch", "abc", "--server-url", "http://localhost:8080"];
            args.extend(extra);
            assert!(Cli::try_parse_from(args).is_err(), "{extra:?} should conflict");
        }
        assert!(Cli::try_parse_from(["caption-fetch", "fetch", "abc", "--server-url", "http://x", "--no-cache"]).is_err());
        assert!(Cli::try_parse_from(["caption-fetch", "fetch", "abc", "--language", "de", "--online-timeout", "5"]).is_ok());
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["caption-fetch", "fetch", "abc", "--format", "pdf"]).is_err());
    }
}

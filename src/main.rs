mod cli;

use anyhow::{Result, anyhow};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;

use caption_fetch::cache::{JsonFileStore, TranscriptCache};
use caption_fetch::client;
use caption_fetch::config::{ClientConfig, ExtractorConfig};
use caption_fetch::server;
use caption_fetch::service::TranscriptService;
use caption_fetch::transcript::{OutputFormat, TranscriptData};
use caption_fetch::video::parse_video_id;
use cli::{CacheAction, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = ExtractorConfig::default();

    match cli.command {
        Commands::Serve { host, port } => {
            server::run_server(host, port, config).await?;
        }
        Commands::Fetch {
            video,
            format,
            timestamps,
            output,
            save,
            no_cache,
            server_url,
            online_timeout,
            language,
        } => {
            let video_id = parse_video_id(&video)?;
            if let Some(secs) = online_timeout {
                config.online_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if let Some(language) = language {
                config.language = language;
            }

            let mut transcript = match server_url {
                Some(server_url) => {
                    client::fetch_remote(&ClientConfig::new(server_url, video_id)).await?
                }
                None => {
                    let service = TranscriptService::from_config(&config, !no_cache).await?;
                    service
                        .get_transcript(&video_id)
                        .await
                        .map_err(|e| anyhow!("Failed to get transcript data: {e}"))?
                }
            };

            let destination = if save {
                Some(PathBuf::from(transcript.filename(format)))
            } else {
                output
            };
            write_transcript(&mut transcript, format, timestamps, destination)?;
        }
        Commands::Probe { video } => {
            let video_id = parse_video_id(&video)?;
            let service = TranscriptService::from_config(&config, false).await?;

            println!("Testing all strategies for video: {video_id}");
            for report in service.probe(&video_id).await {
                let status = if report.success { "ok" } else { "--" };
                println!(
                    "  [{status}] {:<16} {:>6} ms  {:>5} segments{}",
                    report.strategy,
                    report.elapsed_ms,
                    report.segments,
                    report
                        .error
                        .map(|e| format!("  ({e})"))
                        .unwrap_or_default()
                );
            }
        }
        Commands::Cache { action } => {
            let cache = TranscriptCache::new(
                Box::new(JsonFileStore::new(&config.cache_path)),
                config.cache_ttl,
                config.cache_capacity,
            );
            match action {
                CacheAction::Clear => {
                    cache.clear()?;
                    info!("Cleared transcript cache at {}", config.cache_path.display());
                }
                CacheAction::Info => {
                    println!(
                        "{} cached transcripts in {}",
                        cache.len()?,
                        config.cache_path.display()
                    );
                }
                CacheAction::Remove { video } => {
                    let video_id = parse_video_id(&video)?;
                    cache.remove(&video_id)?;
                    info!("Removed {video_id} from transcript cache");
                }
            }
        }
    }

    Ok(())
}

fn write_transcript(
    transcript: &mut TranscriptData,
    format: OutputFormat,
    timestamps: bool,
    destination: Option<PathBuf>,
) -> Result<()> {
    let rendered = transcript.formatted(format, timestamps);

    match destination {
        Some(path) => {
            std::fs::write(&path, rendered).map_err(|e| {
                error!("Failed to write {}: {e}", path.display());
                anyhow!("Failed to write transcript: {}", e)
            })?;
            info!(
                "Saved {} segments as {format} to {}",
                transcript.segments.len(),
                path.display()
            );
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

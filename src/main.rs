//! mediakit command-line entry point.
//!
//! Parses arguments, loads configuration, installs logging and dispatches
//! one subcommand to the matching `Toolkit` method.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mediakit::cli::{Args, Commands, MetadataAction};
use mediakit::config::{Config, LoggingConfig};
use mediakit::media::probe::MediaDescriptor;
use mediakit::operations::metadata::parse_entry;
use mediakit::operations::{
    ConvertRequest, ExtractAudioRequest, GifRequest, MergeRequest, MetadataRequest,
    OptimizeRequest, ResizeRequest, SplitBy, SplitRequest, SubtitleRequest, ThumbnailRequest,
    TrimRequest,
};
use mediakit::time::TimeRange;
use mediakit::{Outcome, OutputFileHandle, Toolkit};

const DEFAULT_CONFIG_FILE: &str = "mediakit.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = setup_logging(args.verbose, &config.logging)?;

    let toolkit = Toolkit::with_system_runner(config);
    run(&toolkit, args).await
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

async fn run(toolkit: &Toolkit, args: Args) -> Result<()> {
    let json = args.json;
    let overwrite = args.overwrite;

    match args.command {
        Commands::Convert {
            input,
            output,
            video_codec,
            audio_codec,
            quality,
            no_video,
            no_audio,
            format,
            faststart,
        } => {
            let request = ConvertRequest {
                input,
                output,
                video_codec,
                audio_codec,
                quality: quality.into_options(),
                no_video,
                no_audio,
                format,
                faststart,
                overwrite,
            };
            let outcome = with_spinner("Converting", json, toolkit.convert(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Resize {
            input,
            output,
            width,
            height,
            algorithm,
            pad,
            video_codec,
            quality,
        } => {
            let request = ResizeRequest {
                input,
                output,
                width,
                height,
                algorithm,
                pad,
                video_codec,
                quality: quality.into_options(),
                overwrite,
            };
            let outcome = with_spinner("Resizing", json, toolkit.resize(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Trim {
            input,
            output,
            start,
            end,
            duration,
            accurate,
            reencode,
            video_codec,
            audio_codec,
            quality,
        } => {
            let range = TimeRange::from_parts(start.as_deref(), end.as_deref(), duration.as_deref())?;
            let request = TrimRequest {
                fast_seek: !accurate,
                reencode,
                video_codec,
                audio_codec,
                quality: quality.into_options(),
                overwrite,
                ..TrimRequest::new(input, output, range)
            };
            let outcome = with_spinner("Trimming", json, toolkit.trim(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Merge {
            inputs,
            output,
            reencode,
            no_audio,
            video_codec,
            audio_codec,
            quality,
        } => {
            let request = MergeRequest {
                inputs,
                output,
                reencode,
                include_audio: !no_audio,
                video_codec,
                audio_codec,
                quality: quality.into_options(),
                overwrite,
            };
            let outcome = with_spinner("Merging", json, toolkit.merge(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::ExtractAudio {
            input,
            output,
            codec,
            bitrate,
            sample_rate,
            channels,
            stream,
        } => {
            let request = ExtractAudioRequest {
                input,
                output,
                codec,
                bitrate,
                sample_rate,
                channels,
                stream,
                overwrite,
            };
            let outcome = with_spinner("Extracting audio", json, toolkit.extract_audio(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Thumbnail {
            input,
            output,
            at,
            width,
            quality,
        } => {
            let request = ThumbnailRequest {
                input,
                output,
                position: at,
                width,
                quality,
                overwrite,
            };
            let outcome = with_spinner("Grabbing frame", json, toolkit.thumbnail(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Gif {
            input,
            output,
            start,
            end,
            duration,
            fps,
            width,
            max_colors,
            dither,
            loop_count,
            no_palette,
        } => {
            let request = GifRequest {
                range: TimeRange::from_parts(start.as_deref(), end.as_deref(), duration.as_deref())?,
                fps,
                width,
                max_colors,
                dither,
                loop_count,
                use_palette: !no_palette,
                overwrite,
                ..GifRequest::new(input, output)
            };
            let outcome = with_spinner("Rendering GIF", json, toolkit.gif(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Subtitle {
            input,
            subtitles,
            output,
            mode,
            language,
            style,
        } => {
            let request = SubtitleRequest {
                input,
                output,
                subtitles,
                mode,
                language,
                style,
                overwrite,
            };
            let outcome = with_spinner("Adding subtitles", json, toolkit.subtitle(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Metadata { action } => match action {
            MetadataAction::Show { input } => {
                let tags = toolkit.show_metadata(&input).await?;
                report(json, &tags, || {
                    if tags.is_empty() {
                        "No metadata".to_string()
                    } else {
                        tags.iter()
                            .map(|(key, value)| format!("{:<20} {}", key, value))
                            .collect::<Vec<_>>()
                            .join("\n")
                    }
                })?;
            }
            MetadataAction::Set {
                input,
                output,
                entries,
                clear,
            } => {
                let entries = entries
                    .iter()
                    .map(|entry| parse_entry(entry))
                    .collect::<mediakit::Result<Vec<_>>>()?;
                let request = MetadataRequest {
                    input,
                    output,
                    entries,
                    clear_existing: clear,
                    overwrite,
                };
                let outcome = with_spinner("Writing metadata", json, toolkit.set_metadata(&request)).await?;
                report_outcome(json, &outcome)?;
            }
        },
        Commands::Split {
            input,
            output_dir,
            segment,
            parts,
            prefix,
            reencode,
        } => {
            let by = match (segment, parts) {
                (Some(length), None) => SplitBy::Duration(length),
                (None, Some(parts)) => SplitBy::Parts(parts),
                _ => anyhow::bail!("specify exactly one of --segment or --parts"),
            };
            let request = SplitRequest {
                prefix,
                reencode,
                overwrite,
                ..SplitRequest::new(input, output_dir, by)
            };
            let outcome = with_spinner("Splitting", json, toolkit.split(&request)).await?;
            report_segments(json, &outcome)?;
        }
        Commands::Optimize {
            input,
            output,
            target,
            max_width,
            target_size,
        } => {
            let request = OptimizeRequest {
                input,
                output,
                target,
                max_width,
                target_size_mb: target_size,
                overwrite,
            };
            let outcome = with_spinner("Optimizing", json, toolkit.optimize(&request)).await?;
            report_outcome(json, &outcome)?;
        }
        Commands::Info { input } => {
            let descriptor = toolkit.probe(&input).await?;
            report(json, &descriptor, || describe_media(&input, &descriptor))?;
        }
        Commands::Capabilities => {
            let capabilities = toolkit.capabilities().await?;
            report(json, &capabilities, || {
                let mut lines = Vec::new();
                for status in [&capabilities.ffmpeg, &capabilities.ffprobe] {
                    let state = match &status.version {
                        Some(version) => version.clone(),
                        None => "not available".to_string(),
                    };
                    lines.push(format!("{:<10} {}", status.tool, state));
                }
                if capabilities.hardware_encoders.is_empty() {
                    lines.push("Hardware encoders: none".to_string());
                } else {
                    lines.push(format!(
                        "Hardware encoders: {}",
                        capabilities.hardware_encoders.join(", ")
                    ));
                }
                lines.join("\n")
            })?;
        }
        Commands::Version { tool } => {
            let version = toolkit.version(tool).await?;
            report(json, &version, || version.clone())?;
        }
        Commands::Config { write } => {
            Config::default().save_to_file(&write)?;
            println!("Wrote default configuration to {}", write.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool, logging: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&logging.directory)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&logging.directory, &logging.file);
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        logging.directory.join(&logging.file).display()
    );

    Ok(guard)
}

/// Show a spinner on stderr while `task` runs. Hidden in JSON mode.
async fn with_spinner<F, T>(message: &str, json: bool, task: F) -> Result<T>
where
    F: Future<Output = mediakit::Result<T>>,
{
    let spinner = if json {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?,
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };

    let result = task.await;
    spinner.finish_and_clear();
    Ok(result?)
}

fn report<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn report_outcome(json: bool, outcome: &Outcome) -> Result<()> {
    report(json, outcome, || match outcome {
        Outcome::Completed(handle) => describe_file(handle),
        Outcome::Skipped { path } => skipped_message(path),
    })
}

fn report_segments(json: bool, outcome: &Outcome<Vec<OutputFileHandle>>) -> Result<()> {
    report(json, outcome, || match outcome {
        Outcome::Completed(handles) => handles
            .iter()
            .map(describe_file)
            .collect::<Vec<_>>()
            .join("\n"),
        Outcome::Skipped { path } => skipped_message(path),
    })
}

fn skipped_message(path: &Path) -> String {
    warn!("Nothing written: {} already exists", path.display());
    format!("Skipped {} (already exists; pass --overwrite to replace)", path.display())
}

fn describe_file(handle: &OutputFileHandle) -> String {
    format!("{} ({})", handle.path.display(), format_size(handle.size))
}

fn describe_media(input: &Path, descriptor: &MediaDescriptor) -> String {
    let mut lines = vec![format!("{}", input.display())];
    lines.push(format!(
        "  Format:   {}",
        descriptor
            .format_long_name
            .as_deref()
            .unwrap_or(&descriptor.format_name)
    ));
    if let Some(duration) = descriptor.duration {
        lines.push(format!("  Duration: {:.3}s", duration));
    }
    if let Some(size) = descriptor.size {
        lines.push(format!("  Size:     {}", format_size(size)));
    }
    if let Some(video) = &descriptor.video {
        let fps = video
            .frame_rate
            .map(|fps| format!(" @ {:.2} fps", fps))
            .unwrap_or_default();
        lines.push(format!(
            "  Video:    {} {}x{}{}",
            video.codec, video.width, video.height, fps
        ));
    }
    if let Some(audio) = &descriptor.audio {
        let rate = audio
            .sample_rate
            .map(|rate| format!(" {} Hz", rate))
            .unwrap_or_default();
        let channels = audio
            .channels
            .map(|channels| format!(" {} ch", channels))
            .unwrap_or_default();
        lines.push(format!("  Audio:    {}{}{}", audio.codec, rate, channels));
    }
    lines.push(format!("  Streams:  {}", descriptor.stream_count));
    lines.join("\n")
}

/// Format a byte count as a human readable string
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{} B", bytes)
    } else if bytes_f < MB {
        format!("{:.1} KB", bytes_f / KB)
    } else if bytes_f < GB {
        format!("{:.1} MB", bytes_f / MB)
    } else {
        format!("{:.2} GB", bytes_f / GB)
    }
}

//! Lipdub - Automated Video Dubbing Workflow
//!
//! Entry point: parses arguments, sets up logging and configuration, then
//! dispatches to the pipeline or one of its individual stages.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use lipdub::cli::{read_answer, Args, Commands};
use lipdub::config::{Config, Credentials};
use lipdub::error::DubError;
use lipdub::media::MediaProcessorFactory;
use lipdub::speech::VoiceGender;
use lipdub::workflow::{JobParams, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting Lipdub - Automated Video Dubbing Workflow");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Dub { base_path, video, language, gender, quality } => {
            if let Some(quality) = quality {
                config.transcriber.quality = quality.into();
            }

            let params = JobParams {
                base_path: match base_path {
                    Some(path) => path,
                    None => PathBuf::from(prompt("Enter the base path: ")?),
                },
                video_file: match video {
                    Some(video) => video,
                    None => prompt("Enter the video name with extension (e.g., video.mp4): ")?,
                },
                language: match language {
                    Some(language) => language,
                    None => prompt("Enter the target language for translation (e.g., 'es' for Spanish): ")?,
                },
                gender: VoiceGender::from_selector(&match gender {
                    Some(gender) => gender,
                    None => prompt("Enter the gender (M/F): ")?,
                }),
            };

            let credentials = Credentials::from_env()?;
            let workflow = Workflow::new(config, &credentials, interruptible())?;
            let result = workflow.run(&params).await?;

            println!("Final video: {}", result.final_video.display());
            println!("Download link: {}", result.download_url);
        }
        Commands::Split { input, output_dir } => {
            let video_name = input
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.split('.').next())
                .filter(|name| !name.is_empty())
                .ok_or_else(|| DubError::Config(format!("Invalid video filename: {}", input.display())))?
                .to_string();
            let output_dir = match output_dir {
                Some(dir) => dir,
                None => input.parent().map(|p| p.to_path_buf()).unwrap_or_default(),
            };

            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability().await?;
            info!("Using {}", media.get_version_info().await?);

            let split = media.split_audio_video(&input, &output_dir, &video_name).await?;
            println!("Audio: {}", split.audio_path.display());
            println!("Silent video: {}", split.silent_video_path.display());
        }
        Commands::Transcribe { input, language, quality } => {
            if let Some(quality) = quality {
                config.transcriber.quality = quality.into();
            }

            let credentials = Credentials::from_env()?;
            let workflow = Workflow::new(config, &credentials, interruptible())?;
            let transcript = workflow.transcribe(&input, &language).await?;
            println!("{}", transcript);
        }
        Commands::Speak { text, output_dir, name, gender } => {
            let credentials = Credentials::from_env()?;
            let workflow = Workflow::new(config, &credentials, CancellationToken::new())?;
            let path = workflow
                .speak(&text, &output_dir, &name, VoiceGender::from_selector(&gender))
                .await?;
            println!("Audio: {}", path.display());
        }
        Commands::Cleanup { paths } => {
            let credentials = Credentials::from_env()?;
            let workflow = Workflow::new(config, &credentials, CancellationToken::new())?;
            workflow.cleanup(&paths).await?;
            println!("Deleted {} object(s)", paths.len());
        }
        Commands::InitConfig { output } => {
            config.save_to_file(&output)?;
            println!("Configuration written to {}", output.display());
        }
    }

    info!("Lipdub finished successfully");
    Ok(())
}

/// Ask for a value on stdin; the answer is trimmed
fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    std::io::stdout().flush()?;

    let answer = read_answer(&mut std::io::stdin().lock(), question)
        .context("Failed to read from stdin")?;
    Ok(answer)
}

/// Token cancelled on Ctrl-C so in-flight polling stops and uploaded objects
/// still get removed. Only installed once a run is about to start: after
/// this, SIGINT no longer terminates the process on its own.
fn interruptible() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling the current run...");
            handler.cancel();
        }
    });
    cancel
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".lipdub").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "lipdub.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("lipdub.log").display());

    Ok(())
}

//! `play` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::PlaybackConfig;
use tracing::{info, warn};

use crate::cli::PlayArgs;
use crate::error::CliError;
use crate::session::{PlaybackSession, SeekRequest, SessionConfig};

/// Execute the `play` command
pub async fn run_play(args: &PlayArgs) -> Result<()> {
    let playback = resolve_config(args)?;

    if !playback.file.exists() {
        return Err(CliError::recording_not_found(&playback.file).into());
    }

    info!(
        file = %playback.file.display(),
        realtime = playback.pacing.realtime,
        speed = playback.pacing.speed,
        streams = ?playback.streams.enabled,
        motion = playback.streams.motion,
        "Configuration loaded"
    );

    let session_config = SessionConfig {
        playback,
        max_samples: (args.max_samples > 0).then_some(args.max_samples),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        seek: seek_request(args),
        dump_dir: args.dump_dir.clone(),
        channel_size: args.channel_size,
        lossy: args.lossy,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let session = PlaybackSession::new(session_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting playback...");

    tokio::select! {
        result = session.run() => {
            let stats = result.context("Playback failed")?;
            info!(
                samples = stats.samples_received,
                duration_secs = stats.duration.as_secs_f64(),
                rate = format!("{:.2}", stats.rate()),
                "Playback completed"
            );

            if args.json {
                let json = serde_json::to_string_pretty(&stats.report())
                    .context("Failed to serialize playback statistics")?;
                println!("{}", json);
            } else {
                stats.print_summary();
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping playback...");
        }
    }

    info!("Capture Player finished");
    Ok(())
}

/// Configuration file (if any) with command-line overrides applied
fn resolve_config(args: &PlayArgs) -> Result<PlaybackConfig> {
    let mut config = match (&args.config, &args.recording) {
        (Some(path), _) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path).into());
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        (None, Some(recording)) => PlaybackConfig::for_file(recording),
        (None, None) => return Err(CliError::NoRecording.into()),
    };

    if let Some(ref recording) = args.recording {
        config.file = recording.clone();
    }
    if args.no_realtime {
        config.pacing.realtime = false;
    }
    if let Some(speed) = args.speed {
        info!(speed, "Overriding playback speed from CLI");
        config.pacing.speed = speed;
    }
    if !args.streams.is_empty() {
        config.streams.enabled = args.streams.clone();
    }
    if args.no_motion {
        config.streams.motion = false;
    }

    ConfigLoader::validate(&config).context("Invalid playback configuration")?;
    Ok(config)
}

fn seek_request(args: &PlayArgs) -> Option<SeekRequest> {
    if let Some(ms) = args.seek_ms {
        return Some(SeekRequest::Timestamp(ms.saturating_mul(1000)));
    }
    args.seek_index.map(|index| SeekRequest::Index {
        stream: args.seek_stream,
        index,
    })
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

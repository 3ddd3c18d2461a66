//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::StreamKind;
use std::path::PathBuf;

/// Capture Player - disk playback for multi-stream depth-camera recordings
#[derive(Parser, Debug)]
#[command(
    name = "capture-player",
    author,
    version,
    about = "Play back multi-stream depth-camera recordings",
    long_about = "Plays .rscp capture recordings from disk.\n\n\
                  Indexes the file lazily, prefetches decoded frames on a background \n\
                  thread and delivers depth, color, infrared and motion samples in \n\
                  capture order, optionally paced at recorded speed."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CAPTURE_PLAYER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CAPTURE_PLAYER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a recording
    Play(PlayArgs),

    /// Print recording headers, streams and device information
    Info(InfoArgs),

    /// Validate a playback configuration file without playing
    Validate(ValidateArgs),

    /// Write a synthetic recording
    Synth(SynthArgs),
}

/// Arguments for the `play` command
#[derive(Parser, Debug, Clone)]
pub struct PlayArgs {
    /// Recording to play (overrides `file` from the configuration)
    #[arg(env = "CAPTURE_PLAYER_FILE")]
    pub recording: Option<PathBuf>,

    /// Path to a playback configuration file (TOML or JSON)
    #[arg(short, long, env = "CAPTURE_PLAYER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Deliver samples as fast as possible instead of at recorded speed
    #[arg(long, env = "CAPTURE_PLAYER_NO_REALTIME")]
    pub no_realtime: bool,

    /// Playback speed multiplier for realtime pacing
    #[arg(long, env = "CAPTURE_PLAYER_SPEED")]
    pub speed: Option<f64>,

    /// Streams to enable (repeatable or comma separated; default: all)
    #[arg(long = "stream", value_delimiter = ',', env = "CAPTURE_PLAYER_STREAMS")]
    pub streams: Vec<StreamKind>,

    /// Do not deliver motion samples
    #[arg(long, env = "CAPTURE_PLAYER_NO_MOTION")]
    pub no_motion: bool,

    /// Stop after this many delivered samples (0 = unlimited)
    #[arg(long, default_value = "0", env = "CAPTURE_PLAYER_MAX_SAMPLES")]
    pub max_samples: u64,

    /// Playback timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CAPTURE_PLAYER_TIMEOUT")]
    pub timeout: u64,

    /// Seek to this capture time (milliseconds) before playing
    #[arg(long, conflicts_with = "seek_index")]
    pub seek_ms: Option<u64>,

    /// Seek to this frame index of `--seek-stream` before playing
    #[arg(long)]
    pub seek_index: Option<u32>,

    /// Stream addressed by `--seek-index`
    #[arg(long, default_value = "depth")]
    pub seek_stream: StreamKind,

    /// Write delivered frames (PNG) and motion (JSON lines) under this directory
    #[arg(long, env = "CAPTURE_PLAYER_DUMP_DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Capacity of the queue between the playback thread and the consumer
    #[arg(long, default_value = "64", env = "CAPTURE_PLAYER_CHANNEL_SIZE")]
    pub channel_size: usize,

    /// Drop samples when the queue is full instead of stalling playback
    #[arg(long, env = "CAPTURE_PLAYER_LOSSY")]
    pub lossy: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CAPTURE_PLAYER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the final statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Recording to inspect
    #[arg(env = "CAPTURE_PLAYER_FILE")]
    pub recording: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Index the whole file to report sample counts and run time
    #[arg(long)]
    pub scan: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "playback.toml", env = "CAPTURE_PLAYER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `synth` command
#[derive(Parser, Debug)]
pub struct SynthArgs {
    /// Output recording path
    #[arg(short, long, default_value = "synthetic.rscp")]
    pub output: PathBuf,

    /// On-disk format version (1 or 2)
    #[arg(long, default_value = "2")]
    pub format_version: u32,

    /// Frames per stream
    #[arg(long, default_value = "30")]
    pub frames: u32,

    /// Frame rate of every stream
    #[arg(long, default_value = "30")]
    pub fps: u32,

    #[arg(long, default_value = "64")]
    pub width: u32,

    #[arg(long, default_value = "48")]
    pub height: u32,

    /// Streams to record (repeatable or comma separated)
    #[arg(long = "stream", value_delimiter = ',', default_value = "depth,color")]
    pub streams: Vec<StreamKind>,

    /// Motion rate in Hz (0 = no motion)
    #[arg(long, default_value = "0")]
    pub motion_hz: u32,

    /// Deflate-compress image payloads
    #[arg(long)]
    pub compress: bool,

    /// Frames to write with an undecodable payload, as `stream:index`
    #[arg(long, value_delimiter = ',')]
    pub corrupt: Vec<String>,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_args() {
        let cli = Cli::try_parse_from([
            "capture-player",
            "play",
            "capture.rscp",
            "--no-realtime",
            "--stream",
            "depth,color",
            "--stream",
            "infrared",
            "--seek-index",
            "4",
        ])
        .unwrap();

        let Commands::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.recording, Some(PathBuf::from("capture.rscp")));
        assert!(args.no_realtime);
        assert_eq!(
            args.streams,
            vec![StreamKind::Depth, StreamKind::Color, StreamKind::Infrared]
        );
        assert_eq!(args.seek_index, Some(4));
        assert_eq!(args.seek_stream, StreamKind::Depth);
        assert_eq!(args.max_samples, 0);
    }

    #[test]
    fn test_seek_flags_conflict() {
        let result = Cli::try_parse_from([
            "capture-player",
            "play",
            "capture.rscp",
            "--seek-ms",
            "10",
            "--seek-index",
            "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_stream_rejected() {
        let result = Cli::try_parse_from(["capture-player", "play", "a.rscp", "--stream", "lidar"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_synth_defaults() {
        let cli = Cli::try_parse_from(["capture-player", "synth", "--corrupt", "depth:5"]).unwrap();
        let Commands::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.format_version, 2);
        assert_eq!(args.streams, vec![StreamKind::Depth, StreamKind::Color]);
        assert_eq!(args.corrupt, vec!["depth:5".to_string()]);
    }
}

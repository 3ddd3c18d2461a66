//! `synth` command implementation.

use anyhow::{Context, Result};
use contracts::{CompressionType, PixelFormat, StreamKind};
use recording_format::synth::{stream_info, write_synthetic, SynthConfig};
use tracing::info;

use crate::cli::SynthArgs;
use crate::error::CliError;

/// Execute the `synth` command
pub fn run_synth(args: &SynthArgs) -> Result<()> {
    let config = synth_config(args)?;
    info!(
        output = %args.output.display(),
        version = config.version,
        frames = config.frames,
        streams = config.streams.len(),
        "Writing synthetic recording"
    );

    let summary = write_synthetic(&args.output, &config)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Wrote {}", args.output.display());
    for (stream, frames) in &summary.frames {
        println!("  {}: {} frames", stream, frames);
    }
    if summary.motion > 0 {
        println!("  motion: {} samples", summary.motion);
    }
    println!(
        "  span: {:.3} s",
        summary.last_capture_time as f64 / 1_000_000.0
    );
    Ok(())
}

fn synth_config(args: &SynthArgs) -> Result<SynthConfig> {
    let compression = if args.compress {
        CompressionType::Deflate
    } else {
        CompressionType::None
    };

    let mut streams = Vec::with_capacity(args.streams.len());
    for &stream in &args.streams {
        if streams.iter().any(|s: &contracts::StreamInfo| s.profile.stream == stream) {
            continue;
        }
        streams.push(stream_info(
            stream,
            args.width,
            args.height,
            args.fps,
            default_format(stream),
            compression,
        ));
    }

    let corrupt = args
        .corrupt
        .iter()
        .map(|value| parse_frame_ref(value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SynthConfig {
        version: args.format_version,
        streams,
        frames: args.frames,
        motion_hz: args.motion_hz,
        corrupt,
    })
}

/// Pixel format a synthetic stream is recorded in
fn default_format(stream: StreamKind) -> PixelFormat {
    match stream {
        StreamKind::Depth => PixelFormat::Z16,
        StreamKind::Color => PixelFormat::Rgb8,
        StreamKind::Infrared | StreamKind::Infrared2 => PixelFormat::Y8,
        StreamKind::Fisheye => PixelFormat::Raw8,
    }
}

/// Parse `stream:index`
fn parse_frame_ref(value: &str) -> Result<(StreamKind, u32), CliError> {
    let (stream, index) = value
        .split_once(':')
        .ok_or_else(|| CliError::invalid_frame_ref(value, "expected stream:index"))?;
    let stream = stream
        .trim()
        .parse::<StreamKind>()
        .map_err(|e| CliError::invalid_frame_ref(value, e))?;
    let index = index
        .trim()
        .parse::<u32>()
        .map_err(|e| CliError::invalid_frame_ref(value, e.to_string()))?;
    Ok((stream, index))
}

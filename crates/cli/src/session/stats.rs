//! Playback session statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use observability::PlaybackMetricsAggregator;
use playback_engine::PlaybackStats;
use serde::Serialize;

/// Statistics from a playback session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Samples handed to the consumer task
    pub samples_received: u64,

    /// Samples discarded because the consumer queue was full
    pub consumer_drops: u64,

    /// Samples written by the frame dumper
    pub samples_dumped: u64,

    /// Wall-clock duration of playback
    pub duration: Duration,

    /// Whether the engine reported end of stream
    pub end_of_stream: bool,

    /// Frame index each stream was moved to by the initial seek
    pub seek: Option<BTreeMap<String, u32>>,

    /// Engine snapshot taken after playback stopped
    pub engine: Option<PlaybackStats>,

    /// Per-channel delivery statistics
    pub metrics: PlaybackMetricsAggregator,
}

/// Machine-readable form of [`SessionStats`]
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    duration_secs: f64,
    samples_per_sec: f64,
    samples_received: u64,
    frames_received: u64,
    motion_received: u64,
    consumer_drops: u64,
    samples_dumped: u64,
    end_of_stream: bool,
    channels: &'a BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seek: Option<&'a BTreeMap<String, u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<&'a PlaybackStats>,
}

impl SessionStats {
    /// Delivered samples per wall-clock second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn report(&self) -> SessionReport<'_> {
        SessionReport {
            duration_secs: self.duration.as_secs_f64(),
            samples_per_sec: self.rate(),
            samples_received: self.samples_received,
            frames_received: self.metrics.total_frames,
            motion_received: self.metrics.total_motion,
            consumer_drops: self.consumer_drops,
            samples_dumped: self.samples_dumped,
            end_of_stream: self.end_of_stream,
            channels: &self.metrics.channel_counts,
            seek: self.seek.as_ref(),
            engine: self.engine.as_ref(),
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Playback Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Samples received: {}", self.samples_received);
        println!("   ├─ Rate: {:.2} samples/s", self.rate());
        println!("   ├─ Consumer drops: {}", self.consumer_drops);
        println!("   ├─ Samples dumped: {}", self.samples_dumped);
        println!("   └─ End of stream: {}", self.end_of_stream);

        if let Some(ref seek) = self.seek {
            println!("\nInitial Seek");
            for (stream, index) in seek {
                println!("   ├─ {}: frame {}", stream, index);
            }
        }

        if let Some(ref engine) = self.engine {
            println!("\nEngine");
            println!("   ├─ Frames dispatched: {}", engine.counters.dispatched_frames);
            println!("   ├─ Motion dispatched: {}", engine.counters.dispatched_motion);
            println!("   ├─ Frames decoded: {}", engine.counters.decoded_frames);
            println!("   ├─ Decode failures: {}", engine.counters.decode_failures);
            println!(
                "   ├─ Samples indexed: {}{}",
                engine.indexed,
                if engine.index_complete { " (complete)" } else { "" }
            );
            println!("   └─ Motion drops: {}", engine.drops.imu);

            if !engine.channels.is_empty() {
                println!("\nPrefetched");
                for (channel, progress) in &engine.channels {
                    println!(
                        "   ├─ {}: {} ({} buffered)",
                        channel, progress.prefetched, progress.buffered
                    );
                }
            }

            if !engine.drops.frames.is_empty() {
                println!("\nFrame Drops");
                for (stream, count) in &engine.drops.frames {
                    println!("   ├─ {}: {}", stream, count);
                }
            }
        }

        println!("\n{}", self.metrics.summary());
    }
}

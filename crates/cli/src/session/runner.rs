//! Playback session runner.
//!
//! Bridges the engine's worker-thread callbacks into an async consumer task
//! through a bounded channel.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender, TrySendError};
use contracts::{PlaybackConfig, Sample, StreamKind};
use observability::PlaybackMetricsAggregator;
use playback_engine::PlaybackEngine;
use tracing::{debug, info, trace, warn};

use super::dump::FrameDumper;
use super::stats::SessionStats;

/// Position to move to before playback starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekRequest {
    /// Capture time in microseconds
    Timestamp(u64),
    Index { stream: StreamKind, index: u32 },
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub playback: PlaybackConfig,

    /// Stop after this many delivered samples
    pub max_samples: Option<u64>,

    /// Stop after this much wall-clock time
    pub timeout: Option<Duration>,

    pub seek: Option<SeekRequest>,

    /// Dump delivered samples under this directory
    pub dump_dir: Option<PathBuf>,

    /// Capacity of the worker-to-consumer queue
    pub channel_size: usize,

    /// Discard samples when the queue is full instead of stalling playback
    pub lossy: bool,

    /// Metrics server port
    pub metrics_port: Option<u16>,
}

/// What the worker thread hands over to the consumer
#[derive(Debug)]
enum Event {
    Sample(Sample),
    EndOfStream,
}

/// Samples the consumer never saw, reported back to the engine afterwards
#[derive(Debug, Default)]
struct ConsumerDrops {
    frames: Mutex<BTreeMap<StreamKind, u64>>,
    motion: AtomicU64,
}

impl ConsumerDrops {
    fn record(&self, sample: &Sample) {
        match sample {
            Sample::Frame(frame) => {
                let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
                *frames.entry(frame.stream).or_insert(0) += 1;
            }
            Sample::Motion(_) => {
                self.motion.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Move the counts into the engine's drop counters; returns the total
    fn flush_into(&self, engine: &PlaybackEngine) -> u64 {
        let frames = std::mem::take(&mut *self.frames.lock().unwrap_or_else(PoisonError::into_inner));
        let motion = self.motion.swap(0, Ordering::Relaxed);

        let mut total = motion;
        for (stream, count) in frames {
            total += count;
            if let Err(e) = engine.update_frame_drop_count(stream, count) {
                warn!(stream = %stream, error = %e, "Could not report dropped frames");
            }
        }
        if motion > 0 {
            engine.update_imu_drop_count(motion);
        }
        total
    }
}

/// One playback run over a recording
pub struct PlaybackSession {
    config: SessionConfig,
}

impl PlaybackSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Play until end of stream, the sample limit or the timeout
    pub async fn run(self) -> Result<SessionStats> {
        let config = self.config;

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let engine = PlaybackEngine::init(config.playback.clone()).with_context(|| {
            format!("Failed to open recording {}", config.playback.file.display())
        })?;
        let file_info = engine.query_file_info();
        info!(
            file = %config.playback.file.display(),
            version = file_info.version,
            capture_mode = ?file_info.capture_mode,
            streams = ?engine.query_enabled_streams(),
            motion = engine.is_motion_enabled(),
            realtime = engine.is_realtime(),
            "Recording opened"
        );

        let (tx, rx) = async_channel::bounded(config.channel_size.max(1));
        let drops = Arc::new(ConsumerDrops::default());
        install_callbacks(&engine, tx, config.lossy, Arc::clone(&drops));

        let mut stats = SessionStats::default();
        if let Some(request) = config.seek {
            stats.seek = Some(seek(&engine, request)?);
        }

        let mut dumper = config.dump_dir.as_ref().map(FrameDumper::new).transpose()?;

        let started = Instant::now();
        engine.resume().context("Failed to start playback")?;

        let consume = consume(&rx, &mut stats, dumper.as_mut(), config.max_samples);
        match config.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, consume).await {
                Ok(result) => result?,
                Err(_) => warn!(timeout_secs = timeout.as_secs(), "Playback timed out"),
            },
            None => consume.await?,
        }
        stats.duration = started.elapsed();

        // unblocks a worker waiting in `send_blocking` so the pause can join it
        rx.close();
        let (engine_stats, consumer_drops) = tokio::task::spawn_blocking(move || {
            engine.pause();
            let dropped = drops.flush_into(&engine);
            (engine.stats(), dropped)
        })
        .await
        .context("Playback shutdown task failed")?;

        if let Some(ref mut dumper) = dumper {
            dumper.finish()?;
            stats.samples_dumped = dumper.written();
        }
        stats.consumer_drops = consumer_drops;
        stats.engine = Some(engine_stats);

        info!(
            samples = stats.samples_received,
            consumer_drops = stats.consumer_drops,
            end_of_stream = stats.end_of_stream,
            duration_secs = stats.duration.as_secs_f64(),
            "Playback finished"
        );
        Ok(stats)
    }
}

fn install_callbacks(
    engine: &PlaybackEngine,
    tx: Sender<Event>,
    lossy: bool,
    drops: Arc<ConsumerDrops>,
) {
    let sample_tx = tx.clone();
    engine.set_sample_callback(move |sample| {
        if !lossy {
            if sample_tx.send_blocking(Event::Sample(sample)).is_err() {
                trace!("consumer gone, sample discarded");
            }
            return;
        }
        match sample_tx.try_send(Event::Sample(sample)) {
            Ok(()) => {}
            Err(TrySendError::Full(Event::Sample(sample))) => {
                trace!(channel = %sample.channel(), "consumer queue full, sample dropped");
                drops.record(&sample);
            }
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => trace!("consumer gone, sample discarded"),
        }
    });
    engine.set_end_of_stream_callback(move || {
        if tx.send_blocking(Event::EndOfStream).is_err() {
            debug!("consumer gone before end of stream");
        }
    });
}

async fn consume(
    rx: &Receiver<Event>,
    stats: &mut SessionStats,
    mut dumper: Option<&mut FrameDumper>,
    max_samples: Option<u64>,
) -> Result<()> {
    let mut metrics = PlaybackMetricsAggregator::new();
    let result = loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(_) => {
                warn!("Playback channel closed");
                break Ok(());
            }
        };

        match event {
            Event::Sample(sample) => {
                stats.samples_received += 1;
                metrics.update(&sample);

                if let Sample::Frame(ref frame) = sample {
                    debug!(
                        stream = %frame.stream,
                        index = frame.index,
                        capture_time = frame.capture_time,
                        "Frame delivered"
                    );
                }
                if let Some(ref mut dumper) = dumper {
                    if let Err(e) = dumper.write(&sample) {
                        break Err(e).context("Failed to dump sample");
                    }
                }

                if max_samples.is_some_and(|max| stats.samples_received >= max) {
                    info!(samples = stats.samples_received, "Reached max samples limit");
                    break Ok(());
                }
            }
            Event::EndOfStream => {
                stats.end_of_stream = true;
                info!("End of stream reached");
                break Ok(());
            }
        }
    };
    stats.metrics = metrics;
    result
}

/// Apply the initial seek; returns the resolved frame index per stream
fn seek(engine: &PlaybackEngine, request: SeekRequest) -> Result<BTreeMap<String, u32>> {
    let frames = match request {
        SeekRequest::Timestamp(timestamp) => engine
            .set_frame_by_time_stamp(timestamp)
            .with_context(|| format!("Seek to {timestamp} us failed"))?,
        SeekRequest::Index { stream, index } => engine
            .set_frame_by_index(index, stream)
            .with_context(|| format!("Seek to {stream} frame {index} failed"))?,
    };

    for (stream, frame) in &frames {
        info!(
            stream = %stream,
            index = frame.index,
            capture_time = frame.capture_time,
            "Seek resolved"
        );
    }
    Ok(frames
        .iter()
        .map(|(stream, frame)| (stream.to_string(), frame.index))
        .collect())
}

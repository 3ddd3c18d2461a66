//! Shared fixtures: synthetic recordings and a sample collector.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use contracts::{
    Channel, CompressionType, PixelFormat, PlaybackConfig, Sample, StreamInfo, StreamKind,
};
use playback_engine::PlaybackEngine;
use recording_format::synth::{stream_info, write_synthetic, SynthConfig};

pub const WAIT: Duration = Duration::from_secs(10);

/// What identifies a delivered sample across runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleKey {
    pub channel: Channel,
    /// Frame index within its stream, or the motion frame number
    pub index: u64,
    pub capture_time: u64,
}

impl From<&Sample> for SampleKey {
    fn from(sample: &Sample) -> Self {
        let index = match sample {
            Sample::Frame(frame) => frame.index as u64,
            Sample::Motion(motion) => motion.frame_number,
        };
        Self {
            channel: sample.channel(),
            index,
            capture_time: sample.capture_time(),
        }
    }
}

pub fn depth(fps: u32) -> StreamInfo {
    stream_info(StreamKind::Depth, 8, 4, fps, PixelFormat::Z16, CompressionType::Deflate)
}

pub fn color(fps: u32) -> StreamInfo {
    stream_info(StreamKind::Color, 4, 4, fps, PixelFormat::Rgb8, CompressionType::None)
}

/// Write a synthetic recording into `dir` and return its path
pub fn recording(
    dir: &Path,
    version: u32,
    streams: Vec<StreamInfo>,
    frames: u32,
    motion_hz: u32,
    corrupt: Vec<(StreamKind, u32)>,
) -> PathBuf {
    let path = dir.join(format!("capture-v{version}.rscp"));
    write_synthetic(
        &path,
        &SynthConfig {
            version,
            streams,
            frames,
            motion_hz,
            corrupt,
        },
    )
    .unwrap();
    path
}

/// Depth and color, 10 frames each at 30 fps
pub fn depth_color_recording(dir: &Path) -> PathBuf {
    recording(dir, 2, vec![depth(30), color(30)], 10, 0, Vec::new())
}

/// Config delivering as fast as samples are decoded
pub fn fast_config(path: &Path) -> PlaybackConfig {
    let mut config = PlaybackConfig::for_file(path);
    config.pacing.realtime = false;
    config
}

/// Records every delivered sample and end-of-stream notification
#[derive(Clone, Default)]
pub struct Collector {
    samples: Arc<Mutex<Vec<Sample>>>,
    signal: Arc<(Mutex<u32>, Condvar)>,
}

impl Collector {
    pub fn attach(engine: &PlaybackEngine) -> Self {
        let collector = Self::default();

        let samples = Arc::clone(&collector.samples);
        let signal = Arc::clone(&collector.signal);
        engine.set_sample_callback(move |sample| {
            samples.lock().unwrap().push(sample);
            signal.1.notify_all();
        });

        let signal = Arc::clone(&collector.signal);
        engine.set_end_of_stream_callback(move || {
            *signal.0.lock().unwrap() += 1;
            signal.1.notify_all();
        });
        collector
    }

    /// Block until `count` end-of-stream notifications were seen
    pub fn wait_end_of_stream(&self, count: u32) -> bool {
        let (lock, cvar) = &*self.signal;
        let deadline = Instant::now() + WAIT;
        let mut seen = lock.lock().unwrap();
        while *seen < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            seen = cvar.wait_timeout(seen, deadline - now).unwrap().0;
        }
        true
    }

    /// Block until at least `count` samples were delivered
    pub fn wait_samples(&self, count: usize) -> bool {
        let deadline = Instant::now() + WAIT;
        while self.len() < count {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<SampleKey> {
        self.samples.lock().unwrap().iter().map(SampleKey::from).collect()
    }

    /// Take the delivered samples, leaving the collector empty
    pub fn take_keys(&self) -> Vec<SampleKey> {
        let samples = std::mem::take(&mut *self.samples.lock().unwrap());
        samples.iter().map(SampleKey::from).collect()
    }

    /// Frame indices delivered for `stream`, in delivery order
    pub fn frame_indices(&self, stream: StreamKind) -> Vec<u32> {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sample::Frame(f) if f.stream == stream => Some(f.index),
                _ => None,
            })
            .collect()
    }
}

/// Play `engine` from its current position to end of stream
pub fn play_to_end(engine: &PlaybackEngine) -> Collector {
    let collector = Collector::attach(engine);
    engine.resume().unwrap();
    assert!(collector.wait_end_of_stream(1), "playback did not finish");
    collector
}

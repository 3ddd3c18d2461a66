//! Playback engine: control surface and shared state.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use codec::FrameDecoder;
use contracts::{
    CameraInfo, Capability, CaptureMode, Channel, CoordinateSystem, Decoder, EndOfStreamCallback,
    FileInfo, FormatReader, MotionIntrinsics, PixelFormat, PlaybackConfig, PlaybackError,
    Properties, RecordingHeaders, Result, Sample, SampleCallback, StreamInfo, StreamKind,
    TOTAL_FRAME_DROPS_PROPERTY,
};
use recording_format::RecordingFile;
use tracing::{debug, info, instrument, warn};

use crate::index::SampleIndex;
use crate::pacing::PacingController;
use crate::payload::PayloadReader;
use crate::prefetch::PrefetchBuffer;
use crate::stats::{ChannelStats, DropCounters, PlaybackCounters, PlaybackStats};
use crate::streams::ActiveStreamRegistry;
use crate::worker;

/// Records scanned per step when indexing on behalf of a caller
pub(crate) const INDEX_SCAN_BATCH: usize = 32;

/// Sequential indexing handle
pub(crate) struct Scanner {
    pub(crate) file: RecordingFile,
    pub(crate) reader: Arc<dyn FormatReader>,
}

/// Mutable playback state, guarded by a single mutex
pub(crate) struct EngineState {
    pub(crate) index: SampleIndex,
    pub(crate) registry: ActiveStreamRegistry,
    pub(crate) buffer: PrefetchBuffer,
    pub(crate) pacing: PacingController,
    pub(crate) paused: bool,
    pub(crate) shutdown: bool,
    pub(crate) realtime: bool,
    /// Bumped whenever buffered or in-flight samples become stale
    pub(crate) generation: u64,
    /// Identifies the worker allowed to run; older workers exit
    pub(crate) worker_epoch: u64,
    pub(crate) end_of_stream: bool,
    /// Capture time of the last dispatched sample, or of the last seek target
    pub(crate) playhead: Option<u64>,
    pub(crate) drops: DropCounters,
    pub(crate) counters: PlaybackCounters,
    pub(crate) properties: Properties,
    pub(crate) index_error: Option<String>,
    pub(crate) on_sample: Option<SampleCallback>,
    pub(crate) on_end_of_stream: Option<EndOfStreamCallback>,
}

impl EngineState {
    /// Empty the prefetch buffer, rolling each channel cursor back so the
    /// samples are materialized again
    fn return_buffered(&mut self) {
        let channels: Vec<Channel> = self.registry.active().map(|a| a.channel).collect();
        for channel in channels {
            if let Some(first) = self.buffer.remove_channel(channel) {
                self.registry.rewind(channel, first);
            }
        }
        observability::record_buffer_depth(self.buffer.len());
    }
}

/// Everything the worker and the control surface share
///
/// Lock order is `scanner` before `state`; `payload` is never taken while
/// `state` is held.
pub(crate) struct Shared {
    pub(crate) state: Mutex<EngineState>,
    pub(crate) wakeup: Condvar,
    pub(crate) scanner: Mutex<Scanner>,
    pub(crate) payload: Mutex<PayloadReader>,
    pub(crate) headers: RecordingHeaders,
    pub(crate) config: PlaybackConfig,
}

impl Shared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_payload(&self) -> MutexGuard<'_, PayloadReader> {
        self.payload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_scanner(&self) -> MutexGuard<'_, Scanner> {
        self.scanner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scan up to `n` more records into the index
    ///
    /// A parse failure ends indexing for good; everything indexed before it
    /// stays playable.
    #[instrument(level = "trace", name = "playback_index_next", skip(self))]
    pub(crate) fn index_next_samples(&self, n: usize) -> Result<usize> {
        let mut guard = self.lock_scanner();
        if self.lock_state().index.is_complete() {
            return Ok(0);
        }

        let scanner = &mut *guard;
        let mut batch = Vec::with_capacity(n);
        let mut reached_eof = false;
        let mut failure = None;
        for _ in 0..n.max(1) {
            match scanner.reader.read_next_record(&mut scanner.file) {
                Ok(Some(descriptor)) => batch.push(descriptor),
                Ok(None) => {
                    reached_eof = true;
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let appended = batch.len();
        let mut state = self.lock_state();
        for descriptor in batch {
            state.index.push(descriptor);
        }
        if reached_eof {
            state.index.mark_complete();
            debug!(samples = state.index.len(), "Indexing complete");
        }
        if let Some(e) = &failure {
            state.index.mark_complete();
            state.index_error = Some(e.to_string());
            warn!(
                error = %e,
                terminal = e.is_terminal_for_index(),
                indexed = state.index.len(),
                "Indexing stopped at unreadable record"
            );
        }
        observability::record_index_size(state.index.len());
        drop(state);
        self.wakeup.notify_all();

        match failure {
            Some(e) => Err(e),
            None => Ok(appended),
        }
    }

    /// Index forward until `done` holds or the file is exhausted
    pub(crate) fn index_until(&self, batch: usize, done: impl Fn(&SampleIndex) -> bool) {
        loop {
            {
                let state = self.lock_state();
                if state.index.is_complete() || done(&state.index) {
                    return;
                }
            }
            if let Err(e) = self.index_next_samples(batch) {
                debug!(error = %e, "Index scan ended early");
            }
        }
    }
}

/// Disk-backed playback of a capture recording
///
/// One background worker indexes, prefetches, paces and dispatches samples
/// through the registered callbacks. Every control call is safe from any
/// thread, the sample callback included.
pub struct PlaybackEngine {
    pub(crate) shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("file", &self.shared.config.file)
            .field("version", &self.shared.headers.header.version)
            .finish()
    }
}

impl PlaybackEngine {
    /// Open the recording with the default frame decoder
    pub fn init(config: PlaybackConfig) -> Result<Self> {
        Self::init_with_decoder(config, Box::new(FrameDecoder::new()))
    }

    /// Open the recording, parse its headers and enable the configured streams
    ///
    /// The engine starts paused; call [`resume`](Self::resume) to play.
    #[instrument(name = "playback_init", skip(config, decoder), fields(file = %config.file.display()))]
    pub fn init_with_decoder(config: PlaybackConfig, decoder: Box<dyn Decoder>) -> Result<Self> {
        let mut scan_file = RecordingFile::open(&config.file)?;
        let reader: Arc<dyn FormatReader> =
            Arc::from(recording_format::open_reader(&mut scan_file)?);
        let headers = reader.read_headers(&mut scan_file)?;
        let payload_file = RecordingFile::open(&config.file)?;

        let mut registry = ActiveStreamRegistry::new(headers.streams.clone());
        let selection: Vec<StreamKind> = if config.streams.enabled.is_empty() {
            headers.streams.keys().copied().collect()
        } else {
            config.streams.enabled.clone()
        };
        for stream in selection {
            registry.enable(Channel::Stream(stream))?;
        }
        if config.streams.motion {
            registry.enable(Channel::Motion)?;
        }

        let state = EngineState {
            index: SampleIndex::new(),
            registry,
            buffer: PrefetchBuffer::new(config.prefetch.depth),
            pacing: PacingController::new(config.pacing.speed),
            paused: true,
            shutdown: false,
            realtime: config.pacing.realtime,
            generation: 0,
            worker_epoch: 0,
            end_of_stream: false,
            playhead: None,
            drops: DropCounters::default(),
            counters: PlaybackCounters::default(),
            properties: headers.properties.clone(),
            index_error: None,
            on_sample: None,
            on_end_of_stream: None,
        };

        info!(
            version = reader.version(),
            streams = ?headers.streams.keys().collect::<Vec<_>>(),
            capture_mode = ?headers.header.capture_mode,
            "Playback engine initialized"
        );

        let payload = PayloadReader::new(
            payload_file,
            Arc::clone(&reader),
            decoder,
            &headers.streams,
        );
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                wakeup: Condvar::new(),
                scanner: Mutex::new(Scanner {
                    file: scan_file,
                    reader,
                }),
                payload: Mutex::new(payload),
                headers,
                config,
            }),
            worker: Mutex::new(None),
        })
    }

    /// Register the consumer of dispatched samples
    pub fn set_sample_callback(&self, callback: impl Fn(Sample) + Send + Sync + 'static) {
        self.shared.lock_state().on_sample = Some(Arc::new(callback));
    }

    /// Register the end-of-stream notification
    ///
    /// Fires once when every enabled channel is exhausted. A seek or a newly
    /// enabled channel re-arms it, as does [`reset`](Self::reset).
    pub fn set_end_of_stream_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.shared.lock_state().on_end_of_stream = Some(Arc::new(callback));
    }

    // ===== Playback control =====

    /// Start or continue delivery from the current position
    #[instrument(name = "playback_resume", skip(self))]
    pub fn resume(&self) -> Result<()> {
        let mut worker = self.lock_worker();
        let epoch = {
            let mut state = self.shared.lock_state();
            if !state.paused {
                return Ok(());
            }
            state.paused = false;
            state.pacing.reset();
            state.worker_epoch += 1;
            state.worker_epoch
        };

        if let Some(previous) = worker.take() {
            // a worker that paused itself from its callback exits on the epoch change
            if previous.is_finished() {
                let _ = previous.join();
            }
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("playback-worker".into())
            .spawn(move || worker::run(shared, epoch))
            .inspect_err(|_| {
                self.shared.lock_state().paused = true;
            })?;
        *worker = Some(handle);
        debug!(epoch, "Playback resumed");
        Ok(())
    }

    /// Stop delivery at the next check boundary
    ///
    /// Blocks until the worker has exited, unless called from the worker's
    /// own sample callback.
    #[instrument(name = "playback_pause", skip(self))]
    pub fn pause(&self) {
        self.shared.lock_state().paused = true;
        self.shared.wakeup.notify_all();
        self.join_worker();
    }

    /// Rewind to the first sample and clear buffered state
    ///
    /// The sample index and headers are kept.
    #[instrument(name = "playback_reset", skip(self))]
    pub fn reset(&self) {
        self.pause();
        let mut state = self.shared.lock_state();
        state.buffer.clear();
        state.registry.reset_cursors();
        state.pacing.reset();
        state.drops.clear();
        state.counters = PlaybackCounters::default();
        state.end_of_stream = false;
        state.playhead = None;
        state.generation += 1;
        observability::record_buffer_depth(0);
        info!(indexed = state.index.len(), "Playback reset");
    }

    /// Enable or disable a video stream
    ///
    /// Disabling drops the stream's buffered samples and moves its cursor
    /// back to the first of them, so enabling it again resumes in place.
    #[instrument(name = "playback_enable_stream", skip(self))]
    pub fn enable_stream(&self, stream: StreamKind, enable: bool) -> Result<()> {
        self.set_channel_enabled(Channel::Stream(stream), enable)
    }

    /// Enable or disable delivery of motion samples
    #[instrument(name = "playback_enable_motion", skip(self))]
    pub fn enable_motion(&self, enable: bool) -> Result<()> {
        self.set_channel_enabled(Channel::Motion, enable)
    }

    /// Switch between capture cadence and as-fast-as-possible delivery
    pub fn set_realtime(&self, realtime: bool) {
        let mut state = self.shared.lock_state();
        state.realtime = realtime;
        state.pacing.reset();
        drop(state);
        self.shared.wakeup.notify_all();
        debug!(realtime, "Pacing mode changed");
    }

    /// Index up to `n` more records; returns how many were appended
    pub fn index_next_samples(&self, n: usize) -> Result<usize> {
        self.shared.index_next_samples(n)
    }

    fn set_channel_enabled(&self, channel: Channel, enable: bool) -> Result<()> {
        let mut state = self.shared.lock_state();
        if let Channel::Stream(stream) = channel {
            state.registry.ensure_available(stream)?;
        }

        if enable {
            if state.registry.enable(channel)? {
                let state = &mut *state;
                // buffered samples may be later than the new channel's first one
                state.return_buffered();
                state
                    .registry
                    .join_at(channel, &state.index, state.playhead);
                state.generation += 1;
                // the new channel may still have samples ahead of its cursor
                state.end_of_stream = false;
                debug!(%channel, "Channel enabled");
            }
        } else if state.registry.disable(channel) {
            if let Some(first) = state.buffer.remove_channel(channel) {
                state.registry.rewind(channel, first);
            }
            state.generation += 1;
            observability::record_buffer_depth(state.buffer.len());
            debug!(%channel, "Channel disabled");
        }
        drop(state);
        self.shared.wakeup.notify_all();
        Ok(())
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_worker(&self) {
        let Some(handle) = self.lock_worker().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // called from the sample callback; the loop exits once it returns
            return;
        }
        if handle.join().is_err() {
            warn!("Playback worker panicked");
        }
    }

    // ===== Queries =====

    /// Streams recorded in the file
    pub fn query_streams(&self) -> &BTreeMap<StreamKind, StreamInfo> {
        &self.shared.headers.streams
    }

    pub fn query_stream_info(&self, stream: StreamKind) -> Result<&StreamInfo> {
        self.shared
            .headers
            .streams
            .get(&stream)
            .ok_or(PlaybackError::StreamUnavailable { stream })
    }

    /// Video streams currently enabled
    pub fn query_enabled_streams(&self) -> Vec<StreamKind> {
        self.shared.lock_state().registry.enabled_streams()
    }

    pub fn is_motion_enabled(&self) -> bool {
        self.shared.lock_state().registry.is_enabled(Channel::Motion)
    }

    pub fn is_stream_profile_available(
        &self,
        stream: StreamKind,
        width: u32,
        height: u32,
        format: PixelFormat,
        framerate: u32,
    ) -> bool {
        self.shared.headers.streams.get(&stream).is_some_and(|info| {
            let p = &info.profile;
            p.width == width && p.height == height && p.format == format && p.fps == framerate
        })
    }

    pub fn headers(&self) -> &RecordingHeaders {
        &self.shared.headers
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    pub fn get_capabilities(&self) -> &[Capability] {
        &self.shared.headers.capabilities
    }

    pub fn get_camera_info(&self) -> &CameraInfo {
        &self.shared.headers.camera_info
    }

    pub fn get_motion_intrinsics(&self) -> &MotionIntrinsics {
        &self.shared.headers.motion_intrinsics
    }

    /// Device properties, including values set during playback
    pub fn get_properties(&self) -> Properties {
        self.shared.lock_state().properties.clone()
    }

    pub fn set_total_frame_drop_count(&self, value: u64) {
        self.shared
            .lock_state()
            .properties
            .insert(TOTAL_FRAME_DROPS_PROPERTY.to_string(), value as f64);
    }

    pub fn query_capture_mode(&self) -> CaptureMode {
        self.shared.headers.header.capture_mode
    }

    pub fn query_coordinate_system(&self) -> CoordinateSystem {
        self.shared.headers.header.coordinate_system
    }

    pub fn query_file_info(&self) -> FileInfo {
        let headers = &self.shared.headers;
        FileInfo {
            version: headers.header.version,
            capture_mode: headers.header.capture_mode,
            sdk_version: headers.sw_info.sdk.to_string(),
            librealsense_version: headers.sw_info.librealsense.to_string(),
        }
    }

    pub fn query_sdk_version(&self) -> String {
        self.shared.headers.sw_info.sdk.to_string()
    }

    pub fn query_librealsense_version(&self) -> String {
        self.shared.headers.sw_info.librealsense.to_string()
    }

    pub fn is_realtime(&self) -> bool {
        self.shared.lock_state().realtime
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock_state().paused
    }

    /// Frames of `stream` in the recording
    ///
    /// Uses the count stored in the stream header, falling back to the
    /// number of frames indexed so far when the recorder left it at zero.
    pub fn query_number_of_frames(&self, stream: StreamKind) -> Result<u32> {
        let info = self.query_stream_info(stream)?;
        if info.nframes > 0 {
            return Ok(info.nframes);
        }
        Ok(self
            .shared
            .lock_state()
            .index
            .channel_len(Channel::Stream(stream)))
    }

    /// Samples indexed so far
    pub fn query_indexed_samples(&self) -> usize {
        self.shared.lock_state().index.len()
    }

    /// Capture span of the recording in microseconds
    ///
    /// Indexes the remainder of the file if needed.
    pub fn query_run_time(&self) -> u64 {
        self.shared.index_until(INDEX_SCAN_BATCH, |_| false);
        self.shared
            .lock_state()
            .index
            .capture_range()
            .map_or(0, |(first, last)| last - first)
    }

    /// Position of the last frame of `stream` delivered or sought to
    pub fn query_current_position(&self, stream: StreamKind) -> Result<Option<u32>> {
        self.query_stream_info(stream)?;
        Ok(self
            .shared
            .lock_state()
            .registry
            .cursor(Channel::Stream(stream))
            .last_dispatched)
    }

    // ===== Drop accounting =====

    /// Add frames the consumer chose not to process
    pub fn update_frame_drop_count(&self, stream: StreamKind, frames_dropped: u64) -> Result<()> {
        self.query_stream_info(stream)?;
        self.shared
            .lock_state()
            .drops
            .add_frames(stream, frames_dropped);
        observability::record_frames_dropped(stream, frames_dropped);
        Ok(())
    }

    /// Add motion samples the consumer chose not to process
    pub fn update_imu_drop_count(&self, samples_dropped: u64) {
        self.shared.lock_state().drops.add_imu(samples_dropped);
        observability::record_motion_dropped(samples_dropped);
    }

    pub fn query_frame_drop_count(&self, stream: StreamKind) -> u64 {
        self.shared.lock_state().drops.frames_for(stream)
    }

    pub fn query_imu_drop_count(&self) -> u64 {
        self.shared.lock_state().drops.imu
    }

    /// Last index parse failure, if indexing stopped early
    pub fn index_error(&self) -> Option<String> {
        self.shared.lock_state().index_error.clone()
    }

    pub fn stats(&self) -> PlaybackStats {
        let state = self.shared.lock_state();
        PlaybackStats {
            counters: state.counters,
            drops: state.drops.clone(),
            buffered: state.buffer.len(),
            channels: state
                .registry
                .active()
                .map(|active| {
                    (
                        active.channel.to_string(),
                        ChannelStats {
                            prefetched: active.prefetched,
                            buffered: state.buffer.count_for(active.channel),
                        },
                    )
                })
                .collect(),
            indexed: state.index.len(),
            index_complete: state.index.is_complete(),
            paused: state.paused,
            realtime: state.realtime,
            end_of_stream: state.end_of_stream,
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock_state();
            state.shutdown = true;
            state.paused = true;
        }
        self.shared.wakeup.notify_all();
        self.join_worker();
        debug!("Playback engine stopped");
    }
}

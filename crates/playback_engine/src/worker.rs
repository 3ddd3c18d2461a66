//! Background loop: index, prefetch, pace and dispatch.

use std::sync::{Arc, MutexGuard};
use std::time::{Duration, Instant};

use contracts::{Channel, EndOfStreamCallback, Sample, SampleCallback, SampleDescriptor};
use tracing::{debug, trace, warn};

use crate::engine::{EngineState, Shared};
use crate::prefetch::PrefetchedSample;
use crate::streams::PrefetchCandidate;

/// What the worker does next, decided under the state lock
enum Step {
    /// Materialize an indexed sample outside the lock
    Prefetch {
        candidate: PrefetchCandidate,
        descriptor: SampleDescriptor,
        generation: u64,
    },
    /// Extend the sample index
    Index,
    /// Hand a sample to the consumer
    Dispatch(Sample, Option<SampleCallback>),
    EndOfStream(Option<EndOfStreamCallback>),
    Exit,
}

/// Worker entry point; returns once paused, shut down or superseded
pub(crate) fn run(shared: Arc<Shared>, epoch: u64) {
    debug!(epoch, "Playback worker started");
    loop {
        match next_step(&shared, epoch) {
            Step::Prefetch {
                candidate,
                descriptor,
                generation,
            } => prefetch(&shared, candidate, &descriptor, generation),
            Step::Index => {
                let batch = shared.config.prefetch.index_batch;
                // failures are recorded on the state and end indexing
                let _ = shared.index_next_samples(batch);
            }
            Step::Dispatch(sample, callback) => {
                if let Some(callback) = callback {
                    callback(sample);
                }
            }
            Step::EndOfStream(callback) => {
                debug!("End of stream");
                if let Some(callback) = callback {
                    callback();
                }
            }
            Step::Exit => break,
        }
    }
    debug!(epoch, "Playback worker exited");
}

fn next_step(shared: &Shared, epoch: u64) -> Step {
    let idle = Duration::from_millis(shared.config.prefetch.idle_poll_ms.max(1));
    let lag_tolerance = Duration::from_millis(shared.config.motion.lag_tolerance_ms);
    let mut state = shared.lock_state();

    loop {
        if state.shutdown || state.paused || state.worker_epoch != epoch {
            return Step::Exit;
        }

        if !state.buffer.is_full() {
            if let Some(candidate) = state.registry.next_candidate(&state.index) {
                if let Some(entry) = state.index.get(candidate.position) {
                    return Step::Prefetch {
                        candidate,
                        descriptor: entry.descriptor.clone(),
                        generation: state.generation,
                    };
                }
            }
            if !state.index.is_complete() {
                return Step::Index;
            }
        }

        let head_time = state.buffer.peek().map(PrefetchedSample::capture_time);
        if let Some(capture_time) = head_time {
            if state.realtime {
                let sleep = state.pacing.calc_sleep_time(capture_time, Instant::now());
                if !sleep.is_zero() {
                    observability::record_pacing_sleep_ms(sleep.as_secs_f64() * 1000.0);
                    state = wait(shared, state, sleep);
                    continue;
                }
            }

            let Some(prefetched) = state.buffer.pop() else {
                continue;
            };
            observability::record_buffer_depth(state.buffer.len());

            if shared.config.motion.drop_late
                && state.realtime
                && matches!(prefetched.sample, Sample::Motion(_))
                && state.pacing.lag(capture_time, Instant::now()) > lag_tolerance
            {
                state.drops.add_imu(1);
                state.playhead = Some(capture_time);
                observability::record_motion_dropped(1);
                trace!(capture_time, "late motion sample dropped");
                continue;
            }

            return dispatch(&mut state, prefetched);
        }

        if !state.end_of_stream {
            state.end_of_stream = true;
            return Step::EndOfStream(state.on_end_of_stream.clone());
        }
        state = wait(shared, state, idle);
    }
}

fn dispatch(state: &mut EngineState, prefetched: PrefetchedSample) -> Step {
    let channel = prefetched.channel();
    match channel {
        Channel::Stream(_) => state.counters.dispatched_frames += 1,
        Channel::Motion => state.counters.dispatched_motion += 1,
    }
    state.registry.mark_dispatched(channel, prefetched.local);
    state.playhead = Some(prefetched.capture_time());
    observability::record_sample_dispatched(channel);
    trace!(
        %channel,
        local = prefetched.local,
        capture_time = prefetched.capture_time(),
        "dispatching sample"
    );
    Step::Dispatch(prefetched.sample, state.on_sample.clone())
}

fn prefetch(
    shared: &Shared,
    candidate: PrefetchCandidate,
    descriptor: &SampleDescriptor,
    generation: u64,
) {
    let result = shared
        .lock_payload()
        .materialize(descriptor, candidate.local);

    let mut state = shared.lock_state();
    if state.generation != generation {
        // a seek, reset or disable happened while reading
        return;
    }

    match result {
        Ok(sample) => {
            if matches!(sample, Sample::Frame(_)) {
                state.counters.decoded_frames += 1;
            }
            let prefetched = PrefetchedSample {
                position: candidate.position,
                local: candidate.local,
                sample,
            };
            if state.buffer.push(prefetched).is_err() {
                trace!(channel = %candidate.channel, "buffer filled meanwhile, retrying later");
                return;
            }
            state.registry.advance(candidate.channel, candidate.local);
            observability::record_buffer_depth(state.buffer.len());
        }
        Err(e) => {
            state.registry.advance(candidate.channel, candidate.local);
            state.counters.decode_failures += 1;
            if let Channel::Stream(stream) = candidate.channel {
                state.drops.add_frames(stream, 1);
                observability::record_decode_failure(stream);
                observability::record_frames_dropped(stream, 1);
            }
            warn!(
                channel = %candidate.channel,
                local = candidate.local,
                offset = descriptor.offset(),
                error = %e,
                "Skipping unreadable sample"
            );
        }
    }
    drop(state);
    shared.wakeup.notify_all();
}

fn wait<'a>(
    shared: &'a Shared,
    state: MutexGuard<'a, EngineState>,
    timeout: Duration,
) -> MutexGuard<'a, EngineState> {
    shared
        .wakeup
        .wait_timeout(state, timeout)
        .map(|(guard, _)| guard)
        .unwrap_or_else(|poisoned| poisoned.into_inner().0)
}

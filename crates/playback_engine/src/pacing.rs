//! Real-time pacing of dispatched samples.

use std::time::{Duration, Instant};

/// Reproduces recorded inter-sample gaps on the wall clock
///
/// The first sample after a reset anchors `(now, capture_time)`; later
/// samples wait until the same capture distance has elapsed on the wall
/// clock, scaled by `speed`. Late samples are never compensated by
/// shortening later waits below zero.
#[derive(Debug, Clone)]
pub struct PacingController {
    base: Option<(Instant, u64)>,
    speed: f64,
}

impl PacingController {
    pub fn new(speed: f64) -> Self {
        Self {
            base: None,
            speed: if speed.is_finite() && speed > 0.0 {
                speed
            } else {
                1.0
            },
        }
    }

    /// Time to wait before dispatching a sample captured at `capture_time` (us)
    pub fn calc_sleep_time(&mut self, capture_time: u64, now: Instant) -> Duration {
        let (base_now, base_capture) = *self.base.get_or_insert((now, capture_time));

        let capture_delta = capture_time.saturating_sub(base_capture) as f64 / self.speed;
        let target = Duration::from_micros(capture_delta as u64);
        let elapsed = now.saturating_duration_since(base_now);
        target.saturating_sub(elapsed)
    }

    /// How far behind schedule a sample is (zero when on time)
    pub fn lag(&self, capture_time: u64, now: Instant) -> Duration {
        let Some((base_now, base_capture)) = self.base else {
            return Duration::ZERO;
        };
        let capture_delta = capture_time.saturating_sub(base_capture) as f64 / self.speed;
        let target = Duration::from_micros(capture_delta as u64);
        now.saturating_duration_since(base_now).saturating_sub(target)
    }

    /// Drop the time base; the next sample re-anchors
    pub fn reset(&mut self) {
        self.base = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.base.is_some()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

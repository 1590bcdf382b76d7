//! Per-body position caches and incremental orbit trails.
//!
//! The trail keeps a fixed-capacity window of propagated samples centered
//! on the simulation time. When the clock advances by a few sample slots
//! only the samples that rolled off are recomputed; the rest of the window
//! is reused. A jump larger than the window rebuilds it from scratch.

use std::collections::VecDeque;

use nalgebra::Vector3;

use crate::time::SECONDS_PER_DAY;

/// Default number of samples in an orbit trail.
pub const DEFAULT_TRAIL_SAMPLES: usize = 90;

/// Default seconds of simulated time between trail samples.
pub const DEFAULT_SLOT_SECONDS: f64 = 20.0;

/// Samples over which the trail fades out at each end.
pub const DEFAULT_FADE_SAMPLES: usize = 4;

/// One propagated sample: where a body was at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagatedState {
    pub jd: f64,
    pub position: Vector3<f64>,
}

/// Memoizes the most recent propagation so that several consumers asking
/// for the same body within one frame trigger a single solve.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    cached: Option<PropagatedState>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached position for `jd`, or run the propagation and
    /// cache its result. Only the last time queried is retained.
    pub fn get_or_compute(
        &mut self,
        jd: f64,
        propagate: impl FnOnce(f64) -> Vector3<f64>,
    ) -> Vector3<f64> {
        if let Some(state) = self.cached {
            if state.jd == jd {
                return state.position;
            }
        }
        let position = propagate(jd);
        self.cached = Some(PropagatedState { jd, position });
        position
    }

    /// Cached position for exactly this time, if present. For callers
    /// whose propagation is fallible and cannot run inside a closure.
    pub fn peek(&self, jd: f64) -> Option<Vector3<f64>> {
        self.cached
            .filter(|state| state.jd == jd)
            .map(|state| state.position)
    }

    /// Store a freshly propagated sample.
    pub fn store(&mut self, jd: f64, position: Vector3<f64>) {
        self.cached = Some(PropagatedState { jd, position });
    }

    /// Drop the cached sample, forcing the next query to propagate.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Sliding window of trail samples maintained incrementally.
#[derive(Debug, Clone)]
pub struct OrbitTrail {
    samples: VecDeque<PropagatedState>,
    capacity: usize,
    slot_seconds: f64,
    fade_samples: usize,
    last_jd: Option<f64>,
}

impl OrbitTrail {
    pub fn new(capacity: usize, slot_seconds: f64, fade_samples: usize) -> Self {
        assert!(capacity >= 2, "a trail needs at least two samples");
        assert!(slot_seconds > 0.0);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            slot_seconds,
            fade_samples,
            last_jd: None,
        }
    }

    /// Trail with the conventional 90-sample, 20-second window.
    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_TRAIL_SAMPLES,
            DEFAULT_SLOT_SECONDS,
            DEFAULT_FADE_SAMPLES,
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in time order, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &PropagatedState> {
        self.samples.iter()
    }

    fn slot_days(&self) -> f64 {
        self.slot_seconds / SECONDS_PER_DAY
    }

    /// Bring the window up to date for simulation time `jd`.
    ///
    /// `propagate` is called once per sample that actually needs computing:
    /// `capacity` times on a rebuild, `n` times when the clock moved by `n`
    /// whole slots, zero times otherwise. `last_jd` only advances by whole
    /// slots, so sub-slot motion accumulates instead of being dropped.
    pub fn update(&mut self, jd: f64, propagate: &mut dyn FnMut(f64) -> Vector3<f64>) {
        let slot = self.slot_days();
        let last = match self.last_jd {
            Some(last) if !self.samples.is_empty() => last,
            _ => {
                self.rebuild(jd, propagate);
                return;
            }
        };

        let diff = jd - last;
        let elapsed = (diff.abs() / slot).floor() as usize;
        if elapsed == 0 {
            return;
        }
        if elapsed >= self.capacity {
            self.rebuild(jd, propagate);
            return;
        }

        if diff > 0.0 {
            // Window slides forward: drop the oldest, extend the newest
            for _ in 0..elapsed {
                self.samples.pop_front();
                let next_jd = self.samples.back().map_or(last, |s| s.jd) + slot;
                self.samples.push_back(PropagatedState {
                    jd: next_jd,
                    position: propagate(next_jd),
                });
            }
            self.last_jd = Some(last + elapsed as f64 * slot);
        } else {
            for _ in 0..elapsed {
                self.samples.pop_back();
                let prev_jd = self.samples.front().map_or(last, |s| s.jd) - slot;
                self.samples.push_front(PropagatedState {
                    jd: prev_jd,
                    position: propagate(prev_jd),
                });
            }
            self.last_jd = Some(last - elapsed as f64 * slot);
        }
    }

    /// Recompute every sample, centered on `jd`.
    fn rebuild(&mut self, jd: f64, propagate: &mut dyn FnMut(f64) -> Vector3<f64>) {
        let slot = self.slot_days();
        let half = self.capacity as f64 / 2.0;
        self.samples.clear();
        for i in 0..self.capacity {
            let sample_jd = jd + (i as f64 - half) * slot;
            self.samples.push_back(PropagatedState {
                jd: sample_jd,
                position: propagate(sample_jd),
            });
        }
        self.last_jd = Some(jd);
    }

    /// Drawing intensity of sample `index`, in [0, 1]. Ramps from zero at
    /// both ends of the window over `fade_samples` samples. Indices past
    /// the window report zero.
    pub fn sample_intensity(&self, index: usize) -> f64 {
        let n = self.samples.len();
        if index >= n {
            return 0.0;
        }
        if self.fade_samples == 0 {
            return 1.0;
        }
        let fade = self.fade_samples as f64;
        let from_start = (index + 1) as f64 / fade;
        let from_end = (n - index) as f64 / fade;
        from_start.min(from_end).min(1.0)
    }
}

//! The simulation clock.
//!
//! Simulated time is a Julian day advanced from wall-clock deltas through
//! a rate multiplier. Rate 1 tracks real time, 60 runs a minute per
//! second, 0 freezes the sky without pausing; `pause` stops advancement
//! while keeping the rate for resume.

use chrono::Utc;
use ephemeris::time::{julian_day_from_datetime, SECONDS_PER_DAY};

#[derive(Debug, Clone, Copy)]
pub struct SimulationClock {
    jd: f64,
    rate: f64,
    paused: bool,
}

impl SimulationClock {
    /// Clock starting at a given Julian day, running at real-time rate.
    pub fn new(jd: f64) -> Self {
        Self {
            jd,
            rate: 1.0,
            paused: false,
        }
    }

    /// Clock starting at the current system time.
    pub fn from_system_time() -> Self {
        Self::new(julian_day_from_datetime(&Utc::now()))
    }

    /// Current simulated Julian day.
    pub fn jd(&self) -> f64 {
        self.jd
    }

    /// Jump to an absolute simulated time.
    pub fn set_jd(&mut self, jd: f64) {
        self.jd = jd;
    }

    /// Simulated seconds per wall second. Negative runs time backwards.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Advance by a wall-clock delta, scaled by the rate. No-op while
    /// paused.
    pub fn advance(&mut self, wall_seconds: f64) {
        if !self.paused {
            self.jd += wall_seconds * self.rate / SECONDS_PER_DAY;
        }
    }

    /// Step the simulated time directly, ignoring rate and pause. For
    /// scripted jumps.
    pub fn step_seconds(&mut self, sim_seconds: f64) {
        self.jd += sim_seconds / SECONDS_PER_DAY;
    }
}

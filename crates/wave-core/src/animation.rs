use instant::Instant;

use crate::constants::DEFAULT_TIME_RATE;
use crate::error::{Result, WaveError};

/// Play/pause flag and period scale for the phase animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    time_active: bool,
    time_rate: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            time_active: false,
            time_rate: DEFAULT_TIME_RATE,
        }
    }
}

impl AnimationState {
    pub fn new(time_active: bool, time_rate: f32) -> Result<Self> {
        let mut state = Self {
            time_active,
            ..Self::default()
        };
        state.set_time_rate(time_rate)?;
        Ok(state)
    }

    pub fn time_active(&self) -> bool {
        self.time_active
    }

    pub fn time_rate(&self) -> f32 {
        self.time_rate
    }

    /// Returns true when the flag actually changed.
    pub fn set_time_active(&mut self, active: bool) -> bool {
        let changed = self.time_active != active;
        self.time_active = active;
        changed
    }

    pub fn set_time_rate(&mut self, rate: f32) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(WaveError::InvalidTimeRate(rate));
        }
        self.time_rate = rate;
        Ok(())
    }
}

/// Monotonic time source in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Seconds since construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Externally stepped clock for tests and offline rendering.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualClock {
    pub seconds: f64,
}

impl ManualClock {
    pub fn advance(&mut self, seconds: f64) {
        self.seconds += seconds.max(0.0);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.seconds
    }
}

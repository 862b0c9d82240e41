//! Scene clock.
//!
//! The animation is a pure function of elapsed time, so the clock is the
//! single source of truth for `t`. It runs either from the wall clock (live
//! viewing) or in fixed steps (headless rendering and exports), where every
//! [`Clock::tick`] advances by exactly the configured step.
//!
//! # Example
//!
//! ```ignore
//! use christmas_glow::time::Clock;
//!
//! let mut clock = Clock::fixed(1.0 / 60.0);
//! let (elapsed, delta) = clock.tick();
//! assert_eq!(clock.frame(), 1);
//! ```

use std::time::{Duration, Instant};

/// Assumed tick rate when a wall clock has to be planned ahead.
const NOMINAL_STEP: f32 = 1.0 / 60.0;

#[derive(Debug, Clone)]
pub struct Clock {
    /// Wall-clock reference of the previous tick.
    anchor: Instant,
    elapsed: f32,
    delta: f32,
    frames: u64,
    /// Fixed step; `None` follows the wall clock.
    step: Option<f32>,
    scale: f32,
    paused: bool,
}

impl Clock {
    /// A clock that follows the wall clock.
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
            elapsed: 0.0,
            delta: 0.0,
            frames: 0,
            step: None,
            scale: 1.0,
            paused: false,
        }
    }

    /// A clock that advances exactly `step` seconds per tick.
    pub fn fixed(step: f32) -> Self {
        Self {
            step: Some(step.max(0.0)),
            ..Self::new()
        }
    }

    /// Advance one frame. Returns `(elapsed, delta)`.
    ///
    /// A paused clock still re-anchors to the wall clock so resuming does
    /// not produce one huge step.
    pub fn tick(&mut self) -> (f32, f32) {
        let wall = self.anchor.elapsed().as_secs_f32();
        self.anchor = Instant::now();

        self.delta = if self.paused {
            0.0
        } else {
            self.frames += 1;
            self.step.unwrap_or(wall) * self.scale
        };
        self.elapsed += self.delta;
        (self.elapsed, self.delta)
    }

    /// Scene time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Time advanced by the last tick.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Unpaused ticks since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn fixed_delta(&self) -> Option<f32> {
        self.step
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Switch between wall-clock (`None`) and fixed-step mode.
    pub fn set_fixed_delta(&mut self, step: Option<f32>) {
        self.step = step.map(|s| s.max(0.0));
    }

    /// Negative scales clamp to zero.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.scale = scale.max(0.0);
    }

    /// Number of ticks that cover `duration`.
    pub fn ticks_for(&self, duration: Duration) -> u32 {
        let step = self.step.unwrap_or(NOMINAL_STEP) * self.scale;
        if step <= 0.0 {
            return 0;
        }
        (duration.as_secs_f32() / step).round() as u32
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

//! Fixed-timestep accumulator.
//!
//! Converts variable wall-clock frame deltas into a whole number of fixed
//! physics ticks. Frame deltas are capped first so a stall (debugger break,
//! window drag) does not trigger a burst of catch-up ticks.

use crate::error::Result;
use crate::simulation::physics_config::ClockConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct StepClock {
    fixed_timestep: f32,
    max_frame_delta: f32,
    accumulator: f32,
}

impl StepClock {
    pub fn new(config: ClockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fixed_timestep: config.fixed_timestep,
            max_frame_delta: config.max_frame_delta,
            accumulator: 0.0,
        })
    }

    pub fn fixed_timestep(&self) -> f32 {
        self.fixed_timestep
    }

    /// Time carried over towards the next tick.
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Fraction of a tick currently accumulated, in [0, 1).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_timestep
    }

    /// Feed one frame's delta and return how many ticks are now due.
    ///
    /// The caller must run exactly that many ticks. Negative deltas count as 0.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let mut dt = frame_dt.max(0.0);
        if dt > self.max_frame_delta {
            log::warn!(
                "Frame delta {:.1}ms exceeds cap of {:.1}ms, dropping {:.1}ms of simulation time",
                dt * 1000.0,
                self.max_frame_delta * 1000.0,
                (dt - self.max_frame_delta) * 1000.0
            );
            dt = self.max_frame_delta;
        }

        self.accumulator += dt;

        let mut ticks = 0;
        while self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            ticks += 1;
        }
        ticks
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

//! Real-time driven cloth scene.

use glam::Vec3;

use crate::error::Result;
use crate::scene::traits::Scene;
use crate::simulation::{
    physics_step, ClothState, ClothStats, ControlParameters, SimulationSettings, StepClock,
    StepReport,
};

/// One cloth, its live controls and the fixed-timestep driver.
pub struct ClothScene {
    pub state: ClothState,

    /// Read at the start of every tick; only replaced through validated setters
    controls: ControlParameters,

    clock: StepClock,

    /// Whether simulation is paused
    pub paused: bool,

    /// Simulated seconds since construction or the last reset
    pub current_time: f32,

    /// Time scale multiplier for simulation speed (1.0 = normal)
    pub time_scale: f32,

    /// Springs torn since construction or the last reset
    pub torn_total: usize,
}

impl ClothScene {
    pub fn new(settings: &SimulationSettings) -> Result<Self> {
        settings.validate()?;
        let state = ClothState::from_config(&settings.cloth)?;
        let clock = StepClock::new(settings.clock)?;

        log::info!(
            "Cloth scene ready: {}x{} segments, {} Hz",
            settings.cloth.segments_x,
            settings.cloth.segments_z,
            (1.0 / settings.clock.fixed_timestep).round()
        );

        Ok(Self {
            state,
            controls: settings.controls.clone(),
            clock,
            paused: false,
            current_time: 0.0,
            time_scale: 1.0,
            torn_total: 0,
        })
    }

    /// Run exactly one tick regardless of pause state or clock.
    pub fn step_once(&mut self) -> StepReport {
        let report = physics_step(&mut self.state, &self.controls);
        self.current_time += self.clock.fixed_timestep();
        self.torn_total += report.springs_torn;
        report
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = if time_scale.is_finite() { time_scale.max(0.0) } else { 1.0 };
    }

    pub fn controls(&self) -> &ControlParameters {
        &self.controls
    }

    /// Replace every control at once. Takes effect on the next tick.
    ///
    /// Invalid controls are rejected and the current ones stay in place.
    pub fn set_controls(&mut self, controls: ControlParameters) -> Result<()> {
        controls.validate()?;
        self.controls = controls;
        Ok(())
    }

    pub fn set_probe_position(&mut self, position: Vec3) {
        self.controls.probe.position = position;
    }

    pub fn set_probe_shape(&mut self, radius: f32, height: f32) -> Result<()> {
        let mut probe = self.controls.probe;
        probe.radius = radius;
        probe.height = height;
        probe.validate()?;
        self.controls.probe = probe;
        Ok(())
    }

    pub fn set_probe_enabled(&mut self, enabled: bool) {
        self.controls.probe.enabled = enabled;
    }

    pub fn set_breakage_enabled(&mut self, enabled: bool) {
        self.state.breakage.enabled = enabled;
    }

    pub fn stats(&self) -> ClothStats {
        ClothStats::gather(&self.state)
    }

    pub fn clock(&self) -> &StepClock {
        &self.clock
    }
}

impl Scene for ClothScene {
    fn update(&mut self, dt: f32) {
        if self.paused {
            return;
        }

        let ticks = self.clock.advance(dt * self.time_scale);
        for _ in 0..ticks {
            self.step_once();
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn current_time(&self) -> f32 {
        self.current_time
    }

    fn vertex_count(&self) -> usize {
        self.state.vertex_count()
    }

    fn reset(&mut self) {
        self.state.reset();
        self.clock.reset();
        self.current_time = 0.0;
        self.torn_total = 0;
        self.paused = false;
    }
}

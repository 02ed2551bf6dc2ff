//! # Cloth Simulation State - Structure-of-Arrays Layout
//!
//! [`ClothState`] owns every mutable array the two stages touch, plus a shared
//! handle to the immutable [`Topology`] they were built from. Nothing lives in
//! global scope: each stage receives the state by reference.
//!
//! ## Data Organization
//!
//! ### Per Vertex
//! - `positions` - current positions, read by the renderer
//! - `velocities` - persistent velocity accumulator (decayed, never zeroed)
//! - `vertex_broken` - "a spring touching me has torn", for tear display
//!
//! ### Per Spring
//! - `spring_forces` - half-force written by the spring stage each tick
//! - `stiffnesses` - current stiffness; drops to zero once and stays there
//! - `spring_broken` - whether the spring has torn
//!
//! ## Ownership Between Stages
//!
//! The spring stage writes only its own spring's slots, plus the endpoint
//! `vertex_broken` flags. Those flags are atomics: every writer stores the
//! same `true`, and no physics code reads them, so relaxed stores suffice.
//! The vertex stage writes only its own vertex's slots.
//!
//! ## Reset
//!
//! [`ClothState::reset`] rewrites the arrays from the topology's rest data.
//! Ids, endpoints and adjacency are never rebuilt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;

use crate::error::Result;
use crate::simulation::physics_config::ClothConfig;
use crate::simulation::topology::{build_topology, Topology};

/// Shared, immutable topology.
pub type TopologyHandle = Arc<Topology>;

/// When springs tear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakageSettings {
    pub enabled: bool,
    /// Stretch ratio (length / rest length) above which a breakable spring tears
    pub threshold: f32,
}

impl Default for BreakageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1.9,
        }
    }
}

impl BreakageSettings {
    pub fn from_config(config: &ClothConfig) -> Self {
        Self {
            enabled: config.breakage_enabled,
            threshold: config.break_threshold,
        }
    }
}

/// Mutable simulation arrays for one cloth.
pub struct ClothState {
    pub topology: TopologyHandle,
    pub breakage: BreakageSettings,

    // === Per vertex ===
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub vertex_broken: Vec<AtomicBool>,

    // === Per spring ===
    pub spring_forces: Vec<Vec3>,
    pub stiffnesses: Vec<f32>,
    pub spring_broken: Vec<bool>,

    /// Ticks completed since construction or the last reset
    pub tick: u64,
}

impl ClothState {
    /// Allocate every array at its final size and fill it from rest data.
    pub fn new(topology: TopologyHandle, breakage: BreakageSettings) -> Self {
        let vertex_count = topology.vertex_count();
        let spring_count = topology.spring_count();

        let mut state = Self {
            topology,
            breakage,
            positions: vec![Vec3::ZERO; vertex_count],
            velocities: vec![Vec3::ZERO; vertex_count],
            vertex_broken: (0..vertex_count).map(|_| AtomicBool::new(false)).collect(),
            spring_forces: vec![Vec3::ZERO; spring_count],
            stiffnesses: vec![0.0; spring_count],
            spring_broken: vec![false; spring_count],
            tick: 0,
        };
        state.restore_rest_values();
        state
    }

    /// Build the topology described by `config` and wrap it in a fresh state.
    pub fn from_config(config: &ClothConfig) -> Result<Self> {
        let topology = Arc::new(build_topology(config)?);
        Ok(Self::new(topology, BreakageSettings::from_config(config)))
    }

    /// Restore rest positions and base stiffness, clear velocities and tears.
    ///
    /// Must not run while a tick is in flight; `&mut self` guarantees that.
    pub fn reset(&mut self) {
        self.restore_rest_values();
        self.tick = 0;
        log::info!(
            "Reset cloth state ({} vertices, {} springs)",
            self.vertex_count(),
            self.spring_count()
        );
    }

    fn restore_rest_values(&mut self) {
        for (position, vertex) in self.positions.iter_mut().zip(&self.topology.vertices) {
            *position = vertex.rest_position;
        }
        self.velocities.fill(Vec3::ZERO);
        for flag in &mut self.vertex_broken {
            *flag.get_mut() = false;
        }

        for (stiffness, spring) in self.stiffnesses.iter_mut().zip(&self.topology.springs) {
            *stiffness = spring.base_stiffness;
        }
        self.spring_forces.fill(Vec3::ZERO);
        self.spring_broken.fill(false);
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn spring_count(&self) -> usize {
        self.stiffnesses.len()
    }

    // === Read accessors for the rendering side ===

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Positions as raw bytes, ready for a vertex buffer upload.
    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn position(&self, vertex: usize) -> Vec3 {
        self.positions[vertex]
    }

    pub fn velocity(&self, vertex: usize) -> Vec3 {
        self.velocities[vertex]
    }

    pub fn is_fixed(&self, vertex: usize) -> bool {
        self.topology.vertices[vertex].is_fixed
    }

    pub fn vertex_broken(&self, vertex: usize) -> bool {
        self.vertex_broken[vertex].load(Ordering::Relaxed)
    }

    /// Snapshot of every vertex's broken indicator.
    pub fn vertex_broken_flags(&self) -> Vec<bool> {
        self.vertex_broken
            .iter()
            .map(|flag| flag.load(Ordering::Relaxed))
            .collect()
    }

    pub fn spring_stiffness(&self, spring: usize) -> f32 {
        self.stiffnesses[spring]
    }

    pub fn spring_broken(&self, spring: usize) -> bool {
        self.spring_broken[spring]
    }

    pub fn spring_force(&self, spring: usize) -> Vec3 {
        self.spring_forces[spring]
    }

    /// Current length of a spring divided by its rest length.
    pub fn stretch_ratio(&self, spring: usize) -> f32 {
        let spring = &self.topology.springs[spring];
        let length = self.positions[spring.a as usize].distance(self.positions[spring.b as usize]);
        length / spring.rest_length
    }
}

impl Clone for ClothState {
    fn clone(&self) -> Self {
        Self {
            topology: Arc::clone(&self.topology),
            breakage: self.breakage,
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
            vertex_broken: self
                .vertex_broken
                .iter()
                .map(|flag| AtomicBool::new(flag.load(Ordering::Relaxed)))
                .collect(),
            spring_forces: self.spring_forces.clone(),
            stiffnesses: self.stiffnesses.clone(),
            spring_broken: self.spring_broken.clone(),
            tick: self.tick,
        }
    }
}

impl std::fmt::Debug for ClothState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClothState")
            .field("vertices", &self.vertex_count())
            .field("springs", &self.spring_count())
            .field("breakage", &self.breakage)
            .field("tick", &self.tick)
            .finish()
    }
}

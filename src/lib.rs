//! # Tearable Cloth: Two-Layer Mass-Spring Simulation
//!
//! A rectangular sheet of cloth modelled as two parallel vertex grids joined
//! by springs. Springs stretched past a threshold tear permanently, and a
//! sphere or capsule probe can be pushed through the sheet.
//!
//! ## Architecture Overview
//!
//! ### 1. Simulation Engine ([`simulation`])
//!
//! - [`simulation::topology`] - Immutable vertices, springs and CSR adjacency
//! - [`simulation::ClothState`] - Structure-of-Arrays mutable state
//! - [`simulation::spring_stage`] - Per-spring forces and tearing
//! - [`simulation::vertex_stage`] - Per-vertex damping, forces, collision, integration
//! - [`simulation::physics_step`] - One tick: spring stage, barrier, vertex stage
//! - [`simulation::SimulationSettings`] - RON-loadable configuration
//!
//! **Key Design**: Every task in a stage writes only slots it owns, so both
//! stages run on the rayon pool and match the single-threaded path bit for bit.
//!
//! ### 2. Scenes ([`scene`])
//!
//! - [`scene::ClothScene`] - Fixed-timestep driver with pause, time scale and reset
//!
//! ## Data Flow
//!
//! ```text
//! Frame dt → StepClock → N × (spring stage → barrier → vertex stage) → positions_bytes()
//! ```
//!
//! ## Dependencies
//!
//! - **Math**: `glam` (SIMD math types), `bytemuck` (safe transmutation)
//! - **Concurrency**: `rayon` (parallel iteration)
//! - **Serialization**: `serde` + `ron` (human-readable config files)
//! - **Diagnostics**: `log` + `env_logger`, `thiserror`

pub mod error;
pub mod scene;
pub mod simulation;

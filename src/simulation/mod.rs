pub mod clock;
pub mod cloth_state;
pub mod collision;
pub mod cpu_physics;
pub mod physics_config;
pub mod spring_stage;
pub mod stats;
pub mod topology;
pub mod vertex_stage;

pub use clock::StepClock;
pub use cloth_state::{BreakageSettings, ClothState, TopologyHandle};
pub use collision::{collision_displacement, Probe};
pub use cpu_physics::{physics_step, physics_step_parallel, physics_step_st, StepReport};
pub use physics_config::{
    CategoryStiffness, ClockConfig, ClothConfig, ControlParameters, PinRule, SimulationSettings,
    StiffnessMultipliers,
};
pub use stats::ClothStats;
pub use topology::{build_topology, Layer, Spring, SpringCategory, Topology, TopologyBuilder, Vertex};

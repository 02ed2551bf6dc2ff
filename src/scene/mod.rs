//! Scene management for the cloth simulation.
//!
//! A scene owns one simulation together with its real-time driver state
//! (pause, time scale, clock) and is what an interactive front end ticks.

pub mod cloth_scene;
pub mod traits;

pub use cloth_scene::ClothScene;
pub use traits::Scene;

//! Scene trait definition.

/// Common interface for a driven simulation.
///
/// The front end calls [`Scene::update`] once per frame with the wall-clock
/// delta; the scene decides how many fixed ticks that amounts to.
pub trait Scene {
    /// Update the scene simulation by the given delta time.
    fn update(&mut self, dt: f32);

    /// Check if the simulation is paused.
    fn is_paused(&self) -> bool;

    /// Set the paused state.
    fn set_paused(&mut self, paused: bool);

    /// Get the current simulation time.
    fn current_time(&self) -> f32;

    /// Get the number of vertices in the simulation.
    fn vertex_count(&self) -> usize;

    /// Return the simulation to its initial state.
    fn reset(&mut self);
}

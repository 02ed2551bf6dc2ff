//! Vertex integration stage: one independent task per vertex.
//!
//! Must only run after the spring stage has finished for every spring. Each
//! task reads spring forces through its adjacency slice and writes nothing but
//! its own position and velocity.
//!
//! Update order per movable vertex:
//!
//! ```text
//! v *= damping
//! v += sum(±F[s]) for s in adjacency(vertex)
//! v += (gravity + wind) / vertex_count
//! v += collision(p + v)
//! p += v
//! ```
//!
//! The velocity doubles as a per-tick displacement: there is no mass or dt
//! term, both are folded into the stiffness, gravity and damping constants.

use glam::Vec3;
use rayon::prelude::*;

use crate::simulation::cloth_state::ClothState;
use crate::simulation::collision::{collision_displacement, Probe};
use crate::simulation::physics_config::ControlParameters;
use crate::simulation::topology::Topology;

/// Per-vertex share of gravity and wind, so the total weight of the cloth
/// does not depend on its resolution.
#[inline]
pub fn external_push(controls: &ControlParameters, vertex_count: usize) -> Vec3 {
    if vertex_count == 0 {
        return Vec3::ZERO;
    }
    (Vec3::NEG_Y * controls.gravity + controls.wind) / vertex_count as f32
}

/// Integrate a single vertex in place.
#[inline]
#[allow(clippy::too_many_arguments)]
fn integrate_vertex(
    vertex: usize,
    topology: &Topology,
    spring_forces: &[Vec3],
    damping: f32,
    external: Vec3,
    probe: &Probe,
    position: &mut Vec3,
    velocity: &mut Vec3,
) {
    if topology.vertices[vertex].is_fixed {
        return;
    }

    let mut accumulator = *velocity * damping;

    let id = vertex as u32;
    for &spring_id in topology.adjacency.springs_of(vertex) {
        let spring = &topology.springs[spring_id as usize];
        let force = spring_forces[spring_id as usize];
        if spring.a == id {
            accumulator += force;
        } else {
            accumulator -= force;
        }
    }

    accumulator += external;

    let tentative = *position + accumulator;
    accumulator += collision_displacement(tentative, probe);

    *velocity = accumulator;
    *position += accumulator;
}

/// Run the stage across the rayon pool.
pub fn run_vertex_stage_parallel(state: &mut ClothState, controls: &ControlParameters) {
    let topology: &Topology = &state.topology;
    let spring_forces = &state.spring_forces;
    let external = external_push(controls, topology.vertex_count());

    state
        .positions
        .par_iter_mut()
        .zip(state.velocities.par_iter_mut())
        .enumerate()
        .for_each(|(vertex, (position, velocity))| {
            integrate_vertex(
                vertex,
                topology,
                spring_forces,
                controls.damping,
                external,
                &controls.probe,
                position,
                velocity,
            );
        });
}

/// Single-threaded version of [`run_vertex_stage_parallel`].
pub fn run_vertex_stage_st(state: &mut ClothState, controls: &ControlParameters) {
    let topology: &Topology = &state.topology;
    let spring_forces = &state.spring_forces;
    let external = external_push(controls, topology.vertex_count());

    for (vertex, (position, velocity)) in state
        .positions
        .iter_mut()
        .zip(state.velocities.iter_mut())
        .enumerate()
    {
        integrate_vertex(
            vertex,
            topology,
            spring_forces,
            controls.damping,
            external,
            &controls.probe,
            position,
            velocity,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::cloth_state::BreakageSettings;
    use crate::simulation::topology::{Layer, SpringCategory, TopologyBuilder};
    use std::sync::Arc;

    fn quiet_controls() -> ControlParameters {
        let mut controls = ControlParameters::default();
        controls.damping = 1.0;
        controls.gravity = 0.0;
        controls.probe.enabled = false;
        controls
    }

    /// Fixed anchor, free middle vertex, free end vertex in a line.
    fn chain_state() -> ClothState {
        let mut builder = TopologyBuilder::new();
        let anchor = builder.add_vertex(Vec3::ZERO, Layer::Top, true);
        let middle = builder.add_vertex(Vec3::X, Layer::Top, false);
        let end = builder.add_vertex(Vec3::X * 2.0, Layer::Top, false);
        builder.add_spring(anchor, middle, 1.0, SpringCategory::Structural).unwrap();
        builder.add_spring(middle, end, 1.0, SpringCategory::Structural).unwrap();
        ClothState::new(Arc::new(builder.build()), BreakageSettings::default())
    }

    #[test]
    fn test_fixed_vertex_is_untouched() {
        let mut state = chain_state();
        state.spring_forces[0] = Vec3::new(5.0, 5.0, 5.0);
        state.velocities[0] = Vec3::ONE;

        run_vertex_stage_st(&mut state, &ControlParameters::default());

        assert_eq!(state.position(0), Vec3::ZERO);
        assert_eq!(state.velocity(0), Vec3::ONE);
    }

    #[test]
    fn test_force_sign_follows_endpoint_order() {
        let mut state = chain_state();
        // Spring 0: anchor -> middle, spring 1: middle -> end
        state.spring_forces[1] = Vec3::new(0.1, 0.0, 0.0);

        run_vertex_stage_st(&mut state, &quiet_controls());

        // Middle is endpoint A of spring 1, end is endpoint B
        assert!((state.velocity(1) - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-7);
        assert!((state.velocity(2) - Vec3::new(-0.1, 0.0, 0.0)).length() < 1e-7);
        assert!((state.position(1) - Vec3::new(1.1, 0.0, 0.0)).length() < 1e-6);
        assert!((state.position(2) - Vec3::new(1.9, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_damping_decays_velocity() {
        let mut state = chain_state();
        state.velocities[2] = Vec3::new(0.0, 0.0, 1.0);
        let mut controls = quiet_controls();
        controls.damping = 0.5;

        run_vertex_stage_st(&mut state, &controls);

        assert_eq!(state.velocity(2), Vec3::new(0.0, 0.0, 0.5));
        assert_eq!(state.position(2), Vec3::new(2.0, 0.0, 0.5));
    }

    #[test]
    fn test_gravity_is_split_across_vertices() {
        let mut state = chain_state();
        let mut controls = quiet_controls();
        controls.gravity = 0.3;

        run_vertex_stage_st(&mut state, &controls);

        let expected = -0.3 / 3.0;
        assert!((state.velocity(1).y - expected).abs() < 1e-7);
        assert!((state.velocity(2).y - expected).abs() < 1e-7);
        assert_eq!(state.velocity(0), Vec3::ZERO);
    }

    #[test]
    fn test_collision_correction_enters_velocity() {
        let mut state = chain_state();
        let mut controls = quiet_controls();
        controls.probe = Probe::sphere(Vec3::new(2.0, -0.05, 0.0), 0.1);

        run_vertex_stage_st(&mut state, &controls);

        // End vertex sits 0.05 above the probe centre and is pushed to its surface
        let end = state.position(2);
        assert!((end.distance(controls.probe.position) - 0.1).abs() < 1e-6);
        assert!((state.velocity(2).y - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_stage_matches_sequential() {
        let config = crate::simulation::ClothConfig {
            segments_x: 10,
            segments_z: 10,
            ..Default::default()
        };
        let mut sequential = ClothState::from_config(&config).unwrap();
        for (i, force) in sequential.spring_forces.iter_mut().enumerate() {
            *force = Vec3::new((i % 11) as f32 * 1e-3, (i % 7) as f32 * -1e-3, (i % 5) as f32 * 2e-3);
        }
        let mut parallel = sequential.clone();
        let controls = ControlParameters::default();

        run_vertex_stage_st(&mut sequential, &controls);
        run_vertex_stage_parallel(&mut parallel, &controls);

        assert_eq!(sequential.positions, parallel.positions);
        assert_eq!(sequential.velocities, parallel.velocities);
    }
}

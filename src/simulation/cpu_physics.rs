// CPU cloth step: spring stage, barrier, vertex stage

use crate::simulation::cloth_state::ClothState;
use crate::simulation::physics_config::ControlParameters;
use crate::simulation::spring_stage::{run_spring_stage_parallel, run_spring_stage_st};
use crate::simulation::vertex_stage::{run_vertex_stage_parallel, run_vertex_stage_st};

/// Below this many springs the rayon dispatch overhead outweighs the work.
pub const PARALLEL_THRESHOLD: usize = 1024;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Springs that tore during this tick (not counting earlier tears)
    pub springs_torn: usize,
}

// ============================================================================
// Main Physics Step
// ============================================================================

/// Advance the cloth by one tick, choosing the parallel path for large meshes.
///
/// Both paths produce bit-identical results. `controls` are assumed to have
/// passed [`ControlParameters::validate`]; they are not rechecked per tick.
pub fn physics_step(state: &mut ClothState, controls: &ControlParameters) -> StepReport {
    if state.spring_count() >= PARALLEL_THRESHOLD {
        physics_step_parallel(state, controls)
    } else {
        physics_step_st(state, controls)
    }
}

/// Physics step using the rayon pool for both stages.
pub fn physics_step_parallel(state: &mut ClothState, controls: &ControlParameters) -> StepReport {
    // 1. Spring forces and tearing, one task per spring
    let springs_torn = run_spring_stage_parallel(state, &controls.stiffness_multipliers);

    // Barrier: the reduction above has joined every spring task, so all
    // forces are written before any vertex reads them.

    // 2. Damping, forces, gravity, collision and integration, one task per vertex
    run_vertex_stage_parallel(state, controls);

    finish_tick(state, springs_torn)
}

/// Single-threaded physics step.
pub fn physics_step_st(state: &mut ClothState, controls: &ControlParameters) -> StepReport {
    // 1. Spring forces and tearing
    let springs_torn = run_spring_stage_st(state, &controls.stiffness_multipliers);

    // 2. Vertex integration
    run_vertex_stage_st(state, controls);

    finish_tick(state, springs_torn)
}

fn finish_tick(state: &mut ClothState, springs_torn: usize) -> StepReport {
    state.tick += 1;
    if springs_torn > 0 {
        log::debug!("Tick {}: {} springs torn", state.tick, springs_torn);
    }
    StepReport { springs_torn }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::cloth_state::BreakageSettings;
    use crate::simulation::collision::Probe;
    use crate::simulation::physics_config::{ClothConfig, PinRule};
    use crate::simulation::topology::{Layer, SpringCategory, TopologyBuilder};
    use glam::Vec3;
    use std::sync::Arc;

    fn quiet_controls() -> ControlParameters {
        ControlParameters {
            damping: 1.0,
            gravity: 0.0,
            probe: Probe {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn grid_state(segments: u32, pin_rule: PinRule) -> ClothState {
        let config = ClothConfig {
            segments_x: segments,
            segments_z: segments,
            pin_rule,
            ..Default::default()
        };
        ClothState::from_config(&config).unwrap()
    }

    /// Probe that starts above the cloth centre and pokes down through it.
    fn poking_controls() -> ControlParameters {
        ControlParameters {
            probe: Probe::capsule(Vec3::new(0.05, 0.4, -0.03), 0.12, 0.6),
            gravity: 0.5,
            ..Default::default()
        }
    }

    /// Fixed boundary vertex at the origin and a movable centre vertex resting
    /// 0.5 away, joined by one structural spring of rest length 0.5.
    fn boundary_centre_state() -> ClothState {
        let mut builder = TopologyBuilder::new();
        let boundary = builder.add_vertex(Vec3::ZERO, Layer::Top, true);
        let centre = builder.add_vertex(Vec3::new(0.5, 0.0, 0.0), Layer::Top, false);
        builder.add_spring(boundary, centre, 0.2, SpringCategory::Structural).unwrap();
        ClothState::new(Arc::new(builder.build()), BreakageSettings::default())
    }

    #[test]
    fn test_stretched_centre_moves_towards_boundary() {
        let mut state = boundary_centre_state();
        state.positions[1] = Vec3::new(0.7, 0.0, 0.0);

        physics_step_st(&mut state, &quiet_controls());

        assert!(state.position(1).x < 0.7);
        assert!(state.velocity(1).x < 0.0);
        assert_eq!(state.position(0), Vec3::ZERO);
    }

    #[test]
    fn test_compressed_centre_moves_away_from_boundary() {
        let mut state = boundary_centre_state();
        state.positions[1] = Vec3::new(0.3, 0.0, 0.0);

        physics_step_st(&mut state, &quiet_controls());

        assert!(state.position(1).x > 0.3);
        assert!(state.velocity(1).x > 0.0);
    }

    /// Distance from the top-layer centre of a 3x3 grid to its pinned
    /// neighbour at +X after one tick, starting from `centre_x`.
    fn centre_to_neighbour_after_step(centre_x: f32) -> f32 {
        let config = ClothConfig {
            segments_x: 2,
            segments_z: 2,
            ..Default::default()
        };
        let mut state = ClothState::from_config(&config).unwrap();
        // Row-major ids: centre is 4, its +X neighbour is 5, 0.5 apart at rest
        let (centre, neighbour) = (4, 5);
        assert!(!state.is_fixed(centre));
        assert!(state.is_fixed(neighbour));
        assert!((state.position(centre).distance(state.position(neighbour)) - 0.5).abs() < 1e-6);

        state.positions[centre].x = centre_x;
        physics_step(&mut state, &quiet_controls());

        assert_eq!(state.position(neighbour), state.topology.vertices[neighbour].rest_position);
        state.position(centre).distance(state.position(neighbour))
    }

    #[test]
    fn test_grid_centre_follows_its_boundary_spring() {
        // Compressed to 0.3: pushed away from the neighbour
        assert!(centre_to_neighbour_after_step(0.2) > 0.3);
        // Stretched to 0.7: pulled back towards it
        assert!(centre_to_neighbour_after_step(-0.2) < 0.7);
    }

    #[test]
    fn test_cloth_at_rest_without_gravity_stays_put() {
        let mut state = grid_state(3, PinRule::Perimeter);
        for _ in 0..10 {
            physics_step(&mut state, &quiet_controls());
        }
        for (position, rest) in state.positions.iter().zip(state.topology.rest_positions()) {
            assert!(position.distance(rest) < 1e-6);
        }
    }

    #[test]
    fn test_fixed_vertices_never_move() {
        let mut state = grid_state(8, PinRule::Perimeter);
        let controls = poking_controls();

        for _ in 0..200 {
            physics_step(&mut state, &controls);
        }

        for vertex in state.topology.vertices.iter().filter(|v| v.is_fixed) {
            let id = vertex.id as usize;
            assert_eq!(state.position(id), vertex.rest_position);
            assert_eq!(state.velocity(id), Vec3::ZERO);
        }
        // Free vertices did move
        let moved = state
            .positions
            .iter()
            .zip(state.topology.rest_positions())
            .any(|(position, rest)| position.distance(rest) > 0.005);
        assert!(moved);
    }

    #[test]
    fn test_steps_are_deterministic() {
        let mut first = grid_state(10, PinRule::Corners);
        let mut second = grid_state(10, PinRule::Corners);
        let controls = poking_controls();

        for _ in 0..50 {
            let a = physics_step(&mut first, &controls);
            let b = physics_step(&mut second, &controls);
            assert_eq!(a, b);
        }

        assert_eq!(first.positions, second.positions);
        assert_eq!(first.velocities, second.velocities);
        assert_eq!(first.stiffnesses, second.stiffnesses);
        assert_eq!(first.vertex_broken_flags(), second.vertex_broken_flags());
    }

    #[test]
    fn test_parallel_matches_sequential_over_many_ticks() {
        let mut sequential = grid_state(24, PinRule::Perimeter);
        let mut parallel = sequential.clone();
        assert!(parallel.spring_count() >= PARALLEL_THRESHOLD);

        let mut controls = poking_controls();
        controls.probe.radius = 0.08;
        for tick in 0..120 {
            // Drive the probe down through the cloth so springs tear
            controls.probe.position.y = 0.4 - tick as f32 * 0.01;
            let a = physics_step_st(&mut sequential, &controls);
            let b = physics_step_parallel(&mut parallel, &controls);
            assert_eq!(a, b);
        }

        assert_eq!(sequential.positions, parallel.positions);
        assert_eq!(sequential.velocities, parallel.velocities);
        assert_eq!(sequential.spring_broken, parallel.spring_broken);
        assert_eq!(sequential.vertex_broken_flags(), parallel.vertex_broken_flags());
    }

    #[test]
    fn test_breakage_is_monotonic() {
        let mut state = grid_state(10, PinRule::Perimeter);
        // Yank the centre of the top layer far out of the sheet
        let centre = 5 * 11 + 5;
        state.positions[centre].y += 1.0;

        let controls = ControlParameters::default();
        let mut previous = state.spring_broken.clone();
        let mut total_torn = 0;

        for _ in 0..30 {
            total_torn += physics_step(&mut state, &controls).springs_torn;
            for (spring, (&before, &now)) in previous.iter().zip(&state.spring_broken).enumerate() {
                if before {
                    assert!(now);
                    assert_eq!(state.spring_stiffness(spring), 0.0);
                }
            }
            previous = state.spring_broken.clone();
        }

        assert!(total_torn > 0);
        assert_eq!(total_torn, state.spring_broken.iter().filter(|b| **b).count());
        assert!(state.vertex_broken(centre));
    }

    #[test]
    fn test_disabled_breakage_never_tears() {
        let mut state = grid_state(10, PinRule::Perimeter);
        state.breakage.enabled = false;
        state.positions[5 * 11 + 5].y += 1.0;

        for _ in 0..30 {
            assert_eq!(physics_step(&mut state, &ControlParameters::default()).springs_torn, 0);
        }
        assert!(state.spring_broken.iter().all(|b| !b));
        assert!(state.vertex_broken_flags().iter().all(|b| !b));
    }

    #[test]
    fn test_spring_forces_conserve_momentum() {
        let mut state = grid_state(6, PinRule::Free);
        for (i, position) in state.positions.iter_mut().enumerate() {
            *position += Vec3::new((i % 5) as f32 * 0.004, (i % 3) as f32 * -0.006, (i % 7) as f32 * 0.003);
        }

        physics_step_st(&mut state, &quiet_controls());

        // Every spring adds +F to one endpoint and -F to the other
        let total: Vec3 = state.velocities.iter().copied().sum();
        assert!(total.length() < 1e-5, "net impulse {total:?}");
        assert!(state.velocities.iter().any(|v| v.length() > 1e-6));
    }

    #[test]
    fn test_reset_after_tearing_matches_fresh_state() {
        let fresh = grid_state(10, PinRule::Perimeter);
        let mut state = fresh.clone();
        state.positions[5 * 11 + 5].y += 1.0;
        for _ in 0..20 {
            physics_step(&mut state, &poking_controls());
        }
        assert!(state.spring_broken.iter().any(|b| *b));

        state.reset();
        state.reset();

        assert_eq!(state.positions, fresh.positions);
        assert_eq!(state.velocities, fresh.velocities);
        assert_eq!(state.stiffnesses, fresh.stiffnesses);
        assert_eq!(state.spring_broken, fresh.spring_broken);
        assert_eq!(state.vertex_broken_flags(), fresh.vertex_broken_flags());
        assert_eq!(state.tick, 0);
    }

    #[test]
    fn test_tick_counter_advances() {
        let mut state = grid_state(2, PinRule::Perimeter);
        for _ in 0..3 {
            physics_step(&mut state, &quiet_controls());
        }
        assert_eq!(state.tick, 3);
    }
}

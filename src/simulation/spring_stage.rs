//! Spring force stage: one independent task per spring.
//!
//! Each task reads the two endpoint positions, decides whether the spring
//! tears, and stores a pre-halved Hooke force in its own slot. The vertex
//! stage later adds that force to endpoint A and subtracts it from endpoint B.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use rayon::prelude::*;

use crate::simulation::cloth_state::{BreakageSettings, ClothState};
use crate::simulation::physics_config::StiffnessMultipliers;
use crate::simulation::topology::Spring;

/// Floor on spring length so coincident endpoints never divide by zero.
pub const LENGTH_EPSILON: f32 = 1e-6;

/// Hooke force for a spring from `pa` to `pb`, already halved for the
/// two-endpoint split. Points from A towards B when stretched.
#[inline]
pub fn hooke_half_force(pa: Vec3, pb: Vec3, rest_length: f32, stiffness: f32) -> Vec3 {
    let delta = pb - pa;
    let dist = delta.length().max(LENGTH_EPSILON);
    delta * (stiffness * (dist - rest_length) * 0.5 / dist)
}

/// Evaluate one spring, writing only its own slots.
///
/// Returns 1 if the spring tore during this call, 0 otherwise, so the
/// dispatch can be reduced to a tear count.
#[inline]
#[allow(clippy::too_many_arguments)]
fn evaluate_spring(
    spring: &Spring,
    positions: &[Vec3],
    vertex_broken: &[AtomicBool],
    breakage: BreakageSettings,
    multipliers: &StiffnessMultipliers,
    force: &mut Vec3,
    stiffness: &mut f32,
    broken: &mut bool,
) -> usize {
    let pa = positions[spring.a as usize];
    let pb = positions[spring.b as usize];

    let mut tore = 0;
    if breakage.enabled && spring.category.is_breakable() {
        let dist = (pb - pa).length().max(LENGTH_EPSILON);
        if dist / spring.rest_length > breakage.threshold {
            if !*broken {
                tore = 1;
            }
            *stiffness = 0.0;
            *broken = true;
            // Same value from every writer, read only by the renderer
            vertex_broken[spring.a as usize].store(true, Ordering::Relaxed);
            vertex_broken[spring.b as usize].store(true, Ordering::Relaxed);
        }
    }

    let effective = *stiffness * multipliers.for_category(spring.category);
    *force = hooke_half_force(pa, pb, spring.rest_length, effective);
    tore
}

/// Run the stage across the rayon pool. Returns the number of springs torn.
///
/// The reduction only returns after every spring task has completed, which
/// is the barrier the vertex stage depends on.
pub fn run_spring_stage_parallel(state: &mut ClothState, multipliers: &StiffnessMultipliers) -> usize {
    let springs = &state.topology.springs;
    let positions = &state.positions;
    let vertex_broken = &state.vertex_broken;
    let breakage = state.breakage;

    state
        .spring_forces
        .par_iter_mut()
        .zip(state.stiffnesses.par_iter_mut())
        .zip(state.spring_broken.par_iter_mut())
        .zip(springs.par_iter())
        .map(|(((force, stiffness), broken), spring)| {
            evaluate_spring(
                spring,
                positions,
                vertex_broken,
                breakage,
                multipliers,
                force,
                stiffness,
                broken,
            )
        })
        .sum()
}

/// Single-threaded version of [`run_spring_stage_parallel`].
pub fn run_spring_stage_st(state: &mut ClothState, multipliers: &StiffnessMultipliers) -> usize {
    let springs = &state.topology.springs;
    let positions = &state.positions;
    let vertex_broken = &state.vertex_broken;
    let breakage = state.breakage;

    state
        .spring_forces
        .iter_mut()
        .zip(state.stiffnesses.iter_mut())
        .zip(state.spring_broken.iter_mut())
        .zip(springs.iter())
        .map(|(((force, stiffness), broken), spring)| {
            evaluate_spring(
                spring,
                positions,
                vertex_broken,
                breakage,
                multipliers,
                force,
                stiffness,
                broken,
            )
        })
        .sum()
}

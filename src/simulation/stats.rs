//! Summary numbers for logging and the runner's progress output.

use rayon::prelude::*;

use crate::simulation::cloth_state::ClothState;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClothStats {
    pub tick: u64,
    pub torn_springs: usize,
    pub torn_vertices: usize,
    /// Largest length / rest length over intact springs
    pub max_stretch: f32,
    /// Mean per-tick displacement of all vertices
    pub mean_speed: f32,
    /// Lowest y over all vertices
    pub lowest_point: f32,
}

impl ClothStats {
    pub fn gather(state: &ClothState) -> Self {
        let torn_springs = state.spring_broken.par_iter().filter(|b| **b).count();
        let torn_vertices = state.vertex_broken_flags().into_iter().filter(|b| *b).count();

        let max_stretch = (0..state.spring_count())
            .into_par_iter()
            .filter(|&s| !state.spring_broken(s))
            .map(|s| state.stretch_ratio(s))
            .reduce(|| 0.0, f32::max);

        let vertex_count = state.vertex_count();
        let mean_speed = if vertex_count == 0 {
            0.0
        } else {
            state.velocities.par_iter().map(|v| v.length()).sum::<f32>() / vertex_count as f32
        };

        let lowest_point = state
            .positions
            .par_iter()
            .map(|p| p.y)
            .reduce(|| f32::INFINITY, f32::min);

        Self {
            tick: state.tick,
            torn_springs,
            torn_vertices,
            max_stretch,
            mean_speed,
            lowest_point,
        }
    }
}

impl std::fmt::Display for ClothStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tick {}: {} springs torn ({} vertices), max stretch {:.3}, mean speed {:.5}, lowest y {:.4}",
            self.tick,
            self.torn_springs,
            self.torn_vertices,
            self.max_stretch,
            self.mean_speed,
            self.lowest_point
        )
    }
}

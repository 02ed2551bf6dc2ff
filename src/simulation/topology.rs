//! # Cloth Topology - Vertices, Springs and CSR Adjacency
//!
//! The topology is built once and never changes afterwards. It describes:
//!
//! - **Vertices** - rest position, layer tag and whether the vertex is pinned
//! - **Springs** - endpoint pair, rest length, base stiffness and category
//! - **Adjacency** - for every movable vertex, the ids of its incident springs
//!
//! ## Adjacency Layout
//!
//! Incident springs are stored compressed-sparse-row style: one shared
//! `spring_ids` sequence plus an `(offset, count)` slice per vertex. The table
//! is built in three passes:
//!
//! ```text
//! 1. count   - walk every spring, bump the count of each movable endpoint
//! 2. offsets - exclusive prefix sum over the counts
//! 3. fill    - walk the springs again, writing ids at offset + cursor
//! ```
//!
//! Both arrays are allocated once at their final size, so the table stays
//! contiguous and the vertex stage can read it from every worker without
//! synchronization. Because springs are visited in id order during the fill
//! pass, each vertex sees its springs in construction order.
//!
//! ## Grid Construction
//!
//! [`build_topology`] lays out two `(segments_x + 1) x (segments_z + 1)`
//! grids in the XZ plane, `thickness` apart along Y. Vertex ids are
//! layer-major then row-major:
//!
//! ```text
//! id = layer * vertices_per_layer + iz * (segments_x + 1) + ix
//! ```
//!
//! Each layer receives structural, shear and bending springs, and once both
//! layers exist every top vertex is linked to the bottom vertex beneath it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ClothError, Result};
use crate::simulation::physics_config::{ClothConfig, PinRule};

/// Which of the two cloth layers a vertex belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Top,
    Bottom,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Top, Layer::Bottom];

    /// Signed offset along the thickness axis, in units of half the thickness.
    pub fn offset_sign(self) -> f32 {
        match self {
            Layer::Top => 1.0,
            Layer::Bottom => -1.0,
        }
    }
}

/// Spring category. Only layer links are unbreakable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpringCategory {
    /// Horizontal and vertical grid neighbours
    Structural,
    /// Diagonal grid neighbours
    Shear,
    /// Neighbours two cells apart along a row or column
    Bending,
    /// Corresponding vertices of the two layers
    LayerLink,
}

impl SpringCategory {
    pub const ALL: [SpringCategory; 4] = [
        SpringCategory::Structural,
        SpringCategory::Shear,
        SpringCategory::Bending,
        SpringCategory::LayerLink,
    ];

    #[inline]
    pub fn is_breakable(self) -> bool {
        !matches!(self, SpringCategory::LayerLink)
    }

    pub fn name(self) -> &'static str {
        match self {
            SpringCategory::Structural => "structural",
            SpringCategory::Shear => "shear",
            SpringCategory::Bending => "bending",
            SpringCategory::LayerLink => "layer-link",
        }
    }
}

/// Immutable description of one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: u32,
    pub rest_position: Vec3,
    pub layer: Layer,
    pub is_fixed: bool,
}

/// Immutable description of one spring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub id: u32,
    /// First endpoint; receives the stored force with a positive sign
    pub a: u32,
    /// Second endpoint; receives the stored force negated
    pub b: u32,
    pub rest_length: f32,
    pub base_stiffness: f32,
    pub category: SpringCategory,
}

impl Spring {
    #[inline]
    pub fn other(&self, vertex: u32) -> u32 {
        if vertex == self.a {
            self.b
        } else {
            self.a
        }
    }

    #[inline]
    pub fn touches(&self, vertex: u32) -> bool {
        self.a == vertex || self.b == vertex
    }
}

/// Window into [`Adjacency::spring_ids`] for a single vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencySlice {
    pub offset: u32,
    pub count: u32,
}

impl AdjacencySlice {
    #[inline]
    pub fn range(self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.count as usize
    }
}

/// Flattened vertex -> incident spring table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjacency {
    pub slices: Vec<AdjacencySlice>,
    pub spring_ids: Vec<u32>,
}

impl Adjacency {
    /// Count, prefix-sum, fill. Fixed vertices get an empty slice.
    fn build(vertices: &[Vertex], springs: &[Spring]) -> Self {
        let mut counts = vec![0u32; vertices.len()];
        for spring in springs {
            for endpoint in [spring.a, spring.b] {
                if !vertices[endpoint as usize].is_fixed {
                    counts[endpoint as usize] += 1;
                }
            }
        }

        let mut slices = Vec::with_capacity(vertices.len());
        let mut offset = 0u32;
        for &count in &counts {
            slices.push(AdjacencySlice { offset, count });
            offset += count;
        }

        let mut spring_ids = vec![0u32; offset as usize];
        let mut cursors = vec![0u32; vertices.len()];
        for spring in springs {
            for endpoint in [spring.a, spring.b] {
                let v = endpoint as usize;
                if vertices[v].is_fixed {
                    continue;
                }
                let insert_pos = slices[v].offset + cursors[v];
                spring_ids[insert_pos as usize] = spring.id;
                cursors[v] += 1;
            }
        }

        Self { slices, spring_ids }
    }

    /// Incident spring ids of `vertex`, in construction order.
    #[inline]
    pub fn springs_of(&self, vertex: usize) -> &[u32] {
        &self.spring_ids[self.slices[vertex].range()]
    }
}

/// A complete, immutable cloth graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub vertices: Vec<Vertex>,
    pub springs: Vec<Spring>,
    pub adjacency: Adjacency,
}

impl Topology {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    pub fn fixed_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_fixed).count()
    }

    pub fn count_by_category(&self, category: SpringCategory) -> usize {
        self.springs.iter().filter(|s| s.category == category).count()
    }

    /// Rest positions in vertex id order.
    pub fn rest_positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.rest_position).collect()
    }
}

/// Incremental topology construction.
///
/// Used by [`build_topology`] for the cloth grid and directly for small
/// hand-made graphs. Ids are handed out densely in insertion order.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    vertices: Vec<Vertex>,
    springs: Vec<Spring>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, spring_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            springs: Vec::with_capacity(spring_count),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn add_vertex(&mut self, rest_position: Vec3, layer: Layer, is_fixed: bool) -> u32 {
        let id = self.vertices.len() as u32;
        self.vertices.push(Vertex {
            id,
            rest_position,
            layer,
            is_fixed,
        });
        id
    }

    /// Add a spring whose rest length is the current endpoint distance.
    pub fn add_spring(
        &mut self,
        a: u32,
        b: u32,
        stiffness: f32,
        category: SpringCategory,
    ) -> Result<u32> {
        self.check_endpoints(a, b)?;
        let rest_length = self.vertices[a as usize]
            .rest_position
            .distance(self.vertices[b as usize].rest_position);
        check_spring_values(a, b, rest_length, stiffness, category)?;
        Ok(self.push_spring(a, b, rest_length, stiffness, category))
    }

    /// Add a spring with an explicit rest length.
    pub fn add_spring_with_rest_length(
        &mut self,
        a: u32,
        b: u32,
        rest_length: f32,
        stiffness: f32,
        category: SpringCategory,
    ) -> Result<u32> {
        self.check_endpoints(a, b)?;
        check_spring_values(a, b, rest_length, stiffness, category)?;
        Ok(self.push_spring(a, b, rest_length, stiffness, category))
    }

    pub fn build(self) -> Topology {
        let adjacency = Adjacency::build(&self.vertices, &self.springs);
        Topology {
            vertices: self.vertices,
            springs: self.springs,
            adjacency,
        }
    }

    fn check_endpoints(&self, a: u32, b: u32) -> Result<()> {
        let vertex_count = self.vertices.len();
        for index in [a, b] {
            if index as usize >= vertex_count {
                return Err(ClothError::VertexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        if a == b {
            return Err(ClothError::SelfLoop(a));
        }
        Ok(())
    }

    fn push_spring(
        &mut self,
        a: u32,
        b: u32,
        rest_length: f32,
        base_stiffness: f32,
        category: SpringCategory,
    ) -> u32 {
        let id = self.springs.len() as u32;
        self.springs.push(Spring {
            id,
            a,
            b,
            rest_length,
            base_stiffness,
            category,
        });
        id
    }
}

/// Rest length must be usable as a divisor; stiffness may be zero (a spring
/// that starts out slack) but never negative.
fn check_spring_values(
    a: u32,
    b: u32,
    rest_length: f32,
    stiffness: f32,
    category: SpringCategory,
) -> Result<()> {
    if !rest_length.is_finite() || rest_length <= 0.0 {
        return Err(ClothError::InvalidRestLength {
            a,
            b,
            value: rest_length,
        });
    }
    if !stiffness.is_finite() || stiffness < 0.0 {
        return Err(ClothError::InvalidStiffness {
            category: category.name(),
            value: stiffness,
        });
    }
    Ok(())
}

/// Neighbour offsets `(dx, dz, category)` each vertex links forward to.
///
/// Every offset points to a later row or to the right within the same row,
/// so each undirected edge is generated exactly once.
const GRID_LINKS: [(i64, i64, SpringCategory); 6] = [
    (1, 0, SpringCategory::Structural),
    (0, 1, SpringCategory::Structural),
    (1, 1, SpringCategory::Shear),
    (-1, 1, SpringCategory::Shear),
    (2, 0, SpringCategory::Bending),
    (0, 2, SpringCategory::Bending),
];

/// Build the two-layer cloth described by `config`.
pub fn build_topology(config: &ClothConfig) -> Result<Topology> {
    config.validate()?;

    let columns = config.segments_x as usize + 1;
    let rows = config.segments_z as usize + 1;
    let per_layer = columns * rows;
    let springs_per_layer = estimate_grid_springs(columns, rows);

    let mut builder =
        TopologyBuilder::with_capacity(per_layer * 2, springs_per_layer * 2 + per_layer);

    for layer in Layer::ALL {
        let y = layer.offset_sign() * config.thickness * 0.5;
        for iz in 0..rows {
            for ix in 0..columns {
                let x = (ix as f32 / config.segments_x as f32 - 0.5) * config.width;
                let z = (iz as f32 / config.segments_z as f32 - 0.5) * config.depth;
                let is_fixed = is_pinned(config.pin_rule, ix, iz, columns, rows);
                builder.add_vertex(Vec3::new(x, y, z), layer, is_fixed);
            }
        }
    }

    for layer_index in 0..Layer::ALL.len() {
        let base = layer_index * per_layer;
        for iz in 0..rows {
            for ix in 0..columns {
                let from = (base + iz * columns + ix) as u32;
                for (dx, dz, category) in GRID_LINKS {
                    let nx = ix as i64 + dx;
                    let nz = iz as i64 + dz;
                    if nx < 0 || nz < 0 || nx >= columns as i64 || nz >= rows as i64 {
                        continue;
                    }
                    let to = (base + nz as usize * columns + nx as usize) as u32;
                    builder.add_spring(from, to, config.stiffness.for_category(category), category)?;
                }
            }
        }
    }

    for i in 0..per_layer {
        builder.add_spring(
            i as u32,
            (per_layer + i) as u32,
            config.stiffness.layer_link,
            SpringCategory::LayerLink,
        )?;
    }

    let topology = builder.build();
    log::info!(
        "Built cloth topology: {} vertices ({} fixed), {} springs",
        topology.vertex_count(),
        topology.fixed_count(),
        topology.spring_count()
    );
    Ok(topology)
}

fn is_pinned(rule: PinRule, ix: usize, iz: usize, columns: usize, rows: usize) -> bool {
    let on_x_edge = ix == 0 || ix == columns - 1;
    let on_z_edge = iz == 0 || iz == rows - 1;
    match rule {
        PinRule::Perimeter => on_x_edge || on_z_edge,
        PinRule::Corners => on_x_edge && on_z_edge,
        PinRule::Free => false,
    }
}

fn estimate_grid_springs(columns: usize, rows: usize) -> usize {
    let structural = (columns - 1) * rows + columns * (rows - 1);
    let shear = 2 * (columns - 1) * (rows - 1);
    let bending = columns.saturating_sub(2) * rows + columns * rows.saturating_sub(2);
    structural + shear + bending
}

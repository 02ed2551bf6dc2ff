//! Error taxonomy for cloth construction and configuration.
//!
//! Construction and configuration problems are reported eagerly and never
//! clamped. Numerical degeneracy during a tick is not an error (it is guarded
//! by epsilon floors inside the stages), and broken internal invariants panic.

/// Errors produced while building a cloth or loading its settings.
#[derive(Debug, thiserror::Error)]
pub enum ClothError {
    #[error("grid must have at least one segment along each axis (got {segments_x}x{segments_z})")]
    InvalidGrid { segments_x: u32, segments_z: u32 },

    #[error("cloth extent `{name}` must be positive and finite (got {value})")]
    InvalidExtent { name: &'static str, value: f32 },

    #[error("layer thickness must be positive and finite (got {0})")]
    InvalidThickness(f32),

    #[error("stiffness for {category} springs must be non-negative and finite (got {value})")]
    InvalidStiffness { category: &'static str, value: f32 },

    #[error("break threshold must be greater than 1.0 and finite (got {0})")]
    InvalidBreakThreshold(f32),

    #[error("spring endpoint {index} is out of range ({vertex_count} vertices)")]
    VertexOutOfRange { index: u32, vertex_count: usize },

    #[error("spring endpoints must differ (both are vertex {0})")]
    SelfLoop(u32),

    #[error("spring {a}-{b} rest length must be positive and finite (got {value})")]
    InvalidRestLength { a: u32, b: u32, value: f32 },

    #[error("damping must lie in (0, 1] (got {0})")]
    InvalidDamping(f32),

    #[error("probe {field} must be {requirement} (got {value})")]
    InvalidProbe {
        field: &'static str,
        requirement: &'static str,
        value: f32,
    },

    #[error("timestep `{name}` must be positive and finite (got {value})")]
    InvalidTimestep { name: &'static str, value: f32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON serialize error: {0}")]
    RonSerialize(#[from] ron::Error),
}

pub type Result<T> = std::result::Result<T, ClothError>;

//! Probe collision response.
//!
//! The probe is either a sphere (`height <= 0`) or a vertical cylinder hanging
//! down from `position` with a hemispherical cap at its lower end. The
//! response is a displacement the vertex stage adds straight into a vertex's
//! velocity accumulator, so a penetrating vertex is pushed back onto the
//! surface within the same tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ClothError, Result};

/// Lengths below this are treated as "no usable direction".
const DIRECTION_EPSILON: f32 = 1e-6;

/// Collision probe driven by the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    /// Sphere centre, or the top of the cylinder axis
    pub position: Vec3,
    pub radius: f32,
    /// 0 for a pure sphere, otherwise the cylinder length below `position`
    pub height: f32,
    pub enabled: bool,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.5, 0.0),
            radius: 0.15,
            height: 0.0,
            enabled: true,
        }
    }
}

impl Probe {
    pub fn sphere(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            radius,
            height: 0.0,
            enabled: true,
        }
    }

    /// A stylus-like probe: `top` is the upper end of the axis.
    pub fn capsule(top: Vec3, radius: f32, height: f32) -> Self {
        Self {
            position: top,
            radius,
            height,
            enabled: true,
        }
    }

    pub fn is_sphere(&self) -> bool {
        self.height <= 0.0
    }

    /// Centre of the lower hemispherical cap.
    pub fn bottom_center(&self) -> Vec3 {
        Vec3::new(
            self.position.x,
            self.position.y - self.height.max(0.0),
            self.position.z,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ClothError::InvalidProbe {
                field: "radius",
                requirement: "non-negative and finite",
                value: self.radius,
            });
        }
        if !self.height.is_finite() {
            return Err(ClothError::InvalidProbe {
                field: "height",
                requirement: "finite",
                value: self.height,
            });
        }
        Ok(())
    }
}

/// Displacement that moves `tentative` out of the probe, or zero.
///
/// Sphere mode pushes radially from the centre. Cylinder mode checks exactly
/// two mutually exclusive regions, split on `tentative.y`: the side band
/// `[bottom, top]` pushes horizontally away from the axis, and anything below
/// `bottom` is tested against the cap sphere. Points above `top` never collide.
#[inline]
pub fn collision_displacement(tentative: Vec3, probe: &Probe) -> Vec3 {
    if !probe.enabled {
        return Vec3::ZERO;
    }

    if probe.is_sphere() {
        return push_out_of_sphere(tentative, probe.position, probe.radius);
    }

    let top = probe.position.y;
    let bottom = top - probe.height;

    if tentative.y >= bottom && tentative.y <= top {
        let horizontal = Vec3::new(
            tentative.x - probe.position.x,
            0.0,
            tentative.z - probe.position.z,
        );
        let distance = horizontal.length();
        let penetration = probe.radius - distance;
        if penetration > 0.0 && distance > DIRECTION_EPSILON {
            return horizontal / distance * penetration;
        }
        Vec3::ZERO
    } else if tentative.y < bottom {
        push_out_of_sphere(tentative, probe.bottom_center(), probe.radius)
    } else {
        Vec3::ZERO
    }
}

#[inline]
fn push_out_of_sphere(point: Vec3, center: Vec3, radius: f32) -> Vec3 {
    let offset = point - center;
    let distance = offset.length();
    let penetration = radius - distance;
    if penetration > 0.0 && distance > DIRECTION_EPSILON {
        offset / distance * penetration
    } else {
        Vec3::ZERO
    }
}

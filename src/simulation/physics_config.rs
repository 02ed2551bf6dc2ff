use std::path::Path;

use glam::Vec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ClothError, Result};
use crate::simulation::collision::Probe;
use crate::simulation::topology::SpringCategory;

/// Which boundary vertices are pinned when the grid is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PinRule {
    /// Every vertex on the outer perimeter of either layer.
    #[default]
    Perimeter,
    /// Only the four corners of each layer.
    Corners,
    /// Nothing is pinned; the cloth falls freely.
    Free,
}

/// Base stiffness assigned to each spring category at build time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryStiffness {
    pub structural: f32,
    pub shear: f32,
    pub bending: f32,
    pub layer_link: f32,
}

impl Default for CategoryStiffness {
    fn default() -> Self {
        Self {
            structural: 0.2,
            shear: 0.2,
            bending: 0.05,
            layer_link: 0.2,
        }
    }
}

impl CategoryStiffness {
    pub fn for_category(&self, category: SpringCategory) -> f32 {
        match category {
            SpringCategory::Structural => self.structural,
            SpringCategory::Shear => self.shear,
            SpringCategory::Bending => self.bending,
            SpringCategory::LayerLink => self.layer_link,
        }
    }

    fn validate(&self) -> Result<()> {
        for category in SpringCategory::ALL {
            let value = self.for_category(category);
            if !value.is_finite() || value < 0.0 {
                return Err(ClothError::InvalidStiffness {
                    category: category.name(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Build-time description of the cloth.
///
/// Everything here is consumed once by [`build_topology`](crate::simulation::build_topology);
/// identical configs always produce identical topologies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClothConfig {
    /// Grid segments along X (vertices per row = segments_x + 1)
    pub segments_x: u32,
    /// Grid segments along Z
    pub segments_z: u32,
    /// Physical extent along X
    pub width: f32,
    /// Physical extent along Z
    pub depth: f32,
    /// Distance between the two layers along Y
    pub thickness: f32,
    pub stiffness: CategoryStiffness,
    /// Stretch ratio above which a breakable spring tears
    pub break_threshold: f32,
    pub breakage_enabled: bool,
    pub pin_rule: PinRule,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            segments_x: 30,
            segments_z: 30,
            width: 1.0,
            depth: 1.0,
            thickness: 0.02,
            stiffness: CategoryStiffness::default(),
            break_threshold: 1.9,
            breakage_enabled: true,
            pin_rule: PinRule::Perimeter,
        }
    }
}

impl ClothConfig {
    /// Reject any field outside its valid range. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if self.segments_x == 0 || self.segments_z == 0 {
            return Err(ClothError::InvalidGrid {
                segments_x: self.segments_x,
                segments_z: self.segments_z,
            });
        }
        for (name, value) in [("width", self.width), ("depth", self.depth)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ClothError::InvalidExtent { name, value });
            }
        }
        if !self.thickness.is_finite() || self.thickness <= 0.0 {
            return Err(ClothError::InvalidThickness(self.thickness));
        }
        self.stiffness.validate()?;
        if !self.break_threshold.is_finite() || self.break_threshold <= 1.0 {
            return Err(ClothError::InvalidBreakThreshold(self.break_threshold));
        }
        Ok(())
    }

    /// Vertices in one layer.
    pub fn vertices_per_layer(&self) -> usize {
        (self.segments_x as usize + 1) * (self.segments_z as usize + 1)
    }

    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = parse_ron(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_ron_str(&std::fs::read_to_string(path)?)
    }
}

/// Runtime scale applied on top of each spring's stored stiffness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StiffnessMultipliers {
    pub structural: f32,
    pub shear: f32,
    pub bending: f32,
    pub layer_link: f32,
}

impl Default for StiffnessMultipliers {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

impl StiffnessMultipliers {
    pub fn uniform(value: f32) -> Self {
        Self {
            structural: value,
            shear: value,
            bending: value,
            layer_link: value,
        }
    }

    #[inline]
    pub fn for_category(&self, category: SpringCategory) -> f32 {
        match category {
            SpringCategory::Structural => self.structural,
            SpringCategory::Shear => self.shear,
            SpringCategory::Bending => self.bending,
            SpringCategory::LayerLink => self.layer_link,
        }
    }
}

/// Parameters read by every tick. May change between ticks.
///
/// There is no explicit timestep or mass: the velocity accumulator is an
/// unscaled per-tick displacement, so `gravity`, `wind` and the stiffnesses
/// are already expressed per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlParameters {
    /// Per-tick velocity decay multiplier in (0, 1]
    pub damping: f32,
    /// Total downward pull of the whole cloth, divided evenly between vertices
    pub gravity: f32,
    /// Total constant external push of the whole cloth, divided like gravity
    pub wind: Vec3,
    pub stiffness_multipliers: StiffnessMultipliers,
    pub probe: Probe,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            damping: 0.99,
            gravity: 0.1,
            wind: Vec3::ZERO,
            stiffness_multipliers: StiffnessMultipliers::default(),
            probe: Probe::default(),
        }
    }
}

impl ControlParameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ClothError::InvalidDamping(self.damping));
        }
        self.probe.validate()
    }

    pub fn from_ron_str(source: &str) -> Result<Self> {
        let controls: Self = parse_ron(source)?;
        controls.validate()?;
        Ok(controls)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_ron_str(&std::fs::read_to_string(path)?)
    }
}

/// Real-time driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Simulated seconds per tick (60 Hz)
    pub fixed_timestep: f32,
    /// Longest wall-clock frame delta that is honoured; longer frames are cut
    pub max_frame_delta: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_frame_delta: 1.0 / 15.0,
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fixed_timestep", self.fixed_timestep),
            ("max_frame_delta", self.max_frame_delta),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ClothError::InvalidTimestep { name, value });
            }
        }
        Ok(())
    }
}

/// Everything the runner needs, as a single RON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub cloth: ClothConfig,
    pub controls: ControlParameters,
    pub clock: ClockConfig,
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<()> {
        self.cloth.validate()?;
        self.controls.validate()?;
        self.clock.validate()
    }

    pub fn from_ron_str(source: &str) -> Result<Self> {
        let settings: Self = parse_ron(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Self::from_ron_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded simulation settings from {:?}", path);
        Ok(settings)
    }

    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

fn parse_ron<T: DeserializeOwned>(source: &str) -> Result<T> {
    Ok(ron::from_str(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(SimulationSettings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_segments_rejected() {
        let config = ClothConfig {
            segments_x: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClothError::InvalidGrid { segments_x: 0, .. })
        ));
    }

    #[test]
    fn test_non_positive_thickness_rejected() {
        for thickness in [0.0, -0.01, f32::NAN] {
            let config = ClothConfig {
                thickness,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ClothError::InvalidThickness(_))),
                "thickness {} should be rejected",
                thickness
            );
        }
    }

    #[test]
    fn test_negative_extent_rejected() {
        let config = ClothConfig {
            depth: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClothError::InvalidExtent { name: "depth", .. })
        ));
    }

    #[test]
    fn test_negative_stiffness_rejected() {
        let mut config = ClothConfig::default();
        config.stiffness.bending = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ClothError::InvalidStiffness { category: "bending", .. })
        ));
    }

    #[test]
    fn test_break_threshold_must_exceed_one() {
        let config = ClothConfig {
            break_threshold: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClothError::InvalidBreakThreshold(_))
        ));
    }

    #[test]
    fn test_damping_range() {
        let mut controls = ControlParameters::default();
        controls.damping = 1.0;
        assert!(controls.validate().is_ok());
        controls.damping = 0.0;
        assert!(matches!(controls.validate(), Err(ClothError::InvalidDamping(_))));
        controls.damping = 1.5;
        assert!(matches!(controls.validate(), Err(ClothError::InvalidDamping(_))));
    }

    #[test]
    fn test_clock_rejects_zero_timestep() {
        let clock = ClockConfig {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            clock.validate(),
            Err(ClothError::InvalidTimestep { name: "fixed_timestep", .. })
        ));
    }

    #[test]
    fn test_partial_ron_falls_back_to_defaults() {
        let config = ClothConfig::from_ron_str("(segments_x: 8, segments_z: 4, thickness: 0.05)")
            .expect("partial config should parse");
        assert_eq!(config.segments_x, 8);
        assert_eq!(config.segments_z, 4);
        assert_eq!(config.thickness, 0.05);
        assert_eq!(config.width, ClothConfig::default().width);
        assert_eq!(config.pin_rule, PinRule::Perimeter);
    }

    #[test]
    fn test_invalid_ron_values_are_rejected_after_parsing() {
        let result = ClothConfig::from_ron_str("(segments_x: 0)");
        assert!(matches!(result, Err(ClothError::InvalidGrid { .. })));
    }

    #[test]
    fn test_malformed_ron_reports_parse_error() {
        let result = ControlParameters::from_ron_str("(damping: )");
        assert!(matches!(result, Err(ClothError::Ron(_))));
    }

    #[test]
    fn test_settings_survive_ron_round_trip() {
        let mut settings = SimulationSettings::default();
        settings.cloth.pin_rule = PinRule::Corners;
        settings.controls.stiffness_multipliers.layer_link = 0.5;
        settings.controls.probe.height = 0.3;

        let text = settings.to_ron_string().expect("settings should serialize");
        let parsed = SimulationSettings::from_ron_str(&text).expect("settings should parse");
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_shipped_settings_file_parses() {
        let settings = SimulationSettings::from_ron_str(include_str!("../../cloth.ron"))
            .expect("cloth.ron should parse");
        assert_eq!(settings.cloth.segments_x, 40);
        assert_eq!(settings.controls.probe.height, 0.4);
        assert_eq!(settings.controls.wind, Vec3::ZERO);
    }
}

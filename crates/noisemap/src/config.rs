//! Compute configuration: one serde-friendly struct covering ground,
//! reflection, diffraction, summation and atmosphere switches, with
//! conversions into the core's tracer and summation configs.

use serde::{Deserialize, Deserializer, Serialize};

use noisemap_acoustics::attenuation::{AtmosphericModel, BarrierKind};
use noisemap_acoustics::summation::SummationConfig;
use noisemap_acoustics::surface::{GroundParams, GroundType, SurfaceType};
use noisemap_acoustics::tracer::{SideDiffractionMode, TracerConfig};
use noisemap_acoustics::speed_of_sound;

use crate::error::Result;

/// Per-request compute configuration. Every field has a default so sparse
/// JSON documents work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeConfig {
    #[serde(default = "default_true")]
    pub ground_reflection: bool,
    #[serde(default = "default_ground_type")]
    pub ground_type: GroundType,
    /// For mixed ground: 0 = hard, 1 = soft.
    #[serde(default = "default_ground_mixed_factor")]
    pub ground_mixed_factor: f64,
    /// Flow resistivity of the soft ground fraction, Pa·s/m².
    #[serde(default = "default_flow_resistivity")]
    pub flow_resistivity: f64,
    #[serde(default = "default_true")]
    pub wall_reflections: bool,
    #[serde(default = "default_true")]
    pub barrier_diffraction: bool,
    #[serde(default = "default_true")]
    pub coherent_summation: bool,
    /// Accepts `"none"`/`"simple"`/`"iso9613"`, or a plain boolean:
    /// `true` means the full ISO model, `false` disables absorption.
    #[serde(default, deserialize_with = "de_atmospheric")]
    pub atmospheric_absorption: AtmosphericModel,
    /// Air temperature, °C.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Relative humidity, 0–100 %.
    #[serde(default = "default_humidity")]
    pub humidity: f64,
    /// Ambient pressure, kPa.
    #[serde(default = "default_pressure")]
    pub pressure_kpa: f64,
    /// Override; derived from temperature when absent.
    #[serde(default)]
    pub speed_of_sound: Option<f64>,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default)]
    pub barrier_kind: BarrierKind,
    #[serde(default = "default_side_diffraction")]
    pub side_diffraction: SideDiffractionMode,
    #[serde(default = "default_side_diffraction_max_length")]
    pub side_diffraction_max_length: f64,
    /// Detour threshold for barriers that do not block line of sight, m.
    #[serde(default = "default_diffraction_proximity")]
    pub diffraction_proximity: f64,
    /// Attach per-path detail to results (for visualization).
    #[serde(default)]
    pub include_paths: bool,
}

fn de_atmospheric<'de, D>(deserializer: D) -> std::result::Result<AtmosphericModel, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Switch(bool),
        Model(AtmosphericModel),
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::Switch(true) => AtmosphericModel::Iso9613,
        Repr::Switch(false) => AtmosphericModel::None,
        Repr::Model(model) => model,
    })
}

fn default_true() -> bool {
    true
}
fn default_ground_type() -> GroundType {
    SurfaceType::Soft
}
fn default_ground_mixed_factor() -> f64 {
    0.5
}
fn default_flow_resistivity() -> f64 {
    200_000.0
}
fn default_temperature() -> f64 {
    20.0
}
fn default_humidity() -> f64 {
    50.0
}
fn default_pressure() -> f64 {
    101.325
}
fn default_max_distance() -> f64 {
    2000.0
}
fn default_side_diffraction() -> SideDiffractionMode {
    SideDiffractionMode::Auto
}
fn default_side_diffraction_max_length() -> f64 {
    50.0
}
fn default_diffraction_proximity() -> f64 {
    5.0
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            ground_reflection: true,
            ground_type: default_ground_type(),
            ground_mixed_factor: default_ground_mixed_factor(),
            flow_resistivity: default_flow_resistivity(),
            wall_reflections: true,
            barrier_diffraction: true,
            coherent_summation: true,
            atmospheric_absorption: AtmosphericModel::default(),
            temperature: default_temperature(),
            humidity: default_humidity(),
            pressure_kpa: default_pressure(),
            speed_of_sound: None,
            max_distance: default_max_distance(),
            barrier_kind: BarrierKind::default(),
            side_diffraction: default_side_diffraction(),
            side_diffraction_max_length: default_side_diffraction_max_length(),
            diffraction_proximity: default_diffraction_proximity(),
            include_paths: false,
        }
    }
}

impl ComputeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Effective speed of sound: the explicit override or the
    /// temperature-derived value.
    pub fn effective_speed_of_sound(&self) -> f64 {
        self.speed_of_sound
            .unwrap_or_else(|| speed_of_sound(self.temperature))
    }

    pub fn ground_params(&self) -> GroundParams {
        GroundParams::new(
            self.ground_type,
            self.flow_resistivity,
            self.ground_mixed_factor,
        )
    }

    pub fn tracer_config(&self) -> TracerConfig {
        TracerConfig {
            ground_reflection: self.ground_reflection,
            wall_reflections: self.wall_reflections,
            barrier_diffraction: self.barrier_diffraction,
            diffraction_proximity: self.diffraction_proximity,
            side_diffraction: self.side_diffraction,
            side_diffraction_max_length: self.side_diffraction_max_length,
            max_distance: self.max_distance,
        }
    }

    pub fn summation_config(&self) -> SummationConfig {
        SummationConfig {
            coherent: self.coherent_summation,
            speed_of_sound: self.effective_speed_of_sound(),
            atmospheric: self.atmospheric_absorption,
            temperature_c: self.temperature,
            humidity_pct: self.humidity,
            pressure_kpa: self.pressure_kpa,
            ground: self.ground_params(),
            barrier_kind: self.barrier_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = ComputeConfig::from_json("{}").expect("parse");
        assert_eq!(config, ComputeConfig::default());
        assert!(config.coherent_summation);
        assert_eq!(config.max_distance, 2000.0);
        assert_eq!(config.atmospheric_absorption, AtmosphericModel::Iso9613);
    }

    #[test]
    fn test_speed_of_sound_derivation() {
        let config = ComputeConfig {
            temperature: 20.0,
            ..ComputeConfig::default()
        };
        assert!((config.effective_speed_of_sound() - 343.2).abs() < 0.5);

        let fixed = ComputeConfig {
            speed_of_sound: Some(340.0),
            ..ComputeConfig::default()
        };
        assert_eq!(fixed.effective_speed_of_sound(), 340.0);
    }

    #[test]
    fn test_atmospheric_accepts_booleans() {
        let on = ComputeConfig::from_json(r#"{"atmospheric_absorption": true}"#).expect("parse");
        assert_eq!(on.atmospheric_absorption, AtmosphericModel::Iso9613);
        let off = ComputeConfig::from_json(r#"{"atmospheric_absorption": false}"#).expect("parse");
        assert_eq!(off.atmospheric_absorption, AtmosphericModel::None);
        // The string forms keep working alongside.
        let simple =
            ComputeConfig::from_json(r#"{"atmospheric_absorption": "simple"}"#).expect("parse");
        assert_eq!(simple.atmospheric_absorption, AtmosphericModel::Simple);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = ComputeConfig::from_json(
            r#"{"atmospheric_absorption": "simple", "temperature": 5.0, "coherent_summation": false}"#,
        )
        .expect("parse");
        assert_eq!(config.atmospheric_absorption, AtmosphericModel::Simple);
        assert_eq!(config.temperature, 5.0);
        assert!(!config.coherent_summation);
        // Untouched fields keep their defaults.
        assert!(config.ground_reflection);
    }
}

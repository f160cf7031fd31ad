//! Workpiece materials, machining operations and their physical constants.
//!
//! The tables here are the only source of material- and operation-specific
//! numbers used by [`crate::process`].

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

/// Workpiece material selected when a job is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    #[serde(rename = "Mild Steel")]
    MildSteel,
    Aluminum,
    Wood,
    /// Operator-defined material. Has no process profile and cannot be
    /// simulated.
    Custom,
}

impl Material {
    pub const ALL: [Material; 4] = [
        Material::MildSteel,
        Material::Aluminum,
        Material::Wood,
        Material::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Material::MildSteel => "Mild Steel",
            Material::Aluminum => "Aluminum",
            Material::Wood => "Wood",
            Material::Custom => "Custom",
        }
    }

    /// Physical constants for this material, if it can be simulated.
    pub fn profile(&self) -> Option<&'static MaterialProfile> {
        match self {
            Material::MildSteel => Some(&MILD_STEEL),
            Material::Aluminum => Some(&ALUMINUM),
            Material::Wood => Some(&WOOD),
            Material::Custom => None,
        }
    }

    /// Like [`Material::profile`] but reports a validation error for
    /// materials without a profile.
    pub fn require_profile(&self) -> Result<&'static MaterialProfile, CoreError> {
        self.profile().ok_or_else(|| {
            CoreError::Validation(format!(
                "Material '{}' has no process profile and cannot be simulated",
                self.as_str()
            ))
        })
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Material {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Material::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown material: '{s}'")))
    }
}

/// Material-specific constants driving the process model.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProfile {
    /// Range the per-job base spindle speed is drawn from (rpm).
    pub base_rpm: RangeInclusive<u32>,
    /// Ambient air temperature around the machine (K).
    pub base_air_temp_k: f64,
    /// Multiplier applied to air temperature to get the baseline process
    /// temperature.
    pub process_temp_multiplier: f64,
    /// Scales the operation's base torque.
    pub torque_factor: f64,
    /// Tool wear accumulated per minute of cutting.
    pub tool_wear_rate: f64,
}

const MILD_STEEL: MaterialProfile = MaterialProfile {
    base_rpm: 800..=1200,
    base_air_temp_k: 298.0,
    process_temp_multiplier: 1.8,
    torque_factor: 1.2,
    tool_wear_rate: 0.25,
};

const ALUMINUM: MaterialProfile = MaterialProfile {
    base_rpm: 1500..=2500,
    base_air_temp_k: 295.0,
    process_temp_multiplier: 1.4,
    torque_factor: 0.8,
    tool_wear_rate: 0.15,
};

const WOOD: MaterialProfile = MaterialProfile {
    base_rpm: 2800..=3500,
    base_air_temp_k: 293.0,
    process_temp_multiplier: 1.1,
    torque_factor: 0.3,
    tool_wear_rate: 0.05,
};

// ---------------------------------------------------------------------------
// Job type
// ---------------------------------------------------------------------------

/// Lathe operation performed by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Turning,
    Facing,
    Threading,
    Drilling,
    Boring,
    Knurling,
}

impl JobType {
    pub const ALL: [JobType; 6] = [
        JobType::Turning,
        JobType::Facing,
        JobType::Threading,
        JobType::Drilling,
        JobType::Boring,
        JobType::Knurling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Turning => "turning",
            JobType::Facing => "facing",
            JobType::Threading => "threading",
            JobType::Drilling => "drilling",
            JobType::Boring => "boring",
            JobType::Knurling => "knurling",
        }
    }

    /// Base cutting torque range for this operation (Nm), before material
    /// and tool-size scaling.
    pub fn base_torque_range(&self) -> (f64, f64) {
        match self {
            JobType::Turning => (15.0, 25.0),
            JobType::Facing => (20.0, 35.0),
            JobType::Threading => (10.0, 20.0),
            JobType::Drilling => (25.0, 45.0),
            JobType::Boring => (18.0, 30.0),
            JobType::Knurling => (12.0, 22.0),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job type: '{s}'")))
    }
}

/// Tool diameter in millimetres for a tool number.
pub fn tool_diameter_mm(tool_number: u32) -> f64 {
    10.0 + f64::from(tool_number) * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_round_trips_through_str() {
        for m in Material::ALL {
            assert_eq!(m.as_str().parse::<Material>().unwrap(), m);
        }
        assert!("Titanium".parse::<Material>().is_err());
    }

    #[test]
    fn material_serializes_with_display_names() {
        let json = serde_json::to_string(&Material::MildSteel).unwrap();
        assert_eq!(json, "\"Mild Steel\"");
        let parsed: Material = serde_json::from_str("\"Aluminum\"").unwrap();
        assert_eq!(parsed, Material::Aluminum);
    }

    #[test]
    fn custom_material_has_no_profile() {
        assert!(Material::Custom.profile().is_none());
        assert!(matches!(
            Material::Custom.require_profile(),
            Err(CoreError::Validation(_))
        ));
        assert!(Material::Wood.require_profile().is_ok());
    }

    #[test]
    fn job_type_parses_lowercase_names() {
        assert_eq!("drilling".parse::<JobType>().unwrap(), JobType::Drilling);
        assert!("Drilling".parse::<JobType>().is_err());
    }

    #[test]
    fn torque_ranges_are_ordered() {
        for t in JobType::ALL {
            let (lo, hi) = t.base_torque_range();
            assert!(lo < hi, "{t} torque range is inverted");
        }
    }

    #[test]
    fn tool_diameter_grows_two_mm_per_tool_number() {
        assert_eq!(tool_diameter_mm(0), 10.0);
        assert_eq!(tool_diameter_mm(3), 16.0);
    }
}

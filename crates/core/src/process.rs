//! Physical process model for a single lathe job.
//!
//! A [`ProcessModel`] is built once when a job starts: it draws the job's
//! base spindle speed and base torque and then turns elapsed cutting time
//! into instantaneous [`Reading`]s. The wear trend is deterministic in the
//! elapsed time; every noise term is an independent draw per reading.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::material::{tool_diameter_mm, JobType, Material, MaterialProfile};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Tool wear saturates at this fraction of the job's estimated duration.
pub const MAX_WEAR_FRACTION: f64 = 0.8;

/// Spindle speed never drops below this (rpm).
pub const RPM_FLOOR: f64 = 100.0;

/// Torque never drops below this (Nm).
pub const TORQUE_FLOOR: f64 = 5.0;

/// Air temperature bounds (K).
pub const AIR_TEMP_MIN_K: f64 = 273.0;
pub const AIR_TEMP_MAX_K: f64 = 313.0;

/// Process temperature is at least this far above air temperature (K).
pub const PROCESS_TEMP_MIN_RISE_K: f64 = 50.0;

/// Process temperature upper bound (K).
pub const PROCESS_TEMP_MAX_K: f64 = 1073.0;

const RPM_NOISE_SIGMA: f64 = 0.03;
const TORQUE_NOISE_SIGMA: f64 = 0.08;
const AIR_TEMP_NOISE_SIGMA: f64 = 3.0;
const PROCESS_TEMP_NOISE_SIGMA: f64 = 10.0;

/// Torque grows by up to this fraction as the tool wears out.
const TORQUE_WEAR_GROWTH: f64 = 0.4;

/// Heat contributed by cutting power: `torque * rpm / 1000 * 15`.
const MACHINING_HEAT_FACTOR: f64 = 15.0;

/// Heat contributed per minute of tool wear.
const WEAR_HEAT_FACTOR: f64 = 8.0;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One instantaneous set of physical readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Kelvin.
    pub air_temperature: f64,
    /// Kelvin.
    pub process_temperature: f64,
    /// rpm.
    pub rotational_speed: f64,
    /// Nm.
    pub torque: f64,
    /// Minutes of effective wear.
    pub tool_wear: f64,
}

impl Reading {
    /// Feature vector in the fixed order expected by scorers:
    /// air temperature, process temperature, rpm, torque, tool wear.
    pub fn features(&self) -> [f64; 5] {
        [
            self.air_temperature,
            self.process_temperature,
            self.rotational_speed,
            self.torque,
            self.tool_wear,
        ]
    }
}

// ---------------------------------------------------------------------------
// ProcessModel
// ---------------------------------------------------------------------------

/// Per-job process model with its baseline constants fixed at creation.
#[derive(Debug, Clone)]
pub struct ProcessModel {
    profile: &'static MaterialProfile,
    duration_minutes: f64,
    base_rpm: f64,
    base_torque: f64,
}

impl ProcessModel {
    /// Draw the job's baseline constants.
    ///
    /// Fails for materials without a profile and for non-positive or
    /// non-finite durations.
    pub fn new<R: Rng + ?Sized>(
        material: Material,
        job_type: JobType,
        tool_number: u32,
        duration_minutes: f64,
        rng: &mut R,
    ) -> Result<Self, CoreError> {
        let profile = material.require_profile()?;
        validate_duration(duration_minutes)?;

        let base_rpm = f64::from(rng.random_range(profile.base_rpm.clone()));
        let (lo, hi) = job_type.base_torque_range();
        let base_torque = rng.random_range(lo..=hi)
            * profile.torque_factor
            * (tool_diameter_mm(tool_number) / 10.0);

        Ok(Self {
            profile,
            duration_minutes,
            base_rpm,
            base_torque,
        })
    }

    /// Build a model with explicit baseline constants.
    pub fn with_baseline(
        material: Material,
        duration_minutes: f64,
        base_rpm: f64,
        base_torque: f64,
    ) -> Result<Self, CoreError> {
        let profile = material.require_profile()?;
        validate_duration(duration_minutes)?;
        Ok(Self {
            profile,
            duration_minutes,
            base_rpm,
            base_torque,
        })
    }

    pub fn base_rpm(&self) -> f64 {
        self.base_rpm
    }

    pub fn base_torque(&self) -> f64 {
        self.base_torque
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    /// Upper bound on tool wear for this job.
    pub fn max_tool_wear(&self) -> f64 {
        MAX_WEAR_FRACTION * self.duration_minutes
    }

    /// Tool wear after `elapsed_minutes` of cutting.
    pub fn tool_wear(&self, elapsed_minutes: f64) -> f64 {
        (self.profile.tool_wear_rate * elapsed_minutes.max(0.0)).min(self.max_tool_wear())
    }

    /// Compute one reading at `elapsed_minutes` since job start.
    ///
    /// Values are rounded the way samples are stored (temperatures, torque
    /// and wear to 2 decimals, rpm to 1) and the bounds are enforced on
    /// the rounded values.
    pub fn reading<R: Rng + ?Sized>(&self, elapsed_minutes: f64, rng: &mut R) -> Reading {
        let wear = self.tool_wear(elapsed_minutes);

        let wear_factor = 1.0 - wear / (self.duration_minutes * 2.0);
        let rpm = (self.base_rpm * wear_factor * gaussian(rng, 1.0, RPM_NOISE_SIGMA))
            .max(RPM_FLOOR);

        let growth = 1.0 + (wear / self.duration_minutes) * TORQUE_WEAR_GROWTH;
        let torque = (self.base_torque * growth * gaussian(rng, 1.0, TORQUE_NOISE_SIGMA))
            .max(TORQUE_FLOOR);

        let air = (self.profile.base_air_temp_k + gaussian(rng, 0.0, AIR_TEMP_NOISE_SIGMA))
            .clamp(AIR_TEMP_MIN_K, AIR_TEMP_MAX_K);

        let machining_heat = (torque * rpm / 1000.0) * MACHINING_HEAT_FACTOR;
        let wear_heat = wear * WEAR_HEAT_FACTOR;
        let process = (air * self.profile.process_temp_multiplier
            + machining_heat
            + wear_heat
            + gaussian(rng, 0.0, PROCESS_TEMP_NOISE_SIGMA))
        .clamp(air + PROCESS_TEMP_MIN_RISE_K, PROCESS_TEMP_MAX_K);

        let air = round_to(air, 2).clamp(AIR_TEMP_MIN_K, AIR_TEMP_MAX_K);
        let process =
            round_to(process, 2).clamp(air + PROCESS_TEMP_MIN_RISE_K, PROCESS_TEMP_MAX_K);

        Reading {
            air_temperature: air,
            process_temperature: process,
            rotational_speed: round_to(rpm, 1).max(RPM_FLOOR),
            torque: round_to(torque, 2).max(TORQUE_FLOOR),
            tool_wear: round_to(wear, 2).min(self.max_tool_wear()),
        }
    }
}

fn validate_duration(duration_minutes: f64) -> Result<(), CoreError> {
    if duration_minutes.is_finite() && duration_minutes > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Estimated duration must be a positive number of minutes, got {duration_minutes}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Draw from N(mean, std) using the Box-Muller transform.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

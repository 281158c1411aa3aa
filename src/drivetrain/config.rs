use num_traits::Float;
use serde::Deserialize;
use snafu::ensure;

use crate::{error, Result};

/// Tuning for the drivetrain controller.
///
/// Missing fields fall back to [`Default`], so a config file only needs the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrivetrainConfig {
    /// Heading-hold gains. Error is in degrees, output in percent of full power.
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub kf: f64,
    /// `on_target` holds while the heading error is within this many degrees.
    pub tolerance_degrees: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// The integral only accumulates while the error is within this many degrees.
    pub integral_band_degrees: f64,
    /// Limit on profile velocity setpoints, in native units per 100 ms.
    pub max_velocity: f64,
    /// Limit on the magnitude of profile position setpoints, in native units.
    pub max_position: Option<f64>,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            kp: 0.05,
            ki: 0.0,
            kd: 0.05,
            kf: 0.0,
            tolerance_degrees: 2.0,
            output_min: -1.0,
            output_max: 1.0,
            integral_band_degrees: 10.0,
            max_velocity: 5200.0,
            max_position: None,
        }
    }
}

impl DrivetrainConfig {
    /// Check that every value can be used as configured.
    ///
    /// The controller never panics on a config that fails this check, but it
    /// falls back to [`DrivetrainConfig::output_range`] and the other sanitised
    /// limits, which may not be what was intended.
    pub fn validate(&self) -> Result {
        for (field, gain) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd), ("kf", self.kf)] {
            ensure!(
                gain.is_finite(),
                error::InvalidConfigSnafu {
                    field,
                    reason: "must be finite"
                }
            );
        }
        ensure!(
            self.output_min.is_finite() && self.output_max.is_finite(),
            error::InvalidConfigSnafu {
                field: "output_min/output_max",
                reason: "must be finite"
            }
        );
        ensure!(
            self.output_min <= self.output_max,
            error::InvalidConfigSnafu {
                field: "output_min",
                reason: "must not exceed output_max"
            }
        );
        let limits = [
            ("tolerance_degrees", Some(self.tolerance_degrees)),
            ("integral_band_degrees", Some(self.integral_band_degrees)),
            ("max_velocity", Some(self.max_velocity)),
            ("max_position", self.max_position),
        ];
        for (field, limit) in limits {
            if let Some(limit) = limit {
                ensure!(
                    limit >= 0.0,
                    error::InvalidConfigSnafu {
                        field,
                        reason: "must be zero or positive"
                    }
                );
            }
        }
        Ok(())
    }

    /// Correction bounds in order. Non-finite bounds fall back to full power.
    pub fn output_range(&self) -> (f64, f64) {
        let min = if self.output_min.is_finite() {
            self.output_min
        } else {
            -1.0
        };
        let max = if self.output_max.is_finite() {
            self.output_max
        } else {
            1.0
        };
        (min.min(max), min.max(max))
    }

    pub fn velocity_limit(&self) -> f64 {
        magnitude(self.max_velocity)
    }

    pub fn position_limit(&self) -> Option<f64> {
        self.max_position.map(magnitude)
    }
}

/// A limit's magnitude; NaN allows nothing through.
fn magnitude(limit: f64) -> f64 {
    if limit.is_nan() {
        0.0
    } else {
        Float::abs(limit)
    }
}

//! Heading-hold PID loop.
//!
//! The loop runs once per scheduler tick, so the derivative is a plain
//! backward difference and the integral a plain sum; the tick period is folded
//! into the gains.

use num_traits::Float;

use super::{config::DrivetrainConfig, heading::angle_difference};

#[derive(Debug, Clone)]
pub struct HeadingPid {
    kp: f64,
    ki: f64,
    kd: f64,
    kf: f64,
    output_min: f64,
    output_max: f64,
    tolerance: f64,
    integral_band: f64,
    setpoint: f64,
    integral: f64,
    previous_error: f64,
    output: f64,
    enabled: bool,
}

impl HeadingPid {
    pub fn new(config: &DrivetrainConfig) -> Self {
        let (output_min, output_max) = config.output_range();
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            kf: config.kf,
            output_min,
            output_max,
            tolerance: config.tolerance_degrees,
            integral_band: config.integral_band_degrees,
            setpoint: 0.0,
            integral: 0.0,
            previous_error: 0.0,
            output: 0.0,
            enabled: false,
        }
    }

    /// Start holding `setpoint`, clearing any state from a previous hold.
    pub fn enable(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.output = 0.0;
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.integral = 0.0;
        self.output = 0.0;
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compute the correction for one tick. Returns zero while disabled.
    ///
    /// A non-finite heading yields no correction and leaves the error history
    /// and integral untouched, so the next good reading carries on from the
    /// last one.
    pub fn calculate(&mut self, heading: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        if !heading.is_finite() {
            self.output = 0.0;
            return 0.0;
        }

        let error = angle_difference(heading, self.setpoint);
        let derivative = error - self.previous_error;

        let mut integral = self.integral;
        if Float::abs(error) <= self.integral_band {
            integral += error;
        }

        let unclamped = self.kf * self.setpoint
            + self.kp * error
            + self.ki * integral
            + self.kd * derivative;
        let output = unclamped.clamp(self.output_min, self.output_max);

        // Saturated and still pushing the same way: keep the old integral.
        let winding_up = output != unclamped && (unclamped > 0.0) == (error > 0.0);
        if !winding_up {
            self.integral = integral;
        }

        self.previous_error = error;
        self.output = output;
        output
    }

    /// The most recent wrapped error.
    pub fn error(&self) -> f64 {
        self.previous_error
    }

    pub fn on_target(&self) -> bool {
        Float::abs(self.previous_error) <= self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// The last computed correction, or zero while disabled.
    pub fn output(&self) -> f64 {
        self.output
    }
}

//! Differential drivetrain with heading hold.
//!
//! [`DrivetrainController`] turns drive intents into left/right actuation. In
//! raw mode the outputs pass straight through. In heading-hold mode a PID
//! loop keeps the robot on the heading it had when the hold began, adding its
//! correction to one side and taking it from the other.
//!
//! If the heading sensor cannot be brought up, the controller still
//! constructs but stays in a degraded mode where every drive call is raw.

use alloc::format;
use core::fmt::{self, Debug, Formatter};

use log::{error, info, warn};
use snafu::ensure;

use crate::{
    error,
    subsystem::Subsystem,
    telemetry::{Diagnostics, Telemetry},
    Result,
};

pub mod commands;
pub mod config;
pub mod heading;
pub mod pid;
pub mod profile;

pub use config::DrivetrainConfig;
pub use heading::{HeadingSource, YawSensor};
use pid::HeadingPid;
use profile::ProfileSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// How a motor controller interprets a setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Fraction of available voltage, `-1.0..=1.0`.
    PercentOutput,
    /// Native units per 100 ms, closed-loop on the motor controller.
    Velocity,
    /// Native encoder units, closed-loop on the motor controller.
    Position,
}

/// The motor controllers driving each side.
///
/// Implementors own current limiting and voltage compensation; the controller
/// never issues values outside the configured bounds.
pub trait DriveOutput {
    fn set_output(&mut self, side: Side, mode: ControlMode, value: f64) -> Result;
    fn encoder_position(&self, side: Side) -> Result<i32>;
}

pub struct DrivetrainController<O, S> {
    output: O,
    heading: Option<HeadingSource<S>>,
    pid: HeadingPid,
    config: DrivetrainConfig,
    last_output: (f64, f64),
}

impl<O: DriveOutput, S: YawSensor> DrivetrainController<O, S> {
    /// Build the controller around already configured hardware.
    ///
    /// A failed `sensor` is reported to `diagnostics` and leaves the
    /// controller permanently degraded instead of failing construction.
    pub fn new(
        config: DrivetrainConfig,
        output: O,
        sensor: Result<S>,
        diagnostics: &mut dyn Diagnostics,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("falling back to sanitised drivetrain limits");
            diagnostics.report_error(&format!("{}", e));
        }

        let heading = match sensor {
            Ok(sensor) => Some(HeadingSource::new(sensor)),
            Err(e) => {
                error!("heading sensor unavailable, heading hold disabled");
                diagnostics.report_error(&format!("Error instantiating heading sensor: {}", e));
                None
            }
        };

        Self {
            output,
            heading,
            pid: HeadingPid::new(&config),
            config,
            last_output: (0.0, 0.0),
        }
    }

    /// True when the heading sensor failed and only raw driving is available.
    pub fn is_degraded(&self) -> bool {
        self.heading.is_none()
    }

    /// Drive each side at a fraction of full power, clamped to `-1.0..=1.0`.
    ///
    /// Heading hold stays enabled if it was; call
    /// [`DrivetrainController::disable_heading_hold`] when switching modes.
    pub fn set_raw_output(&mut self, left: f64, right: f64) -> Result {
        let left = finite_or_zero(left).clamp(-1.0, 1.0);
        let right = finite_or_zero(right).clamp(-1.0, 1.0);
        self.output.set_output(Side::Left, ControlMode::PercentOutput, left)?;
        self.output.set_output(Side::Right, ControlMode::PercentOutput, right)?;
        self.last_output = (left, right);
        Ok(())
    }

    /// Drive at `magnitude` while holding the heading captured on the first call.
    ///
    /// Call once per tick. Degraded controllers drive both sides at `magnitude`.
    pub fn drive_straight(&mut self, magnitude: f64) -> Result {
        let heading = match self.heading.as_ref() {
            Some(source) => source.heading()?,
            None => return self.set_raw_output(magnitude, magnitude),
        };
        if !heading.is_finite() {
            warn!("ignoring non-finite heading reading {}", heading);
            return self.set_raw_output(magnitude, magnitude);
        }
        if !self.pid.is_enabled() {
            info!("heading hold enabled at {:.1} degrees", heading);
            self.pid.enable(heading);
        }

        let correction = self.pid.calculate(heading);
        self.set_raw_output(magnitude + correction, magnitude - correction)
    }

    pub fn disable_heading_hold(&mut self) {
        if self.pid.is_enabled() {
            info!("heading hold disabled");
        }
        self.pid.disable();
    }

    pub fn heading_hold_enabled(&self) -> bool {
        self.pid.is_enabled()
    }

    /// True while the most recent heading error is within tolerance. Always
    /// false when degraded, since the heading is unknown.
    pub fn on_target(&self) -> bool {
        !self.is_degraded() && self.pid.on_target()
    }

    pub fn set_tolerance(&mut self, tolerance_degrees: f64) {
        self.pid.set_tolerance(tolerance_degrees);
    }

    /// The heading being held, meaningful only while heading hold is enabled.
    pub fn setpoint(&self) -> f64 {
        self.pid.setpoint()
    }

    /// The most recent heading correction; zero while heading hold is disabled.
    pub fn correction(&self) -> f64 {
        self.pid.output()
    }

    /// Forward one motion-profile sample to the motor controllers' closed loops.
    pub fn follow_sample(&mut self, sample: ProfileSample) -> Result {
        let (mode, left, right) = match sample {
            ProfileSample::Velocity { left, right } => {
                let limit = self.config.velocity_limit();
                (
                    ControlMode::Velocity,
                    left.clamp(-limit, limit),
                    right.clamp(-limit, limit),
                )
            }
            ProfileSample::Position { left, right } => match self.config.position_limit() {
                Some(limit) => (
                    ControlMode::Position,
                    left.clamp(-limit, limit),
                    right.clamp(-limit, limit),
                ),
                None => (ControlMode::Position, left, right),
            },
        };
        ensure!(
            left.is_finite() && right.is_finite(),
            error::HardwareSnafu {
                device: "motion profile",
                message: "non-finite setpoint",
            }
        );
        self.output.set_output(Side::Left, mode, left)?;
        self.output.set_output(Side::Right, mode, right)
    }

    pub fn stop(&mut self) -> Result {
        self.set_raw_output(0.0, 0.0)
    }

    pub fn left_encoder_position(&self) -> Result<i32> {
        self.output.encoder_position(Side::Left)
    }

    pub fn right_encoder_position(&self) -> Result<i32> {
        self.output.encoder_position(Side::Right)
    }

    pub fn heading_degrees(&self) -> Result<f64> {
        self.heading_source()?.heading()
    }

    pub fn zero_heading(&mut self) -> Result {
        match self.heading.as_mut() {
            Some(source) => source.zero(),
            None => missing_sensor(),
        }
    }

    /// The last percent-output pair sent to the motors.
    pub fn last_output(&self) -> (f64, f64) {
        self.last_output
    }

    pub fn config(&self) -> &DrivetrainConfig {
        &self.config
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn heading_source(&self) -> Result<&HeadingSource<S>> {
        match self.heading.as_ref() {
            Some(source) => Ok(source),
            None => missing_sensor(),
        }
    }

    pub fn heading_source_mut(&mut self) -> Result<&mut HeadingSource<S>> {
        match self.heading.as_mut() {
            Some(source) => Ok(source),
            None => missing_sensor(),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn missing_sensor<T>() -> Result<T> {
    error::HardwareSnafu {
        device: "heading sensor",
        message: "not available",
    }
    .fail()
}

impl<O, S> Debug for DrivetrainController<O, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrivetrainController")
            .field("degraded", &self.heading.is_none())
            .field("pid", &self.pid)
            .field("last_output", &self.last_output)
            .finish_non_exhaustive()
    }
}

impl<O: DriveOutput, S: YawSensor> Subsystem for DrivetrainController<O, S> {
    fn name(&self) -> &str {
        "Drivetrain"
    }

    fn log_telemetry(&self, telemetry: &mut dyn Telemetry) {
        if let Ok(heading) = self.heading_degrees() {
            telemetry.put_number("Current Angle", heading);
        }
        telemetry.put_number("Target Angle", self.pid.setpoint());
        telemetry.put_bool("Heading Hold", self.pid.is_enabled());
        telemetry.put_bool("Degraded", self.is_degraded());
    }
}

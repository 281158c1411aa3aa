use log::info;
use robot_command::{drivetrain::ControlMode, subsystem::Subsystem, telemetry::Telemetry};

use crate::{config::LiftConfig, sim::SimLiftMotor};

/// The cube lift with its intake wheels and claw.
///
/// In position mode the stick nudges a target that the motor controller
/// closes on. Raw mode passes the stick straight to the motor.
#[derive(Debug)]
pub struct Lift {
    motor: SimLiftMotor,
    config: LiftConfig,
    target: f64,
    raw_mode: bool,
}

impl Lift {
    /// The lift starts raised, so the encoder is seeded at the upper limit.
    pub fn new(mut motor: SimLiftMotor, config: LiftConfig) -> Self {
        motor.set_position(config.upper_limit);
        Self {
            motor,
            target: config.upper_limit,
            config,
            raw_mode: false,
        }
    }

    pub fn intake(&mut self) {
        self.motor.set_intake(1.0);
    }

    pub fn outtake(&mut self) {
        self.motor.set_intake(-1.0);
    }

    pub fn stop_flywheels(&mut self) {
        self.motor.set_intake(0.0);
    }

    pub fn open_claw(&mut self) {
        self.motor.set_claw(true);
    }

    pub fn close_claw(&mut self) {
        self.motor.set_claw(false);
    }

    /// Drive the lift from a stick value in `-1.0..=1.0`.
    pub fn drive(&mut self, stick: f64) {
        if self.raw_mode {
            self.motor.set(ControlMode::PercentOutput, stick);
        } else {
            self.target += stick * self.config.max_speed;
            self.move_to_target();
        }
    }

    /// Command the motor toward the target, clamped off the hard stops.
    pub fn move_to_target(&mut self) {
        self.target = self
            .target
            .clamp(self.config.lower_limit, self.config.upper_limit);
        self.motor.set(ControlMode::Position, self.target);
    }

    pub fn toggle_raw_mode(&mut self) {
        self.raw_mode = !self.raw_mode;
        info!("lift raw mode {}", if self.raw_mode { "on" } else { "off" });
        if !self.raw_mode {
            // Raw driving ends at the bottom stop, so re-seed the encoder there.
            let bottom = self.config.lower_limit + self.config.backlash;
            self.motor.set_position(bottom);
            self.target = bottom;
        }
    }

    pub fn raw_mode(&self) -> bool {
        self.raw_mode
    }

    pub fn set_to_switch(&mut self) {
        self.target = self.config.switch_height;
    }

    pub fn set_to_bottom(&mut self) {
        self.target = self.config.lower_limit;
    }

    pub fn set_to_top(&mut self) {
        self.target = self.config.upper_limit;
    }

    /// Declare the lift to be resting against its upper stop.
    pub fn reset_top_position(&mut self) {
        self.motor.set_position(self.config.upper_limit);
        self.target = self.config.upper_limit;
    }

    pub fn position(&self) -> f64 {
        self.motor.position()
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn at_target(&self) -> bool {
        (self.position() - self.target).abs() <= self.config.tolerance
    }

    pub fn intake_speed(&self) -> f64 {
        self.motor.intake()
    }
}

impl Subsystem for Lift {
    fn name(&self) -> &str {
        "Lift"
    }

    fn log_telemetry(&self, telemetry: &mut dyn Telemetry) {
        telemetry.put_number("lift position", self.position());
        telemetry.put_number("lift target", self.target);
        telemetry.put_bool("Lift Mode", self.raw_mode);
    }
}

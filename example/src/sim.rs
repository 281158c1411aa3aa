//! Stand-in hardware for running the robot on a desktop.
//!
//! Nothing here models physics beyond integrating commanded outputs once per
//! tick; it exists so the command framework has something to drive.

use std::{cell::RefCell, rc::Rc};

use robot_command::{
    drivetrain::{ControlMode, DriveOutput, Side, YawSensor},
    error::HardwareSnafu,
    Result,
};
use snafu::ensure;

/// Encoder units per tick at full percent output.
const UNITS_PER_TICK: f64 = 120.0;
/// Degrees of yaw per tick per unit of side difference at full output.
const YAW_PER_TICK: f64 = 4.0;
/// Velocities are in native units per 100 ms and a tick is 20 ms.
const TICKS_PER_VELOCITY_PERIOD: f64 = 5.0;

#[derive(Debug, Default)]
struct Motor {
    mode: Option<(ControlMode, f64)>,
    position: f64,
    /// Travel this tick as a fraction of full speed, used for yaw.
    effort: f64,
}

impl Motor {
    fn step(&mut self) {
        let before = self.position;
        match self.mode {
            Some((ControlMode::PercentOutput, value)) => self.position += value * UNITS_PER_TICK,
            Some((ControlMode::Velocity, value)) => {
                self.position += value / TICKS_PER_VELOCITY_PERIOD
            }
            Some((ControlMode::Position, value)) => self.position = value,
            None => {}
        }
        self.effort = (self.position - before) / UNITS_PER_TICK;
    }
}

#[derive(Debug, Default)]
struct WorldState {
    left: Motor,
    right: Motor,
    yaw: f64,
    lift: Motor,
    intake: f64,
    claw_open: bool,
}

/// Shared simulated world. Clones refer to the same world.
#[derive(Debug, Clone, Default)]
pub struct SimWorld(Rc<RefCell<WorldState>>);

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate one tick of every commanded output.
    pub fn step(&self) {
        let mut world = self.0.borrow_mut();
        world.left.step();
        world.right.step();
        world.lift.step();
        let turn = (world.right.effort - world.left.effort) * YAW_PER_TICK;
        world.yaw += turn;
    }

    pub fn drive(&self) -> SimDrive {
        SimDrive(self.clone())
    }

    /// Connect to the simulated gyro, which fails when `faulty` is set.
    pub fn gyro(&self, faulty: bool) -> Result<SimGyro> {
        ensure!(
            !faulty,
            HardwareSnafu {
                device: "gyro",
                message: "no response on the expansion port"
            }
        );
        Ok(SimGyro {
            world: self.clone(),
        })
    }

    pub fn lift_motor(&self) -> SimLiftMotor {
        SimLiftMotor(self.clone())
    }

    pub fn yaw(&self) -> f64 {
        self.0.borrow().yaw
    }
}

#[derive(Debug)]
pub struct SimDrive(SimWorld);

impl DriveOutput for SimDrive {
    fn set_output(&mut self, side: Side, mode: ControlMode, value: f64) -> Result {
        let mut world = self.0 .0.borrow_mut();
        let motor = match side {
            Side::Left => &mut world.left,
            Side::Right => &mut world.right,
        };
        motor.mode = Some((mode, value));
        Ok(())
    }

    fn encoder_position(&self, side: Side) -> Result<i32> {
        let world = self.0 .0.borrow();
        let motor = match side {
            Side::Left => &world.left,
            Side::Right => &world.right,
        };
        Ok(motor.position.round() as i32)
    }
}

/// Reports yaw counterclockwise-positive, the way the drivetrain expects.
#[derive(Debug)]
pub struct SimGyro {
    world: SimWorld,
}

impl YawSensor for SimGyro {
    fn yaw_degrees(&self) -> Result<f64> {
        Ok(self.world.yaw())
    }

    fn zero_yaw(&mut self) -> Result {
        self.world.0.borrow_mut().yaw = 0.0;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimLiftMotor(SimWorld);

impl SimLiftMotor {
    pub fn set(&mut self, mode: ControlMode, value: f64) {
        self.0 .0.borrow_mut().lift.mode = Some((mode, value));
    }

    pub fn position(&self) -> f64 {
        self.0 .0.borrow().lift.position
    }

    /// Overwrite the encoder reading without moving the lift.
    pub fn set_position(&mut self, position: f64) {
        self.0 .0.borrow_mut().lift.position = position;
    }

    pub fn set_intake(&mut self, value: f64) {
        self.0 .0.borrow_mut().intake = value;
    }

    pub fn intake(&self) -> f64 {
        self.0 .0.borrow().intake
    }

    pub fn set_claw(&mut self, open: bool) {
        self.0 .0.borrow_mut().claw_open = open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faster_right_side_turns_left() {
        let world = SimWorld::new();
        let mut drive = world.drive();
        drive
            .set_output(Side::Left, ControlMode::PercentOutput, 0.2)
            .unwrap();
        drive
            .set_output(Side::Right, ControlMode::PercentOutput, 0.7)
            .unwrap();
        world.step();

        assert!(world.yaw() > 0.0);
        assert_eq!(drive.encoder_position(Side::Left).unwrap(), 24);
        assert_eq!(drive.encoder_position(Side::Right).unwrap(), 84);
    }

    #[test]
    fn faulty_gyro_reports_hardware_error() {
        let world = SimWorld::new();
        assert!(world.gyro(true).is_err());
        assert!(world.gyro(false).is_ok());
    }
}

use alloc::{rc::Rc, vec, vec::Vec};
use core::cell::RefCell;

use num_traits::Float;

use super::{profile::ProfileSource, DriveOutput, DrivetrainController, YawSensor};
use crate::{command::Command, Result, SubsystemRef};

pub type DrivetrainRef<O, S> = Rc<RefCell<DrivetrainController<O, S>>>;

/// Drives each side from a supplier, typically two joystick axes. Never
/// finishes on its own, so it suits a default command.
pub struct TankDrive<O, S, F> {
    drivetrain: DrivetrainRef<O, S>,
    input: F,
    requirements: Vec<SubsystemRef>,
}

impl<O, S, F> TankDrive<O, S, F>
where
    O: DriveOutput + 'static,
    S: YawSensor + 'static,
    F: FnMut() -> (f64, f64),
{
    pub fn new(drivetrain: DrivetrainRef<O, S>, input: F) -> Self {
        Self {
            requirements: vec![SubsystemRef::from(&drivetrain)],
            drivetrain,
            input,
        }
    }
}

impl<O, S, F> Command for TankDrive<O, S, F>
where
    O: DriveOutput + 'static,
    S: YawSensor + 'static,
    F: FnMut() -> (f64, f64),
{
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "TankDrive"
    }

    fn initialize(&mut self) -> Result {
        self.drivetrain.borrow_mut().disable_heading_hold();
        Ok(())
    }

    fn execute(&mut self) -> Result {
        let (left, right) = (self.input)();
        self.drivetrain.borrow_mut().set_raw_output(left, right)
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        self.drivetrain.borrow_mut().stop()
    }
}

/// Drives forward holding the starting heading until the average encoder
/// travel reaches `distance` native units.
pub struct DriveStraight<O, S> {
    drivetrain: DrivetrainRef<O, S>,
    magnitude: f64,
    distance: f64,
    start: f64,
    requirements: Vec<SubsystemRef>,
}

impl<O, S> DriveStraight<O, S>
where
    O: DriveOutput + 'static,
    S: YawSensor + 'static,
{
    pub fn new(drivetrain: DrivetrainRef<O, S>, magnitude: f64, distance: f64) -> Self {
        Self {
            requirements: vec![SubsystemRef::from(&drivetrain)],
            drivetrain,
            magnitude,
            distance,
            start: 0.0,
        }
    }

    fn travelled(&self) -> Result<f64> {
        Ok(average_position(&*self.drivetrain.borrow())? - self.start)
    }
}

fn average_position<O: DriveOutput, S: YawSensor>(
    drivetrain: &DrivetrainController<O, S>,
) -> Result<f64> {
    let left = drivetrain.left_encoder_position()?;
    let right = drivetrain.right_encoder_position()?;
    Ok((f64::from(left) + f64::from(right)) / 2.0)
}

impl<O, S> Command for DriveStraight<O, S>
where
    O: DriveOutput + 'static,
    S: YawSensor + 'static,
{
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "DriveStraight"
    }

    fn initialize(&mut self) -> Result {
        let mut drivetrain = self.drivetrain.borrow_mut();
        drivetrain.disable_heading_hold();
        self.start = average_position(&*drivetrain)?;
        Ok(())
    }

    fn execute(&mut self) -> Result {
        self.drivetrain.borrow_mut().drive_straight(self.magnitude)
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(Float::abs(self.travelled()?) >= Float::abs(self.distance))
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        let mut drivetrain = self.drivetrain.borrow_mut();
        drivetrain.disable_heading_hold();
        drivetrain.stop()
    }
}

/// Plays back a recorded trajectory, one sample per tick.
pub struct FollowProfile<O, S, P> {
    drivetrain: DrivetrainRef<O, S>,
    profile: P,
    exhausted: bool,
    requirements: Vec<SubsystemRef>,
}

impl<O, S, P> FollowProfile<O, S, P>
where
    O: DriveOutput + 'static,
    S: YawSensor + 'static,
    P: ProfileSource,
{
    pub fn new(drivetrain: DrivetrainRef<O, S>, profile: P) -> Self {
        Self {
            requirements: vec![SubsystemRef::from(&drivetrain)],
            drivetrain,
            profile,
            exhausted: false,
        }
    }
}

impl<O, S, P> Command for FollowProfile<O, S, P>
where
    O: DriveOutput + 'static,
    S: YawSensor + 'static,
    P: ProfileSource,
{
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "FollowProfile"
    }

    fn initialize(&mut self) -> Result {
        self.drivetrain.borrow_mut().disable_heading_hold();
        Ok(())
    }

    fn execute(&mut self) -> Result {
        match self.profile.next_sample() {
            Some(sample) => self.drivetrain.borrow_mut().follow_sample(sample),
            None => {
                self.exhausted = true;
                Ok(())
            }
        }
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self.exhausted)
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        self.drivetrain.borrow_mut().stop()
    }
}

use std::{cell::RefCell, rc::Rc};

use robot_command::{command::Command, Result, SubsystemRef};

use crate::{operator::Gamepad, subsystems::lift::Lift};

/// Operator control of the lift, intake and claw. The lift's default command.
pub struct LiftCube {
    lift: Rc<RefCell<Lift>>,
    gamepad: Gamepad,
    requirements: Vec<SubsystemRef>,
}

impl LiftCube {
    pub fn new(lift: Rc<RefCell<Lift>>, gamepad: Gamepad) -> Self {
        Self {
            requirements: vec![SubsystemRef::from(&lift)],
            lift,
            gamepad,
        }
    }
}

impl Command for LiftCube {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "LiftCube"
    }

    fn execute(&mut self) -> Result {
        let mut lift = self.lift.borrow_mut();
        let gamepad = &self.gamepad;

        match (gamepad.intake(), gamepad.outtake()) {
            (true, false) => lift.intake(),
            (false, true) => lift.outtake(),
            _ => lift.stop_flywheels(),
        }

        if gamepad.open_claw() {
            lift.open_claw();
        } else {
            lift.close_claw();
        }

        if gamepad.switch_height() {
            lift.set_to_switch();
        } else if gamepad.lift_bottom() {
            lift.set_to_bottom();
        }
        lift.drive(gamepad.secondary_y());
        Ok(())
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        self.lift.borrow_mut().stop_flywheels();
        Ok(())
    }
}

/// Raises the lift to its upper stop and finishes once it gets there.
pub struct LiftUp {
    lift: Rc<RefCell<Lift>>,
    requirements: Vec<SubsystemRef>,
}

impl LiftUp {
    pub fn new(lift: Rc<RefCell<Lift>>) -> Self {
        Self {
            requirements: vec![SubsystemRef::from(&lift)],
            lift,
        }
    }
}

impl Command for LiftUp {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "LiftUp"
    }

    fn initialize(&mut self) -> Result {
        self.lift.borrow_mut().set_to_top();
        Ok(())
    }

    fn execute(&mut self) -> Result {
        self.lift.borrow_mut().move_to_target();
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self.lift.borrow().at_target())
    }
}

/// Spits the cube out for a fixed number of ticks.
pub struct Outtake {
    lift: Rc<RefCell<Lift>>,
    ticks: u64,
    elapsed: u64,
    requirements: Vec<SubsystemRef>,
}

impl Outtake {
    pub fn ticks(lift: Rc<RefCell<Lift>>, ticks: u64) -> Self {
        Self {
            requirements: vec![SubsystemRef::from(&lift)],
            lift,
            ticks,
            elapsed: 0,
        }
    }
}

impl Command for Outtake {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "Outtake"
    }

    fn execute(&mut self) -> Result {
        self.lift.borrow_mut().outtake();
        self.elapsed += 1;
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self.elapsed >= self.ticks)
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        self.lift.borrow_mut().stop_flywheels();
        Ok(())
    }
}

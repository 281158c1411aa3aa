use core::time::Duration;

use log::info;

use crate::Result;

/// The period the host driver is expected to call into the robot at.
pub const ITERATION_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotMode {
    Disabled,
    Autonomous,
    Teleop,
}

pub trait ScheduledRobot {
    /// Runs every iteration after the mode-specific hooks, usually to tick the scheduler.
    fn periodic(&mut self) -> Result {
        Ok(())
    }
    fn disabled_init(&mut self) -> Result {
        Ok(())
    }
    fn disabled_periodic(&mut self) -> Result {
        Ok(())
    }
    fn autonomous_init(&mut self) -> Result {
        Ok(())
    }
    fn autonomous_periodic(&mut self) -> Result {
        Ok(())
    }
    fn teleop_init(&mut self) -> Result {
        Ok(())
    }
    fn teleop_periodic(&mut self) -> Result {
        Ok(())
    }
}

/// Calls a robot's mode hooks once per iteration.
///
/// The `*_init` hook of a mode runs once on the iteration the mode is
/// entered. Sleeping between iterations is left to the host driver.
#[derive(Debug, Default)]
pub struct ModeDispatcher {
    previous_mode: Option<RobotMode>,
}

impl ModeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, robot: &mut impl ScheduledRobot, current_mode: RobotMode) -> Result {
        let entered = self.previous_mode != Some(current_mode);
        if entered {
            info!("entering {:?}", current_mode);
        }

        match current_mode {
            RobotMode::Disabled => {
                if entered {
                    robot.disabled_init()?;
                }
                robot.disabled_periodic()?;
            }
            RobotMode::Autonomous => {
                if entered {
                    robot.autonomous_init()?;
                }
                robot.autonomous_periodic()?;
            }
            RobotMode::Teleop => {
                if entered {
                    robot.teleop_init()?;
                }
                robot.teleop_periodic()?;
            }
        }
        self.previous_mode = Some(current_mode);

        robot.periodic()
    }

    pub fn mode(&self) -> Option<RobotMode> {
        self.previous_mode
    }
}

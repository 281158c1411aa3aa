use std::{
    path::PathBuf,
    thread::sleep,
    time::{Duration, Instant},
};

use log::{error, info};
use robot_command::robot::{ModeDispatcher, RobotMode, ITERATION_PERIOD};
use snafu::{ResultExt, Snafu};

use crate::{config::ConfigError, operator::Gamepad, robot::Robot, sim::SimWorld};

mod commands;
mod config;
mod dashboard;
mod logger;
mod operator;
mod robot;
mod sim;
mod subsystems;

/// A short scripted match.
const MATCH: [(RobotMode, Duration); 4] = [
    (RobotMode::Disabled, Duration::from_secs(1)),
    (RobotMode::Autonomous, Duration::from_secs(15)),
    (RobotMode::Teleop, Duration::from_secs(10)),
    (RobotMode::Disabled, Duration::from_secs(1)),
];

#[derive(Debug, Snafu)]
enum AppError {
    #[snafu(display("Could not load the configuration"))]
    Config { source: ConfigError },
    #[snafu(display("Could not set up logging"))]
    Logger { source: log::SetLoggerError },
    #[snafu(display("Could not build the robot"))]
    Build { source: robot_command::Error },
}

#[snafu::report]
fn main() -> Result<(), AppError> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::load(config_path.as_deref()).context(ConfigSnafu)?;
    logger::init(config.level_filter().context(ConfigSnafu)?).context(LoggerSnafu)?;

    let gamepad = Gamepad::new();
    let mut robot = Robot::new(&config, SimWorld::new()).context(BuildSnafu)?;
    robot.configure_button_bindings(&gamepad);

    let mut dispatcher = ModeDispatcher::new();
    let mut deadline = Instant::now();
    for (mode, length) in MATCH {
        let iterations = length.as_millis() / ITERATION_PERIOD.as_millis();
        for iteration in 0..iterations {
            if mode == RobotMode::Teleop {
                gamepad.script(iteration as u32);
            }
            if let Err(e) = dispatcher.step(&mut robot, mode) {
                error!("iteration failed: {}", e);
            }

            deadline += ITERATION_PERIOD;
            if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
                sleep(remaining);
            }
        }
    }

    info!("match over");
    Ok(())
}

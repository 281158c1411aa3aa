use std::{fs::read_to_string, path::Path};

use log::LevelFilter;
use robot_command::drivetrain::DrivetrainConfig;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Cannot read the config file {path}: {source}"))]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Cannot parse the config file: {source}"))]
    Parse { source: toml::de::Error },
    #[snafu(display("Invalid config: {source}"))]
    Invalid { source: robot_command::Error },
    #[snafu(display("Unknown log level {level:?}"))]
    LogLevel { level: String },
}

/// Everything the demo robot can be tuned with. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub log_level: Option<String>,
    /// Make the simulated gyro fail to connect, leaving the drivetrain degraded.
    pub simulate_gyro_fault: bool,
    pub drivetrain: DrivetrainConfig,
    pub lift: LiftConfig,
    pub auto: AutoConfig,
}

impl RobotConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        match &self.log_level {
            None => Ok(LevelFilter::Info),
            Some(level) => level.parse().map_err(|_| ConfigError::LogLevel {
                level: level.clone(),
            }),
        }
    }
}

/// Lift geometry in encoder units, 4096 per revolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiftConfig {
    pub upper_limit: f64,
    pub lower_limit: f64,
    // Placeholder until the switch height is measured on the real lift.
    pub switch_height: f64,
    // Placeholder until backlash is measured.
    pub backlash: f64,
    /// Target change per tick at full stick deflection.
    pub max_speed: f64,
    /// The lift counts as in position within this many units of its target.
    pub tolerance: f64,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            upper_limit: 3500.0,
            lower_limit: 0.0,
            switch_height: 0.0,
            backlash: 0.0,
            max_speed: 50.0,
            tolerance: 20.0,
        }
    }
}

/// The autonomous drive profile as per-side velocity setpoints, one per tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoConfig {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    /// Ticks to run the outtake for once the profile is done.
    pub outtake_ticks: u64,
}

impl Default for AutoConfig {
    fn default() -> Self {
        // Accelerate, cruise while curving left, decelerate.
        let ramp = (0..25).map(|i| f64::from(i) * 40.0);
        let left = ramp
            .clone()
            .chain(std::iter::repeat(800.0).take(50))
            .chain(ramp.clone().rev())
            .collect();
        let right = ramp
            .clone()
            .chain(std::iter::repeat(1000.0).take(50))
            .chain(ramp.rev())
            .collect();
        Self {
            left,
            right,
            outtake_ticks: 150,
        }
    }
}

/// Load the config at `path`, or the defaults if no path is given.
pub fn load(path: Option<&Path>) -> Result<RobotConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(RobotConfig::default());
    };

    let text = read_to_string(path).context(ReadSnafu {
        path: path.display().to_string(),
    })?;
    parse(&text)
}

fn parse(text: &str) -> Result<RobotConfig, ConfigError> {
    let config: RobotConfig = toml::from_str(text).context(ParseSnafu)?;
    config.drivetrain.validate().context(InvalidSnafu)?;
    Ok(config)
}

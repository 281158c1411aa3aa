use alloc::string::String;

use snafu::Snafu;

pub type Result<T = (), E = Error> = core::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Hardware fault on {device}: {message}"))]
    Hardware {
        device: &'static str,
        message: String,
    },
    #[snafu(display("Command {name} has already run and cannot be restarted."))]
    AlreadyRan { name: String },
    #[snafu(display("Profile sides differ in length: {left} left samples, {right} right samples."))]
    MismatchedProfile { left: usize, right: usize },
    #[snafu(display("Invalid drivetrain config: {field} {reason}."))]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    #[snafu(context(false), display("Invalid command group: {source}"))]
    Group { source: GroupError },
}

#[derive(Debug, Snafu)]
pub enum SetDefaultCommandError {
    #[snafu(display("Default commands must require their subsystem."))]
    MustRequireSubsystem,
    #[snafu(display("Cannot set the default command on a subsystem that is not registered."))]
    NotRegistered,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GroupError {
    #[snafu(display(
        "Subsystem {subsystem} would be required by two children of the group at the same time."
    ))]
    DoubleClaim { subsystem: String },
    #[snafu(display("Cannot add children to a group that has already started."))]
    AlreadyStarted,
}

use alloc::{boxed::Box, vec::Vec};

use crate::{Result, SubsystemRef};

pub mod group;
pub mod trigger;

/// An action the robot can perform. Runs when scheduled, until it is interrupted or it finishes.
///
/// Every subsystem the command touches must be listed by [`Command::get_requirements`];
/// the scheduler cannot detect undeclared hardware access.
pub trait Command {
    fn get_requirements(&self) -> &[SubsystemRef];

    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// The initial subroutine of a command. Called once when the command is initially scheduled.
    fn initialize(&mut self) -> Result {
        Ok(())
    }
    /// Called once per tick while the command is scheduled.
    fn execute(&mut self) -> Result {
        Ok(())
    }
    /// Called exactly once per run: with `false` when [`Command::is_finished`]
    /// returned true, with `true` when the command was cancelled or preempted.
    #[allow(unused_variables)]
    fn end(&mut self, interrupted: bool) -> Result {
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(false)
    }

    fn runs_when_disabled(&self) -> bool {
        false
    }

    fn get_interruption_behavior(&self) -> InterruptionBehavior {
        InterruptionBehavior::default()
    }
}

/// Where a single command instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandState {
    #[default]
    Idle,
    Initializing,
    Running,
    Finished,
    Interrupted,
}

impl CommandState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Interrupted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptionBehavior {
    #[default]
    CancelSelf,
    CancelIncoming,
}

pub struct FunctionalCommand {
    on_init: Box<dyn FnMut() -> Result>,
    on_execute: Box<dyn FnMut() -> Result>,
    on_end: Box<dyn FnMut(bool) -> Result>,
    is_finished: Box<dyn Fn() -> Result<bool>>,
    requirements: Vec<SubsystemRef>,
}

impl FunctionalCommand {
    pub fn new(
        on_init: impl FnMut() -> Result + 'static,
        on_execute: impl FnMut() -> Result + 'static,
        on_end: impl FnMut(bool) -> Result + 'static,
        is_finished: impl Fn() -> Result<bool> + 'static,
        requirements: Vec<SubsystemRef>,
    ) -> Self {
        Self {
            on_init: Box::new(on_init),
            on_execute: Box::new(on_execute),
            on_end: Box::new(on_end),
            is_finished: Box::new(is_finished),
            requirements,
        }
    }

    /// A command that runs `action` once when initialized and finishes on its first tick.
    pub fn instant(action: impl FnMut() -> Result + 'static, requirements: Vec<SubsystemRef>) -> Self {
        Self::new(action, || Ok(()), |_| Ok(()), || Ok(true), requirements)
    }
}

impl Command for FunctionalCommand {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "FunctionalCommand"
    }

    fn initialize(&mut self) -> Result {
        (self.on_init)()
    }

    fn execute(&mut self) -> Result {
        (self.on_execute)()
    }

    fn end(&mut self, interrupted: bool) -> Result {
        (self.on_end)(interrupted)
    }

    fn is_finished(&self) -> Result<bool> {
        (self.is_finished)()
    }
}

/// Finishes after it has executed for a fixed number of ticks.
#[derive(Debug)]
pub struct Wait {
    ticks: u64,
    elapsed: u64,
}

impl Wait {
    pub fn ticks(ticks: u64) -> Self {
        Self { ticks, elapsed: 0 }
    }
}

impl Command for Wait {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &[]
    }

    fn initialize(&mut self) -> Result {
        self.elapsed = 0;
        Ok(())
    }

    fn execute(&mut self) -> Result {
        self.elapsed += 1;
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self.elapsed >= self.ticks)
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }
}

#[macro_export]
macro_rules! run_once {
    ($on_init:block) => {
        $crate::command::FunctionalCommand::new(move || $on_init, || Ok(()), |_| Ok(()), || Ok(true), $crate::__private::vec![])
    };
    ($on_init:block, $($requirement:expr),+ $(,)?) => {
        $crate::command::FunctionalCommand::new(move || $on_init, || Ok(()), |_| Ok(()), || Ok(true), $crate::__private::vec![$($requirement),+])
    };
}

#[macro_export]
macro_rules! run {
    ($on_execute:block) => {
        $crate::command::FunctionalCommand::new(
            || Ok(()),
            move || $on_execute,
            |_| Ok(()),
            || Ok(false),
            $crate::__private::vec![],
        )
    };
    ($on_execute:block, $($requirement:expr),+ $(,)?) => {
        $crate::command::FunctionalCommand::new(
            || Ok(()),
            move || $on_execute,
            |_| Ok(()),
            || Ok(false),
            $crate::__private::vec![$($requirement),+],
        )
    };
}

#[macro_export]
macro_rules! start_end {
    ($start:block, $end:block) => {
        $crate::command::FunctionalCommand::new(move || $start, || Ok(()), move |_| $end, || Ok(false), $crate::__private::vec![])
    };
    ($start:block, $end:block, $($requirement:expr),+ $(,)?) => {
        $crate::command::FunctionalCommand::new(
            move || $start,
            || Ok(()),
            move |_| $end,
            || Ok(false),
            $crate::__private::vec![$($requirement),+],
        )
    };
}

#[macro_export]
macro_rules! run_end {
    ($execute:block, $end:block) => {
        $crate::command::FunctionalCommand::new(|| Ok(()), move || $execute, move |_| $end, || Ok(false), $crate::__private::vec![])
    };
    ($execute:block, $end:block, $($requirement:expr),+ $(,)?) => {
        $crate::command::FunctionalCommand::new(|| Ok(()), move || $execute, move |_| $end, || Ok(false), $crate::__private::vec![$($requirement),+])
    };
}

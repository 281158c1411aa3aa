use alloc::vec::Vec;

use hashbrown::HashSet;
use log::debug;

use super::{Command, CommandState};
use crate::{error::GroupError, CommandRef, Result, SubsystemRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Starts once every earlier sequential child has ended.
    Sequential,
    /// Starts alongside the next sequential child and runs beside it.
    Parallel,
}

struct GroupEntry {
    command: CommandRef,
    mode: ExecutionMode,
}

/// A command made of child commands, run in order or side by side.
///
/// Children are kept in a flat list in insertion order. A cursor walks the
/// list: every parallel child it passes is started, and it stops on the next
/// sequential child until that child ends.
///
/// ```
/// # use robot_command::command::{group::{CommandGroup, ExecutionMode}, Wait};
/// let mut auto = CommandGroup::new();
/// auto.add(Wait::ticks(50), ExecutionMode::Parallel)?;
/// auto.add(Wait::ticks(10), ExecutionMode::Sequential)?;
/// auto.add(Wait::ticks(10), ExecutionMode::Sequential)?;
/// # Ok::<(), robot_command::GroupError>(())
/// ```
#[derive(Default)]
pub struct CommandGroup {
    entries: Vec<GroupEntry>,
    requirements: Vec<SubsystemRef>,
    parallel_requirements: HashSet<SubsystemRef>,
    cursor: usize,
    current: Option<usize>,
    running_parallel: Vec<usize>,
    elapsed: u64,
    started: bool,
}

impl CommandGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child.
    ///
    /// A parallel child may still be running when any later child starts, so
    /// no later child may share a subsystem with it. Children that would claim
    /// the same subsystem at the same time are rejected here rather than
    /// fighting over it at run time.
    pub fn add(
        &mut self,
        command: impl Into<CommandRef>,
        mode: ExecutionMode,
    ) -> core::result::Result<(), GroupError> {
        if self.started {
            return Err(GroupError::AlreadyStarted);
        }

        let command = command.into();
        let requirements = command.requirements();
        if let Some(claimed) = requirements
            .iter()
            .find(|r| self.parallel_requirements.contains(*r))
        {
            return Err(GroupError::DoubleClaim {
                subsystem: claimed.name(),
            });
        }

        for requirement in requirements {
            if mode == ExecutionMode::Parallel {
                self.parallel_requirements.insert(requirement.clone());
            }
            if !self.requirements.contains(&requirement) {
                self.requirements.push(requirement);
            }
        }
        self.entries.push(GroupEntry { command, mode });
        Ok(())
    }

    pub fn add_sequential(
        &mut self,
        command: impl Into<CommandRef>,
    ) -> core::result::Result<(), GroupError> {
        self.add(command, ExecutionMode::Sequential)
    }

    pub fn add_parallel(
        &mut self,
        command: impl Into<CommandRef>,
    ) -> core::result::Result<(), GroupError> {
        self.add(command, ExecutionMode::Parallel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lifecycle state of every child, in insertion order.
    pub fn child_states(&self) -> Vec<CommandState> {
        self.entries.iter().map(|e| e.command.state()).collect()
    }

    /// Start children until the cursor rests on a running sequential child
    /// or runs off the end of the list.
    fn advance(&mut self) -> Result {
        while self.current.is_none() && self.cursor < self.entries.len() {
            let index = self.cursor;
            self.cursor += 1;

            let entry = &self.entries[index];
            debug!("group starting child {} ({:?})", index, entry.mode);
            // Track the child before initializing so a failed start is still interrupted.
            match entry.mode {
                ExecutionMode::Parallel => self.running_parallel.push(index),
                ExecutionMode::Sequential => self.current = Some(index),
            }
            entry.command.initialize(self.elapsed)?;
        }
        Ok(())
    }
}

impl Command for CommandGroup {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        "CommandGroup"
    }

    fn initialize(&mut self) -> Result {
        self.started = true;
        self.advance()
    }

    fn execute(&mut self) -> Result {
        while let Some(index) = self.current {
            let child = &self.entries[index].command;
            if !child.execute()? {
                break;
            }
            child.finish()?;
            self.current = None;
            self.advance()?;
        }

        let mut i = 0;
        while i < self.running_parallel.len() {
            let child = &self.entries[self.running_parallel[i]].command;
            if child.execute()? {
                child.finish()?;
                self.running_parallel.remove(i);
            } else {
                i += 1;
            }
        }

        self.elapsed += 1;
        Ok(())
    }

    fn end(&mut self, interrupted: bool) -> Result {
        if !interrupted {
            return Ok(());
        }

        let mut active: Vec<usize> = self.current.take().into_iter().collect();
        active.append(&mut self.running_parallel);

        let mut result = Ok(());
        for index in active {
            if let Err(error) = self.entries[index].command.interrupt() {
                result = result.and(Err(error));
            }
        }
        result
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self.current.is_none()
            && self.cursor >= self.entries.len()
            && self.running_parallel.is_empty())
    }

    fn runs_when_disabled(&self) -> bool {
        self.entries.iter().all(|e| e.command.runs_when_disabled())
    }
}

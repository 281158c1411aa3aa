#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::{boxed::Box, rc::Rc, string::String, vec::Vec};
use core::{
    cell::{Cell, Ref, RefCell},
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    ops::Deref,
};

use command::{Command, CommandState, InterruptionBehavior};
use event::EventLoop;
use hashbrown::HashMap;
use log::{debug, warn};
use snafu::ensure;
use subsystem::Subsystem;
use telemetry::Telemetry;

pub use error::{Error, GroupError, Result, SetDefaultCommandError};

pub mod command;
pub mod drivetrain;
pub mod error;
pub mod event;
pub mod robot;
pub mod subsystem;
pub mod telemetry;

#[doc(hidden)]
pub mod __private {
    pub use alloc::vec;
}

#[derive(Clone)]
pub struct SubsystemRef(Rc<RefCell<dyn Subsystem>>);

impl SubsystemRef {
    /// The subsystem's name, or a placeholder if it is mutably borrowed right now.
    pub fn name(&self) -> String {
        match self.0.try_borrow() {
            Ok(subsystem) => subsystem.name().into(),
            Err(_) => "<borrowed subsystem>".into(),
        }
    }
}

impl PartialEq for SubsystemRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SubsystemRef {}

impl Hash for SubsystemRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const ()).hash(state);
    }
}

impl Debug for SubsystemRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubsystemRef").field(&self.name()).finish()
    }
}

impl From<Rc<RefCell<dyn Subsystem>>> for SubsystemRef {
    fn from(subsystem: Rc<RefCell<dyn Subsystem>>) -> Self {
        Self(subsystem)
    }
}

impl<S: Subsystem + 'static> From<Rc<RefCell<S>>> for SubsystemRef {
    fn from(subsystem: Rc<RefCell<S>>) -> Self {
        Self(subsystem)
    }
}

impl<S: Subsystem + 'static> From<&Rc<RefCell<S>>> for SubsystemRef {
    fn from(subsystem: &Rc<RefCell<S>>) -> Self {
        Self(subsystem.clone())
    }
}

impl Deref for SubsystemRef {
    type Target = Rc<RefCell<dyn Subsystem>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Lifecycle bookkeeping shared by every handle to one command instance.
struct CommandCell<C: ?Sized> {
    state: Cell<CommandState>,
    started_at: Cell<Option<u64>>,
    command: RefCell<C>,
}

/// A shared handle to a single run of a command.
///
/// The handle carries the command's [`CommandState`]. Once the command has
/// finished or been interrupted, the instance cannot be scheduled again.
#[derive(Clone)]
pub struct CommandRef(Rc<CommandCell<dyn Command>>);

impl CommandRef {
    pub fn new(command: impl Command + 'static) -> Self {
        Self(Rc::new(CommandCell {
            state: Cell::new(CommandState::Idle),
            started_at: Cell::new(None),
            command: RefCell::new(command),
        }))
    }

    pub fn state(&self) -> CommandState {
        self.0.state.get()
    }

    /// The tick at which the command was initialized.
    ///
    /// Top-level commands are stamped with the scheduler tick; children of a
    /// [`command::group::CommandGroup`] are stamped with ticks since the group started.
    pub fn started_at(&self) -> Option<u64> {
        self.0.started_at.get()
    }

    pub fn name(&self) -> String {
        match self.0.command.try_borrow() {
            Ok(command) => command.name().into(),
            Err(_) => "<running command>".into(),
        }
    }

    /// Borrow the underlying command.
    pub fn borrow(&self) -> Ref<'_, dyn Command> {
        self.0.command.borrow()
    }

    pub fn requirements(&self) -> Vec<SubsystemRef> {
        self.0.command.borrow().get_requirements().to_vec()
    }

    pub fn runs_when_disabled(&self) -> bool {
        self.0.command.borrow().runs_when_disabled()
    }

    pub fn interruption_behavior(&self) -> InterruptionBehavior {
        self.0.command.borrow().get_interruption_behavior()
    }

    pub(crate) fn initialize(&self, now: u64) -> Result {
        ensure!(
            self.state() == CommandState::Idle,
            error::AlreadyRanSnafu { name: self.name() }
        );
        self.0.state.set(CommandState::Initializing);
        self.0.started_at.set(Some(now));
        self.0.command.borrow_mut().initialize()?;
        self.0.state.set(CommandState::Running);
        Ok(())
    }

    /// Run the execution phase, then poll for completion.
    pub(crate) fn execute(&self) -> Result<bool> {
        let mut command = self.0.command.borrow_mut();
        command.execute()?;
        command.is_finished()
    }

    pub(crate) fn finish(&self) -> Result {
        if self.state().is_terminal() {
            return Ok(());
        }
        self.0.state.set(CommandState::Finished);
        self.0.command.borrow_mut().end(false)
    }

    pub(crate) fn interrupt(&self) -> Result {
        if self.state().is_terminal() {
            return Ok(());
        }
        self.0.state.set(CommandState::Interrupted);
        self.0.command.borrow_mut().end(true)
    }
}

impl PartialEq for CommandRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for CommandRef {}

impl Debug for CommandRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRef")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Command + 'static> From<T> for CommandRef {
    fn from(command: T) -> Self {
        Self::new(command)
    }
}

/// Builds a fresh default command each time the previous one has ended.
struct DefaultCommand {
    factory: Box<dyn FnMut() -> CommandRef>,
    current: CommandRef,
}

impl DefaultCommand {
    fn next(&mut self) -> CommandRef {
        if self.current.state() != CommandState::Idle {
            self.current = (self.factory)();
        }
        self.current.clone()
    }
}

struct RegisteredSubsystem {
    subsystem: SubsystemRef,
    default_command: Option<DefaultCommand>,
}

#[derive(Default)]
struct CommandSchedulerState {
    subsystems: RefCell<Vec<RegisteredSubsystem>>,
    in_run_loop: Cell<bool>,
    disabled: Cell<bool>,
    ticks: Cell<u64>,
    to_schedule: RefCell<Vec<CommandRef>>,
    to_cancel: RefCell<Vec<CommandRef>>,
    scheduled_commands: RefCell<Vec<CommandRef>>,
    requirements: RefCell<HashMap<SubsystemRef, CommandRef>>,
    button_loop: Rc<RefCell<EventLoop>>,
    telemetry: RefCell<Option<Box<dyn Telemetry>>>,
}

impl CommandSchedulerState {
    #[inline]
    fn is_scheduled(&self, command: &CommandRef) -> bool {
        self.scheduled_commands.borrow().contains(command)
    }

    fn requiring(&self, subsystem: &SubsystemRef) -> Option<CommandRef> {
        self.requirements.borrow().get(subsystem).cloned()
    }

    fn release(&self, command: &CommandRef) {
        self.scheduled_commands.borrow_mut().retain(|c| c != command);
        self.requirements
            .borrow_mut()
            .retain(|_, owner| owner != command);
    }

    fn cancel(&self, command: &CommandRef) -> Result {
        if self.in_run_loop.get() {
            self.to_cancel.borrow_mut().push(command.clone());
            return Ok(());
        }
        self.cancel_now(command)
    }

    fn cancel_now(&self, command: &CommandRef) -> Result {
        if !self.is_scheduled(command) {
            return Ok(());
        }

        debug!("interrupting {}", command.name());
        self.release(command);
        command.interrupt()
    }

    fn schedule_now(&self, command: CommandRef) -> Result {
        if self.is_scheduled(&command) {
            return Ok(());
        }
        ensure!(
            command.state() == CommandState::Idle,
            error::AlreadyRanSnafu {
                name: command.name()
            }
        );
        if self.disabled.get() && !command.runs_when_disabled() {
            warn!(
                "refusing to schedule {} while the robot is disabled",
                command.name()
            );
            return Ok(());
        }

        let requirements = command.requirements();

        let mut requiring_commands: Vec<CommandRef> = Vec::new();
        for requiring in requirements.iter().filter_map(|r| self.requiring(r)) {
            if !requiring_commands.contains(&requiring) {
                requiring_commands.push(requiring);
            }
        }

        for requiring in &requiring_commands {
            if requiring.interruption_behavior() == InterruptionBehavior::CancelIncoming {
                debug!(
                    "{} rejected: {} does not yield its subsystems",
                    command.name(),
                    requiring.name()
                );
                return Ok(());
            }
        }

        for requiring in &requiring_commands {
            debug!("{} preempts {}", command.name(), requiring.name());
            self.cancel_now(requiring)?;
        }

        self.requirements
            .borrow_mut()
            .extend(requirements.into_iter().map(|r| (r, command.clone())));
        self.scheduled_commands.borrow_mut().push(command);
        Ok(())
    }

    /// Start the default command of every registered subsystem nobody owns.
    fn schedule_defaults(&self) -> Result {
        let count = self.subsystems.borrow().len();
        let mut result = Ok(());
        for index in 0..count {
            let default_command = {
                let mut subsystems = self.subsystems.borrow_mut();
                let registered = &mut subsystems[index];
                if self.requirements.borrow().contains_key(&registered.subsystem) {
                    continue;
                }
                match registered.default_command.as_mut() {
                    Some(default_command) => default_command.next(),
                    None => continue,
                }
            };
            if self.disabled.get() && !default_command.runs_when_disabled() {
                continue;
            }
            result = result.and(self.schedule_now(default_command));
        }
        result
    }

    /// Advance every active command. A failed command is interrupted and the
    /// rest still run; the first error is returned.
    fn run_scheduled(&self, now: u64) -> Result {
        let scheduled_commands = self.scheduled_commands.borrow().clone();

        let mut result = Ok(());
        for command in scheduled_commands {
            if command.state().is_terminal() {
                continue;
            }
            if let Err(error) = self.advance(&command, now) {
                warn!("{} failed: {}", command.name(), error);
                self.release(&command);
                if let Err(end_error) = command.interrupt() {
                    warn!("{} failed while ending: {}", command.name(), end_error);
                }
                result = result.and(Err(error));
            }
        }

        result
    }

    fn advance(&self, command: &CommandRef, now: u64) -> Result {
        if command.state() == CommandState::Idle {
            command.initialize(now)?;
        }

        if command.execute()? {
            self.release(command);
            command.finish()?;
        }
        Ok(())
    }

    fn publish_telemetry(&self, subsystems: &[SubsystemRef]) {
        let mut telemetry = self.telemetry.borrow_mut();
        if let Some(sink) = telemetry.as_mut() {
            for subsystem in subsystems {
                subsystem.borrow().log_telemetry(sink.as_mut());
            }
        }
    }
}

/// Runs commands against registered subsystems, one tick at a time.
///
/// The scheduler is a cheap handle; clones share the same state. It is meant
/// to be constructed once by the robot's composition root and handed to
/// whatever needs to schedule commands.
#[derive(Clone, Default)]
pub struct CommandScheduler {
    state: Rc<CommandSchedulerState>,
}

impl CommandScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem with the scheduler.
    pub fn register<S: Subsystem + 'static>(&self, subsystem: S) -> Rc<RefCell<S>> {
        let subsystem = Rc::new(RefCell::new(subsystem));
        self.register_ref(SubsystemRef(subsystem.clone()));
        subsystem
    }

    /// Register an already shared subsystem. Registering twice is a no-op.
    pub fn register_ref(&self, subsystem: impl Into<SubsystemRef>) {
        let subsystem = subsystem.into();
        let mut subsystems = self.state.subsystems.borrow_mut();
        if subsystems.iter().all(|r| r.subsystem != subsystem) {
            subsystems.push(RegisteredSubsystem {
                subsystem,
                default_command: None,
            });
        }
    }

    /// Request that a command starts.
    ///
    /// Any running command holding one of its subsystems is interrupted
    /// immediately; the new command initializes on the next tick. Requests made
    /// from inside a tick are applied once all commands have executed.
    pub fn schedule(&self, command: impl Into<CommandRef>) -> Result {
        let command = command.into();
        if self.state.in_run_loop.get() {
            self.state.to_schedule.borrow_mut().push(command);
            return Ok(());
        }

        self.state.schedule_now(command)
    }

    pub fn cancel(&self, command: &CommandRef) -> Result {
        self.state.cancel(command)
    }

    pub fn cancel_all(&self) -> Result {
        let scheduled_commands = self.state.scheduled_commands.borrow().clone();
        for command in scheduled_commands {
            self.state.cancel(&command)?;
        }
        Ok(())
    }

    /// Set the command that runs whenever nothing else requires `subsystem`.
    ///
    /// `factory` is called again each time the previous default command has
    /// ended, since a command instance only runs once.
    pub fn set_default_command<S, C, F>(
        &self,
        subsystem: &Rc<RefCell<S>>,
        mut factory: F,
    ) -> core::result::Result<(), SetDefaultCommandError>
    where
        S: Subsystem + 'static,
        C: Command + 'static,
        F: FnMut() -> C + 'static,
    {
        let subsystem = SubsystemRef(subsystem.clone());
        let command = CommandRef::new(factory());
        if !command.requirements().contains(&subsystem) {
            return Err(SetDefaultCommandError::MustRequireSubsystem);
        }

        let mut subsystems = self.state.subsystems.borrow_mut();
        let registered = subsystems
            .iter_mut()
            .find(|r| r.subsystem == subsystem)
            .ok_or(SetDefaultCommandError::NotRegistered)?;
        registered.default_command = Some(DefaultCommand {
            factory: Box::new(move || CommandRef::new(factory())),
            current: command,
        });

        Ok(())
    }

    /// Remove the default command of `subsystem`, returning the instance that
    /// would have run next. A default command that is already running keeps
    /// running until something ends it.
    pub fn remove_default_command<S>(&self, subsystem: &Rc<RefCell<S>>) -> Option<CommandRef>
    where
        S: Subsystem + 'static,
    {
        let subsystem = SubsystemRef(subsystem.clone());
        let mut subsystems = self.state.subsystems.borrow_mut();
        let registered = subsystems.iter_mut().find(|r| r.subsystem == subsystem)?;
        registered.default_command.take().map(|d| d.current)
    }

    /// Advance every subsystem and command by one period.
    pub fn tick(&self) -> Result {
        let state = &*self.state;
        let now = state.ticks.get();
        state.ticks.set(now + 1);

        let subsystems = state
            .subsystems
            .borrow()
            .iter()
            .map(|r| r.subsystem.clone())
            .collect::<Vec<_>>();
        let mut result = Ok(());
        for subsystem in &subsystems {
            let periodic = subsystem.borrow_mut().periodic();
            if let Err(e) = periodic {
                warn!("{} periodic failed: {}", subsystem.name(), e);
                result = result.and(Err(e));
            }
        }
        state.publish_telemetry(&subsystems);

        let button_loop = state.button_loop.clone();
        button_loop.borrow_mut().poll();

        if state.disabled.get() {
            let scheduled_commands = state.scheduled_commands.borrow().clone();
            for command in scheduled_commands {
                if !command.runs_when_disabled() {
                    result = result.and(state.cancel_now(&command));
                }
            }
        }

        result = result.and(state.schedule_defaults());

        state.in_run_loop.set(true);
        let run = state.run_scheduled(now);
        state.in_run_loop.set(false);
        result = result.and(run);

        // Both queues are drained even after a failure so no request is lost.
        let to_schedule = state.to_schedule.take();
        for command in to_schedule {
            result = result.and(state.schedule_now(command));
        }

        let to_cancel = state.to_cancel.take();
        for command in to_cancel {
            result = result.and(state.cancel_now(&command));
        }

        result
    }

    pub fn is_scheduled(&self, command: &CommandRef) -> bool {
        self.state.is_scheduled(command)
    }

    /// The command currently owning `subsystem`, if any.
    pub fn requiring(&self, subsystem: impl Into<SubsystemRef>) -> Option<CommandRef> {
        self.state.requiring(&subsystem.into())
    }

    /// Active top-level commands in the order they are executed.
    pub fn scheduled(&self) -> Vec<CommandRef> {
        self.state.scheduled_commands.borrow().clone()
    }

    /// Number of ticks run so far.
    pub fn now(&self) -> u64 {
        self.state.ticks.get()
    }

    /// While disabled, commands that do not run when disabled are interrupted
    /// and refused.
    pub fn set_disabled(&self, disabled: bool) {
        self.state.disabled.set(disabled);
    }

    pub fn is_disabled(&self) -> bool {
        self.state.disabled.get()
    }

    /// Publish every subsystem's readouts to `telemetry` once per tick.
    pub fn set_telemetry(&self, telemetry: impl Telemetry + 'static) {
        self.state.telemetry.replace(Some(Box::new(telemetry)));
    }

    pub fn button_event_loop(&self) -> Rc<RefCell<EventLoop>> {
        self.state.button_loop.clone()
    }
}

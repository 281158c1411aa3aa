use alloc::rc::Rc;
use core::{cell::RefCell, fmt::Debug};

use crate::{
    command::FunctionalCommand, run, run_end, run_once, start_end, telemetry::Telemetry, Result,
    SubsystemRef,
};

/// A collection of robot parts and other hardware that act together as a whole.
///
/// At most one command owns a subsystem at a time; hardware methods should
/// only be called by that command.
pub trait Subsystem: Debug {
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// This method will be called once per scheduler run
    fn periodic(&mut self) -> Result {
        Ok(())
    }

    /// Publish readouts. Called once per scheduler run, after [`Subsystem::periodic`].
    #[allow(unused_variables)]
    fn log_telemetry(&self, telemetry: &mut dyn Telemetry) {}
}

/// Shorthands for commands that require a single subsystem.
pub trait SubsystemRefExt {
    fn run_once(&self, action: impl FnMut() -> Result + 'static) -> FunctionalCommand;
    fn run(&self, action: impl FnMut() -> Result + 'static) -> FunctionalCommand;
    fn start_end(
        &self,
        start: impl FnMut() -> Result + 'static,
        end: impl FnMut() -> Result + 'static,
    ) -> FunctionalCommand;
    fn run_end(
        &self,
        run: impl FnMut() -> Result + 'static,
        end: impl FnMut() -> Result + 'static,
    ) -> FunctionalCommand;
}

impl<T> SubsystemRefExt for Rc<RefCell<T>>
where
    T: Subsystem + 'static,
{
    fn run_once(&self, action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        SubsystemRef::from(self).run_once(action)
    }
    fn run(&self, action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        SubsystemRef::from(self).run(action)
    }
    fn start_end(
        &self,
        start: impl FnMut() -> Result + 'static,
        end: impl FnMut() -> Result + 'static,
    ) -> FunctionalCommand {
        SubsystemRef::from(self).start_end(start, end)
    }
    fn run_end(
        &self,
        run: impl FnMut() -> Result + 'static,
        end: impl FnMut() -> Result + 'static,
    ) -> FunctionalCommand {
        SubsystemRef::from(self).run_end(run, end)
    }
}

impl SubsystemRefExt for SubsystemRef {
    fn run_once(&self, mut action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        run_once!({ action() }, self.clone())
    }
    fn run(&self, mut action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        run!({ action() }, self.clone())
    }
    fn start_end(
        &self,
        mut start: impl FnMut() -> Result + 'static,
        mut end: impl FnMut() -> Result + 'static,
    ) -> FunctionalCommand {
        start_end!({ start() }, { end() }, self.clone())
    }
    fn run_end(
        &self,
        mut run: impl FnMut() -> Result + 'static,
        mut end: impl FnMut() -> Result + 'static,
    ) -> FunctionalCommand {
        run_end!({ run() }, { end() }, self.clone())
    }
}

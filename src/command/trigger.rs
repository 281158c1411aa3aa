use alloc::rc::Rc;
use core::cell::RefCell;

use log::warn;

use super::Command;
use crate::{event::EventLoop, CommandRef, CommandScheduler};

/// Starts and cancels commands when a condition changes.
///
/// Conditions are sampled when the scheduler polls its event loop at the
/// start of each tick. Since a command instance runs only once, bindings take
/// a factory and build a fresh command for every activation.
pub struct Trigger {
    scheduler: CommandScheduler,
    event_loop: Rc<RefCell<EventLoop>>,
    condition: Rc<dyn Fn() -> bool>,
}

impl Trigger {
    pub fn new_with_loop(
        scheduler: &CommandScheduler,
        event_loop: Rc<RefCell<EventLoop>>,
        condition: impl Fn() -> bool + 'static,
    ) -> Self {
        Self {
            scheduler: scheduler.clone(),
            event_loop,
            condition: Rc::new(condition),
        }
    }

    pub fn new(scheduler: &CommandScheduler, condition: impl Fn() -> bool + 'static) -> Self {
        Self {
            scheduler: scheduler.clone(),
            event_loop: scheduler.button_event_loop(),
            condition: Rc::new(condition),
        }
    }

    /// Schedule a new command each time the condition becomes true.
    pub fn on_true<C: Command + 'static>(self, factory: impl FnMut() -> C + 'static) -> Self {
        self.bind_edge(true, factory)
    }

    /// Schedule a new command each time the condition becomes false.
    pub fn on_false<C: Command + 'static>(self, factory: impl FnMut() -> C + 'static) -> Self {
        self.bind_edge(false, factory)
    }

    /// Run a command while the condition holds, cancelling it when it stops holding.
    pub fn while_true<C: Command + 'static>(self, factory: impl FnMut() -> C + 'static) -> Self {
        self.bind_while(true, factory)
    }

    pub fn while_false<C: Command + 'static>(self, factory: impl FnMut() -> C + 'static) -> Self {
        self.bind_while(false, factory)
    }

    /// Start a command when the condition becomes true, or cancel it if it is
    /// still running.
    pub fn toggle_on_true<C: Command + 'static>(
        self,
        factory: impl FnMut() -> C + 'static,
    ) -> Self {
        self.bind_toggle(true, factory)
    }

    pub fn toggle_on_false<C: Command + 'static>(
        self,
        factory: impl FnMut() -> C + 'static,
    ) -> Self {
        self.bind_toggle(false, factory)
    }

    pub fn is_active(&self) -> bool {
        (self.condition)()
    }

    pub fn and(&self, other: &Self) -> Self {
        let condition = self.condition.clone();
        let other_condition = other.condition.clone();
        self.derive(move || condition() && other_condition())
    }

    pub fn or(&self, other: &Self) -> Self {
        let condition = self.condition.clone();
        let other_condition = other.condition.clone();
        self.derive(move || condition() || other_condition())
    }

    pub fn negate(&self) -> Self {
        let condition = self.condition.clone();
        self.derive(move || !condition())
    }

    fn derive(&self, condition: impl Fn() -> bool + 'static) -> Self {
        Self::new_with_loop(&self.scheduler, self.event_loop.clone(), condition)
    }

    fn bind_edge<C: Command + 'static>(
        self,
        edge: bool,
        mut factory: impl FnMut() -> C + 'static,
    ) -> Self {
        let condition = self.condition.clone();
        let scheduler = self.scheduler.clone();
        let mut pressed_last = condition();
        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if pressed != pressed_last && pressed == edge {
                schedule_logged(&scheduler, CommandRef::new(factory()));
            }
            pressed_last = pressed;
        });
        self
    }

    fn bind_while<C: Command + 'static>(
        self,
        active: bool,
        mut factory: impl FnMut() -> C + 'static,
    ) -> Self {
        let condition = self.condition.clone();
        let scheduler = self.scheduler.clone();
        let mut pressed_last = condition();
        let mut running: Option<CommandRef> = None;

        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if pressed != pressed_last {
                if pressed == active {
                    let command = CommandRef::new(factory());
                    schedule_logged(&scheduler, command.clone());
                    running = Some(command);
                } else if let Some(command) = running.take() {
                    cancel_logged(&scheduler, &command);
                }
            }
            pressed_last = pressed;
        });
        self
    }

    fn bind_toggle<C: Command + 'static>(
        self,
        edge: bool,
        mut factory: impl FnMut() -> C + 'static,
    ) -> Self {
        let condition = self.condition.clone();
        let scheduler = self.scheduler.clone();
        let mut pressed_last = condition();
        let mut running: Option<CommandRef> = None;

        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if pressed != pressed_last && pressed == edge {
                match running.take() {
                    Some(command) if scheduler.is_scheduled(&command) => {
                        cancel_logged(&scheduler, &command);
                    }
                    _ => {
                        let command = CommandRef::new(factory());
                        schedule_logged(&scheduler, command.clone());
                        running = Some(command);
                    }
                }
            }
            pressed_last = pressed;
        });
        self
    }
}

fn schedule_logged(scheduler: &CommandScheduler, command: CommandRef) {
    let name = command.name();
    if let Err(error) = scheduler.schedule(command) {
        warn!("trigger could not schedule {}: {}", name, error);
    }
}

fn cancel_logged(scheduler: &CommandScheduler, command: &CommandRef) {
    if let Err(error) = scheduler.cancel(command) {
        warn!("trigger could not cancel {}: {}", command.name(), error);
    }
}

use std::{cell::Cell, cell::RefCell, rc::Rc};

use robot_command::{
    command::{
        group::CommandGroup, trigger::Trigger, Command, CommandState, FunctionalCommand,
        InterruptionBehavior, Wait,
    },
    error::HardwareSnafu,
    subsystem::{Subsystem, SubsystemRefExt},
    telemetry::Telemetry,
    CommandRef, CommandScheduler, Error, Result, SetDefaultCommandError, SubsystemRef,
};

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Default)]
struct Arm {
    ticks: u32,
}

impl Subsystem for Arm {
    fn name(&self) -> &str {
        "Arm"
    }

    fn periodic(&mut self) -> Result {
        self.ticks += 1;
        Ok(())
    }

    fn log_telemetry(&self, telemetry: &mut dyn Telemetry) {
        telemetry.put_number("arm ticks", self.ticks as f64);
    }
}

#[derive(Debug, Default)]
struct Intake;

impl Subsystem for Intake {}

/// Records its lifecycle calls into a shared log.
struct Scripted {
    label: String,
    log: Log,
    requirements: Vec<SubsystemRef>,
    finish_after: Option<u32>,
    executed: u32,
    interruption: InterruptionBehavior,
    runs_when_disabled: bool,
    fails_on_execute: bool,
}

impl Scripted {
    fn new(label: impl Into<String>, log: &Log) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            requirements: Vec::new(),
            finish_after: None,
            executed: 0,
            interruption: InterruptionBehavior::CancelSelf,
            runs_when_disabled: false,
            fails_on_execute: false,
        }
    }

    fn requiring(mut self, subsystem: impl Into<SubsystemRef>) -> Self {
        self.requirements.push(subsystem.into());
        self
    }

    fn finishing_after(mut self, ticks: u32) -> Self {
        self.finish_after = Some(ticks);
        self
    }

    fn failing_on_execute(mut self) -> Self {
        self.fails_on_execute = true;
        self
    }

    fn record(&self, event: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.label, event));
    }
}

impl Command for Scripted {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn initialize(&mut self) -> Result {
        self.record("init");
        Ok(())
    }

    fn execute(&mut self) -> Result {
        self.executed += 1;
        self.record("exec");
        if self.fails_on_execute {
            return HardwareSnafu {
                device: "arm encoder",
                message: "disconnected",
            }
            .fail();
        }
        Ok(())
    }

    fn end(&mut self, interrupted: bool) -> Result {
        self.record(if interrupted { "interrupted" } else { "end" });
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self.finish_after.is_some_and(|n| self.executed >= n))
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled
    }

    fn get_interruption_behavior(&self) -> InterruptionBehavior {
        self.interruption
    }
}

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn events(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

fn count(log: &Log, event: &str) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}

#[test]
fn command_runs_through_its_lifecycle() {
    let scheduler = CommandScheduler::new();
    let log = new_log();
    let command = CommandRef::new(Scripted::new("a", &log).finishing_after(2));

    scheduler.schedule(command.clone()).unwrap();
    assert_eq!(command.state(), CommandState::Idle);
    assert!(scheduler.is_scheduled(&command));

    scheduler.tick().unwrap();
    assert_eq!(command.state(), CommandState::Running);
    assert_eq!(command.started_at(), Some(0));

    scheduler.tick().unwrap();
    assert_eq!(command.state(), CommandState::Finished);
    assert!(!scheduler.is_scheduled(&command));
    assert_eq!(events(&log), ["a:init", "a:exec", "a:exec", "a:end"]);
}

#[test]
fn finished_command_cannot_be_restarted() {
    let scheduler = CommandScheduler::new();
    let log = new_log();
    let command = CommandRef::new(Scripted::new("a", &log).finishing_after(1));
    scheduler.schedule(command.clone()).unwrap();
    scheduler.tick().unwrap();

    let error = scheduler.schedule(command.clone()).unwrap_err();
    assert!(matches!(error, Error::AlreadyRan { .. }));
    scheduler.tick().unwrap();
    assert_eq!(count(&log, "a:init"), 1);
}

#[test]
fn preemption_ends_incumbent_before_newcomer_initializes() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let log = new_log();

    let first = CommandRef::new(Scripted::new("first", &log).requiring(&arm));
    scheduler.schedule(first.clone()).unwrap();
    scheduler.tick().unwrap();

    let second = CommandRef::new(Scripted::new("second", &log).requiring(&arm));
    scheduler.schedule(second.clone()).unwrap();
    scheduler.tick().unwrap();

    assert_eq!(
        events(&log),
        [
            "first:init",
            "first:exec",
            "first:interrupted",
            "second:init",
            "second:exec"
        ]
    );
    assert_eq!(first.state(), CommandState::Interrupted);
    assert_eq!(scheduler.requiring(&arm), Some(second));
}

#[test]
fn cancel_incoming_commands_keep_their_subsystems() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let log = new_log();

    let mut stubborn = Scripted::new("stubborn", &log).requiring(&arm);
    stubborn.interruption = InterruptionBehavior::CancelIncoming;
    let stubborn = CommandRef::new(stubborn);
    scheduler.schedule(stubborn.clone()).unwrap();

    let newcomer = CommandRef::new(Scripted::new("newcomer", &log).requiring(&arm));
    scheduler.schedule(newcomer.clone()).unwrap();
    scheduler.tick().unwrap();

    assert!(scheduler.is_scheduled(&stubborn));
    assert!(!scheduler.is_scheduled(&newcomer));
    assert_eq!(newcomer.state(), CommandState::Idle);
}

#[test]
fn mutual_exclusion_holds_across_a_busy_sequence() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let intake = scheduler.register(Intake);
    let log = new_log();

    let mut all = Vec::new();
    for round in 0..12u32 {
        let mut command = Scripted::new(format!("c{}", round), &log).finishing_after(1 + round % 4);
        if round % 2 == 0 {
            command = command.requiring(&arm);
        }
        if round % 3 == 0 {
            command = command.requiring(&intake);
        }
        let command = CommandRef::new(command);
        scheduler.schedule(command.clone()).unwrap();
        all.push(command);
        scheduler.tick().unwrap();

        let owners: Vec<SubsystemRef> = scheduler
            .scheduled()
            .iter()
            .flat_map(|c| c.requirements())
            .collect();
        for (i, owner) in owners.iter().enumerate() {
            assert!(!owners[i + 1..].contains(owner), "subsystem claimed twice");
        }
    }
    scheduler.cancel_all().unwrap();

    // Every run ended exactly once, one way or the other.
    for command in &all {
        let label = command.name();
        let ended = count(&log, &format!("{}:end", label));
        let interrupted = count(&log, &format!("{}:interrupted", label));
        assert_eq!(ended + interrupted, 1, "{} ended {} times", label, ended + interrupted);
        assert!(command.state().is_terminal());
    }
}

#[test]
fn default_command_fills_idle_subsystem_and_returns_after_preemption() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let log = new_log();

    let built = Rc::new(Cell::new(0));
    scheduler
        .set_default_command(&arm, {
            let log = log.clone();
            let arm = arm.clone();
            let built = built.clone();
            move || {
                built.set(built.get() + 1);
                Scripted::new("hold", &log).requiring(&arm)
            }
        })
        .unwrap();

    scheduler.tick().unwrap();
    assert_eq!(events(&log), ["hold:init", "hold:exec"]);

    let lift = CommandRef::new(Scripted::new("lift", &log).requiring(&arm).finishing_after(1));
    scheduler.schedule(lift).unwrap();
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    assert_eq!(
        events(&log),
        [
            "hold:init",
            "hold:exec",
            "hold:interrupted",
            "lift:init",
            "lift:exec",
            "lift:end",
            "hold:init",
            "hold:exec"
        ]
    );
    assert_eq!(built.get(), 2);
}

#[test]
fn removed_default_command_is_not_rebuilt() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let log = new_log();

    scheduler
        .set_default_command(&arm, {
            let log = log.clone();
            let arm = arm.clone();
            move || Scripted::new("hold", &log).requiring(&arm)
        })
        .unwrap();
    scheduler.tick().unwrap();

    let running = scheduler.remove_default_command(&arm).unwrap();
    assert_eq!(running.state(), CommandState::Running);
    assert_eq!(scheduler.requiring(&arm), Some(running.clone()));

    scheduler.cancel(&running).unwrap();
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert_eq!(count(&log, "hold:init"), 1);
    assert!(scheduler.requiring(&arm).is_none());
}

#[test]
fn default_command_must_require_its_subsystem() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let unregistered = Rc::new(RefCell::new(Intake));
    let log = new_log();

    let error = scheduler
        .set_default_command(&arm, {
            let log = log.clone();
            move || Scripted::new("nothing", &log)
        })
        .unwrap_err();
    assert!(matches!(error, SetDefaultCommandError::MustRequireSubsystem));

    let error = scheduler
        .set_default_command(&unregistered, {
            let log = log.clone();
            let unregistered = unregistered.clone();
            move || Scripted::new("intake", &log).requiring(&unregistered)
        })
        .unwrap_err();
    assert!(matches!(error, SetDefaultCommandError::NotRegistered));

    assert!(scheduler.remove_default_command(&arm).is_none());
}

#[test]
fn sequential_group_waits_for_each_child() {
    let scheduler = CommandScheduler::new();
    let log = new_log();

    let mut group = CommandGroup::new();
    group.add_sequential(Scripted::new("a", &log).finishing_after(1)).unwrap();
    group.add_sequential(Scripted::new("b", &log).finishing_after(2)).unwrap();
    group.add_sequential(Scripted::new("c", &log).finishing_after(1)).unwrap();
    let group = CommandRef::new(group);
    scheduler.schedule(group.clone()).unwrap();

    for _ in 0..3 {
        scheduler.tick().unwrap();
    }

    assert_eq!(
        events(&log),
        [
            "a:init", "a:exec", "a:end", "b:init", "b:exec", "b:exec", "b:end", "c:init",
            "c:exec", "c:end"
        ]
    );
    assert_eq!(group.state(), CommandState::Finished);
}

#[test]
fn parallel_children_start_together_and_hold_the_group_open() {
    let scheduler = CommandScheduler::new();
    let log = new_log();

    let mut group = CommandGroup::new();
    group.add_parallel(Scripted::new("x", &log).finishing_after(1)).unwrap();
    group.add_parallel(Scripted::new("y", &log).finishing_after(3)).unwrap();
    group.add_sequential(Scripted::new("s", &log).finishing_after(1)).unwrap();
    let group = CommandRef::new(group);
    scheduler.schedule(group.clone()).unwrap();

    scheduler.tick().unwrap();
    {
        let log = events(&log);
        assert_eq!(&log[..3], ["x:init", "y:init", "s:init"]);
    }
    assert_eq!(group.state(), CommandState::Running);

    scheduler.tick().unwrap();
    assert_eq!(group.state(), CommandState::Running);
    scheduler.tick().unwrap();
    assert_eq!(group.state(), CommandState::Finished);
    assert_eq!(count(&log, "y:end"), 1);
}

#[test]
fn cancelling_a_group_interrupts_only_the_active_child() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let log = new_log();

    let mut group = CommandGroup::new();
    group
        .add_sequential(Scripted::new("a", &log).requiring(&arm).finishing_after(1))
        .unwrap();
    group.add_sequential(Scripted::new("b", &log).requiring(&arm)).unwrap();
    group.add_sequential(Scripted::new("c", &log).requiring(&arm)).unwrap();
    let group = CommandRef::new(group);
    scheduler.schedule(group.clone()).unwrap();
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    scheduler.cancel(&group).unwrap();
    assert_eq!(group.state(), CommandState::Interrupted);
    assert_eq!(count(&log, "a:end"), 1);
    assert_eq!(count(&log, "b:interrupted"), 1);
    assert!(!events(&log).iter().any(|e| e.starts_with("c:")));
    assert!(scheduler.requiring(&arm).is_none());
}

#[test]
fn group_claims_the_union_of_child_subsystems() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let intake = scheduler.register(Intake);
    let log = new_log();

    let mut group = CommandGroup::new();
    group.add_parallel(Scripted::new("spin", &log).requiring(&intake)).unwrap();
    group.add_sequential(Scripted::new("raise", &log).requiring(&arm)).unwrap();
    let group = CommandRef::new(group);
    scheduler.schedule(group.clone()).unwrap();

    assert_eq!(scheduler.requiring(&arm), Some(group.clone()));
    assert_eq!(scheduler.requiring(&intake), Some(group));
}

#[test]
fn schedule_requests_from_inside_a_tick_apply_after_execution() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let intake = scheduler.register(Intake);
    let log = new_log();

    let victim = CommandRef::new(Scripted::new("victim", &log).requiring(&arm));
    let spawned = CommandRef::new(Scripted::new("spawned", &log).requiring(&arm));
    scheduler.schedule(victim.clone()).unwrap();
    scheduler
        .schedule(intake.run_once({
            let scheduler = scheduler.clone();
            let spawned = spawned.clone();
            move || scheduler.schedule(spawned.clone())
        }))
        .unwrap();

    scheduler.tick().unwrap();
    // The victim still executes on the tick the preempting request is made.
    assert_eq!(
        events(&log),
        ["victim:init", "victim:exec", "victim:interrupted"]
    );
    assert!(scheduler.is_scheduled(&spawned));
    assert_eq!(spawned.state(), CommandState::Idle);

    scheduler.tick().unwrap();
    assert_eq!(spawned.state(), CommandState::Running);
}

#[test]
fn cancel_requests_from_inside_a_tick_apply_after_execution() {
    let scheduler = CommandScheduler::new();
    let log = new_log();

    let victim = CommandRef::new(Scripted::new("victim", &log));
    scheduler
        .schedule(FunctionalCommand::instant(
            {
                let scheduler = scheduler.clone();
                let victim = victim.clone();
                move || scheduler.cancel(&victim)
            },
            vec![],
        ))
        .unwrap();
    scheduler.schedule(victim.clone()).unwrap();

    scheduler.tick().unwrap();
    assert_eq!(
        events(&log),
        ["victim:init", "victim:exec", "victim:interrupted"]
    );
    assert!(scheduler.scheduled().is_empty());
}

#[test]
fn failing_command_does_not_stop_the_rest_of_the_tick() {
    let scheduler = CommandScheduler::new();
    let log = new_log();

    let victim = CommandRef::new(Scripted::new("victim", &log));
    let canceller = CommandRef::new(FunctionalCommand::new(
        || Ok(()),
        {
            let scheduler = scheduler.clone();
            let victim = victim.clone();
            move || scheduler.cancel(&victim)
        },
        |_| Ok(()),
        || Ok(false),
        vec![],
    ));
    let failer = CommandRef::new(Scripted::new("failer", &log).failing_on_execute());
    let other = CommandRef::new(Scripted::new("other", &log));
    for command in [&victim, &canceller, &failer, &other] {
        scheduler.schedule(command.clone()).unwrap();
    }

    assert!(matches!(scheduler.tick(), Err(Error::Hardware { .. })));
    assert_eq!(
        events(&log),
        [
            "victim:init",
            "victim:exec",
            "failer:init",
            "failer:exec",
            "failer:interrupted",
            "other:init",
            "other:exec",
            "victim:interrupted",
        ]
    );
    assert_eq!(victim.state(), CommandState::Interrupted);
    assert_eq!(failer.state(), CommandState::Interrupted);
    assert!(!scheduler.is_scheduled(&failer));
    assert_eq!(scheduler.scheduled(), [canceller, other]);

    scheduler.tick().unwrap();
    assert_eq!(count(&log, "other:exec"), 2);
    assert_eq!(count(&log, "failer:exec"), 1);
}

#[test]
fn disabled_scheduler_interrupts_and_refuses_commands() {
    let scheduler = CommandScheduler::new();
    let log = new_log();

    let drive = CommandRef::new(Scripted::new("drive", &log));
    let mut lights = Scripted::new("lights", &log);
    lights.runs_when_disabled = true;
    let lights = CommandRef::new(lights);
    scheduler.schedule(drive.clone()).unwrap();
    scheduler.schedule(lights.clone()).unwrap();
    scheduler.tick().unwrap();

    scheduler.set_disabled(true);
    scheduler.tick().unwrap();
    assert_eq!(drive.state(), CommandState::Interrupted);
    assert_eq!(lights.state(), CommandState::Running);

    let refused = CommandRef::new(Scripted::new("refused", &log));
    scheduler.schedule(refused.clone()).unwrap();
    assert!(!scheduler.is_scheduled(&refused));
}

#[test]
fn wait_finishes_after_its_ticks() {
    let scheduler = CommandScheduler::new();
    let wait = CommandRef::new(Wait::ticks(3));
    scheduler.schedule(wait.clone()).unwrap();
    for _ in 0..2 {
        scheduler.tick().unwrap();
    }
    assert_eq!(wait.state(), CommandState::Running);
    scheduler.tick().unwrap();
    assert_eq!(wait.state(), CommandState::Finished);
}

#[test]
fn triggers_schedule_fresh_commands_on_edges() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let log = new_log();
    let button = Rc::new(Cell::new(false));

    Trigger::new(&scheduler, {
        let button = button.clone();
        move || button.get()
    })
    .while_true({
        let log = log.clone();
        let arm = arm.clone();
        move || Scripted::new("held", &log).requiring(&arm)
    });

    scheduler.tick().unwrap();
    assert!(events(&log).is_empty());

    button.set(true);
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert_eq!(events(&log), ["held:init", "held:exec", "held:exec"]);

    button.set(false);
    scheduler.tick().unwrap();
    assert_eq!(count(&log, "held:interrupted"), 1);

    button.set(true);
    scheduler.tick().unwrap();
    assert_eq!(count(&log, "held:init"), 2);
}

#[test]
fn toggle_trigger_alternates_start_and_cancel() {
    let scheduler = CommandScheduler::new();
    let log = new_log();
    let button = Rc::new(Cell::new(false));

    Trigger::new(&scheduler, {
        let button = button.clone();
        move || button.get()
    })
    .toggle_on_true({
        let log = log.clone();
        move || Scripted::new("toggled", &log)
    });

    let press = |scheduler: &CommandScheduler| {
        button.set(true);
        scheduler.tick().unwrap();
        button.set(false);
        scheduler.tick().unwrap();
    };

    press(&scheduler);
    assert_eq!(scheduler.scheduled().len(), 1);
    press(&scheduler);
    assert!(scheduler.scheduled().is_empty());
    assert_eq!(count(&log, "toggled:interrupted"), 1);
}

#[derive(Clone, Default)]
struct Dashboard(Rc<RefCell<Vec<(String, f64)>>>);

impl Telemetry for Dashboard {
    fn put_number(&mut self, key: &str, value: f64) {
        self.0.borrow_mut().push((key.into(), value));
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.put_number(key, if value { 1.0 } else { 0.0 });
    }
}

#[test]
fn subsystems_run_periodic_and_publish_each_tick() {
    let scheduler = CommandScheduler::new();
    let arm = scheduler.register(Arm::default());
    let dashboard = Dashboard::default();
    scheduler.set_telemetry(dashboard.clone());

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    assert_eq!(arm.borrow().ticks, 2);
    assert_eq!(scheduler.now(), 2);
    assert_eq!(
        *dashboard.0.borrow(),
        [("arm ticks".to_string(), 1.0), ("arm ticks".to_string(), 2.0)]
    );
}

use std::{cell::RefCell, rc::Rc};

use log::{debug, info, warn};
use robot_command::{
    command::{group::CommandGroup, trigger::Trigger},
    drivetrain::{
        commands::{DriveStraight, DrivetrainRef, FollowProfile, TankDrive},
        profile::{ProfileKind, Trajectory},
        DrivetrainController,
    },
    robot::ScheduledRobot,
    subsystem::SubsystemRefExt,
    telemetry::LogDiagnostics,
    CommandRef, CommandScheduler, Result,
};

use crate::{
    commands::{LiftCube, LiftUp, Outtake},
    config::RobotConfig,
    dashboard::Dashboard,
    operator::Gamepad,
    sim::{SimDrive, SimGyro, SimWorld},
    subsystems::{
        led::{Color, Led},
        lift::Lift,
    },
};

/// Iterations between dashboard dumps, one second at the default period.
const DASHBOARD_EVERY: u64 = 50;

/// Owns every subsystem and the scheduler, and wires them to the operator.
pub struct Robot {
    scheduler: CommandScheduler,
    world: SimWorld,
    dashboard: Dashboard,
    drivetrain: DrivetrainRef<SimDrive, SimGyro>,
    lift: Rc<RefCell<Lift>>,
    led: Rc<RefCell<Led>>,
    auto_profile: Trajectory,
    outtake_ticks: u64,
    auto_command: Option<CommandRef>,
}

impl Robot {
    pub fn new(config: &RobotConfig, world: SimWorld) -> Result<Self> {
        let scheduler = CommandScheduler::new();
        let dashboard = Dashboard::new();
        scheduler.set_telemetry(dashboard.clone());

        let drivetrain = scheduler.register(DrivetrainController::new(
            config.drivetrain.clone(),
            world.drive(),
            world.gyro(config.simulate_gyro_fault),
            &mut LogDiagnostics,
        ));
        let lift = scheduler.register(Lift::new(world.lift_motor(), config.lift.clone()));
        let led = scheduler.register(Led::default());

        let auto_profile =
            Trajectory::from_sides(ProfileKind::Velocity, &config.auto.left, &config.auto.right)?;
        info!("autonomous profile has {} samples", auto_profile.len());

        Ok(Self {
            scheduler,
            world,
            dashboard,
            drivetrain,
            lift,
            led,
            auto_profile,
            outtake_ticks: config.auto.outtake_ticks,
            auto_command: None,
        })
    }

    pub fn configure_button_bindings(&mut self, gamepad: &Gamepad) {
        let drivetrain = self.drivetrain.clone();
        let input = gamepad.clone();
        let set_default = self.scheduler.set_default_command(&self.drivetrain, move || {
            let input = input.clone();
            TankDrive::new(drivetrain.clone(), move || (input.left_y(), input.right_y()))
        });
        if let Err(e) = set_default {
            warn!("could not set the drivetrain default command: {}", e);
        }

        let lift = self.lift.clone();
        let input = gamepad.clone();
        let set_default = self
            .scheduler
            .set_default_command(&self.lift, move || LiftCube::new(lift.clone(), input.clone()));
        if let Err(e) = set_default {
            warn!("could not set the lift default command: {}", e);
        }

        let input = gamepad.clone();
        let lift = self.lift.clone();
        Trigger::new(&self.scheduler, move || input.toggle_raw_lift()).on_true(move || {
            let handle = lift.clone();
            lift.run_once(move || {
                handle.borrow_mut().toggle_raw_mode();
                Ok(())
            })
        });

        let input = gamepad.clone();
        let drivetrain = self.drivetrain.clone();
        Trigger::new(&self.scheduler, move || input.drive_straight())
            .while_true(move || DriveStraight::new(drivetrain.clone(), 0.5, f64::INFINITY));
    }

    /// Start in the middle and score on the left side of the switch.
    fn middle_left_auto(&self) -> Result<CommandGroup> {
        let mut auto = CommandGroup::new();

        let led = self.led.clone();
        auto.add_parallel(self.led.run_once(move || {
            led.borrow_mut().set_solid(Color::Blue);
            Ok(())
        }))?;

        let lift = self.lift.clone();
        auto.add_sequential(self.lift.run_once(move || {
            lift.borrow_mut().reset_top_position();
            Ok(())
        }))?;
        auto.add_sequential(LiftUp::new(self.lift.clone()))?;
        auto.add_sequential(FollowProfile::new(
            self.drivetrain.clone(),
            self.auto_profile.clone(),
        ))?;
        auto.add_sequential(Outtake::ticks(self.lift.clone(), self.outtake_ticks))?;
        Ok(auto)
    }
}

impl ScheduledRobot for Robot {
    fn periodic(&mut self) -> Result {
        let result = self.scheduler.tick();
        self.world.step();

        if self.scheduler.now() % DASHBOARD_EVERY == 0 {
            debug!("dashboard: {}", self.dashboard.summary());
        }
        result
    }

    fn disabled_init(&mut self) -> Result {
        self.scheduler.set_disabled(true);
        self.drivetrain.borrow_mut().stop()
    }

    fn autonomous_init(&mut self) -> Result {
        self.scheduler.set_disabled(false);
        {
            let mut drivetrain = self.drivetrain.borrow_mut();
            if !drivetrain.is_degraded() {
                drivetrain.zero_heading()?;
            }
        }

        let auto = CommandRef::new(self.middle_left_auto()?);
        self.scheduler.schedule(auto.clone())?;
        self.auto_command = Some(auto);
        Ok(())
    }

    fn teleop_init(&mut self) -> Result {
        self.scheduler.set_disabled(false);
        if let Some(auto) = self.auto_command.take() {
            if self.scheduler.is_scheduled(&auto) {
                info!("stopping autonomous for teleop");
            }
            self.scheduler.cancel(&auto)?;
        }
        Ok(())
    }
}

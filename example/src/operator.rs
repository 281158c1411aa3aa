use std::{cell::Cell, rc::Rc};

#[derive(Debug, Default)]
struct GamepadState {
    left_y: Cell<f64>,
    right_y: Cell<f64>,
    secondary_y: Cell<f64>,
    intake: Cell<bool>,
    outtake: Cell<bool>,
    open_claw: Cell<bool>,
    switch_height: Cell<bool>,
    lift_bottom: Cell<bool>,
    toggle_raw_lift: Cell<bool>,
    drive_straight: Cell<bool>,
}

/// Operator inputs. Clones read the same sticks and buttons.
///
/// With no driver station attached, [`Gamepad::script`] plays back a fixed
/// sequence of inputs instead.
#[derive(Debug, Clone, Default)]
pub struct Gamepad(Rc<GamepadState>);

macro_rules! inputs {
    ($($name:ident: $ty:ty),* $(,)?) => {
        impl Gamepad {
            $(
                pub fn $name(&self) -> $ty {
                    self.0.$name.get()
                }
            )*
        }
    };
}

inputs! {
    left_y: f64,
    right_y: f64,
    secondary_y: f64,
    intake: bool,
    outtake: bool,
    open_claw: bool,
    switch_height: bool,
    lift_bottom: bool,
    toggle_raw_lift: bool,
    drive_straight: bool,
}

impl Gamepad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inputs for iteration `tick` of the scripted teleop period.
    pub fn script(&self, tick: u32) {
        let state = &*self.0;
        let (left, right) = match tick {
            0..=99 => (0.5, 0.5),
            100..=149 => (0.3, 0.6),
            _ => (0.0, 0.0),
        };
        state.left_y.set(left);
        state.right_y.set(right);
        state.intake.set((100..150).contains(&tick));
        state.drive_straight.set((150..200).contains(&tick));
        state.switch_height.set((200..210).contains(&tick));
        state.toggle_raw_lift.set((260..270).contains(&tick) || (320..330).contains(&tick));
        state.secondary_y.set(match tick {
            210..=259 => -0.5,
            270..=319 => 0.3,
            _ => 0.0,
        });
        state.outtake.set((340..380).contains(&tick));
        state.open_claw.set((380..400).contains(&tick));
        state.lift_bottom.set((400..410).contains(&tick));
    }
}

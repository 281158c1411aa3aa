use robot_command::{subsystem::Subsystem, telemetry::Telemetry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Off,
    Red,
    Blue,
}

/// Status light strip.
#[derive(Debug, Default)]
pub struct Led {
    color: Color,
}

impl Led {
    pub fn set_solid(&mut self, color: Color) {
        self.color = color;
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

impl Subsystem for Led {
    fn name(&self) -> &str {
        "LED"
    }

    fn log_telemetry(&self, telemetry: &mut dyn Telemetry) {
        telemetry.put_bool("LED on", self.color != Color::Off);
    }
}

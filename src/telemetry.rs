//! Outbound collaborators: dashboard readouts and fault reports.
//!
//! How readouts are transported or displayed is up to the implementor.

use log::error;

/// Named readouts published once per tick.
pub trait Telemetry {
    fn put_number(&mut self, key: &str, value: f64);
    fn put_bool(&mut self, key: &str, value: bool);
}

/// Receives faults that do not stop the robot but that an operator should see.
pub trait Diagnostics {
    fn report_error(&mut self, message: &str);
}

/// Reports faults through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report_error(&mut self, message: &str) {
        error!("{}", message);
    }
}

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use robot_command::telemetry::Telemetry;

/// Keeps the latest value of every readout. Clones share the same readouts.
#[derive(Debug, Clone, Default)]
pub struct Dashboard(Rc<RefCell<BTreeMap<String, String>>>);

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key).cloned()
    }

    /// All readouts on one line, sorted by key.
    pub fn summary(&self) -> String {
        self.0
            .borrow()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Telemetry for Dashboard {
    fn put_number(&mut self, key: &str, value: f64) {
        self.0.borrow_mut().insert(key.into(), format!("{value:.2}"));
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.0.borrow_mut().insert(key.into(), value.to_string());
    }
}

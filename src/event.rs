use alloc::{boxed::Box, vec::Vec};

/// Actions polled once at the start of every scheduler tick.
#[derive(Default)]
pub struct EventLoop {
    events: Vec<Box<dyn FnMut()>>,
}

impl EventLoop {
    /// Add an event to run when the loop is polled.
    pub fn bind(&mut self, action: impl FnMut() + 'static) {
        self.events.push(Box::new(action));
    }

    /// Run every bound event in the order it was bound.
    pub fn poll(&mut self) {
        for event in self.events.iter_mut() {
            event();
        }
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

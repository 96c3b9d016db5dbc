use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::bus;
use super::event::SecurityEvent;

/// Emission capability handed to detector and controller constructors, so
/// callers choose their egress explicitly instead of reaching for process
/// state. The default forwards to the process-wide bus.
#[derive(Clone, Default)]
pub struct Notifier {
    sink: Option<bus::Sink>,
}

impl Notifier {
    /// Forwards every event to the process-wide telemetry bus.
    pub fn global() -> Self {
        Notifier { sink: None }
    }

    /// Routes events to `sink` directly, bypassing the bus slot.
    pub fn with_sink<F>(sink: F) -> Self
    where
        F: Fn(&SecurityEvent) + Send + Sync + 'static,
    {
        Notifier {
            sink: Some(Arc::new(sink)),
        }
    }

    /// Same guarantee as `bus::emit`: never fails, never unwinds.
    pub fn notify(&self, event: &SecurityEvent) {
        match &self.sink {
            Some(sink) => {
                let _ = catch_unwind(AssertUnwindSafe(|| sink(event)));
            }
            None => bus::emit(event),
        }
    }
}

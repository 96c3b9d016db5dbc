use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::event::SecurityEvent;

/// A registered consumer of security events. Invoked synchronously; must not
/// be relied on to behave — `emit` guards against anything it does.
pub type Sink = Arc<dyn Fn(&SecurityEvent) + Send + Sync>;

// Single slot, process-wide. Absence means telemetry is disabled.
lazy_static::lazy_static! {
    static ref SINK_SLOT: RwLock<Option<Sink>> = RwLock::new(None);
}

/// Replaces the current sink unconditionally. Last registration wins; there
/// is no unregister — the slot lives until process exit.
pub fn register_sink<F>(sink: F)
where
    F: Fn(&SecurityEvent) + Send + Sync + 'static,
{
    let mut slot = SINK_SLOT.write().unwrap_or_else(|e| e.into_inner());
    *slot = Some(Arc::new(sink));
}

/// Delivers one event to the registered sink, if any.
///
/// This is the sole egress path for security events. It never fails from the
/// caller's perspective: no sink is a silent success, and a panicking sink is
/// caught and discarded here rather than unwinding into the host.
pub fn emit(event: &SecurityEvent) {
    let sink = {
        let slot = SINK_SLOT.read().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    };

    let Some(sink) = sink else {
        debug!(event = "telemetry_dropped_no_sink", vector = %event.vector);
        return;
    };

    if catch_unwind(AssertUnwindSafe(|| sink(event))).is_err() {
        debug!(event = "telemetry_sink_panicked", vector = %event.vector);
    }
}

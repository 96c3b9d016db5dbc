use metrics::counter;

use crate::telemetry::event::SecurityEvent;

/// Records one detection for the security dashboard.
///
/// Labels stay low-cardinality: vector tag and severity only, never the
/// directive text.
pub fn record_detection_telemetry(event: &SecurityEvent) {
    counter!("sttf_guard_detections_total",
             1,
             "vector" => event.vector.clone(),
             "level" => event.level.as_str());
}

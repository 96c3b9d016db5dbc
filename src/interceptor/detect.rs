//! Detection facade: fragment parse plus a single telemetry emission.

use tracing::info;

use super::fragment::{self, DirectiveSet};
use crate::telemetry::event::SecurityEvent;
use crate::telemetry::notifier::Notifier;

/// Detector bound to an explicit emission capability. Construct with
/// `Notifier::global()` to report through the process-wide bus, or with a
/// direct sink for isolated pipelines.
#[derive(Clone, Default)]
pub struct Detector {
    notifier: Notifier,
}

impl Detector {
    pub fn new(notifier: Notifier) -> Self {
        Detector { notifier }
    }

    /// Returns whether `url` carries scroll-to-text directives, emitting
    /// exactly one INFO event when it does and nothing otherwise.
    ///
    /// Never raises: parse failures surface as absence, and the notifier
    /// swallows sink misbehavior.
    pub fn detect(&self, url: &str, path: Option<&str>) -> bool {
        self.inspect(url, path).is_some()
    }

    /// As `detect`, but hands the parsed directives back to the caller.
    pub fn inspect(&self, url: &str, path: Option<&str>) -> Option<DirectiveSet> {
        let directives = fragment::parse(url)?;

        info!(
            event = "sttf_directives_detected",
            directive_count = directives.len(),
            path = path.unwrap_or("-"),
        );

        self.notifier
            .notify(&SecurityEvent::sttf(&directives, path));
        Some(directives)
    }
}

/// Bus-wired convenience entry point used by route adapters.
pub fn detect(url: &str, path: Option<&str>) -> bool {
    Detector::new(Notifier::global()).detect(url, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn capturing_detector() -> (Detector, Arc<Mutex<Vec<SecurityEvent>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let events = captured.clone();
        let detector = Detector::new(Notifier::with_sink(move |event| {
            events.lock().unwrap().push(event.clone());
        }));
        (detector, captured)
    }

    #[test]
    fn absent_directives_emit_nothing() {
        let (detector, captured) = capturing_detector();

        assert!(!detector.detect("/page", None));
        assert!(!detector.detect("/page#section", Some("/page")));
        assert!(!detector.detect("not a valid url", None));

        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn one_event_per_detection_with_joined_detail() {
        let (detector, captured) = capturing_detector();

        assert!(detector.detect("/page#:~:text=one&text=two", Some("/page")));

        let events = captured.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].detail.as_deref(), Some("one;two"));
        assert_eq!(events[0].vector, "STTF");
        assert_eq!(events[0].path.as_deref(), Some("/page"));
    }

    #[test]
    fn path_is_omitted_when_not_supplied() {
        let (detector, captured) = capturing_detector();

        assert!(detector.detect("/page#:~:text=secret", None));
        assert_eq!(captured.lock().unwrap()[0].path, None);
    }

    #[test]
    fn throwing_sink_never_propagates_past_detect() {
        let detector = Detector::new(Notifier::with_sink(|_| panic!("sink failure")));
        assert!(detector.detect("/page#:~:text=secret", None));
    }

    #[test]
    fn inspect_returns_the_parsed_set() {
        let (detector, captured) = capturing_detector();

        let set = detector.inspect("/page#:~:text=a", None).unwrap();
        assert_eq!(set.as_slice(), ["a".to_string()]);
        assert_eq!(captured.lock().unwrap().len(), 1);

        assert!(detector.inspect("/page", None).is_none());
        assert_eq!(captured.lock().unwrap().len(), 1);
    }
}

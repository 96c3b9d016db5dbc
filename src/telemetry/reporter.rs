use tracing::debug;

use super::event::SecurityEvent;

/// Ships events to an HTTP collector as JSON POSTs, best effort.
///
/// Delivery runs detached on the ambient runtime so the emitting call path
/// never waits on the network; failures of any kind are dropped.
#[derive(Clone)]
pub struct HttpReporter {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpReporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpReporter {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fire-and-forget delivery of one event.
    pub fn report(&self, event: &SecurityEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(event = "telemetry_report_dropped_no_runtime", endpoint = %self.endpoint);
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let payload = event.clone();
        handle.spawn(async move {
            if let Err(err) = client.post(&endpoint).json(&payload).send().await {
                debug!(event = "telemetry_report_failed", endpoint = %endpoint, error = %err);
            }
        });
    }

    /// Adapts the reporter into a bus sink.
    pub fn into_sink(self) -> impl Fn(&SecurityEvent) + Send + Sync {
        move |event| self.report(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::fragment::DirectiveSet;

    fn sample_event() -> SecurityEvent {
        let set = DirectiveSet::new(vec!["x".to_string()]).unwrap();
        SecurityEvent::sttf(&set, None)
    }

    #[test]
    fn report_outside_runtime_is_dropped_not_fatal() {
        let reporter = HttpReporter::new("http://127.0.0.1:9/collect");
        reporter.report(&sample_event());
    }

    #[tokio::test]
    async fn report_to_unreachable_endpoint_is_swallowed() {
        // Port 9 (discard) refuses connections; delivery must fail quietly.
        let reporter = HttpReporter::new("http://127.0.0.1:9/collect");
        reporter.report(&sample_event());
        tokio::task::yield_now().await;
    }
}

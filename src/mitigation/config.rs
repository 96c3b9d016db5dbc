use std::sync::Arc;

use crate::interceptor::fragment::DirectiveSet;
use crate::telemetry::event::SecurityEvent;
use crate::telemetry::notifier::Notifier;

/// Invoked at most once per page-view, with the decoded directives.
pub type DetectionCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ffef8f";

/// Per-page-view mitigation options. `Default` is the `balanced` preset.
#[derive(Clone)]
pub struct ProtectionConfig {
    /// Master switch; off means the controller does nothing at all.
    pub enabled: bool,
    /// Apply a visual highlight when the searched text is found.
    pub show_highlight: bool,
    /// Attach the copy affordance next to the highlight.
    pub enable_copy_ui: bool,
    pub highlight_color: String,
    /// Noise-phase ceiling. Larger budgets blur the timing oracle harder at
    /// the cost of perceived load delay; zero skips the phase.
    pub noise_budget_ms: u64,
    pub on_detected: Option<DetectionCallback>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl ProtectionConfig {
    pub fn strict() -> Self {
        ProtectionConfig {
            enabled: true,
            show_highlight: true,
            enable_copy_ui: true,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            noise_budget_ms: 500,
            on_detected: None,
        }
    }

    pub fn balanced() -> Self {
        ProtectionConfig {
            noise_budget_ms: 300,
            ..Self::strict()
        }
    }

    /// Detection-only: no noise padding, no highlight, no copy UI.
    pub fn permissive() -> Self {
        ProtectionConfig {
            show_highlight: false,
            enable_copy_ui: false,
            noise_budget_ms: 0,
            ..Self::strict()
        }
    }

    pub fn with_on_detected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.on_detected = Some(Arc::new(callback));
        self
    }

    /// Wires `on_detected` to the telemetry contract: one INFO event per
    /// detected page-view, reported through `notifier`.
    pub fn with_telemetry(self, notifier: Notifier, path: Option<String>) -> Self {
        self.with_on_detected(move |directives| {
            let Some(set) = DirectiveSet::new(directives.to_vec()) else {
                return;
            };
            notifier.notify(&SecurityEvent::sttf(&set, path.as_deref()));
        })
    }
}

//! One-shot, per-page-view mitigation state machine.
//!
//! The native scroll-to-text behavior leaks match/no-match through scroll
//! position and resource-load timing. The controller pre-empts the native
//! scroll, makes both branches spend the same noise budget, and only then
//! reveals its own observably-equivalent highlight.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, info};

use super::config::ProtectionConfig;
use super::dom::{DocumentModel, NodeId, NodeKind};
use crate::interceptor::fragment::{self, DirectiveSet};

/// Settles when one forced-eager resource finishes loading. A failed load
/// settles too; only the controller's budget bounds the wait.
pub type ResourceLoad = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The page surface the controller drives. Implementations adapt the real
/// page; tests substitute instrumented fakes.
#[async_trait]
pub trait PageHost: Send {
    /// Current document URL, fragment included.
    fn location(&self) -> String;

    fn document_mut(&mut self) -> &mut DocumentModel;

    /// Jump the viewport to the top with smooth scrolling disabled. Runs on
    /// the earliest tick after DOM availability, before the native
    /// fragment scroll can fire.
    fn interrupt_native_scroll(&mut self);

    /// Switch lazily-loaded resources to eager and return their settlement
    /// futures.
    fn force_eager_loads(&mut self) -> Vec<ResourceLoad>;

    /// Smooth-scroll the viewport to `target`.
    async fn reveal(&mut self, target: NodeId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Match,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MitigationState {
    Idle,
    ScrollIntercepted,
    NoisePhase,
    Resolved(Resolution),
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Match,
    NoMatch,
    /// Disabled, or the one-shot guard already fired for this page-view.
    Skipped,
}

/// Owns the DOM nodes the controller injected for the current page-view.
#[derive(Debug, Clone, Copy)]
struct HighlightHandle {
    mark: NodeId,
    affordance: Option<NodeId>,
}

pub struct MitigationController {
    config: ProtectionConfig,
    state: MitigationState,
    executed: bool,
    highlight: Option<HighlightHandle>,
}

impl MitigationController {
    pub fn new(config: ProtectionConfig) -> Self {
        MitigationController {
            config,
            state: MitigationState::Idle,
            executed: false,
            highlight: None,
        }
    }

    pub fn state(&self) -> MitigationState {
        self.state
    }

    /// Runs the mitigation once for the current page-view. Idempotent: a
    /// second call is a no-op until `reset`. Never raises.
    pub async fn run<H: PageHost>(&mut self, host: &mut H) -> Outcome {
        if !self.config.enabled || self.executed {
            return Outcome::Skipped;
        }
        self.executed = true;

        // Pre-empt the native fragment scroll before it can leak anything.
        self.state = MitigationState::ScrollIntercepted;
        host.interrupt_native_scroll();

        let directives = fragment::parse(&host.location());

        // Both branches pay the same cost here; an outside observer sees
        // identical load timing whether or not anything matched.
        self.state = MitigationState::NoisePhase;
        self.noise_phase(host).await;

        let Some(directives) = directives else {
            self.state = MitigationState::Resolved(Resolution::NoMatch);
            return Outcome::NoMatch;
        };

        self.invoke_detection_callback(&directives);

        let needle = search_text(&directives);
        let found = host.document_mut().find_text(needle);
        let Some(found) = found else {
            debug!(event = "sttf_mitigation_no_match", needle_len = needle.len());
            self.state = MitigationState::Resolved(Resolution::NoMatch);
            return Outcome::NoMatch;
        };

        if self.config.show_highlight {
            self.apply_highlight(host, found).await;
        }

        info!(event = "sttf_mitigation_match", highlighted = self.highlight.is_some());
        self.state = MitigationState::Resolved(Resolution::Match);
        Outcome::Match
    }

    /// Uniform delay window: force eager loads, wait for settlement up to the
    /// budget, then pad out the remainder so match and no-match spend equal
    /// wall clock.
    async fn noise_phase<H: PageHost>(&self, host: &mut H) {
        let budget = Duration::from_millis(self.config.noise_budget_ms);
        if budget.is_zero() {
            return;
        }

        let started = Instant::now();
        let loads = host.force_eager_loads();
        if !loads.is_empty() {
            let _ = timeout(budget, join_all(loads)).await;
        }

        let elapsed = started.elapsed();
        if elapsed < budget {
            sleep(budget - elapsed).await;
        }
    }

    fn invoke_detection_callback(&self, directives: &DirectiveSet) {
        let Some(callback) = &self.config.on_detected else {
            return;
        };
        // Caller-supplied code; its failures stay its own.
        if catch_unwind(AssertUnwindSafe(|| callback(directives.as_slice()))).is_err() {
            debug!(event = "sttf_detection_callback_panicked");
        }
    }

    async fn apply_highlight<H: PageHost>(&mut self, host: &mut H, found: super::dom::TextMatch) {
        let doc = host.document_mut();
        let Some(mark) = doc.highlight(found, &self.config.highlight_color) else {
            return;
        };

        let affordance = if self.config.enable_copy_ui {
            attach_copy_affordance(doc, mark)
        } else {
            None
        };
        self.highlight = Some(HighlightHandle { mark, affordance });

        // Safe only now: the noise phase already finished, so this scroll's
        // timing carries no information about the match.
        host.reveal(mark).await;
    }

    /// Page-view unmount: unwrap the highlight, drop the affordance, restore
    /// the DOM to its pre-highlight shape.
    pub fn teardown<H: PageHost>(&mut self, host: &mut H) {
        if let Some(handle) = self.highlight.take() {
            let doc = host.document_mut();
            if let Some(affordance) = handle.affordance {
                doc.remove(affordance);
            }
            doc.unwrap_highlight(handle.mark);
        }
        self.state = MitigationState::TornDown;
    }

    /// Re-arms the one-shot guard on a client-side re-mount.
    pub fn reset(&mut self) {
        self.executed = false;
        self.highlight = None;
        self.state = MitigationState::Idle;
    }
}

/// Search text for the document walk: first directive, split on `,`, first
/// piece. Ranges match loosely on their start term; context sub-syntax is
/// not interpreted.
fn search_text(directives: &DirectiveSet) -> &str {
    let first = directives.first();
    first.split(',').next().unwrap_or(first)
}

fn attach_copy_affordance(doc: &mut DocumentModel, mark: NodeId) -> Option<NodeId> {
    let text = doc.collect_text(mark);
    doc.insert_after(
        mark,
        NodeKind::Element {
            tag: "button".to_string(),
            hidden: false,
            attrs: vec![
                ("class".to_string(), "sttf-copy".to_string()),
                ("data-copy-text".to_string(), text),
            ],
        },
    )
}

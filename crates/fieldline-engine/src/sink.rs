//! Event sinks: the fan-out seam for notifications, audit, and settlement
//!
//! The orchestrator emits one event per state transition, strictly after
//! the transition's own commit. Sinks are fire-and-forget: `emit` cannot
//! fail, and a sink that needs durability or retries buffers internally.

use fieldline_types::WorkflowEvent;
use tracing::info;

/// Receives workflow events after their transition commits.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &WorkflowEvent);
}

/// Logs each event through `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &WorkflowEvent) {
        info!(
            event = event.name(),
            request_id = %event.request_id(),
            "workflow event"
        );
    }
}

/// Discards every event. For embedders with no notification fan-out.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &WorkflowEvent) {}
}

use portcullis_core::{AuditEvent, AuditSink};

/// Production audit sink: structured `tracing` events on a dedicated
/// target. Delivery is whatever the subscriber does with them; emission
/// never blocks and never fails the caller.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            target: "portcullis::audit",
            kind = event.kind.as_str(),
            identity = %event.identity,
            origin = %event.origin,
            at = %event.at,
            "audit event"
        );
    }
}

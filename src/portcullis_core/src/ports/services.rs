use crate::domain::audit::AuditEvent;

/// Destination for security audit events.
///
/// Emission is fire-and-forget: implementations must not block the caller
/// and must swallow their own delivery failures. The state machine's
/// outcome never depends on a sink.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

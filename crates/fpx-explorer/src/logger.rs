/// Leveled log sink injected into an [`Explorer`](crate::Explorer).
///
/// Every method defaults to doing nothing, so implementors only override the
/// levels they care about.
pub trait Logger: Send + Sync {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {}

/// Forwards to `tracing` under the `fpx.explorer` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "fpx.explorer", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "fpx.explorer", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "fpx.explorer", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "fpx.explorer", "{message}");
    }
}

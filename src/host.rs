//! Integration seam between the endpoint and the embedding application.

use async_graphql::ServerError;

/// What the embedding application provides to the endpoint.
///
/// The endpoint never logs server-caused errors itself; it hands them to the
/// host so they land in the application's own exception channel. The debug
/// flag controls whether internal error detail may leak into responses.
pub trait Host: Send + Sync {
    /// Route one server-caused execution error to the application.
    fn log_exception(&self, error: &ServerError);

    /// Whether responses may carry internal error detail.
    fn is_debug_mode(&self) -> bool {
        false
    }
}

/// Default host that logs through `tracing` and keeps debug mode off.
#[derive(Debug, Clone, Default)]
pub struct TracingHost {
    /// Expose internal error detail in responses.
    pub debug: bool,
}

impl Host for TracingHost {
    fn log_exception(&self, error: &ServerError) {
        tracing::error!(
            message = %error.message,
            path = ?error.path,
            "graphql execution error"
        );
    }

    fn is_debug_mode(&self) -> bool {
        self.debug
    }
}

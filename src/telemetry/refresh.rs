use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// Correlates the tracing events of a single refresh attempt. There is at
/// most one attempt per originating request, so no retry state is tracked.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    endpoint: String,
}

impl RefreshTelemetry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, rotated: bool) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            rotated,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &Error) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            error = %error,
            "refresh.failure"
        );
    }
}

//! Notification delivery abstraction.
//!
//! The Registration State Machine (C3) needs to deliver a one-time code to
//! the user out-of-band (SMS, email, push). The server never hard-codes a
//! delivery channel — it depends on a `NotificationSink` trait object so the
//! binary can wire in whatever provider fits the deployment, following the
//! dependency-injection seam the reference codebase uses for its own
//! pluggable collaborators.

use async_trait::async_trait;

use crate::error::VeilError;

/// Delivers a one-time verification code to a user-supplied identifier
/// (email address, phone number, etc).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_code(&self, identifier: &str, code: &str) -> Result<(), VeilError>;
}

/// A sink that logs the code via `tracing` instead of delivering it.
///
/// Suitable for local development and tests; never wire this into a
/// production deployment, since anyone with log access could read codes.
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn send_code(&self, identifier: &str, code: &str) -> Result<(), VeilError> {
        tracing::info!(identifier, code, "dev-mode: would deliver verification code");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_sink_always_succeeds() {
        let sink = LoggingNotificationSink;
        let result = sink.send_code("user@example.com", "123456").await;
        assert!(result.is_ok());
    }
}

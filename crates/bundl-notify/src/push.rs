//! The push delivery seam. Actual device push (APNs/FCM) is an external
//! collaborator, out of scope per SPEC_FULL §4 — this trait is the contract
//! a real implementation plugs into.

use async_trait::async_trait;
use bundl_types::{BundlError, UserId};

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Deliver `message` to `user_id`. Resolving the user's device token is
    /// the provider's own concern. A failure here is logged by the caller
    /// and never propagated up to engine state — dropped notifications do
    /// not affect order lifecycle.
    async fn send(&self, user_id: UserId, message: &str) -> Result<(), BundlError>;
}

/// Logs the notification instead of delivering it. The default provider
/// until a real APNs/FCM integration is wired in.
#[derive(Debug, Default)]
pub struct LoggingPushProvider;

#[async_trait]
impl PushProvider for LoggingPushProvider {
    async fn send(&self, user_id: UserId, message: &str) -> Result<(), BundlError> {
        tracing::info!(%user_id, message, "push notification (logged, not delivered)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_provider_never_fails() {
        let provider = LoggingPushProvider;
        provider.send(UserId::new(), "Your order is ready!").await.unwrap();
    }
}

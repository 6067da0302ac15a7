//! Error taxonomy for the engine.
//!
//! Per the surface being total (see design docs): everything else either
//! succeeds or has no observable effect. `remove_tokens` is infallible
//! (double-removal and removal-of-absent-token are silent no-ops); only
//! `add_tokens` can fail, and only because the underlying sensor refused a
//! fresh subscription.

use std::fmt;

/// Errors the engine can surface to a caller.
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    /// The sensor port refused to install a subscription. Surfaced at
    /// `add_tokens` time — the point a ground-term node would otherwise
    /// subscribe — leaving the node's held-token set unmodified.
    #[error("sensor subscription failed for feature {feature}: {reason}")]
    SubscriptionFailed {
        /// Debug rendering of the feature the subscription was for.
        feature: String,
        reason: String,
    },
}

impl GestureError {
    pub fn subscription_failed(feature: impl fmt::Debug, reason: impl Into<String>) -> Self {
        GestureError::SubscriptionFailed {
            feature: format!("{feature:?}"),
            reason: reason.into(),
        }
    }
}

use async_trait::async_trait;

use super::{TravelEstimate, TravelQuery};
use crate::error::ProviderError;

/// Every travel time source implements this trait.
///
/// Implementations must be cheap to share: the orchestrator holds one behind
/// an `Arc` and runs each call on its own task so a call that outlives its
/// timeout can finish in the background.
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Short identifier used in logs (e.g. "google", "proxy").
    fn name(&self) -> &str;

    /// Predict the travel time for one query.
    async fn estimate(&self, query: TravelQuery) -> Result<TravelEstimate, ProviderError>;
}

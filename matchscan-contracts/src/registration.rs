use async_trait::async_trait;
use matchscan_model::{EventId, PlayerId};

use crate::error::ContractResult;

/// Event registration records holding each player's running win total.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Adds `wins` to the player's total for the event in one transaction.
    async fn add_wins(
        &self,
        player: &PlayerId,
        event: &EventId,
        wins: u32,
    ) -> ContractResult<()>;
}

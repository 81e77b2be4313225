use std::sync::Arc;

use async_trait::async_trait;
use matchscan_model::{GameId, MatchOrdering, MatchResult};

use crate::error::ContractResult;

/// Matches returned by a provider for one player.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderMatches {
    pub matches: Vec<MatchResult>,
    /// Provider cursor to persist alongside the matches.
    pub continuation_token: Option<String>,
    /// Ordering of `matches`. Providers must declare it explicitly.
    pub order: MatchOrdering,
}

#[async_trait]
pub trait MatchResultsProvider: Send + Sync {
    async fn get_matches_for_player(
        &self,
        provider_player_id: &str,
        continuation_token: Option<&str>,
    ) -> ContractResult<ProviderMatches>;
}

pub trait MatchResultsProviderFactory: Send + Sync {
    fn create_instance(
        &self,
        game: GameId,
    ) -> ContractResult<Arc<dyn MatchResultsProvider>>;
}

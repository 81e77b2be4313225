//! Match results providers and the registry handing them out per game.

pub mod starcraft;

pub use starcraft::{BattleNetSettings, Region, StarCraftPlayer, StarCraftProvider};

use std::any::type_name_of_val;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use matchscan_contracts::{
    ContractError, ContractResult,
    provider::{MatchResultsProvider, MatchResultsProviderFactory},
};
use matchscan_model::GameId;

/// Providers keyed by the game they serve.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<GameId, Arc<dyn MatchResultsProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (game, provider) in &self.providers {
            map.entry(game, &type_name_of_val(provider.as_ref()));
        }
        map.finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        game: GameId,
        provider: Arc<dyn MatchResultsProvider>,
    ) {
        self.providers.insert(game, provider);
    }

    pub fn with_provider(
        mut self,
        game: GameId,
        provider: Arc<dyn MatchResultsProvider>,
    ) -> Self {
        self.register(game, provider);
        self
    }
}

impl MatchResultsProviderFactory for ProviderRegistry {
    fn create_instance(
        &self,
        game: GameId,
    ) -> ContractResult<Arc<dyn MatchResultsProvider>> {
        self.providers.get(&game).cloned().ok_or_else(|| {
            ContractError::NotFound(format!("no results provider for {game}"))
        })
    }
}

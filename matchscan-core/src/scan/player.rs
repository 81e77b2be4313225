//! Per-player fetch, merge, flush and registration update.

use matchscan_contracts::{
    ContractError,
    provider::ProviderMatches,
    storage::WritablePlayerResults,
    tasks::InfoLevel,
};
use matchscan_model::{MatchOrdering, MatchResult, PlayerId};

use super::context::ScanContext;
use super::phase;
use super::stats::PartitionCounters;
use crate::error::{Result, ScanError};
use crate::merge;

impl ScanContext {
    /// Brings one player's stored history up to date and returns the wins it
    /// contributes to the event.
    ///
    /// Recoverable failures are counted, bump the player's error count and
    /// yield zero wins. Critical failures abort the partition.
    pub(crate) async fn update_player(
        &self,
        player: &dyn WritablePlayerResults,
        counters: &PartitionCounters,
    ) -> Result<u32> {
        let player_id = player.player_id();
        tracing::debug!(target: "scan::player", player = %player_id, "updating player");

        let mut error_count = player.error_count();
        let (previous, latest) = self.fetch_histories(player).await?;

        if latest.is_none() {
            counters.add_provider_failure(1);
        }
        if previous.is_none() {
            counters.add_retrieve_failure(1);
        }
        let (Some(previous), Some(latest)) = (previous, latest) else {
            tracing::error!(
                target: "scan::player",
                player = %player_id,
                "abandoning the update for player"
            );
            self.bump_error_count(player, &mut error_count).await?;
            return Ok(0);
        };

        if latest.order != MatchOrdering::MostRecentlyPlayedFirst {
            return Err(ScanError::UnsupportedOrdering(latest.order));
        }

        let new_matches = match merge::new_matches(&previous, &latest.matches) {
            Ok(new_matches) => new_matches,
            Err(err) if err.is_critical() => return Err(err.into()),
            Err(err) => {
                tracing::error!(
                    target: "scan::player",
                    player = %player_id,
                    error = %err,
                    "stored history does not line up with the latest matches"
                );
                counters.add_merge_failure(1);
                self.bump_error_count(player, &mut error_count).await?;
                return Ok(0);
            }
        };

        tracing::debug!(
            target: "scan::player",
            player = %player_id,
            new_matches = new_matches.len(),
            "merged match history"
        );
        counters.add_new_matches(new_matches.len() as u64);

        let now = self.clock.now();
        if phase::should_count_official_results(&self.traits, now) {
            let wins = new_matches.iter().filter(|m| m.is_win()).count();
            counters.add_new_wins(wins as u64);
        }
        let event_wins = phase::wins_toward_event(&self.traits, now, new_matches);

        if let Err(err) = player
            .add_matches_and_flush(
                new_matches,
                latest.continuation_token.as_deref(),
                event_wins,
            )
            .await
        {
            tracing::error!(
                target: "scan::player",
                player = %player_id,
                error = %err,
                "failed to flush new matches"
            );
            counters.add_save_failure(1);
            self.bump_error_count(player, &mut error_count).await?;
            let err = ScanError::from(err);
            if err.is_critical() {
                return Err(err);
            }
            // The cursor did not advance, so these matches come back next
            // round. Crediting them now would count them twice.
            return Ok(0);
        }
        counters.add_flushed(1);

        if event_wins > 0
            && let Err(err) = self.add_registration_wins(player_id, event_wins).await
        {
            tracing::error!(
                target: "scan::player",
                player = %player_id,
                wins = event_wins,
                error = %err,
                "failed to update the event registration"
            );
            counters.add_registration_failure(1);
            self.bump_error_count(player, &mut error_count).await?;
            if err.is_critical() {
                return Err(err);
            }
        }

        Ok(event_wins)
    }

    /// Fetches stored and fresh histories concurrently, retrying whichever
    /// is still missing.
    async fn fetch_histories(
        &self,
        player: &dyn WritablePlayerResults,
    ) -> Result<(Option<Vec<MatchResult>>, Option<ProviderMatches>)> {
        let policy = self.settings.fetch_retry;
        let continuation_token = player.continuation_token();
        let mut previous = None;
        let mut latest = None;
        let mut attempts = 0;

        while attempts < policy.max_attempts.max(1)
            && (previous.is_none() || latest.is_none())
        {
            if attempts > 0 {
                tokio::time::sleep(policy.pause()).await;
            }
            attempts += 1;

            let need_previous = previous.is_none();
            let need_latest = latest.is_none();
            let stored = async {
                if need_previous {
                    Some(player.get_matches(self.traits.matches_per_query).await)
                } else {
                    None
                }
            };
            let fresh = async {
                if need_latest {
                    Some(
                        self.provider
                            .get_matches_for_player(
                                player.results_token(),
                                continuation_token.as_deref(),
                            )
                            .await,
                    )
                } else {
                    None
                }
            };
            let (stored, fresh) = tokio::join!(stored, fresh);

            match stored {
                Some(Ok(matches)) => previous = Some(matches),
                Some(Err(err)) => {
                    self.fetch_failed(
                        player.player_id(),
                        "failed to get old matches from storage",
                        err,
                    )
                    .await?
                }
                None => {}
            }
            match fresh {
                Some(Ok(matches)) => latest = Some(matches),
                Some(Err(err)) => {
                    self.fetch_failed(
                        player.player_id(),
                        "failed to get new matches",
                        err,
                    )
                    .await?
                }
                None => {}
            }
        }

        Ok((previous, latest))
    }

    async fn fetch_failed(
        &self,
        player_id: &PlayerId,
        what: &str,
        err: ContractError,
    ) -> Result<()> {
        tracing::error!(
            target: "scan::player",
            player = %player_id,
            error = %err,
            "{what}"
        );

        let message =
            format!("Worker {} {what} for player {player_id}", self.worker_label);
        let detail = err.to_string();
        if let Err(info_err) = self
            .participation
            .add_info(InfoLevel::Error, &message, Some(&detail))
            .await
        {
            tracing::warn!(
                target: "scan::player",
                error = %info_err,
                "failed to record fetch failure on the task"
            );
        }

        let err = ScanError::from(err);
        if err.is_critical() { Err(err) } else { Ok(()) }
    }

    async fn bump_error_count(
        &self,
        player: &dyn WritablePlayerResults,
        error_count: &mut u32,
    ) -> Result<()> {
        *error_count = error_count.saturating_add(1);
        match player.update_error_count(*error_count).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let err = ScanError::from(err);
                if err.is_critical() {
                    return Err(err);
                }
                tracing::warn!(
                    target: "scan::player",
                    player = %player.player_id(),
                    error = %err,
                    "failed to persist the player error count"
                );
                Ok(())
            }
        }
    }

    /// Transactional registration update, retrying transient faults only.
    async fn add_registration_wins(
        &self,
        player_id: &PlayerId,
        wins: u32,
    ) -> Result<()> {
        let policy = self.settings.registration_retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .registrations
                .add_wins(player_id, &self.traits.event_id, wins)
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                    tracing::debug!(
                        target: "scan::player",
                        player = %player_id,
                        attempt,
                        error = %err,
                        "retrying registration update"
                    );
                    tokio::time::sleep(policy.pause()).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

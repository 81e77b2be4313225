//! StarCraft II match history through the Battle.net community API.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchscan_contracts::{
    ContractError, ContractResult,
    provider::{MatchResultsProvider, ProviderMatches},
};
use matchscan_model::{MatchOrdering, MatchOutcome, MatchResult};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dispatcher::{ApiDispatcher, DispatchError};

/// Match types whose wins count toward official totals.
const ACCEPTED_MATCH_TYPES: &[&str] = &["SOLO", "TWOS", "THREES", "FOURS", "FFA"];

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BattleNetSettings {
    pub api_key: String,
    pub locale: String,
    /// Replaces the regional API hosts, mainly for proxies and test servers.
    pub base_url: Option<String>,
}

impl fmt::Debug for BattleNetSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleNetSettings")
            .field("api_key", &"<redacted>")
            .field("locale", &self.locale)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for BattleNetSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            locale: "en_US".to_string(),
            base_url: None,
        }
    }
}

/// Battle.net regions with their numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Us = 1,
    Europe = 2,
    Korea = 3,
    Taiwan = 4,
    Sea = 5,
    China = 6,
}

impl Region {
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            1 => Region::Us,
            2 => Region::Europe,
            3 => Region::Korea,
            4 => Region::Taiwan,
            5 => Region::Sea,
            6 => Region::China,
            _ => return None,
        })
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn api_host(&self) -> &'static str {
        match self {
            Region::Us => "https://us.api.battle.net",
            Region::Europe => "https://eu.api.battle.net",
            Region::Korea => "https://kr.api.battle.net",
            Region::Taiwan => "https://tw.api.battle.net",
            Region::Sea => "https://sea.api.battle.net",
            Region::China => "https://api.battlenet.com.cn",
        }
    }
}

/// Provider player id in `name;id;region` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarCraftPlayer {
    pub name: String,
    pub profile_id: String,
    pub region: Region,
}

impl FromStr for StarCraftPlayer {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ContractError::InvalidArgument(format!("invalid player id: {s}"));

        let mut parts = s.split(';');
        let (Some(name), Some(profile_id), Some(region), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let region = region
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Region::from_id)
            .ok_or_else(invalid)?;

        Ok(Self {
            name: name.to_string(),
            profile_id: profile_id.to_string(),
            region,
        })
    }
}

impl fmt::Display for StarCraftPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.name, self.profile_id, self.region.id())
    }
}

#[derive(Debug, Deserialize)]
struct MatchHistory {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
struct ApiMatch {
    map: String,
    #[serde(rename = "type")]
    match_type: String,
    decision: String,
    date: ApiDate,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiDate {
    Seconds(f64),
    Text(String),
}

impl ApiDate {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let seconds = match self {
            ApiDate::Seconds(value) => *value,
            ApiDate::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.trunc();
        let nanos = ((seconds - whole) * 1e9).round().clamp(0.0, 999_999_999.0);
        DateTime::from_timestamp(whole as i64, nanos as u32)
    }
}

fn convert_match(raw: ApiMatch) -> Option<MatchResult> {
    let played_at = raw.date.to_datetime()?;
    let accepted = ACCEPTED_MATCH_TYPES
        .iter()
        .any(|kind| kind.eq_ignore_ascii_case(&raw.match_type));
    let won = raw.decision.eq_ignore_ascii_case("WIN");

    Some(MatchResult {
        outcome: if won && accepted {
            MatchOutcome::Win
        } else {
            MatchOutcome::Loss
        },
        played_at,
        map: raw.map,
        match_type: raw.match_type,
        decision: raw.decision,
        counts_toward_official: accepted,
    })
}

/// Parses a match history payload into results, most recently played first.
pub fn parse_match_history(body: &str) -> ContractResult<Vec<MatchResult>> {
    let history: MatchHistory = serde_json::from_str(body).map_err(|err| {
        ContractError::Network(format!("malformed match history: {err}"))
    })?;

    history
        .matches
        .into_iter()
        .map(|raw| {
            let date = format!("{:?}", raw.date);
            convert_match(raw).ok_or_else(|| {
                ContractError::Network(format!(
                    "malformed match date in history: {date}"
                ))
            })
        })
        .collect()
}

pub struct StarCraftProvider {
    dispatcher: Arc<ApiDispatcher>,
    settings: BattleNetSettings,
}

impl fmt::Debug for StarCraftProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StarCraftProvider")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StarCraftProvider {
    pub fn new(dispatcher: Arc<ApiDispatcher>, settings: BattleNetSettings) -> Self {
        Self {
            dispatcher,
            settings,
        }
    }

    /// `{host}/sc2/profile/{id}/{region}/{name}/matches?locale=..&apiKey=..`
    pub fn match_history_url(&self, player: &StarCraftPlayer) -> ContractResult<Url> {
        let host = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(player.region.api_host());
        let mut url = Url::parse(host).map_err(|err| {
            ContractError::InvalidArgument(format!("invalid api host {host}: {err}"))
        })?;

        let region = player.region.id().to_string();
        url.path_segments_mut()
            .map_err(|_| {
                ContractError::InvalidArgument(format!("api host {host} cannot carry a path"))
            })?
            .pop_if_empty()
            .extend([
                "sc2",
                "profile",
                player.profile_id.as_str(),
                region.as_str(),
                player.name.as_str(),
                "matches",
            ]);
        url.query_pairs_mut()
            .append_pair("locale", &self.settings.locale)
            .append_pair("apiKey", &self.settings.api_key);

        Ok(url)
    }

    pub async fn fetch_matches(
        &self,
        player: &StarCraftPlayer,
    ) -> ContractResult<Vec<MatchResult>> {
        let url = self.match_history_url(player)?;
        let body = self
            .dispatcher
            .request(&url)
            .await
            .map_err(|err| dispatch_failure(player, err))?;
        parse_match_history(&body)
    }
}

fn dispatch_failure(player: &StarCraftPlayer, err: DispatchError) -> ContractError {
    // The uri carries the api key.
    let message = format!(
        "match history request for {player} failed after {} attempt(s) [{}]: {}",
        err.attempts, err.class, err.detail
    );
    if err.is_unexpected() {
        ContractError::Rejected(message)
    } else {
        ContractError::Network(message)
    }
}

#[async_trait]
impl MatchResultsProvider for StarCraftProvider {
    async fn get_matches_for_player(
        &self,
        provider_player_id: &str,
        continuation_token: Option<&str>,
    ) -> ContractResult<ProviderMatches> {
        tracing::trace!(
            target: "scan::provider",
            player = provider_player_id,
            "fetching starcraft match history"
        );

        if continuation_token.is_some_and(|token| !token.trim().is_empty()) {
            return Err(ContractError::InvalidArgument(
                "continuation tokens are not supported by the starcraft provider".into(),
            ));
        }

        let player: StarCraftPlayer = provider_player_id.parse()?;
        let matches = self.fetch_matches(&player).await?;

        Ok(ProviderMatches {
            matches,
            continuation_token: None,
            order: MatchOrdering::MostRecentlyPlayedFirst,
        })
    }
}

//! Operator tooling for matchscan deployments: inspect and build scan task
//! parameters, fetch a player's history through the rate-limited dispatcher,
//! and print the effective configuration.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use matchscan_config::{ConfigSource, MatchScanConfig};
use matchscan_core::ApiDispatcher;
use matchscan_core::providers::{StarCraftPlayer, StarCraftProvider};
use matchscan_core::scan::scan_traits_for;
use matchscan_model::{
    EventId, GameId, GameSettings, ScanTraits, ScanType, ScheduledEvent,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "matchscanctl", about = "Match history scanner operator tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a scan task parameter string and print the traits as JSON
    Decode {
        param: String,
    },
    /// Build the parameter string a scan task would carry
    Encode {
        #[arg(long = "type")]
        scan_type: ScanType,
        #[arg(long)]
        event_id: String,
        #[arg(long, default_value = "StarCraft")]
        game: GameId,
        /// Event start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Event end (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long, default_value_t = 900)]
        refresh_secs: i64,
        #[arg(long, default_value_t = 25)]
        matches_per_query: u32,
    },
    /// Fetch a player's match history through the dispatcher
    Fetch {
        /// Provider player id, `name;id;region`
        #[arg(long)]
        player: String,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

struct EncodeArgs {
    scan_type: ScanType,
    event_id: String,
    game: GameId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    refresh_secs: i64,
    matches_per_query: u32,
}

fn decode(param: &str) -> Result<String> {
    let traits = ScanTraits::parse_param_string(param)
        .context("invalid scan task parameters")?;
    Ok(serde_json::to_string_pretty(&traits)?)
}

fn encode(args: EncodeArgs, now: DateTime<Utc>) -> Result<String> {
    if args.end <= args.start {
        bail!("event end must be after the event start");
    }
    if args.refresh_secs <= 0 {
        bail!("refresh interval must be positive");
    }

    let event = ScheduledEvent {
        id: EventId::new(args.event_id),
        live_start: args.start,
        event_end: args.end,
        game: GameSettings {
            game_id: args.game,
            refresh_interval: TimeDelta::seconds(args.refresh_secs),
            matches_per_query: args.matches_per_query,
        },
    };
    let traits = scan_traits_for(args.scan_type, &event, now);
    Ok(traits.to_param_string()?)
}

fn redacted(mut config: MatchScanConfig) -> MatchScanConfig {
    if !config.battle_net.api_key.is_empty() {
        config.battle_net.api_key = "<redacted>".to_string();
    }
    config
}

fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Default => "built-in defaults".to_string(),
        ConfigSource::EnvInline => "$MATCHSCAN_CONFIG_JSON".to_string(),
        ConfigSource::EnvPath(path) => {
            format!("$MATCHSCAN_CONFIG_PATH ({})", path.display())
        }
        ConfigSource::File(path) => path.display().to_string(),
    }
}

async fn fetch(player: &str) -> Result<String> {
    let (config, source) = MatchScanConfig::load_from_env()?;
    tracing::info!(source = %describe_source(&source), "loaded configuration");
    if config.battle_net.api_key.is_empty() {
        bail!("no Battle.net API key configured; set BATTLENET_API_KEY");
    }

    let player: StarCraftPlayer = player.parse()?;
    let dispatcher = Arc::new(
        ApiDispatcher::with_reqwest(config.dispatcher.clone())
            .context("failed to build the HTTP client")?,
    );
    let provider = StarCraftProvider::new(dispatcher, config.battle_net);
    let matches = provider
        .fetch_matches(&player)
        .await
        .with_context(|| format!("failed to fetch matches for {player}"))?;

    Ok(serde_json::to_string_pretty(&matches)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scan::dispatcher=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if env_loaded {
        tracing::debug!("loaded .env file");
    }

    let cli = Cli::parse();
    let output = match cli.command {
        Command::Decode { param } => decode(&param)?,
        Command::Encode {
            scan_type,
            event_id,
            game,
            start,
            end,
            refresh_secs,
            matches_per_query,
        } => encode(
            EncodeArgs {
                scan_type,
                event_id,
                game,
                start,
                end,
                refresh_secs,
                matches_per_query,
            },
            Utc::now(),
        )?,
        Command::Fetch { player } => fetch(&player).await?,
        Command::Config => {
            let (config, source) = MatchScanConfig::load_from_env()?;
            format!(
                "# source: {}\n{}",
                describe_source(&source),
                toml::to_string_pretty(&redacted(config))?
            )
        }
    };

    println!("{output}");
    Ok(())
}

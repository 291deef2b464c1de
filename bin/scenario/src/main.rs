//! Staking lifecycle scenario binary

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use seascape_client::config::parse_address;
use seascape_client::{
    Config, LedgerMode, LifecycleScenario, RpcLedger, ScenarioConfig, ScenarioReport,
    StakingSessionClient,
};
use seascape_core::{
    Actors, Address, Clock, InMemoryLedger, ManualClock, StakingLedger, StakingToken, SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("╔═══════════════════════════════════════════════╗");
    info!("║        Seascape Staking lifecycle run         ║");
    info!("╚═══════════════════════════════════════════════╝");

    // Load config from environment
    let config = Config::from_env();

    info!("");
    info!("Configuration:");
    info!("  Ledger mode:    {:?}", config.mode);
    info!("  RPC:            {}", config.rpc.url);
    info!("  Staking token:  {}", config.scenario.staking_token);
    info!("  Total reward:   {}", config.scenario.total_reward);
    info!("  Period:         {}s", config.scenario.period_secs);
    info!("  Deposit:        {}", config.scenario.deposit);
    info!("");

    let report = match config.mode {
        LedgerMode::Memory => run_in_memory(&config).await?,
        LedgerMode::Rpc => run_against_node(&config).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_in_memory(config: &Config) -> Result<ScenarioReport> {
    // Waits are instant, timestamps start from the wall clock
    let clock = ManualClock::new(SystemClock.now());
    let ledger = InMemoryLedger::new(clock.clone());
    let actors = Actors {
        admin: configured_or(config.admin_address.as_deref(), "ADDRESS_1", Address::repeat_byte(0xa0))?,
        player: configured_or(config.player_address.as_deref(), "ADDRESS_2", Address::repeat_byte(0xa1))?,
    };

    run(ledger, &clock, actors, &config.scenario).await
}

async fn run_against_node(config: &Config) -> Result<ScenarioReport> {
    let ledger = RpcLedger::new(config.rpc.clone())?;
    info!("Staking contract: {}", ledger.staking_address());

    let actors = resolve_actors(&ledger, config).await?;
    run(ledger, &SystemClock, actors, &config.scenario).await
}

/// Actors from config, falling back to the node's first two accounts
async fn resolve_actors(ledger: &RpcLedger, config: &Config) -> Result<Actors> {
    let admin = parse_address(config.admin_address.as_deref(), "ADDRESS_1")?;
    let player = parse_address(config.player_address.as_deref(), "ADDRESS_2")?;
    if let (Some(admin), Some(player)) = (admin, player) {
        return Ok(Actors { admin, player });
    }

    let accounts = ledger.accounts().await.context("failed to resolve accounts")?;
    if accounts.len() < 2 {
        bail!("node exposes {} accounts, need 2 (or set ADDRESS_1/ADDRESS_2)", accounts.len());
    }

    Ok(Actors { admin: admin.unwrap_or(accounts[0]), player: player.unwrap_or(accounts[1]) })
}

fn configured_or(raw: Option<&str>, name: &str, fallback: Address) -> Result<Address> {
    Ok(parse_address(raw, name)?.unwrap_or(fallback))
}

async fn run<L, C>(ledger: L, clock: &C, actors: Actors, scenario: &ScenarioConfig) -> Result<ScenarioReport>
where
    L: StakingLedger + StakingToken,
    C: Clock,
{
    info!("Admin:  {}", actors.admin);
    info!("Player: {}", actors.player);

    let client = StakingSessionClient::new(ledger);
    LifecycleScenario::new(&client, clock, actors, scenario).run().await
}

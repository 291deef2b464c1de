//! Configuration

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use seascape_core::{Address, Amount, SessionParams, Timestamp, to_wei};

/// Default LP token exercised by the staking scenario
pub const DEFAULT_STAKING_TOKEN: &str = "0x5beabaebb3146685dd74176f68a0721f91297d37";

/// Ledger backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LedgerMode {
    /// Deployed contract reached over JSON-RPC
    #[default]
    Rpc,
    /// In-process ledger (for testing, instant)
    Memory,
}

impl From<&str> for LedgerMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "mock" => Self::Memory,
            _ => Self::Rpc,
        }
    }
}

/// JSON-RPC transport settings
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Node URL (Truffle `development` network)
    pub url: String,
    /// Deployed `Staking` contract
    pub staking_address: Option<String>,
    /// Receipt polling interval
    pub receipt_poll: Duration,
    /// Receipt polls before giving up
    pub receipt_attempts: u32,
    /// Gas limit for sent transactions
    pub gas: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
            staking_address: None,
            receipt_poll: Duration::from_millis(500),
            receipt_attempts: 20,
            gas: "0x100000".to_string(),
        }
    }
}

impl RpcConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("STAKING_RPC").unwrap_or(defaults.url),
            staking_address: env::var("STAKING_ADDRESS").ok(),
            receipt_poll: env::var("RECEIPT_POLL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.receipt_poll, Duration::from_millis),
            receipt_attempts: env::var("RECEIPT_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.receipt_attempts),
            gas: env::var("GAS_LIMIT").unwrap_or(defaults.gas),
        }
    }

    /// Staking contract address, required in RPC mode
    pub fn staking_address(&self) -> Result<Address> {
        let raw = self
            .staking_address
            .as_deref()
            .ok_or_else(|| anyhow!("STAKING_ADDRESS not configured"))?;
        raw.parse().with_context(|| format!("invalid STAKING_ADDRESS {raw}"))
    }
}

/// Sample parameters of the lifecycle scenario
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    /// LP token under test
    pub staking_token: String,
    /// Whole tokens rewarded over the session
    pub total_reward: u64,
    /// Session period in seconds
    pub period_secs: u64,
    /// Generation tag passed to `startSession`
    pub generation: u64,
    /// Whole tokens deposited by the player
    pub deposit: u64,
    /// Wait between the two claimable reads
    pub accrual_wait: Duration,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            staking_token: DEFAULT_STAKING_TOKEN.to_string(),
            total_reward: 100,
            period_secs: 5,
            generation: 0,
            deposit: 50,
            accrual_wait: Duration::from_secs(2),
        }
    }
}

impl ScenarioConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            staking_token: env::var("STAKING_TOKEN").unwrap_or(defaults.staking_token),
            total_reward: env_u64("TOTAL_REWARD").unwrap_or(defaults.total_reward),
            period_secs: env_u64("SESSION_PERIOD").unwrap_or(defaults.period_secs),
            generation: env_u64("GENERATION").unwrap_or(defaults.generation),
            deposit: env_u64("DEPOSIT_AMOUNT").unwrap_or(defaults.deposit),
            accrual_wait: env_u64("ACCRUAL_WAIT")
                .map_or(defaults.accrual_wait, Duration::from_secs),
        }
    }

    /// Parsed staking token address
    pub fn token(&self) -> Result<Address> {
        self.staking_token
            .parse()
            .with_context(|| format!("invalid STAKING_TOKEN {}", self.staking_token))
    }

    /// Deposit in wei
    pub fn deposit_amount(&self) -> Amount {
        to_wei(self.deposit)
    }

    /// `startSession` arguments for a session starting at `start_time`
    pub fn session_params(&self, start_time: Timestamp) -> SessionParams {
        SessionParams {
            total_reward: to_wei(self.total_reward),
            period_secs: self.period_secs,
            start_time,
            generation: self.generation,
        }
    }
}

/// Client configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Ledger backend
    pub mode: LedgerMode,
    /// Node connection, used in `Rpc` mode
    pub rpc: RpcConfig,
    /// Scenario parameters
    pub scenario: ScenarioConfig,
    /// Session owner, `eth_accounts[0]` when unset
    pub admin_address: Option<String>,
    /// Staker, `eth_accounts[1]` when unset
    pub player_address: Option<String>,
}

impl Config {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            mode: env::var("LEDGER_MODE").map(|s| LedgerMode::from(s.as_str())).unwrap_or_default(),
            rpc: RpcConfig::from_env(),
            scenario: ScenarioConfig::from_env(),
            admin_address: env::var("ADDRESS_1").ok(),
            player_address: env::var("ADDRESS_2").ok(),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Parse an optional configured address
pub fn parse_address(raw: Option<&str>, name: &str) -> Result<Option<Address>> {
    raw.map(|s| s.parse().with_context(|| format!("invalid {name} {s}"))).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_mode_from_str() {
        assert_eq!(LedgerMode::from("memory"), LedgerMode::Memory);
        assert_eq!(LedgerMode::from("MOCK"), LedgerMode::Memory);
        assert_eq!(LedgerMode::from("rpc"), LedgerMode::Rpc);
        assert_eq!(LedgerMode::from("anything"), LedgerMode::Rpc);
    }

    #[test]
    fn test_scenario_defaults() {
        let scenario = ScenarioConfig::default();
        let params = scenario.session_params(42);

        assert_eq!(params.total_reward, to_wei(100));
        assert_eq!(params.period_secs, 5);
        assert_eq!(params.start_time, 42);
        assert_eq!(scenario.deposit_amount(), to_wei(50));
        assert_eq!(
            scenario.token().unwrap(),
            DEFAULT_STAKING_TOKEN.parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_staking_address_required() {
        let mut rpc = RpcConfig::default();
        assert!(rpc.staking_address().is_err());

        rpc.staking_address = Some("0x0000000000000000000000000000000000000001".to_string());
        assert_eq!(rpc.staking_address().unwrap(), Address::with_last_byte(1));

        rpc.staking_address = Some("not-an-address".to_string());
        assert!(rpc.staking_address().is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address(None, "ADDRESS_1").unwrap(), None);
        assert!(parse_address(Some("0x12"), "ADDRESS_1").is_err());
    }
}

//! Common types

use serde::{Deserialize, Serialize};

pub use alloy_primitives::{Address, U256};

/// Token amount in base units (18 decimals)
pub type Amount = U256;

/// Session identifier, starts at 1 for the first session on a token
pub type SessionId = u64;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Decimals of the staking and reward tokens
pub const ETHER_DECIMALS: u32 = 18;

/// One whole token in base units
pub fn ether_unit() -> Amount {
    U256::from(10u64.pow(ETHER_DECIMALS))
}

/// Scale a whole token count to base units (`toWei(n, "ether")`)
pub fn to_wei(whole: u64) -> Amount {
    U256::from(whole) * ether_unit()
}

/// Render base units as a decimal token amount (`fromWei`)
pub fn format_ether(amount: Amount) -> String {
    let unit = ether_unit();
    let whole = amount / unit;
    let frac = amount % unit;
    if frac.is_zero() {
        return whole.to_string();
    }

    let digits = format!("{:0>width$}", frac.to_string(), width = ETHER_DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Arguments of `startSession`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Reward distributed over the whole period
    pub total_reward: Amount,
    /// Session length in seconds
    pub period_secs: u64,
    /// Session start
    pub start_time: Timestamp,
    /// Seascape NFT generation attached to the session
    pub generation: u64,
}

/// Where a token's latest session stands at a given time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session was ever started for the token
    NoSession,
    /// `now < start_time + period`
    Active,
    /// Period elapsed; a new session may be started
    Expired,
}

/// Reward distribution period for one staking token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Per-token id, starting at 1
    pub id: SessionId,
    /// Staking token
    pub token: Address,
    /// Reward emitted over the period, in wei
    pub total_reward: Amount,
    /// Length in seconds
    pub period_secs: u64,
    /// Unix timestamp the emission starts at
    pub start_time: Timestamp,
    /// Opaque generation tag
    pub generation: u64,
}

impl Session {
    /// Build a session from `startSession` arguments
    pub fn new(id: SessionId, token: Address, params: &SessionParams) -> Self {
        Self {
            id,
            token,
            total_reward: params.total_reward,
            period_secs: params.period_secs,
            start_time: params.start_time,
            generation: params.generation,
        }
    }

    /// First second after the session
    pub const fn end_time(&self) -> Timestamp {
        self.start_time.saturating_add(self.period_secs)
    }

    /// Whether the period is still running at `now`
    pub const fn is_active(&self, now: Timestamp) -> bool {
        now < self.end_time()
    }

    /// Session state at `now`, `None` meaning no session exists
    pub const fn state_at(session: Option<&Self>, now: Timestamp) -> SessionState {
        match session {
            None => SessionState::NoSession,
            Some(s) if s.is_active(now) => SessionState::Active,
            Some(_) => SessionState::Expired,
        }
    }
}

/// Staked balance of one account for one token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    /// Deposited and not yet withdrawn
    pub staked: Amount,
    /// Reward accrued but not yet claimed
    pub accrued: Amount,
    /// Reward-per-token snapshot at the last update
    pub reward_per_token_paid: Amount,
}

/// Accounts driving a scenario, resolved once at startup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actors {
    /// Session owner (`accounts[0]`)
    pub admin: Address,
    /// Staker (`accounts[1]`)
    pub player: Address,
}

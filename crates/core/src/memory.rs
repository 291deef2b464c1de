//! In-memory staking ledger
//!
//! Stands in for the deployed contract in tests and in `memory` mode. Rewards
//! of a session are emitted linearly over its period and shared between
//! stakers in proportion to their balances, tracked with a reward-per-token
//! accumulator. Each call runs under one lock, computes every new value with
//! checked arithmetic first and only then writes them back, so a rejected
//! call (overflow included) leaves no trace.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{
    ADDITION_OVERFLOW, EXCEEDS_ALLOWANCE, EXCEEDS_STAKED, LedgerError, LedgerResult,
    MULTIPLICATION_OVERFLOW, SUBTRACTION_OVERFLOW,
};
use crate::ledger::{StakingLedger, StakingToken};
use crate::types::{
    Address, Amount, Session, SessionId, SessionParams, SessionState, StakePosition, Timestamp,
    U256, ether_unit,
};

fn add(a: Amount, b: Amount) -> LedgerResult<Amount> {
    a.checked_add(b).ok_or_else(|| LedgerError::Rejected(ADDITION_OVERFLOW.to_string()))
}

fn sub(a: Amount, b: Amount) -> LedgerResult<Amount> {
    a.checked_sub(b).ok_or_else(|| LedgerError::Rejected(SUBTRACTION_OVERFLOW.to_string()))
}

fn mul(a: Amount, b: Amount) -> LedgerResult<Amount> {
    a.checked_mul(b).ok_or_else(|| LedgerError::Rejected(MULTIPLICATION_OVERFLOW.to_string()))
}

/// Per-token pool
#[derive(Clone, Debug, Default)]
struct Pool {
    session: Option<Session>,
    last_session_id: SessionId,
    total_staked: Amount,
    /// Reward per staked unit, scaled by 1e18
    reward_per_token: Amount,
    last_update: Timestamp,
}

impl Pool {
    fn reward_per_token_at(&self, now: Timestamp) -> LedgerResult<Amount> {
        let Some(session) = &self.session else {
            return Ok(self.reward_per_token);
        };
        if self.total_staked.is_zero() || session.period_secs == 0 {
            return Ok(self.reward_per_token);
        }

        let from = self.last_update.max(session.start_time);
        let to = now.min(session.end_time());
        if to <= from {
            return Ok(self.reward_per_token);
        }

        let emitted =
            mul(session.total_reward, U256::from(to - from))? / U256::from(session.period_secs);
        add(self.reward_per_token, mul(emitted, ether_unit())? / self.total_staked)
    }

    /// Store an accumulator computed by `reward_per_token_at(now)`
    fn commit(&mut self, reward_per_token: Amount, now: Timestamp) {
        self.reward_per_token = reward_per_token;
        self.last_update = self.last_update.max(now);
    }
}

fn earned(position: &StakePosition, reward_per_token: Amount) -> LedgerResult<Amount> {
    let delta = sub(reward_per_token, position.reward_per_token_paid)?;
    add(position.accrued, mul(position.staked, delta)? / ether_unit())
}

/// Position brought up to `reward_per_token`, not yet stored
fn settled(position: &StakePosition, reward_per_token: Amount) -> LedgerResult<StakePosition> {
    Ok(StakePosition {
        staked: position.staked,
        accrued: earned(position, reward_per_token)?,
        reward_per_token_paid: reward_per_token,
    })
}

#[derive(Debug, Default)]
struct LedgerState {
    pools: HashMap<Address, Pool>,
    /// (token, account) -> position
    positions: HashMap<(Address, Address), StakePosition>,
    /// (token, owner) -> amount the ledger may pull
    allowances: HashMap<(Address, Address), Amount>,
    /// (token, account) -> total reward paid out
    rewards_paid: HashMap<(Address, Address), Amount>,
}

impl LedgerState {
    fn pool(&self, token: Address) -> Pool {
        self.pools.get(&token).cloned().unwrap_or_default()
    }

    fn position(&self, token: Address, account: Address) -> StakePosition {
        self.positions.get(&(token, account)).cloned().unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address) -> Amount {
        self.allowances.get(&(token, owner)).copied().unwrap_or_default()
    }
}

/// Staking ledger kept in process memory
#[derive(Debug)]
pub struct InMemoryLedger<C> {
    clock: C,
    state: Mutex<LedgerState>,
}

impl<C: Clock> InMemoryLedger<C> {
    /// Empty ledger reading time from `clock`
    pub fn new(clock: C) -> Self {
        Self { clock, state: Mutex::new(LedgerState::default()) }
    }

    /// Total reward paid to `account` by claims on `token`
    pub async fn rewards_paid(&self, token: Address, account: Address) -> Amount {
        let state = self.state.lock().await;
        state.rewards_paid.get(&(token, account)).copied().unwrap_or_default()
    }

    /// Remaining approval of `owner` towards the ledger
    pub async fn allowance(&self, token: Address, owner: Address) -> Amount {
        self.state.lock().await.allowance(token, owner)
    }
}

#[async_trait]
impl<C: Clock> StakingLedger for InMemoryLedger<C> {
    async fn start_session(
        &self,
        token: Address,
        params: &SessionParams,
        actor: Address,
    ) -> LedgerResult<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let pool = state.pool(token);

        if Session::state_at(pool.session.as_ref(), now) == SessionState::Active {
            return Err(LedgerError::SessionActive);
        }

        // Close out the previous session before replacing it
        let reward_per_token = pool.reward_per_token_at(now)?;
        let session_id = pool
            .last_session_id
            .checked_add(1)
            .ok_or_else(|| LedgerError::Rejected(ADDITION_OVERFLOW.to_string()))?;

        let pool = state.pools.entry(token).or_default();
        pool.commit(reward_per_token, now);
        pool.last_session_id = session_id;
        pool.session = Some(Session::new(session_id, token, params));

        debug!(
            "session {} started for {} by {} (period {}s, start {})",
            session_id, token, actor, params.period_secs, params.start_time
        );
        Ok(())
    }

    async fn session_for(&self, token: Address) -> LedgerResult<SessionId> {
        let state = self.state.lock().await;
        Ok(state.pools.get(&token).map_or(0, |p| p.last_session_id))
    }

    async fn deposit(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let allowance = state.allowance(token, actor);
        if allowance < amount {
            return Err(LedgerError::Rejected(EXCEEDS_ALLOWANCE.to_string()));
        }

        let pool = state.pool(token);
        let reward_per_token = pool.reward_per_token_at(now)?;
        let mut position = settled(&state.position(token, actor), reward_per_token)?;
        position.staked = add(position.staked, amount)?;
        let total_staked = add(pool.total_staked, amount)?;
        let remaining = sub(allowance, amount)?;

        let pool = state.pools.entry(token).or_default();
        pool.commit(reward_per_token, now);
        pool.total_staked = total_staked;
        state.positions.insert((token, actor), position);
        state.allowances.insert((token, actor), remaining);

        debug!("{} deposited {} of {}", actor, amount, token);
        Ok(())
    }

    async fn withdraw(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let position = state.position(token, actor);
        if position.staked < amount {
            return Err(LedgerError::Rejected(EXCEEDS_STAKED.to_string()));
        }

        let pool = state.pool(token);
        let reward_per_token = pool.reward_per_token_at(now)?;
        let mut position = settled(&position, reward_per_token)?;
        position.staked = sub(position.staked, amount)?;
        let total_staked = sub(pool.total_staked, amount)?;

        let pool = state.pools.entry(token).or_default();
        pool.commit(reward_per_token, now);
        pool.total_staked = total_staked;
        state.positions.insert((token, actor), position);

        debug!("{} withdrew {} of {}", actor, amount, token);
        Ok(())
    }

    async fn claim(&self, token: Address, actor: Address) -> LedgerResult<()> {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let position = state.position(token, actor);
        if position.staked.is_zero() {
            return Err(LedgerError::NoStake);
        }

        let pool = state.pool(token);
        let reward_per_token = pool.reward_per_token_at(now)?;
        let mut position = settled(&position, reward_per_token)?;
        if position.accrued.is_zero() {
            return Err(LedgerError::NothingToClaim);
        }
        let reward = std::mem::take(&mut position.accrued);
        let paid = add(
            state.rewards_paid.get(&(token, actor)).copied().unwrap_or_default(),
            reward,
        )?;

        state.pools.entry(token).or_default().commit(reward_per_token, now);
        state.positions.insert((token, actor), position);
        state.rewards_paid.insert((token, actor), paid);

        debug!("{} claimed {} from {}", actor, reward, token);
        Ok(())
    }

    async fn staked_balance_of(&self, token: Address, account: Address) -> LedgerResult<Amount> {
        let state = self.state.lock().await;
        Ok(state.positions.get(&(token, account)).map(|p| p.staked).unwrap_or_default())
    }

    async fn claimable(&self, token: Address, account: Address) -> LedgerResult<Amount> {
        let now = self.clock.now();
        let state = self.state.lock().await;
        let Some(position) = state.positions.get(&(token, account)) else {
            return Ok(Amount::ZERO);
        };
        earned(position, state.pool(token).reward_per_token_at(now)?)
    }
}

#[async_trait]
impl<C: Clock> StakingToken for InMemoryLedger<C> {
    async fn approve(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        state.allowances.insert((token, actor), amount);
        debug!("{} approved {} of {}", actor, amount, token);
        Ok(())
    }
}

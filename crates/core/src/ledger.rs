//! Interface of the external staking ledger
//!
//! One method per contract call. Every call is a single round-trip that
//! either completes or rejects without partial effects. `actor` is the sender
//! whose authorization and balances apply.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LedgerResult;
use crate::types::{Address, Amount, SessionId, SessionParams};

/// Staking contract calls
#[async_trait]
pub trait StakingLedger: Send + Sync {
    /// `startSession(token, totalReward, period, startTime, generation)`
    async fn start_session(
        &self,
        token: Address,
        params: &SessionParams,
        actor: Address,
    ) -> LedgerResult<()>;

    /// `sessionFor(token)`, 0 when no session was started yet
    async fn session_for(&self, token: Address) -> LedgerResult<SessionId>;

    /// `deposit(token, amount)`
    async fn deposit(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()>;

    /// `withdraw(token, amount)`
    async fn withdraw(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()>;

    /// `claim(token)`
    async fn claim(&self, token: Address, actor: Address) -> LedgerResult<()>;

    /// `stakedBalanceOf(token, account)`
    async fn staked_balance_of(&self, token: Address, account: Address) -> LedgerResult<Amount>;

    /// `claimable(token, account)`
    async fn claimable(&self, token: Address, account: Address) -> LedgerResult<Amount>;
}

/// Staking token calls needed before a deposit
#[async_trait]
pub trait StakingToken: Send + Sync {
    /// `token.approve(stakingLedger, amount)` sent by `actor`
    async fn approve(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()>;
}

#[async_trait]
impl<L: StakingLedger + ?Sized> StakingLedger for Arc<L> {
    async fn start_session(
        &self,
        token: Address,
        params: &SessionParams,
        actor: Address,
    ) -> LedgerResult<()> {
        (**self).start_session(token, params, actor).await
    }

    async fn session_for(&self, token: Address) -> LedgerResult<SessionId> {
        (**self).session_for(token).await
    }

    async fn deposit(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        (**self).deposit(token, amount, actor).await
    }

    async fn withdraw(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        (**self).withdraw(token, amount, actor).await
    }

    async fn claim(&self, token: Address, actor: Address) -> LedgerResult<()> {
        (**self).claim(token, actor).await
    }

    async fn staked_balance_of(&self, token: Address, account: Address) -> LedgerResult<Amount> {
        (**self).staked_balance_of(token, account).await
    }

    async fn claimable(&self, token: Address, account: Address) -> LedgerResult<Amount> {
        (**self).claimable(token, account).await
    }
}

#[async_trait]
impl<T: StakingToken + ?Sized> StakingToken for Arc<T> {
    async fn approve(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        (**self).approve(token, amount, actor).await
    }
}

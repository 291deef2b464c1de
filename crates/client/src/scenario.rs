//! Staking lifecycle scenario
//!
//! Start a session, confirm it cannot be overwritten, stake, watch the reward
//! accrue, claim it, withdraw everything, then confirm a claim without stake
//! is refused. Every step asserts against fresh ledger reads.

use anyhow::{Context, Result, bail, ensure};
use serde::Serialize;
use tracing::info;

use seascape_core::{
    Actors, Address, Amount, Clock, LedgerError, SessionId, SessionParams, StakingLedger,
    StakingToken, format_ether,
};

use crate::client::{StakingSessionClient, expect_rejection};
use crate::config::ScenarioConfig;

/// What the scenario observed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Staking token used
    pub token: Address,
    /// Id of the session the run started
    pub session_id: SessionId,
    /// Amount approved and deposited
    pub deposited: Amount,
    /// Staked balance read back after the deposit
    pub staked_after_deposit: Amount,
    /// Right after the deposit
    pub claimable_before_wait: Amount,
    /// After the accrual wait
    pub claimable_after_wait: Amount,
    /// After the claim
    pub claimable_after_claim: Amount,
    /// Staked balance after withdrawing everything
    pub staked_after_withdraw: Amount,
    /// Reason of the final rejected claim
    pub final_claim_reason: String,
}

/// One run of the lifecycle against a ledger
#[derive(Debug)]
pub struct LifecycleScenario<'a, L, C> {
    client: &'a StakingSessionClient<L>,
    clock: &'a C,
    actors: Actors,
    config: &'a ScenarioConfig,
}

impl<'a, L, C> LifecycleScenario<'a, L, C>
where
    L: StakingLedger + StakingToken,
    C: Clock,
{
    /// Scenario driving `client`, waiting on `clock`
    pub const fn new(
        client: &'a StakingSessionClient<L>,
        clock: &'a C,
        actors: Actors,
        config: &'a ScenarioConfig,
    ) -> Self {
        Self { client, clock, actors, config }
    }

    /// Run every step, stopping at the first deviation
    pub async fn run(&self) -> Result<ScenarioReport> {
        let token = self.config.token()?;
        let params = self.config.session_params(self.clock.now());
        let mut report = ScenarioReport { token, ..ScenarioReport::default() };

        info!("=== Staking lifecycle on {} ===", token);

        report.session_id = self.start_session(token, &params).await?;
        self.reject_overwrite(token, &params, report.session_id).await?;

        let amount = self.config.deposit_amount();
        report.deposited = amount;
        report.staked_after_deposit = self.deposit(token, amount).await?;

        let (before, after) = self.observe_accrual(token).await?;
        report.claimable_before_wait = before;
        report.claimable_after_wait = after;

        report.claimable_after_claim = self.claim(token, after).await?;
        report.staked_after_withdraw = self.withdraw_all(token).await?;
        report.final_claim_reason = self.reject_claim_without_stake(token).await?;

        info!("=== Scenario passed ===");
        Ok(report)
    }

    async fn start_session(&self, token: Address, params: &SessionParams) -> Result<SessionId> {
        info!("should start a session that lasts {} seconds", params.period_secs);
        let previous = self.client.session_for(token).await?;
        let session_id = self.client.start_session(token, params, self.actors.admin).await?;
        ensure!(
            session_id == previous + 1,
            "session id {session_id} does not follow previous id {previous}"
        );
        Ok(session_id)
    }

    async fn reject_overwrite(
        &self,
        token: Address,
        params: &SessionParams,
        session_id: SessionId,
    ) -> Result<()> {
        info!("should not overwrite a session before time expiration");
        let result = self.client.start_session(token, params, self.actors.admin).await;
        expect_rejection(result, &LedgerError::SessionActive).context("session overwrite")?;

        let current = self.client.session_for(token).await?;
        ensure!(current == session_id, "session id moved from {session_id} to {current}");
        Ok(())
    }

    async fn deposit(&self, token: Address, amount: Amount) -> Result<Amount> {
        info!("should deposit a staking token by a player");
        let player = self.actors.player;
        let before = self.client.staked_balance_of(token, player).await?;

        self.client.approve(token, amount, player).await?;
        self.client.deposit(token, amount, player).await?;

        let balance = self.client.staked_balance_of(token, player).await?;
        ensure!(
            balance == before + amount,
            "staked balance {} after depositing {} on top of {}",
            format_ether(balance),
            format_ether(amount),
            format_ether(before)
        );
        Ok(balance)
    }

    async fn observe_accrual(&self, token: Address) -> Result<(Amount, Amount)> {
        info!("should accrue reward while staked");
        let player = self.actors.player;

        let first = self.client.claimable(token, player).await?;
        self.clock.sleep(self.config.accrual_wait).await;
        let second = self.client.claimable(token, player).await?;

        ensure!(second >= first, "claimable dropped from {first} to {second}");
        ensure!(!second.is_zero(), "nothing accrued after {:?}", self.config.accrual_wait);
        Ok((first, second))
    }

    async fn claim(&self, token: Address, accrued: Amount) -> Result<Amount> {
        info!("should claim some Crowns");
        let player = self.actors.player;

        if let Err(err) = self.client.claim(token, player).await {
            bail!("claim failed: {err}");
        }

        let remaining = self.client.claimable(token, player).await?;
        ensure!(remaining <= accrued, "claimable grew from {accrued} to {remaining} after claim");
        Ok(remaining)
    }

    async fn withdraw_all(&self, token: Address) -> Result<Amount> {
        info!("should withdraw all LP Tokens");
        let player = self.actors.player;

        let staked = self.client.staked_balance_of(token, player).await?;
        self.client.withdraw(token, staked, player).await?;

        let balance = self.client.staked_balance_of(token, player).await?;
        ensure!(balance.is_zero(), "withdrawn LP token amount should be 0, got {balance}");
        Ok(balance)
    }

    async fn reject_claim_without_stake(&self, token: Address) -> Result<String> {
        info!("should fail to claim any token without LP token");
        let result = self.client.claim(token, self.actors.player).await;
        expect_rejection(result, &LedgerError::NoStake).context("claim without stake")?;
        Ok(LedgerError::NoStake.to_string())
    }
}

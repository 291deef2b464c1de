//! Contract bindings
//!
//! Call shapes for the Seascape `Staking` contract and the ERC20 staking
//! token, written by hand against their Solidity signatures.

pub mod abi;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

pub use abi::{AbiError, Token};

/// Calls understood by the `Staking` contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingCall {
    /// `startSession(token, totalReward, period, startTime, generation)`
    StartSession {
        /// Staking token the session is for
        token: Address,
        /// Reward emitted over the whole period, in wei
        total_reward: U256,
        /// Session length in seconds
        period: u64,
        /// Unix timestamp the emission starts at
        start_time: u64,
        /// Opaque generation tag
        generation: u64,
    },
    /// `deposit(token, amount)`
    Deposit {
        /// Staking token
        token: Address,
        /// Amount in wei
        amount: U256,
    },
    /// `withdraw(token, amount)`
    Withdraw {
        /// Staking token
        token: Address,
        /// Amount in wei
        amount: U256,
    },
    /// `claim(token)`
    Claim {
        /// Staking token
        token: Address,
    },
    /// `stakedBalanceOf(token, account)`
    StakedBalanceOf {
        /// Staking token
        token: Address,
        /// Staker
        account: Address,
    },
    /// `claimable(token, account)`
    Claimable {
        /// Staking token
        token: Address,
        /// Staker
        account: Address,
    },
    /// `sessionFor(token)`
    SessionFor {
        /// Staking token
        token: Address,
    },
}

impl StakingCall {
    /// Contract method name
    pub const fn method(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "startSession",
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::Claim { .. } => "claim",
            Self::StakedBalanceOf { .. } => "stakedBalanceOf",
            Self::Claimable { .. } => "claimable",
            Self::SessionFor { .. } => "sessionFor",
        }
    }

    /// Canonical signature used for the selector
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "startSession(address,uint256,uint256,uint256,uint256)",
            Self::Deposit { .. } => "deposit(address,uint256)",
            Self::Withdraw { .. } => "withdraw(address,uint256)",
            Self::Claim { .. } => "claim(address)",
            Self::StakedBalanceOf { .. } => "stakedBalanceOf(address,address)",
            Self::Claimable { .. } => "claimable(address,address)",
            Self::SessionFor { .. } => "sessionFor(address)",
        }
    }

    /// Read-only calls go through `eth_call`, the rest are transactions
    pub const fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::StakedBalanceOf { .. } | Self::Claimable { .. } | Self::SessionFor { .. }
        )
    }

    /// Positional arguments
    pub fn args(&self) -> Vec<Token> {
        match *self {
            Self::StartSession { token, total_reward, period, start_time, generation } => vec![
                token.into(),
                total_reward.into(),
                period.into(),
                start_time.into(),
                generation.into(),
            ],
            Self::Deposit { token, amount } | Self::Withdraw { token, amount } => {
                vec![token.into(), amount.into()]
            }
            Self::Claim { token } | Self::SessionFor { token } => vec![token.into()],
            Self::StakedBalanceOf { token, account } | Self::Claimable { token, account } => {
                vec![token.into(), account.into()]
            }
        }
    }

    /// Selector followed by the encoded arguments
    pub fn calldata(&self) -> Vec<u8> {
        abi::encode_call(self.signature(), &self.args())
    }
}

/// Calls on the ERC20 staking token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenCall {
    /// `approve(spender, amount)`
    Approve {
        /// Contract allowed to pull tokens
        spender: Address,
        /// Allowance in wei
        amount: U256,
    },
}

impl TokenCall {
    /// Contract method name
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
        }
    }

    /// Canonical signature used for the selector
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve(address,uint256)",
        }
    }

    /// Selector followed by the encoded arguments
    pub fn calldata(&self) -> Vec<u8> {
        let args: Vec<Token> = match *self {
            Self::Approve { spender, amount } => vec![spender.into(), amount.into()],
        };
        abi::encode_call(self.signature(), &args)
    }
}

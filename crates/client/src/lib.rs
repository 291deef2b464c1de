//! Client side of the Seascape staking contract

pub mod client;
pub mod config;
pub mod rpc;
pub mod scenario;

pub use client::{StakingSessionClient, expect_rejection, tolerate_rejection};
pub use config::{Config, LedgerMode, RpcConfig, ScenarioConfig};
pub use rpc::RpcLedger;
pub use scenario::{LifecycleScenario, ScenarioReport};

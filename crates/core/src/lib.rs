//! Seascape staking core
//!
//! This crate contains everything shared between the session client and its
//! tests:
//! - Domain types (sessions, positions, amounts)
//! - The rejection taxonomy of the staking contract
//! - The `StakingLedger` interface and an in-memory ledger behind it
//! - An injectable clock for accrual waits

pub mod clock;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{StakingLedger, StakingToken};
pub use memory::InMemoryLedger;
pub use types::*;

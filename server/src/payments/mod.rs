//! Simulated payment rails: the outcome policy, the delayed mobile-money
//! settlement timer and the STK-push callback envelope.

pub mod gateway;
pub mod policy;
pub mod scheduler;

pub use policy::{FixedPolicy, RandomPolicy, SettlementPolicy};
pub use scheduler::{ScheduledSettlement, SettlementScheduler};

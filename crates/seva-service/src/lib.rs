//! Seva business operations.
//!
//! Every settlement path follows the same shape: append ledger rows, resync
//! the user's rank snapshot inside the same transaction, then run the badge
//! check and write the audit row after commit. Settlement operations take
//! the timestamp from the caller so snapshots and grants share one clock.

pub mod attendance;
pub mod audit;
pub mod auth;
pub mod badge;
pub mod bonus;
pub mod department;
pub mod engagement;
pub mod error;
pub mod ledger;
pub mod rank;
pub mod redemption;
pub mod reward;
pub mod schedule;
pub mod user;

//! Seva core: configuration, shared types, and the database-free parts of the
//! settlement pipeline (rank table, badge rules, shift arithmetic, quota
//! arithmetic, and redemption code signing).

pub mod badge_rule;
pub mod config;
pub mod constants;
pub mod error;
pub mod quota;
pub mod rank;
pub mod redemption;
pub mod shift;
pub mod types;

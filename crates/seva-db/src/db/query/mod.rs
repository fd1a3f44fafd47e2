//! Query builders and async query functions, one module per table group.
//!
//! Functions take a `&mut DbConnection` so they compose inside a caller's
//! transaction, and return `diesel::QueryResult`.

pub mod attendance;
pub mod audit;
pub mod badge;
pub mod bonus;
pub mod department;
pub mod engagement;
pub mod ledger;
pub mod rank;
pub mod reward;
pub mod schedule;
pub mod user;

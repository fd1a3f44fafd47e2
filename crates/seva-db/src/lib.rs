//! Seva persistence: `PostgreSQL` schema, models and query functions.

pub mod db;
pub mod error;
pub mod model;

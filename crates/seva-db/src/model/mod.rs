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

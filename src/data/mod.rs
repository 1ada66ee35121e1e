//! Data layer module
//!
//! Handles all data persistence:
//! - Connection pool and write transactions
//! - Users, posts and interaction ledgers
//! - Follow graph
//! - Notifications

mod database;
mod follows;
mod models;
mod notifications;
mod posts;

pub use database::{Database, WriteTx};
pub use models::*;
pub use posts::Ledger;

#[cfg(test)]
mod database_test;

//! Durable storage for measurements, alert rules and notifications.
//!
//! All access goes through [`store::MonitorStore`], an async SeaORM layer
//! over SQLite. The schema is owned by the `migration` crate and applied on
//! connect.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::{AlertRuleUpdate, MonitorStore};

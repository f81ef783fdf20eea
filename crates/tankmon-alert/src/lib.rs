//! Alert evaluation engine.
//!
//! One [`engine::AlertEvaluator::evaluate`] pass runs per freshly persisted
//! measurement: it selects the active rules scoped to that measurement,
//! applies threshold, duration-hold and cooldown checks, persists a
//! [`tankmon_common::types::Notification`] for every firing, and hands each
//! one to the fan-out hub and any configured webhook.

pub mod engine;


pub use engine::AlertEvaluator;

pub mod alert_rule;
pub mod measurement;
pub mod notification;

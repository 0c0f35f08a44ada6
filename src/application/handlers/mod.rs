//! Application command handlers.

pub mod webhooks;
pub mod withdrawals;

//! Adapters - Concrete implementations of the ports.

pub mod analytics;
pub mod http;
pub mod notifier;
pub mod postgres;

//! Ports - Interfaces to external collaborators.
//!
//! Every dependency of the reconciliation core is expressed as an
//! `async_trait` here and injected explicitly; adapters provide the
//! PostgreSQL and HTTP implementations.

mod analytics_forwarder;
mod balance_ledger;
mod notifier;
mod payment_store;
mod product_access_repository;
mod webhook_event_repository;
mod withdrawal_repository;

pub use analytics_forwarder::AnalyticsForwarder;
pub use balance_ledger::{AdjustmentOutcome, BalanceLedger};
pub use notifier::Notifier;
pub use payment_store::{PaymentStore, UpdateOutcome};
pub use product_access_repository::ProductAccessRepository;
pub use webhook_event_repository::{
    LogStatus, RecordOutcome, WebhookEventRepository, WebhookLogEntry,
};
pub use withdrawal_repository::WithdrawalRepository;

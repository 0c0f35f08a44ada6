//! PostgreSQL adapters for the repository ports.

mod balance_ledger;
mod payment_store;
mod product_access_repository;
mod webhook_event_repository;
mod withdrawal_repository;

pub use balance_ledger::PostgresBalanceLedger;
pub use payment_store::PostgresPaymentStore;
pub use product_access_repository::PostgresProductAccessRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
pub use withdrawal_repository::PostgresWithdrawalRepository;

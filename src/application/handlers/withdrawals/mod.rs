//! Withdrawal command handlers.

mod request_withdrawal;

pub use request_withdrawal::{RequestWithdrawalCommand, RequestWithdrawalHandler};

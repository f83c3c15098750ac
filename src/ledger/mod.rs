//! The balance ledger: the per-user transaction history and running balance.

mod balance_endpoint;
mod core;
mod create_transaction_endpoint;

pub use balance_endpoint::{
    HistoryParams, LedgerState, get_balance_endpoint, get_history_endpoint,
};
pub use core::{
    DEFAULT_HISTORY_LIMIT, NewTransaction, Transaction, TransactionStatus, TransactionType,
    apply_transaction, create_ledger_tables, get_balance, get_history, initialize_balance,
};
pub use create_transaction_endpoint::create_transaction_endpoint;

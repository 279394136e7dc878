//! Accounting rules
//!
//! Transaction approval by A.I.E holders and the Master Imprest Register.

mod imprest;
mod transaction;

pub use imprest::{
    is_overdue, register_summary, ImprestStatus, RegisterSummary, MAX_IMPREST_CENTS,
};
pub use transaction::{TransactionAction, TransactionStatus};

//! DIAL (Declaration of Income, Assets and Liabilities) workflow
//!
//! The status state machine and statement arithmetic live here; the
//! handlers in `handlers::dial` apply them to stored records.

mod statement;
mod workflow;

pub use statement::{summarize, Category, Owner, StatementSummary, MAX_ITEM_CENTS};
pub use workflow::{check_action, ActionCheck, DialAction, DialStatus, WorkflowError};

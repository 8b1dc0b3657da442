//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod account;
mod transaction;
pub mod result;

pub use account::{Account, AccountUpdate};
pub use result::{DuplicateField, Error, Result};
pub use transaction::{NewTransaction, TransactionRecord, DEFAULT_TRANSACTION_STATUS};

//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Every backend
//! call a service makes is a single statement bounded by the service's
//! deadline; nothing is retried here.

mod account;
mod credentials;
mod schema;
mod transaction;

use std::future::Future;
use std::time::Duration;

use crate::ports::StorageError;

pub use account::AccountRepository;
pub use credentials::{CredentialValidator, Validation};
pub use schema::SchemaInitializer;
pub use transaction::TransactionRecorder;

/// Deadline applied to each backend call unless configured otherwise
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Await a backend call for at most `deadline`.
///
/// Backends are asked to honour the deadline themselves; this also covers
/// one that does not.
pub(crate) async fn bounded<T, F>(deadline: Duration, call: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(deadline)),
    }
}

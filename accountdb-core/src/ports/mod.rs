//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod hasher;
mod storage;

pub use hasher::CredentialHasher;
pub use storage::{Row, SqlValue, StorageBackend, StorageError};

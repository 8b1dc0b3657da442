//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB behind an r2d2 pool for StorageBackend
//! - Argon2id for CredentialHasher

pub mod argon2_hasher;
pub mod duckdb;

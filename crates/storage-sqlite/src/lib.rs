//! SQLite storage implementation for token holder reconciliation.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the [`HolderStore`](tokenholder_core::holders::HolderStore) trait
//! defined in `tokenholder-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations (the `token_holder` table and its partial unique indexes)
//! - The holder repository issuing bulk upserts per category
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//! core (classification, routing)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod holders;
pub mod schema;
mod utils;

// Re-export database utilities
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool, WriteHandle};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export the repository
pub use holders::HolderRepository;

// Re-export from tokenholder-core for convenience
pub use tokenholder_core::errors::{DatabaseError, Error, Result};

//! SQLite storage implementation for token holders.

mod model;
mod repository;

pub use model::{ConflictTarget, NewTokenHolderDB, TokenHolderDB, INSERT_COLUMNS, UPDATE_COLUMNS};
pub use repository::HolderRepository;

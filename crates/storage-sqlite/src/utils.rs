//! Utility functions for SQLite storage operations.
//!
//! This module provides helpers for working with SQLite, including chunking
//! utilities to avoid parameter limits.

/// Maximum number of bound parameters per statement.
///
/// SQLite builds before 3.32 cap a statement at 999 variables
/// (SQLITE_MAX_VARIABLE_NUMBER). Multi-row inserts are chunked to stay under it.
pub const SQLITE_MAX_PARAMS: usize = 999;

/// Number of rows per multi-row statement when each row binds `params_per_row` values.
pub fn rows_per_statement(params_per_row: usize) -> usize {
    (SQLITE_MAX_PARAMS / params_per_row.max(1)).max(1)
}

/// Chunk rows so that each chunk fits in a single statement.
///
/// # Example
///
/// ```ignore
/// for chunk in chunk_rows_for_sqlite(&rows, 8) {
///     build_insert(chunk).execute(conn)?;
/// }
/// ```
pub fn chunk_rows_for_sqlite<T>(rows: &[T], params_per_row: usize) -> impl Iterator<Item = &[T]> {
    rows.chunks(rows_per_statement(params_per_row))
}

pub mod config;
pub mod loader;
mod main_lib;

pub use main_lib::{build_state, ingest_file, init_tracing, AppState};

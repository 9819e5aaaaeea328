use std::path::PathBuf;

use tokenholder_ingest::config::Config;
use tokenholder_ingest::{build_state, ingest_file, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let inputs: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        anyhow::bail!("usage: tokenholder-ingest <file>...");
    }

    let state = build_state(&config).await?;
    for path in &inputs {
        let summary = ingest_file(&state, path).await?;
        for (category, rows) in &summary.written {
            tracing::info!("{}: {} rows from {}", category, rows, path.display());
        }
        if summary.skipped > 0 {
            tracing::warn!(
                "{} records without a holder identity skipped in {}",
                summary.skipped,
                path.display()
            );
        }
    }

    tracing::info!("Ingested {} file(s) into {}", inputs.len(), state.db_path);
    Ok(())
}

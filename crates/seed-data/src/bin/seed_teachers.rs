//! Seeds the teacher fixture into the `teachers` table.
//!
//! Tries a single raw SQL insert first and falls back to the table
//! endpoint when the store has no raw SQL function. Rerunning is a no-op.
//!
//! Run with:
//! ```
//! STORE_URL=... PUBLIC_KEY=... cargo run -p seed-data --bin seed-teachers
//! ```

use std::process::ExitCode;

use seed_data::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();

    match run().await {
        Ok(code) => code,
        Err(e) => cli::fail(&e),
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let store = cli::connect(CredentialTier::Public)?;

    let teachers = fixtures::teachers()?;
    tracing::info!("Loaded {} teachers from fixture", teachers.len());
    let batch = fixtures::teacher_batch(&teachers)?;

    let result = load(&store, &batch, LoadStrategy::RawSqlFirst).await;
    if let Ok(LoadOutcome::Inserted { records, .. }) = &result {
        for record in records {
            tracing::info!(
                "  {} -> {}",
                record.get("email").and_then(|v| v.as_str()).unwrap_or("?"),
                record.id().map(|id| id.to_string()).unwrap_or_default()
            );
        }
    }

    Ok(cli::finish_load("teachers", result))
}

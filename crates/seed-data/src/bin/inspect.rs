//! Prints rows of a table to verify seeding.
//!
//! Run with:
//! ```
//! STORE_URL=... PUBLIC_KEY=... cargo run -p seed-data --bin inspect -- [TABLE] [LIMIT]
//! ```

use std::process::ExitCode;

use anyhow::Context;
use seed_data::prelude::*;
use tutoring::Filter;

const DEFAULT_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();

    match run().await {
        Ok(code) => code,
        Err(e) => cli::fail(&e),
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let mut args = std::env::args().skip(1);
    let table = args.next().unwrap_or_else(|| "teachers".to_string());
    let limit = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid limit {raw:?}"))?,
        None => DEFAULT_LIMIT,
    };

    let store = cli::connect(CredentialTier::Public)?;
    store
        .check_health()
        .await
        .with_context(|| format!("store at {} is not answering", store.base_url()))?;

    let rows = store
        .select(&table, &Filter::All, limit)
        .await
        .with_context(|| format!("listing {table}"))?;

    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    println!("✓ {} rows from {}", rows.len(), table);
    Ok(ExitCode::SUCCESS)
}

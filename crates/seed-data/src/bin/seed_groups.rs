//! Seeds the study group fixture into the `groups` table.
//!
//! Teachers must be seeded first: each group is linked to its teacher's
//! store-assigned id, looked up by email.
//!
//! Run with:
//! ```
//! STORE_URL=... PUBLIC_KEY=... cargo run -p seed-data --bin seed-groups
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

    let groups = fixtures::groups()?;
    tracing::info!("Loaded {} groups from fixture", groups.len());

    let result = async {
        let batch = group_batch(&store, &groups).await?;
        load(&store, &batch, LoadStrategy::DirectInsert).await
    }
    .await;

    Ok(cli::finish_load("groups", result))
}

//! Applies a SQL migration file with the service credential.
//!
//! Without arguments the bundled groups migration is applied. With
//! `--fallback teachers|groups`, a store without the raw SQL function gets
//! the matching fixture through the table endpoint instead.
//!
//! Run with:
//! ```
//! STORE_URL=... SERVICE_KEY=... cargo run -p seed-data --bin migrate -- [FILE] [--fallback NAME]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use seed_data::prelude::*;

const DEFAULT_MIGRATION: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/migrations/001_create_groups.sql"
);

struct Args {
    path: PathBuf,
    fallback: Option<Fixture>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut path = None;
    let mut fallback = None;

    while let Some(arg) = args.next() {
        if arg == "--fallback" {
            let name = args.next().context("--fallback needs a fixture name")?;
            fallback = Some(
                Fixture::parse(&name)
                    .with_context(|| format!("unknown fixture {name:?}, expected teachers or groups"))?,
            );
        } else if path.is_none() {
            path = Some(PathBuf::from(arg));
        } else {
            bail!("unexpected argument {arg:?}");
        }
    }

    Ok(Args {
        path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_MIGRATION)),
        fallback,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();

    match run().await {
        Ok(code) => code,
        Err(e) => cli::fail(&e),
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let args = parse_args(std::env::args().skip(1))?;
    let store = cli::connect(CredentialTier::Service)?;

    let unit = MigrationUnit::from_file(&args.path)?;
    if unit.is_empty() {
        println!("✓ {} has no statements, nothing to do", unit.name);
        return Ok(ExitCode::SUCCESS);
    }

    let fallback = match args.fallback {
        Some(Fixture::Teachers) => Some(fixtures::teacher_batch(&fixtures::teachers()?)?),
        Some(Fixture::Groups) => Some(group_batch(&store, &fixtures::groups()?).await?),
        None => None,
    };

    let report = apply_migration(&store, &unit, fallback.as_ref()).await?;

    for failure in &report.failed {
        eprintln!(
            "✗ statement {}: {}\n    {}",
            failure.index + 1,
            failure.error,
            failure.statement.lines().next().unwrap_or_default()
        );
    }
    if let Some(outcome) = &report.fallback {
        println!(
            "  Raw SQL unavailable; fallback load inserted {} rows",
            outcome.inserted()
        );
    }

    if report.is_success() {
        println!(
            "✓ Migration {} applied ({} statements)",
            report.unit,
            report.applied.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "✗ Migration {}: {} of {} statements failed",
            report.unit,
            report.failed.len(),
            unit.statements.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

//! Shared plumbing for the seed binaries.

use std::future::Future;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tutoring::{CredentialTier, RestStore, StoreConfig};

use crate::loader::{LoadError, LoadOutcome};

/// Initializes `tracing` with `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Builds a store handle for the tier, reading configuration through `lookup`.
///
/// Fails before any network traffic when configuration is missing.
pub fn connect_with(
    lookup: impl Fn(&str) -> Option<String>,
    tier: CredentialTier,
) -> Result<RestStore, LoadError> {
    let config = StoreConfig::from_lookup(lookup)?;
    let store = RestStore::from_config(&config, tier)?;
    info!("Using store at {} ({:?} credential)", store.base_url(), tier);
    Ok(store)
}

/// Builds a store handle from the process environment.
pub fn connect(tier: CredentialTier) -> Result<RestStore, LoadError> {
    connect_with(|key| std::env::var(key).ok(), tier)
}

/// Connects and runs `op` against the store.
pub async fn run_with<T, F, Fut>(
    lookup: impl Fn(&str) -> Option<String>,
    tier: CredentialTier,
    op: F,
) -> Result<T, LoadError>
where
    F: FnOnce(RestStore) -> Fut,
    Fut: Future<Output = Result<T, LoadError>>,
{
    let store = connect_with(lookup, tier)?;
    op(store).await
}

/// Process exit status for a loader result: 0 on success or nothing to do.
pub fn exit_status<T>(result: &Result<T, LoadError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Prints the final line for a load and converts it to an exit code.
pub fn finish_load(what: &str, result: Result<LoadOutcome, LoadError>) -> ExitCode {
    match &result {
        Ok(LoadOutcome::Inserted { records, .. }) => {
            println!("✓ Seeded {} {}", records.len(), what);
        }
        Ok(LoadOutcome::AlreadySeeded { existing }) => {
            println!(
                "✓ {} already seeded ({} existing rows found), nothing to do",
                what,
                existing.len()
            );
        }
        Ok(LoadOutcome::Empty) => println!("✓ No {what} to seed"),
        Err(e) => report_error(e),
    }
    ExitCode::from(exit_status(&result))
}

/// Reports an error that ended a script and returns the failure exit code.
pub fn fail(e: &anyhow::Error) -> ExitCode {
    match e.downcast_ref::<LoadError>() {
        Some(load_error) => report_error(load_error),
        None => {
            error!("{e:#}");
            eprintln!("✗ {e:#}");
        }
    }
    ExitCode::FAILURE
}

/// Logs and prints a fatal loader error.
pub fn report_error(e: &LoadError) {
    error!("{e}");
    eprintln!("✗ {e}");
    if let LoadError::ConfigurationMissing(_) = e {
        eprintln!(
            "  Set {}, {} and, for migrations, {}",
            tutoring::config::STORE_URL,
            tutoring::config::PUBLIC_KEY,
            tutoring::config::SERVICE_KEY
        );
    }
}

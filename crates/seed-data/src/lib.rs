//! Seed and migration tooling for the tutoring marketplace store.
//!
//! Every script follows the same shape: build a store handle from the
//! environment, build a [`loader::SeedBatch`] from a fixture or validated
//! input, and hand both to [`loader::load`], which only inserts when none
//! of the candidates exist yet.
//!
//! ```rust,ignore
//! use seed_data::prelude::*;
//!
//! let store = cli::connect(CredentialTier::Public)?;
//! let batch = fixtures::teacher_batch(&fixtures::teachers()?)?;
//! let outcome = load(&store, &batch, LoadStrategy::RawSqlFirst).await?;
//! ```

pub mod cli;
pub mod fixtures;
pub mod groups;
pub mod input;
pub mod loader;
pub mod migration;
pub mod sql;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::cli;
    pub use crate::fixtures::{self, Fixture, FixtureError};
    pub use crate::groups::group_batch;
    pub use crate::input::{Prompter, TeacherInput};
    pub use crate::loader::{
        EXISTENCE_PROBE_LIMIT, InsertPath, LoadError, LoadOutcome, LoadState, LoadStrategy,
        SeedBatch, load,
    };
    pub use crate::migration::{MigrationReport, MigrationUnit, apply_migration};
    pub use tutoring::{CredentialTier, Record, Store};
}

//! Idempotent batch loading of seed records.
//!
//! [`load`] probes the store for any candidate whose existence key is
//! already present and only inserts when none is. Reruns against a seeded
//! store are therefore no-ops. There is no transaction around the probe and
//! the insert: concurrent writers can race past the check.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use tutoring::{ConfigError, Filter, Record, Store, StoreError};

use crate::sql;

/// Maximum number of existing rows fetched by the existence probe.
pub const EXISTENCE_PROBE_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Configuration missing or invalid: {0}")]
    ConfigurationMissing(#[from] ConfigError),
    #[error("Store unreachable: {0}")]
    StoreUnreachable(StoreError),
    #[error("Capability unsupported: {0}")]
    CapabilityUnsupported(String),
    #[error("Existence check failed: {0}")]
    ExistenceCheckFailed(StoreError),
    #[error("Insert rejected: {0}")]
    InsertRejected(StoreError),
    #[error("Candidate record {index} is invalid: {reason}")]
    InvalidCandidate { index: usize, reason: String },
    #[error("No teacher found with email {0}")]
    UnknownTeacher(String),
}

impl LoadError {
    /// Wraps a store error for the given stage, keeping network failures distinct.
    pub(crate) fn from_store(e: StoreError, stage: fn(StoreError) -> LoadError) -> Self {
        match e {
            StoreError::Unreachable(_) => LoadError::StoreUnreachable(e),
            other => stage(other),
        }
    }
}

/// Rows destined for one table, deduplicated on one field.
#[derive(Debug, Clone)]
pub struct SeedBatch {
    pub table: String,
    pub existence_key: String,
    pub records: Vec<Record>,
}

impl SeedBatch {
    pub fn new(
        table: impl Into<String>,
        existence_key: impl Into<String>,
        records: Vec<Record>,
    ) -> Self {
        Self {
            table: table.into(),
            existence_key: existence_key.into(),
            records,
        }
    }

    /// Builds a batch from serializable items, one record per item.
    pub fn from_items<T: Serialize>(
        table: impl Into<String>,
        existence_key: impl Into<String>,
        items: &[T],
    ) -> Result<Self, LoadError> {
        let records = items
            .iter()
            .enumerate()
            .map(|(index, item)| match Record::from_serialize(item) {
                Ok(Some(record)) => Ok(record),
                Ok(None) => Err(LoadError::InvalidCandidate {
                    index,
                    reason: "not a JSON object".to_string(),
                }),
                Err(e) => Err(LoadError::InvalidCandidate {
                    index,
                    reason: e.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(table, existence_key, records))
    }

    /// Existence-key values of all candidates.
    ///
    /// Rejects candidates that already carry an identity, lack the key, or
    /// repeat another candidate's key.
    pub fn existence_values(&self) -> Result<Vec<Value>, LoadError> {
        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(self.records.len());

        for (index, record) in self.records.iter().enumerate() {
            if record.has_identity() {
                return Err(LoadError::InvalidCandidate {
                    index,
                    reason: format!("carries a {} field", Record::IDENTITY_FIELD),
                });
            }
            let value = match record.get(&self.existence_key) {
                Some(v) if !v.is_null() => v.clone(),
                _ => {
                    return Err(LoadError::InvalidCandidate {
                        index,
                        reason: format!("missing {}", self.existence_key),
                    });
                }
            };
            if !seen.insert(value.to_string()) {
                return Err(LoadError::InvalidCandidate {
                    index,
                    reason: format!("duplicate {} {}", self.existence_key, value),
                });
            }
            values.push(value);
        }

        Ok(values)
    }
}

/// Preferred way of writing the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Plain batch insert through the table endpoint.
    #[default]
    DirectInsert,
    /// One raw `INSERT ... RETURNING *`, falling back to a plain insert when
    /// the store does not support raw SQL.
    RawSqlFirst,
}

/// Which path actually wrote the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPath {
    Direct,
    RawSql,
    /// Raw SQL was unsupported and the plain insert was used instead.
    Fallback,
}

/// Loader progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unchecked,
    Checked { exists: bool },
    Inserting,
    Aborted,
    Inserted,
    Failed,
}

impl LoadState {
    fn allows(&self, next: &LoadState) -> bool {
        matches!(
            (self, next),
            (LoadState::Unchecked, LoadState::Checked { .. })
                | (LoadState::Unchecked, LoadState::Failed)
                | (LoadState::Checked { exists: true }, LoadState::Aborted)
                | (LoadState::Checked { exists: false }, LoadState::Inserting)
                | (LoadState::Inserting, LoadState::Inserted)
                | (LoadState::Inserting, LoadState::Failed)
        )
    }

    fn advance(self, next: LoadState, table: &str) -> LoadState {
        debug_assert!(self.allows(&next), "invalid transition {self:?} -> {next:?}");
        debug!("Loader for {}: {:?} -> {:?}", table, self, next);
        next
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The batch had no records; nothing was sent.
    Empty,
    /// Matching rows already exist; nothing was inserted.
    AlreadySeeded { existing: Vec<Record> },
    Inserted {
        records: Vec<Record>,
        path: InsertPath,
    },
}

impl LoadOutcome {
    /// Number of rows the store reported as inserted.
    pub fn inserted(&self) -> usize {
        match self {
            LoadOutcome::Inserted { records, .. } => records.len(),
            _ => 0,
        }
    }

    /// Terminal loader state for this outcome.
    pub fn state(&self) -> LoadState {
        match self {
            LoadOutcome::Empty | LoadOutcome::AlreadySeeded { .. } => LoadState::Aborted,
            LoadOutcome::Inserted { .. } => LoadState::Inserted,
        }
    }
}

/// Loads a batch into the store unless any of its rows already exist.
pub async fn load(
    store: &dyn Store,
    batch: &SeedBatch,
    strategy: LoadStrategy,
) -> Result<LoadOutcome, LoadError> {
    let table = batch.table.as_str();
    let keys = batch.existence_values()?;
    if keys.is_empty() {
        info!("Nothing to load into {}", table);
        return Ok(LoadOutcome::Empty);
    }

    let mut state = LoadState::Unchecked;
    info!(
        "Checking {} for existing rows by {}...",
        table, batch.existence_key
    );

    let existing = match store
        .select(
            table,
            &Filter::any_of(&batch.existence_key, keys.clone()),
            EXISTENCE_PROBE_LIMIT,
        )
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            state.advance(LoadState::Failed, table);
            return Err(LoadError::from_store(e, LoadError::ExistenceCheckFailed));
        }
    };

    state = state.advance(
        LoadState::Checked {
            exists: !existing.is_empty(),
        },
        table,
    );

    if !existing.is_empty() {
        state.advance(LoadState::Aborted, table);
        for row in &existing {
            let key = row.get(&batch.existence_key).cloned().unwrap_or_default();
            info!("  Already exists: {} = {}", batch.existence_key, key);
        }
        info!("{} already seeded, skipping insert", table);
        return Ok(LoadOutcome::AlreadySeeded { existing });
    }

    state = state.advance(LoadState::Inserting, table);
    info!("Inserting {} rows into {}...", batch.records.len(), table);

    let result = match strategy {
        LoadStrategy::DirectInsert => direct_insert(store, batch)
            .await
            .map(|records| (records, InsertPath::Direct)),
        LoadStrategy::RawSqlFirst => raw_insert(store, batch, keys).await,
    };

    match result {
        Ok((records, path)) => {
            state.advance(LoadState::Inserted, table);
            info!("Inserted {} rows into {} ({:?})", records.len(), table, path);
            Ok(LoadOutcome::Inserted { records, path })
        }
        Err(e) => {
            state.advance(LoadState::Failed, table);
            Err(e)
        }
    }
}

async fn direct_insert(store: &dyn Store, batch: &SeedBatch) -> Result<Vec<Record>, LoadError> {
    store
        .insert(&batch.table, &batch.records)
        .await
        .map_err(|e| LoadError::from_store(e, LoadError::InsertRejected))
}

/// Inserts through one raw statement.
///
/// Raw execution usually returns nothing, so rows missing from the result
/// are read back by their existence keys.
async fn raw_insert(
    store: &dyn Store,
    batch: &SeedBatch,
    keys: Vec<Value>,
) -> Result<(Vec<Record>, InsertPath), LoadError> {
    let statement = sql::render_insert(&batch.table, &batch.records);
    match store.execute_raw(&statement).await {
        Ok(records) if records.len() >= batch.records.len() => Ok((records, InsertPath::RawSql)),
        Ok(_) => {
            debug!(
                "Raw insert into {} returned no rows, reading back by {}",
                batch.table, batch.existence_key
            );
            let records = store
                .select(
                    &batch.table,
                    &Filter::any_of(&batch.existence_key, keys),
                    batch.records.len(),
                )
                .await
                .map_err(|e| LoadError::from_store(e, LoadError::ExistenceCheckFailed))?;
            Ok((records, InsertPath::RawSql))
        }
        Err(StoreError::Unsupported(reason)) => {
            warn!("Raw SQL unavailable ({reason}), falling back to plain insert");
            let records = direct_insert(store, batch).await?;
            Ok((records, InsertPath::Fallback))
        }
        Err(e) => Err(LoadError::from_store(e, LoadError::InsertRejected)),
    }
}

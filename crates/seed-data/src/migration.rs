//! SQL migration files and their application.
//!
//! Statements run one at a time through the store's raw SQL capability,
//! in file order and without a surrounding transaction. A failed statement
//! is reported and the next one still runs.

use std::path::Path;

use thiserror::Error;
use tracing::{error, info, warn};
use tutoring::{Store, StoreError};

use crate::loader::{LoadError, LoadOutcome, LoadStrategy, SeedBatch, load};

/// Starts a comment running to the end of the line.
pub const COMMENT_MARKER: &str = "--";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to read migration {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// A named, ordered list of SQL statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    pub name: String,
    pub statements: Vec<String>,
}

impl MigrationUnit {
    /// Splits migration text into statements.
    ///
    /// `--` comments are dropped, whether on their own line or after code,
    /// and statements left empty are skipped. Semicolons inside single-quoted
    /// strings, double-quoted identifiers and dollar-quoted bodies do not end
    /// a statement.
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            statements: split_statements(text),
        }
    }

    /// Reads and parses a migration file; the unit is named after the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MigrationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::parse(name, &text))
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Dollar,
}

fn split_statements(body: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote = Quote::None;
    let mut dollar_tag = String::new();
    let mut rest = body;

    while let Some(c) = rest.chars().next() {
        match quote {
            Quote::None => match c {
                '-' if rest.starts_with(COMMENT_MARKER) => {
                    let end = rest.find('\n').unwrap_or(rest.len());
                    rest = &rest[end..];
                    continue;
                }
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                    rest = &rest[1..];
                    continue;
                }
                '\'' => quote = Quote::Single,
                '"' => quote = Quote::Double,
                '$' => {
                    if let Some(tag) = dollar_tag_at(rest) {
                        current.push_str(tag);
                        dollar_tag = tag.to_string();
                        quote = Quote::Dollar;
                        rest = &rest[tag.len()..];
                        continue;
                    }
                }
                _ => {}
            },
            // A doubled quote re-enters the quoted state on the next char
            Quote::Single if c == '\'' => quote = Quote::None,
            Quote::Double if c == '"' => quote = Quote::None,
            Quote::Dollar if rest.starts_with(dollar_tag.as_str()) => {
                current.push_str(&dollar_tag);
                rest = &rest[dollar_tag.len()..];
                quote = Quote::None;
                continue;
            }
            _ => {}
        }
        current.push(c);
        rest = &rest[c.len_utf8()..];
    }

    push_statement(&mut statements, &current);
    statements
}

/// Returns the `$tag$` opening at the start of `text`, if any.
fn dollar_tag_at(text: &str) -> Option<&str> {
    let inner = &text[1..];
    let end = inner.find('$')?;
    let tag = &inner[..end];
    if tag.chars().all(|c| c.is_alphanumeric() || c == '_') && !tag.starts_with(|c: char| c.is_ascii_digit()) {
        Some(&text[..end + 2])
    } else {
        None
    }
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

/// A statement the store refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub index: usize,
    pub statement: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    pub unit: String,
    /// Indexes of statements that ran successfully.
    pub applied: Vec<usize>,
    pub failed: Vec<StatementFailure>,
    /// Indexes of statements never sent because the fallback took over.
    pub skipped: Vec<usize>,
    /// Result of the fallback seed load, when raw SQL was unsupported.
    pub fallback: Option<LoadOutcome>,
}

impl MigrationReport {
    fn new(unit: &MigrationUnit) -> Self {
        Self {
            unit: unit.name.clone(),
            applied: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            fallback: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies a migration statement by statement.
///
/// When the store reports raw SQL as unsupported and a `fallback` batch is
/// given, the remaining statements are skipped and the batch is loaded with
/// a plain insert instead. Without a fallback that is an error.
pub async fn apply_migration(
    store: &dyn Store,
    unit: &MigrationUnit,
    fallback: Option<&SeedBatch>,
) -> Result<MigrationReport, LoadError> {
    let mut report = MigrationReport::new(unit);
    let total = unit.statements.len();
    info!("Applying migration {} ({} statements)...", unit.name, total);

    for (index, statement) in unit.statements.iter().enumerate() {
        match store.execute_raw(statement).await {
            Ok(_) => {
                info!("  [{}/{}] applied", index + 1, total);
                report.applied.push(index);
            }
            Err(StoreError::Unsupported(reason)) => {
                let Some(batch) = fallback else {
                    return Err(LoadError::CapabilityUnsupported(reason));
                };
                warn!(
                    "Raw SQL unavailable ({}), loading {} rows into {} instead",
                    reason,
                    batch.records.len(),
                    batch.table
                );
                report.skipped = (index..total).collect();
                report.fallback = Some(load(store, batch, LoadStrategy::DirectInsert).await?);
                return Ok(report);
            }
            Err(e @ StoreError::Unreachable(_)) => return Err(LoadError::StoreUnreachable(e)),
            Err(e) => {
                error!("  [{}/{}] failed: {}", index + 1, total, e);
                report.failed.push(StatementFailure {
                    index,
                    statement: statement.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Migration {}: {} applied, {} failed",
        unit.name,
        report.applied.len(),
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutoring::{MemoryStore, RawSupport, Record};

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let unit = MigrationUnit::parse(
            "001_groups.sql",
            "-- create groups\nCREATE TABLE groups (id uuid);\n\n  -- indented comment\n;\nCREATE INDEX groups_title ON groups (title);\n",
        );
        assert_eq!(
            unit.statements,
            vec![
                "CREATE TABLE groups (id uuid)".to_string(),
                "CREATE INDEX groups_title ON groups (title)".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_strips_inline_comments() {
        let unit = MigrationUnit::parse(
            "inline",
            "CREATE TABLE t (\n  a int -- don't use\n);\nSELECT 1; -- trailing\n",
        );
        assert_eq!(
            unit.statements,
            vec!["CREATE TABLE t (\n  a int \n)".to_string(), "SELECT 1".to_string()]
        );
    }

    #[test]
    fn test_parse_keeps_dashes_inside_quotes() {
        let unit = MigrationUnit::parse(
            "dashes",
            "INSERT INTO notes (body) VALUES ('a -- b');\nSELECT 3 - -1; -- done",
        );
        assert_eq!(
            unit.statements,
            vec![
                "INSERT INTO notes (body) VALUES ('a -- b')".to_string(),
                "SELECT 3 - -1".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_drops_comment_only_statements() {
        let unit = MigrationUnit::parse("comments", "SELECT 1;\n-- nothing here\n; -- or here");
        assert_eq!(unit.statements, vec!["SELECT 1".to_string()]);
    }

    #[test]
    fn test_parse_keeps_quoted_semicolons() {
        let unit = MigrationUnit::parse(
            "quotes",
            "INSERT INTO notes (body) VALUES ('a; b', 'it''s; fine');\nSELECT \"odd;name\" FROM t",
        );
        assert_eq!(unit.statements.len(), 2);
        assert_eq!(
            unit.statements[0],
            "INSERT INTO notes (body) VALUES ('a; b', 'it''s; fine')"
        );
        assert_eq!(unit.statements[1], "SELECT \"odd;name\" FROM t");
    }

    #[test]
    fn test_parse_keeps_dollar_quoted_bodies() {
        let sql = "CREATE FUNCTION touch() RETURNS trigger AS $body$\nBEGIN\n  NEW.updated_at = now();\n  RETURN NEW;\nEND;\n$body$ LANGUAGE plpgsql;\nSELECT 1;";
        let unit = MigrationUnit::parse("fn", sql);
        assert_eq!(unit.statements.len(), 2);
        assert!(unit.statements[0].ends_with("$body$ LANGUAGE plpgsql"));
        assert!(unit.statements[0].contains("RETURN NEW;"));
        assert_eq!(unit.statements[1], "SELECT 1");
    }

    #[test]
    fn test_dollar_sign_in_identifier_is_not_a_tag() {
        assert_eq!(dollar_tag_at("$$ body"), Some("$$"));
        assert_eq!(dollar_tag_at("$fn$ body"), Some("$fn$"));
        assert_eq!(dollar_tag_at("$1, $2"), None);
        assert_eq!(dollar_tag_at("$ alone"), None);
    }

    #[test]
    fn test_from_file_missing() {
        let err = MigrationUnit::from_file("/nonexistent/002_nothing.sql").unwrap_err();
        assert!(err.to_string().contains("002_nothing.sql"));
    }

    #[tokio::test]
    async fn test_apply_runs_statements_in_order() {
        let store = MemoryStore::new().with_raw_support(RawSupport::Journal);
        let unit = MigrationUnit::parse("m", "SELECT 1; SELECT 2; SELECT 3");

        let report = apply_migration(&store, &unit, None).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.applied, vec![0, 1, 2]);
        assert_eq!(store.journal().await, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[tokio::test]
    async fn test_apply_without_fallback_reports_unsupported() {
        let store = MemoryStore::new();
        let unit = MigrationUnit::parse("m", "ALTER TABLE teachers ADD COLUMN city text");

        let err = apply_migration(&store, &unit, None).await.unwrap_err();
        assert!(matches!(err, LoadError::CapabilityUnsupported(_)));
    }

    #[tokio::test]
    async fn test_apply_falls_back_to_seed_batch() {
        let store = MemoryStore::new();
        let unit = MigrationUnit::parse("m", "INSERT INTO teachers (email) VALUES ('a@x.com'); SELECT 1");
        let batch = SeedBatch::new(
            "teachers",
            "email",
            vec![Record::new().with("email", "a@x.com")],
        );

        let report = apply_migration(&store, &unit, Some(&batch)).await.unwrap();

        assert_eq!(report.skipped, vec![0, 1]);
        assert!(report.applied.is_empty());
        assert_eq!(report.fallback.as_ref().map(LoadOutcome::inserted), Some(1));
        assert_eq!(store.rows("teachers").await.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_offline_is_fatal() {
        let store = MemoryStore::new().offline();
        let unit = MigrationUnit::parse("m", "SELECT 1; SELECT 2");

        let err = apply_migration(&store, &unit, None).await.unwrap_err();
        assert!(matches!(err, LoadError::StoreUnreachable(_)));
        assert_eq!(store.calls().await.raw, 1);
    }
}

//! In-process store used by tests and dry runs.

use std::{collections::HashMap, iter::Peekable, vec::IntoIter};

use async_trait::async_trait;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Filter, Store};
use crate::{errors::StoreError, models::Record};

/// How the in-memory store answers raw SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSupport {
    /// Reports [`StoreError::Unsupported`].
    Unsupported,
    /// Records the statement in the journal and returns no rows.
    Journal,
    /// Journals the statement, applies it when it is a plain multi-row
    /// `INSERT`, and returns no rows like a void database function.
    Apply,
}

/// Number of calls the store has served, per capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallLog {
    pub selects: usize,
    pub inserts: usize,
    pub raw: usize,
}

impl CallLog {
    pub fn total(&self) -> usize {
        self.selects + self.inserts + self.raw
    }
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Record>>,
    journal: Vec<String>,
    calls: CallLog,
}

/// Store kept entirely in memory.
///
/// Assigns a v4 UUID `id` and an RFC 3339 `created_at` to every inserted
/// row, the way the hosted store's column defaults do.
pub struct MemoryStore {
    state: Mutex<State>,
    raw: RawSupport,
    offline: bool,
    reject_inserts: Option<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            raw: RawSupport::Unsupported,
            offline: false,
            reject_inserts: None,
        }
    }

    pub fn with_raw_support(mut self, raw: RawSupport) -> Self {
        self.raw = raw;
        self
    }

    /// Makes every call fail as if the network were down.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Makes every insert fail with the given message.
    pub fn rejecting_inserts(mut self, reason: impl Into<String>) -> Self {
        self.reject_inserts = Some(reason.into());
        self
    }

    /// Pre-populates a table, assigning identities like a real insert.
    pub async fn seed(&self, table: &str, records: Vec<Record>) {
        let mut state = self.state.lock().await;
        let rows = state.tables.entry(table.to_string()).or_default();
        rows.extend(records.into_iter().map(stamp));
    }

    /// All rows of a table in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.state
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Raw statements executed so far.
    pub async fn journal(&self) -> Vec<String> {
        self.state.lock().await.journal.clone()
    }

    pub async fn calls(&self) -> CallLog {
        self.state.lock().await.calls
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }
}

fn stamp(mut record: Record) -> Record {
    if !record.has_identity() {
        record.insert(Record::IDENTITY_FIELD, Uuid::new_v4().to_string());
    }
    if record.get("created_at").is_none() {
        let now = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        record.insert("created_at", now);
    }
    record
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.selects += 1;
        self.check_online()?;

        Ok(state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.matches(row))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, records: &[Record]) -> Result<Vec<Record>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.inserts += 1;
        self.check_online()?;

        if let Some(reason) = &self.reject_inserts {
            return Err(StoreError::Rejected {
                status: 400,
                body: reason.clone(),
            });
        }

        let stored: Vec<Record> = records.iter().cloned().map(stamp).collect();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn execute_raw(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.raw += 1;
        self.check_online()?;

        match self.raw {
            RawSupport::Unsupported => Err(StoreError::Unsupported(
                "raw SQL execution is not enabled".to_string(),
            )),
            RawSupport::Journal => {
                state.journal.push(sql.to_string());
                Ok(Vec::new())
            }
            RawSupport::Apply => {
                state.journal.push(sql.to_string());
                if let Some((table, records)) = parse_insert(sql) {
                    let rows = state.tables.entry(table).or_default();
                    rows.extend(records.into_iter().map(stamp));
                }
                Ok(Vec::new())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Word(String),
    Str(String),
    Cast,
    Punct(char),
}

type Tokens = Peekable<IntoIter<Token>>;

fn tokenize(sql: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '"' | '\'' => {
                let mut text = String::new();
                loop {
                    match chars.next()? {
                        q if q == c && chars.peek() == Some(&c) => {
                            chars.next();
                            text.push(c);
                        }
                        q if q == c => break,
                        other => text.push(other),
                    }
                }
                tokens.push(if c == '"' {
                    Token::Ident(text)
                } else {
                    Token::Str(text)
                });
            }
            ':' => {
                if chars.next()? != ':' {
                    return None;
                }
                tokens.push(Token::Cast);
            }
            '(' | ')' | ',' | ';' => tokens.push(Token::Punct(c)),
            _ => {
                let mut word = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || "\"'(),;:".contains(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Some(tokens)
}

/// Reads `INSERT INTO table (columns) VALUES (...), ...` into rows.
///
/// `DEFAULT` leaves the field out, `'...'::jsonb` is parsed as JSON and a
/// string shaped like `{a,b}` is read as an array literal. Anything after
/// the last row is ignored.
fn parse_insert(sql: &str) -> Option<(String, Vec<Record>)> {
    let mut tokens = tokenize(sql)?.into_iter().peekable();
    expect_word(&mut tokens, "INSERT")?;
    expect_word(&mut tokens, "INTO")?;
    let table = name(tokens.next()?)?;

    expect(&mut tokens, Token::Punct('('))?;
    let mut columns = Vec::new();
    loop {
        columns.push(name(tokens.next()?)?);
        match tokens.next()? {
            Token::Punct(',') => {}
            Token::Punct(')') => break,
            _ => return None,
        }
    }

    expect_word(&mut tokens, "VALUES")?;
    let mut records = Vec::new();
    loop {
        expect(&mut tokens, Token::Punct('('))?;
        let mut record = Record::new();
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                expect(&mut tokens, Token::Punct(','))?;
            }
            if let Some(value) = literal(&mut tokens)? {
                record.insert(column.as_str(), value);
            }
        }
        expect(&mut tokens, Token::Punct(')'))?;
        records.push(record);

        if tokens.peek() != Some(&Token::Punct(',')) {
            break;
        }
        tokens.next();
    }

    Some((table, records))
}

fn expect(tokens: &mut Tokens, token: Token) -> Option<()> {
    (tokens.next()? == token).then_some(())
}

fn expect_word(tokens: &mut Tokens, word: &str) -> Option<()> {
    match tokens.next()? {
        Token::Word(w) if w.eq_ignore_ascii_case(word) => Some(()),
        _ => None,
    }
}

fn name(token: Token) -> Option<String> {
    match token {
        Token::Ident(s) | Token::Word(s) => Some(s),
        _ => None,
    }
}

/// One value; `Some(None)` for `DEFAULT`.
fn literal(tokens: &mut Tokens) -> Option<Option<Value>> {
    let value = match tokens.next()? {
        Token::Word(w) if w.eq_ignore_ascii_case("DEFAULT") => return Some(None),
        Token::Word(w) if w.eq_ignore_ascii_case("NULL") => Value::Null,
        Token::Word(w) if w.eq_ignore_ascii_case("TRUE") => Value::Bool(true),
        Token::Word(w) if w.eq_ignore_ascii_case("FALSE") => Value::Bool(false),
        Token::Word(w) => serde_json::from_str::<Value>(&w)
            .ok()
            .filter(Value::is_number)?,
        Token::Str(s) => {
            if tokens.peek() != Some(&Token::Cast) {
                array_literal(&s).unwrap_or(Value::String(s))
            } else {
                tokens.next();
                match tokens.next()? {
                    Token::Word(ty) if ty.eq_ignore_ascii_case("jsonb") => {
                        serde_json::from_str(&s).ok()?
                    }
                    _ => return None,
                }
            }
        }
        _ => return None,
    };
    Some(Some(value))
}

fn array_literal(text: &str) -> Option<Value> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    while chars.peek().is_some() {
        let item = if chars.peek() == Some(&'"') {
            chars.next();
            let mut element = String::new();
            loop {
                match chars.next()? {
                    '\\' => element.push(chars.next()?),
                    '"' => break,
                    c => element.push(c),
                }
            }
            Value::String(element)
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            match word.as_str() {
                "NULL" => Value::Null,
                _ => serde_json::from_str::<Value>(&word).unwrap_or(Value::String(word)),
            }
        };
        items.push(item);

        match chars.next() {
            None => break,
            Some(',') => {}
            Some(_) => return None,
        }
    }

    Some(Value::Array(items))
}

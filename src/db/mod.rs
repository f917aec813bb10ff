pub mod applications;
pub mod companies;
pub mod items;
pub mod jobs;
pub mod profiles;
pub mod schema;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
  types::{Type, Value},
  Connection, ErrorCode, Result, Row,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
  /// Log the error at warn level and return None
  fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        None
      }
    }
  }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

/// Open (creating if needed) the database file and bring its schema up to date
pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  let conn = Connection::open(path)?;
  conn.execute_batch("PRAGMA journal_mode = WAL;")?;
  configure(&conn)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Fresh in-memory database with the full schema (tests, ephemeral runs)
pub fn open_in_memory() -> Result<DbPool> {
  let conn = Connection::open_in_memory()?;
  configure(&conn)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn configure(conn: &Connection) -> Result<()> {
  conn.execute_batch("PRAGMA foreign_keys = ON;")
}

/// Fixed-width UTC timestamp so stored values order correctly as text
pub fn format_ts(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_ts() -> String {
  format_ts(Utc::now())
}

pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

/// True when the error is a UNIQUE / PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
  match err {
    rusqlite::Error::SqliteFailure(e, _) => {
      e.code == ErrorCode::ConstraintViolation
        && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
          || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    }
    _ => false,
  }
}

/// Read a text column holding an enum's `as_str` form
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> Result<T> {
  let raw: String = row.get(idx)?;
  parse(&raw).ok_or_else(|| {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("unexpected value '{}'", raw).into())
  })
}

/// SQL LIKE pattern matching `term` anywhere, with wildcards in the term escaped
pub(crate) fn like_pattern(term: &str) -> String {
  let escaped = term
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{}%", escaped)
}

/// WHERE clause built from optional filters. Conditions use anonymous `?`
/// placeholders, bound in the order they were added.
#[derive(Debug, Default)]
pub(crate) struct Conditions {
  clauses: Vec<String>,
  values: Vec<Value>,
}

impl Conditions {
  pub(crate) fn and(&mut self, clause: &str, values: impl IntoIterator<Item = Value>) -> &mut Self {
    self.clauses.push(clause.to_string());
    self.values.extend(values);
    self
  }

  /// `WHERE a AND b`, or empty when nothing was added
  pub(crate) fn sql(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  pub(crate) fn values(&self) -> &[Value] {
    &self.values
  }

  /// Bound values followed by LIMIT and OFFSET
  pub(crate) fn with_page(&self, limit: i64, offset: i64) -> Vec<Value> {
    let mut values = self.values.clone();
    values.push(Value::Integer(limit));
    values.push(Value::Integer(offset));
    values
  }
}

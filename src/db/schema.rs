//! Database schema with version-gated migrations.
//!
//! Each migration:
//! 1. Checks if the current schema version is less than the target version
//! 2. Runs its SQL inside a transaction
//! 3. Records the new version in `db_version`
//!
//! Migrations only run once. New databases walk through every step.

use rusqlite::{params, Connection, Result};

use super::now_ts;

/// Current schema version
/// Increment this when adding a new migration
pub const DB_VERSION: i32 = 3;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Bootstrap: ensure db_version table exists (needed to check version)
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("schema version: {}", current_version);

  if current_version < 1 {
    migrate(conn, 1, "Create users and sessions", MIGRATION_V1)?;
  }
  if current_version < 2 {
    migrate(conn, 2, "Add companies, profiles, jobs and applications", MIGRATION_V2)?;
  }
  if current_version < 3 {
    migrate(conn, 3, "Add items and api keys", MIGRATION_V3)?;
  }

  Ok(())
}

/// v0→v1: accounts and revocable login sessions
const MIGRATION_V1: &str = r#"
  CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'job_seeker',
    is_active INTEGER NOT NULL DEFAULT 1,
    failed_login_attempts INTEGER NOT NULL DEFAULT 0,
    locked_until TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_login_at TEXT
  );

  -- Rows are never deleted; revocation is a flag plus reason
  CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    token_hash TEXT NOT NULL UNIQUE,
    user_agent TEXT,
    ip_address TEXT,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_activity_at TEXT NOT NULL,
    revoked_at TEXT,
    revoked_reason TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id)
  );

  CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
  CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
"#;

/// v1→v2: job board tables
const MIGRATION_V2: &str = r#"
  CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    website TEXT,
    location TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id)
  );

  CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE,
    headline TEXT,
    bio TEXT,
    skills TEXT,
    location TEXT,
    resume_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
  );

  CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL,
    posted_by INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    location TEXT NOT NULL,
    job_type TEXT NOT NULL,
    level TEXT NOT NULL,
    salary_min INTEGER,
    salary_max INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (company_id) REFERENCES companies(id),
    FOREIGN KEY (posted_by) REFERENCES users(id)
  );

  CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    cover_letter TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (job_id, user_id),
    FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
  );

  CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company_id);
  CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
  CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id);
"#;

/// v2→v3: generic items and api keys
const MIGRATION_V3: &str = r#"
  CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id)
  );

  CREATE TABLE IF NOT EXISTS api_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    key_prefix TEXT NOT NULL,
    key_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    last_used_at TEXT,
    revoked_at TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id)
  );

  CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id);
  CREATE INDEX IF NOT EXISTS idx_api_keys_user ON api_keys(user_id);
"#;

/// Run one migration's SQL and record its version atomically
fn migrate(conn: &Connection, version: i32, description: &str, sql: &str) -> Result<()> {
  tracing::info!("Running migration v{}→v{}: {}", version - 1, version, description);

  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(sql)?;
  tx.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now_ts(), description],
  )?;
  tx.commit()?;

  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

/// Get current schema version (0 if no versions recorded)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
}

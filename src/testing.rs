//! Test utilities for database setup.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

use crate::auth::db::create_user;
use crate::domain::Role;

/// Migrated database in a temporary directory, removed when dropped.
pub struct TestEnv {
    /// Kept alive for the database file's lifetime
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("jobboard.db"))?;
        crate::db::configure(&conn)?;
        crate::db::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Insert a recruiter named "Test User", returns the user ID
    pub fn recruiter(&self, email: &str) -> i64 {
        self.user(email, Role::Recruiter)
    }

    /// Insert a job seeker named "Test User", returns the user ID
    pub fn job_seeker(&self, email: &str) -> i64 {
        self.user(email, Role::JobSeeker)
    }

    fn user(&self, email: &str, role: Role) -> i64 {
        create_user(&self.conn, email, "hash", "Test User", role).expect("Failed to seed user")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_has_file_backed_schema() {
        let env = TestEnv::new().unwrap();
        assert!(env.path().join("jobboard.db").exists());

        let fk: i64 = env
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use super::{enum_column, now_ts};
use crate::domain::ApplicationStatus;

const APPLICATION_COLUMNS: &str =
  "a.id, a.job_id, a.user_id, a.cover_letter, a.status, a.created_at, a.updated_at";

#[derive(Debug, Clone, Serialize)]
pub struct Application {
  pub id: i64,
  pub job_id: i64,
  pub user_id: i64,
  pub cover_letter: Option<String>,
  pub status: ApplicationStatus,
  pub created_at: String,
  pub updated_at: String,
}

impl Application {
  fn from_row(row: &Row<'_>) -> Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      job_id: row.get(1)?,
      user_id: row.get(2)?,
      cover_letter: row.get(3)?,
      status: enum_column(row, 4, ApplicationStatus::from_str)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }
}

/// A seeker's application with the job it was made to
#[derive(Debug, Clone, Serialize)]
pub struct MyApplication {
  #[serde(flatten)]
  pub application: Application,
  pub job_title: String,
  pub company_name: String,
}

/// An application as the recruiter sees it
#[derive(Debug, Clone, Serialize)]
pub struct Applicant {
  #[serde(flatten)]
  pub application: Application,
  pub applicant_name: String,
  pub applicant_email: String,
}

pub fn has_applied(conn: &Connection, job_id: i64, user_id: i64) -> Result<bool> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM applications WHERE job_id = ?1 AND user_id = ?2",
    params![job_id, user_id],
    |row| row.get(0),
  )?;
  Ok(count > 0)
}

/// Insert a pending application. A second application to the same job
/// fails with a UNIQUE violation.
pub fn create_application(
  conn: &Connection,
  job_id: i64,
  user_id: i64,
  cover_letter: Option<&str>,
) -> Result<i64> {
  let now = now_ts();
  conn.execute(
    r#"
    INSERT INTO applications (job_id, user_id, cover_letter, status, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?5)
    "#,
    params![job_id, user_id, cover_letter, ApplicationStatus::Pending.as_str(), now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_application(conn: &Connection, id: i64) -> Result<Option<Application>> {
  conn
    .query_row(
      &format!("SELECT {} FROM applications a WHERE a.id = ?1", APPLICATION_COLUMNS),
      params![id],
      Application::from_row,
    )
    .optional()
}

/// A user's applications, newest first
pub fn list_user_applications(conn: &Connection, user_id: i64) -> Result<Vec<MyApplication>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}, j.title, c.name
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN companies c ON c.id = j.company_id
    WHERE a.user_id = ?1
    ORDER BY a.created_at DESC, a.id DESC
    "#,
    APPLICATION_COLUMNS
  ))?;

  let applications = stmt
    .query_map(params![user_id], |row| {
      Ok(MyApplication {
        application: Application::from_row(row)?,
        job_title: row.get(7)?,
        company_name: row.get(8)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(applications)
}

/// Applications to one job, oldest first
pub fn list_job_applications(conn: &Connection, job_id: i64) -> Result<Vec<Applicant>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}, u.name, u.email
    FROM applications a
    JOIN users u ON u.id = a.user_id
    WHERE a.job_id = ?1
    ORDER BY a.created_at ASC, a.id ASC
    "#,
    APPLICATION_COLUMNS
  ))?;

  let applicants = stmt
    .query_map(params![job_id], |row| {
      Ok(Applicant {
        application: Application::from_row(row)?,
        applicant_name: row.get(7)?,
        applicant_email: row.get(8)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(applicants)
}

pub fn update_application_status(conn: &Connection, id: i64, status: ApplicationStatus) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE applications SET status = ?1, updated_at = ?2 WHERE id = ?3",
    params![status.as_str(), now_ts(), id],
  )?;
  Ok(changed > 0)
}

//! Job postings.
//!
//! A job belongs to a company and records the recruiter who posted it.
//! Public listings only show active jobs; a recruiter's own listing shows
//! everything their company has posted.

use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use super::{enum_column, like_pattern, now_ts, Conditions};
use crate::domain::{ExperienceLevel, JobType};
use crate::response::PageParams;

const JOB_COLUMNS: &str = r#"j.id, j.company_id, c.name, j.posted_by, j.title, j.description, j.location,
  j.job_type, j.level, j.salary_min, j.salary_max, j.is_active, j.created_at, j.updated_at"#;

const JOB_FROM: &str = "FROM jobs j JOIN companies c ON c.id = j.company_id";

#[derive(Debug, Clone, Serialize)]
pub struct Job {
  pub id: i64,
  pub company_id: i64,
  pub company_name: String,
  pub posted_by: i64,
  pub title: String,
  pub description: String,
  pub location: String,
  pub job_type: JobType,
  pub level: ExperienceLevel,
  pub salary_min: Option<i64>,
  pub salary_max: Option<i64>,
  pub is_active: bool,
  pub created_at: String,
  pub updated_at: String,
}

impl Job {
  fn from_row(row: &Row<'_>) -> Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      company_id: row.get(1)?,
      company_name: row.get(2)?,
      posted_by: row.get(3)?,
      title: row.get(4)?,
      description: row.get(5)?,
      location: row.get(6)?,
      job_type: enum_column(row, 7, JobType::from_str)?,
      level: enum_column(row, 8, ExperienceLevel::from_str)?,
      salary_min: row.get(9)?,
      salary_max: row.get(10)?,
      is_active: row.get(11)?,
      created_at: row.get(12)?,
      updated_at: row.get(13)?,
    })
  }
}

pub struct NewJob<'a> {
  pub title: &'a str,
  pub description: &'a str,
  pub location: &'a str,
  pub job_type: JobType,
  pub level: ExperienceLevel,
  pub salary_min: Option<i64>,
  pub salary_max: Option<i64>,
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Default)]
pub struct JobChanges<'a> {
  pub title: Option<&'a str>,
  pub description: Option<&'a str>,
  pub location: Option<&'a str>,
  pub job_type: Option<JobType>,
  pub level: Option<ExperienceLevel>,
  pub salary_min: Option<i64>,
  pub salary_max: Option<i64>,
  pub is_active: Option<bool>,
}

/// Public listing filters; unset fields do not filter
#[derive(Debug, Default)]
pub struct JobFilter {
  /// Matched against title and description
  pub search: Option<String>,
  pub location: Option<String>,
  pub job_type: Option<JobType>,
  pub level: Option<ExperienceLevel>,
  /// Jobs paying at least this much at the top of their range
  pub salary_min: Option<i64>,
  /// Jobs starting at or below this much
  pub salary_max: Option<i64>,
}

impl JobFilter {
  fn conditions(&self) -> Conditions {
    let mut conditions = Conditions::default();
    conditions.and("j.is_active = 1", []);

    if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      let pattern = like_pattern(term);
      conditions.and(
        r"(j.title LIKE ? ESCAPE '\' OR j.description LIKE ? ESCAPE '\')",
        [Value::Text(pattern.clone()), Value::Text(pattern)],
      );
    }
    if let Some(location) = self.location.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      conditions.and(r"j.location LIKE ? ESCAPE '\'", [Value::Text(like_pattern(location))]);
    }
    if let Some(job_type) = self.job_type {
      conditions.and("j.job_type = ?", [Value::Text(job_type.as_str().to_string())]);
    }
    if let Some(level) = self.level {
      conditions.and("j.level = ?", [Value::Text(level.as_str().to_string())]);
    }
    if let Some(min) = self.salary_min {
      conditions.and("COALESCE(j.salary_max, j.salary_min) >= ?", [Value::Integer(min)]);
    }
    if let Some(max) = self.salary_max {
      conditions.and("COALESCE(j.salary_min, j.salary_max) <= ?", [Value::Integer(max)]);
    }
    conditions
  }
}

pub fn create_job(conn: &Connection, company_id: i64, posted_by: i64, job: &NewJob<'_>) -> Result<i64> {
  let now = now_ts();
  conn.execute(
    r#"
    INSERT INTO jobs (company_id, posted_by, title, description, location, job_type, level,
                      salary_min, salary_max, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
    "#,
    params![
      company_id,
      posted_by,
      job.title,
      job.description,
      job.location,
      job.job_type.as_str(),
      job.level.as_str(),
      job.salary_min,
      job.salary_max,
      now
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_job(conn: &Connection, id: i64) -> Result<Option<Job>> {
  conn
    .query_row(
      &format!("SELECT {} {} WHERE j.id = ?1", JOB_COLUMNS, JOB_FROM),
      params![id],
      Job::from_row,
    )
    .optional()
}

/// Active jobs matching `filter`, newest first, plus the total match count
pub fn list_jobs(conn: &Connection, filter: &JobFilter, page: PageParams) -> Result<(Vec<Job>, i64)> {
  let conditions = filter.conditions();
  let where_sql = conditions.sql();

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) {} {}", JOB_FROM, where_sql),
    params_from_iter(conditions.values().iter()),
    |row| row.get(0),
  )?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {} {} {} ORDER BY j.created_at DESC, j.id DESC LIMIT ? OFFSET ?",
    JOB_COLUMNS, JOB_FROM, where_sql
  ))?;
  let jobs = stmt
    .query_map(
      params_from_iter(conditions.with_page(page.limit(), page.offset()).iter()),
      Job::from_row,
    )?
    .collect::<Result<Vec<_>>>()?;

  Ok((jobs, total))
}

/// Every job of a company, active or not, newest first
pub fn list_company_jobs(conn: &Connection, company_id: i64, page: PageParams) -> Result<(Vec<Job>, i64)> {
  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM jobs WHERE company_id = ?1",
    params![company_id],
    |row| row.get(0),
  )?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {} {} WHERE j.company_id = ?1 ORDER BY j.created_at DESC, j.id DESC LIMIT ?2 OFFSET ?3",
    JOB_COLUMNS, JOB_FROM
  ))?;
  let jobs = stmt
    .query_map(params![company_id, page.limit(), page.offset()], Job::from_row)?
    .collect::<Result<Vec<_>>>()?;

  Ok((jobs, total))
}

pub fn update_job(conn: &Connection, id: i64, changes: &JobChanges<'_>) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE jobs
    SET title = COALESCE(?1, title),
        description = COALESCE(?2, description),
        location = COALESCE(?3, location),
        job_type = COALESCE(?4, job_type),
        level = COALESCE(?5, level),
        salary_min = COALESCE(?6, salary_min),
        salary_max = COALESCE(?7, salary_max),
        is_active = COALESCE(?8, is_active),
        updated_at = ?9
    WHERE id = ?10
    "#,
    params![
      changes.title,
      changes.description,
      changes.location,
      changes.job_type.map(|t| t.as_str()),
      changes.level.map(|l| l.as_str()),
      changes.salary_min,
      changes.salary_max,
      changes.is_active,
      now_ts(),
      id
    ],
  )?;
  Ok(changed > 0)
}

/// Delete a job; its applications go with it
pub fn delete_job(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::companies::{create_company, CompanyFields};
  use crate::testing::TestEnv;

  fn new_job<'a>(title: &'a str, location: &'a str) -> NewJob<'a> {
    NewJob {
      title,
      description: "Build things",
      location,
      job_type: JobType::FullTime,
      level: ExperienceLevel::Mid,
      salary_min: None,
      salary_max: None,
    }
  }

  fn seed_company(env: &TestEnv, email: &str) -> (i64, i64) {
    let owner = env.recruiter(email);
    let company = create_company(&env.conn, owner, "Acme", &CompanyFields::default()).unwrap();
    (owner, company)
  }

  #[test]
  fn test_create_and_get_job() {
    let env = TestEnv::new().unwrap();
    let (owner, company) = seed_company(&env, "r@example.com");

    let id = create_job(&env.conn, company, owner, &new_job("Rust Engineer", "Berlin")).unwrap();
    let job = get_job(&env.conn, id).unwrap().unwrap();
    assert_eq!(job.title, "Rust Engineer");
    assert_eq!(job.company_name, "Acme");
    assert_eq!(job.job_type, JobType::FullTime);
    assert!(job.is_active);
    assert!(get_job(&env.conn, id + 1).unwrap().is_none());
  }

  #[test]
  fn test_list_jobs_filters() {
    let env = TestEnv::new().unwrap();
    let (owner, company) = seed_company(&env, "r@example.com");

    create_job(&env.conn, company, owner, &new_job("Rust Engineer", "Berlin")).unwrap();
    create_job(
      &env.conn,
      company,
      owner,
      &NewJob {
        job_type: JobType::Contract,
        level: ExperienceLevel::Senior,
        salary_min: Some(90_000),
        salary_max: Some(120_000),
        ..new_job("Go Developer", "Remote")
      },
    )
    .unwrap();
    create_job(
      &env.conn,
      company,
      owner,
      &NewJob {
        salary_min: Some(40_000),
        salary_max: Some(50_000),
        ..new_job("Junior 100% Rust", "Berlin")
      },
    )
    .unwrap();

    let page = PageParams::default();
    let search = |filter: JobFilter| list_jobs(&env.conn, &filter, page).unwrap();

    assert_eq!(search(JobFilter::default()).1, 3);

    let (jobs, total) = search(JobFilter {
      search: Some("rust".to_string()),
      ..Default::default()
    });
    assert_eq!(total, 2);
    assert_eq!(jobs.len(), 2);

    // Wildcards in the term are literal
    assert_eq!(
      search(JobFilter {
        search: Some("100%".to_string()),
        ..Default::default()
      })
      .1,
      1
    );

    assert_eq!(
      search(JobFilter {
        location: Some("berl".to_string()),
        ..Default::default()
      })
      .1,
      2
    );
    assert_eq!(
      search(JobFilter {
        job_type: Some(JobType::Contract),
        level: Some(ExperienceLevel::Senior),
        ..Default::default()
      })
      .1,
      1
    );

    let (jobs, _) = search(JobFilter {
      salary_min: Some(60_000),
      ..Default::default()
    });
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].title, "Go Developer");

    let (jobs, _) = search(JobFilter {
      salary_max: Some(60_000),
      ..Default::default()
    });
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].title, "Junior 100% Rust");
  }

  #[test]
  fn test_list_jobs_paginates_and_hides_inactive() {
    let env = TestEnv::new().unwrap();
    let (owner, company) = seed_company(&env, "r@example.com");
    let mut ids = Vec::new();
    for i in 0..5 {
      ids.push(create_job(&env.conn, company, owner, &new_job(&format!("Job {}", i), "Berlin")).unwrap());
    }
    let changes = JobChanges {
      is_active: Some(false),
      ..Default::default()
    };
    update_job(&env.conn, ids[0], &changes).unwrap();

    let page = PageParams {
      page: Some(2),
      limit: Some(3),
    };
    let (jobs, total) = list_jobs(&env.conn, &JobFilter::default(), page).unwrap();
    assert_eq!(total, 4);
    assert_eq!(jobs.len(), 1);

    // The company's own listing still includes the inactive job
    let (_, total) = list_company_jobs(&env.conn, company, PageParams::default()).unwrap();
    assert_eq!(total, 5);
  }

  #[test]
  fn test_update_and_delete_job() {
    let env = TestEnv::new().unwrap();
    let (owner, company) = seed_company(&env, "r@example.com");
    let id = create_job(&env.conn, company, owner, &new_job("Rust Engineer", "Berlin")).unwrap();

    let changes = JobChanges {
      title: Some("Senior Rust Engineer"),
      level: Some(ExperienceLevel::Senior),
      ..Default::default()
    };
    assert!(update_job(&env.conn, id, &changes).unwrap());
    let job = get_job(&env.conn, id).unwrap().unwrap();
    assert_eq!(job.title, "Senior Rust Engineer");
    assert_eq!(job.level, ExperienceLevel::Senior);
    assert_eq!(job.location, "Berlin");

    assert!(delete_job(&env.conn, id).unwrap());
    assert!(!delete_job(&env.conn, id).unwrap());
    assert!(get_job(&env.conn, id).unwrap().is_none());
  }
}

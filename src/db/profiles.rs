//! Candidate profiles: at most one per user.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use super::now_ts;

const PROFILE_COLUMNS: &str =
  "p.id, p.user_id, u.name, p.headline, p.bio, p.skills, p.location, p.resume_url, p.created_at, p.updated_at";

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
  pub id: i64,
  pub user_id: i64,
  /// Account name, joined from users
  pub name: String,
  pub headline: Option<String>,
  pub bio: Option<String>,
  pub skills: Vec<String>,
  pub location: Option<String>,
  pub resume_url: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl Profile {
  fn from_row(row: &Row<'_>) -> Result<Self> {
    let skills: Option<String> = row.get(5)?;
    Ok(Self {
      id: row.get(0)?,
      user_id: row.get(1)?,
      name: row.get(2)?,
      headline: row.get(3)?,
      bio: row.get(4)?,
      skills: skills.as_deref().map(split_skills).unwrap_or_default(),
      location: row.get(6)?,
      resume_url: row.get(7)?,
      created_at: row.get(8)?,
      updated_at: row.get(9)?,
    })
  }
}

/// Column values for insert and update. On update `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ProfileFields<'a> {
  pub headline: Option<&'a str>,
  pub bio: Option<&'a str>,
  pub skills: Option<&'a [String]>,
  pub location: Option<&'a str>,
  pub resume_url: Option<&'a str>,
}

/// Skills are stored as one comma separated column
pub fn join_skills(skills: &[String]) -> String {
  skills
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(",")
}

fn split_skills(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

pub fn create_profile(conn: &Connection, user_id: i64, fields: &ProfileFields<'_>) -> Result<i64> {
  let now = now_ts();
  conn.execute(
    r#"
    INSERT INTO profiles (user_id, headline, bio, skills, location, resume_url, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
    "#,
    params![
      user_id,
      fields.headline,
      fields.bio,
      fields.skills.map(join_skills),
      fields.location,
      fields.resume_url,
      now
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_profile_by_user(conn: &Connection, user_id: i64) -> Result<Option<Profile>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM profiles p JOIN users u ON u.id = p.user_id WHERE p.user_id = ?1",
        PROFILE_COLUMNS
      ),
      params![user_id],
      Profile::from_row,
    )
    .optional()
}

/// Returns false if the user has no profile yet
pub fn update_profile(conn: &Connection, user_id: i64, fields: &ProfileFields<'_>) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE profiles
    SET headline = COALESCE(?1, headline),
        bio = COALESCE(?2, bio),
        skills = COALESCE(?3, skills),
        location = COALESCE(?4, location),
        resume_url = COALESCE(?5, resume_url),
        updated_at = ?6
    WHERE user_id = ?7
    "#,
    params![
      fields.headline,
      fields.bio,
      fields.skills.map(join_skills),
      fields.location,
      fields.resume_url,
      now_ts(),
      user_id
    ],
  )?;
  Ok(changed > 0)
}

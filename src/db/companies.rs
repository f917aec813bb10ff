//! Companies: one per recruiter account.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use super::now_ts;

const COMPANY_COLUMNS: &str =
  "id, owner_id, name, description, website, location, created_at, updated_at";

#[derive(Debug, Clone, Serialize)]
pub struct Company {
  pub id: i64,
  pub owner_id: i64,
  pub name: String,
  pub description: Option<String>,
  pub website: Option<String>,
  pub location: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl Company {
  fn from_row(row: &Row<'_>) -> Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      owner_id: row.get(1)?,
      name: row.get(2)?,
      description: row.get(3)?,
      website: row.get(4)?,
      location: row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }
}

/// Column values for insert and update. On update `None` keeps the current value.
#[derive(Debug, Default)]
pub struct CompanyFields<'a> {
  pub name: Option<&'a str>,
  pub description: Option<&'a str>,
  pub website: Option<&'a str>,
  pub location: Option<&'a str>,
}

/// Create the owner's company, returns its ID. Fails with a UNIQUE
/// violation if the owner already has one.
pub fn create_company(conn: &Connection, owner_id: i64, name: &str, fields: &CompanyFields<'_>) -> Result<i64> {
  let now = now_ts();
  conn.execute(
    r#"
    INSERT INTO companies (owner_id, name, description, website, location, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
    "#,
    params![owner_id, name, fields.description, fields.website, fields.location, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_company(conn: &Connection, id: i64) -> Result<Option<Company>> {
  conn
    .query_row(
      &format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLUMNS),
      params![id],
      Company::from_row,
    )
    .optional()
}

pub fn get_company_by_owner(conn: &Connection, owner_id: i64) -> Result<Option<Company>> {
  conn
    .query_row(
      &format!("SELECT {} FROM companies WHERE owner_id = ?1", COMPANY_COLUMNS),
      params![owner_id],
      Company::from_row,
    )
    .optional()
}

/// Update the owner's company. Returns false if they have none.
pub fn update_company(conn: &Connection, owner_id: i64, fields: &CompanyFields<'_>) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE companies
    SET name = COALESCE(?1, name),
        description = COALESCE(?2, description),
        website = COALESCE(?3, website),
        location = COALESCE(?4, location),
        updated_at = ?5
    WHERE owner_id = ?6
    "#,
    params![
      fields.name,
      fields.description,
      fields.website,
      fields.location,
      now_ts(),
      owner_id
    ],
  )?;
  Ok(changed > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  #[test]
  fn test_company_per_owner() {
    let env = TestEnv::new().unwrap();
    let owner = env.recruiter("r@example.com");

    let fields = CompanyFields {
      website: Some("https://acme.test"),
      ..Default::default()
    };
    let id = create_company(&env.conn, owner, "Acme", &fields).unwrap();

    let company = get_company_by_owner(&env.conn, owner).unwrap().unwrap();
    assert_eq!(company.id, id);
    assert_eq!(company.name, "Acme");
    assert_eq!(company.website.as_deref(), Some("https://acme.test"));
    assert!(company.location.is_none());

    let second = create_company(&env.conn, owner, "Acme 2", &CompanyFields::default());
    assert!(crate::db::is_unique_violation(&second.unwrap_err()));
  }

  #[test]
  fn test_update_company_keeps_unset_fields() {
    let env = TestEnv::new().unwrap();
    let owner = env.recruiter("r@example.com");
    let fields = CompanyFields {
      location: Some("Berlin"),
      ..Default::default()
    };
    let id = create_company(&env.conn, owner, "Acme", &fields).unwrap();

    let changes = CompanyFields {
      name: Some("Acme GmbH"),
      ..Default::default()
    };
    assert!(update_company(&env.conn, owner, &changes).unwrap());

    let company = get_company(&env.conn, id).unwrap().unwrap();
    assert_eq!(company.name, "Acme GmbH");
    assert_eq!(company.location.as_deref(), Some("Berlin"));

    assert!(!update_company(&env.conn, owner + 100, &changes).unwrap());
  }
}

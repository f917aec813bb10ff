//! Generic owned records.
//!
//! Every query is scoped to one owner; callers never see another user's items.

use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use super::{enum_column, like_pattern, now_ts, Conditions};
use crate::domain::{ItemSort, ItemStatus, SortOrder};
use crate::response::PageParams;

const ITEM_COLUMNS: &str = "id, owner_id, title, description, status, created_at, updated_at";

#[derive(Debug, Clone, Serialize)]
pub struct Item {
  pub id: i64,
  pub owner_id: i64,
  pub title: String,
  pub description: Option<String>,
  pub status: ItemStatus,
  pub created_at: String,
  pub updated_at: String,
}

impl Item {
  fn from_row(row: &Row<'_>) -> Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      owner_id: row.get(1)?,
      title: row.get(2)?,
      description: row.get(3)?,
      status: enum_column(row, 4, ItemStatus::from_str)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }
}

#[derive(Debug, Default)]
pub struct ItemFilter {
  /// Matched against title and description
  pub search: Option<String>,
  pub status: Option<ItemStatus>,
  pub sort: ItemSort,
  pub order: SortOrder,
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Default)]
pub struct ItemChanges<'a> {
  pub title: Option<&'a str>,
  pub description: Option<&'a str>,
  pub status: Option<ItemStatus>,
}

pub fn create_item(
  conn: &Connection,
  owner_id: i64,
  title: &str,
  description: Option<&str>,
  status: ItemStatus,
) -> Result<i64> {
  let now = now_ts();
  conn.execute(
    r#"
    INSERT INTO items (owner_id, title, description, status, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?5)
    "#,
    params![owner_id, title, description, status.as_str(), now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_item(conn: &Connection, id: i64) -> Result<Option<Item>> {
  conn
    .query_row(
      &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
      params![id],
      Item::from_row,
    )
    .optional()
}

/// One page of the owner's items plus the total match count
pub fn list_items(
  conn: &Connection,
  owner_id: i64,
  filter: &ItemFilter,
  page: PageParams,
) -> Result<(Vec<Item>, i64)> {
  let mut conditions = Conditions::default();
  conditions.and("owner_id = ?", [Value::Integer(owner_id)]);
  if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
    let pattern = like_pattern(term);
    conditions.and(
      r"(title LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\')",
      [Value::Text(pattern.clone()), Value::Text(pattern)],
    );
  }
  if let Some(status) = filter.status {
    conditions.and("status = ?", [Value::Text(status.as_str().to_string())]);
  }
  let where_sql = conditions.sql();

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM items {}", where_sql),
    params_from_iter(conditions.values().iter()),
    |row| row.get(0),
  )?;

  // Sort column and direction come from closed enums, never from raw input
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM items {} ORDER BY {} {}, id {} LIMIT ? OFFSET ?",
    ITEM_COLUMNS,
    where_sql,
    filter.sort.column(),
    filter.order.keyword(),
    filter.order.keyword()
  ))?;
  let items = stmt
    .query_map(
      params_from_iter(conditions.with_page(page.limit(), page.offset()).iter()),
      Item::from_row,
    )?
    .collect::<Result<Vec<_>>>()?;

  Ok((items, total))
}

pub fn update_item(conn: &Connection, id: i64, changes: &ItemChanges<'_>) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE items
    SET title = COALESCE(?1, title),
        description = COALESCE(?2, description),
        status = COALESCE(?3, status),
        updated_at = ?4
    WHERE id = ?5
    "#,
    params![
      changes.title,
      changes.description,
      changes.status.map(|s| s.as_str()),
      now_ts(),
      id
    ],
  )?;
  Ok(changed > 0)
}

pub fn delete_item(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  fn titles(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
  }

  #[test]
  fn test_list_is_scoped_to_owner() {
    let env = TestEnv::new().unwrap();
    let alice = env.job_seeker("a@example.com");
    let bob = env.job_seeker("b@example.com");
    create_item(&env.conn, alice, "Mine", None, ItemStatus::Draft).unwrap();
    create_item(&env.conn, bob, "Theirs", None, ItemStatus::Draft).unwrap();

    let (items, total) = list_items(&env.conn, alice, &ItemFilter::default(), PageParams::default()).unwrap();
    assert_eq!(total, 1);
    assert_eq!(titles(&items), vec!["Mine"]);
  }

  #[test]
  fn test_filter_and_sort() {
    let env = TestEnv::new().unwrap();
    let owner = env.job_seeker("a@example.com");
    create_item(&env.conn, owner, "banana", Some("yellow fruit"), ItemStatus::Active).unwrap();
    create_item(&env.conn, owner, "apple", Some("red fruit"), ItemStatus::Draft).unwrap();
    create_item(&env.conn, owner, "carrot", Some("vegetable"), ItemStatus::Active).unwrap();

    let page = PageParams::default();
    let by_title = ItemFilter {
      sort: ItemSort::Title,
      order: SortOrder::Asc,
      ..Default::default()
    };
    let (items, _) = list_items(&env.conn, owner, &by_title, page).unwrap();
    assert_eq!(titles(&items), vec!["apple", "banana", "carrot"]);

    let fruit = ItemFilter {
      search: Some("fruit".to_string()),
      sort: ItemSort::Title,
      order: SortOrder::Desc,
      ..Default::default()
    };
    let (items, total) = list_items(&env.conn, owner, &fruit, page).unwrap();
    assert_eq!(total, 2);
    assert_eq!(titles(&items), vec!["banana", "apple"]);

    let active = ItemFilter {
      status: Some(ItemStatus::Active),
      ..Default::default()
    };
    let (_, total) = list_items(&env.conn, owner, &active, page).unwrap();
    assert_eq!(total, 2);

    // Default order is newest first
    let (items, _) = list_items(&env.conn, owner, &ItemFilter::default(), page).unwrap();
    assert_eq!(titles(&items), vec!["carrot", "apple", "banana"]);
  }

  #[test]
  fn test_update_and_delete_item() {
    let env = TestEnv::new().unwrap();
    let owner = env.job_seeker("a@example.com");
    let id = create_item(&env.conn, owner, "Draft post", Some("body"), ItemStatus::Draft).unwrap();

    let changes = ItemChanges {
      status: Some(ItemStatus::Archived),
      ..Default::default()
    };
    assert!(update_item(&env.conn, id, &changes).unwrap());
    let item = get_item(&env.conn, id).unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Archived);
    assert_eq!(item.title, "Draft post");
    assert_eq!(item.description.as_deref(), Some("body"));

    assert!(delete_item(&env.conn, id).unwrap());
    assert!(get_item(&env.conn, id).unwrap().is_none());
    assert!(!update_item(&env.conn, id, &changes).unwrap());
  }
}

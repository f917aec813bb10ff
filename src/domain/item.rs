use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
  Draft,
  Active,
  Archived,
}

impl ItemStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "draft" => Some(Self::Draft),
      "active" => Some(Self::Active),
      "archived" => Some(Self::Archived),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Active => "active",
      Self::Archived => "archived",
    }
  }
}

impl Default for ItemStatus {
  fn default() -> Self {
    Self::Draft
  }
}

/// Column an item listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSort {
  #[default]
  CreatedAt,
  UpdatedAt,
  Title,
}

impl ItemSort {
  /// Column name, safe to splice into SQL
  pub fn column(&self) -> &'static str {
    match self {
      Self::CreatedAt => "created_at",
      Self::UpdatedAt => "updated_at",
      Self::Title => "title",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn keyword(&self) -> &'static str {
    match self {
      Self::Asc => "ASC",
      Self::Desc => "DESC",
    }
  }
}

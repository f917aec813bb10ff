use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
  Pending,
  Accepted,
  Rejected,
}

impl ApplicationStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(Self::Pending),
      "accepted" => Some(Self::Accepted),
      "rejected" => Some(Self::Rejected),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
    }
  }
}

impl Default for ApplicationStatus {
  fn default() -> Self {
    Self::Pending
  }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
  FullTime,
  PartTime,
  Contract,
  Internship,
  Remote,
}

impl JobType {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "full_time" => Some(Self::FullTime),
      "part_time" => Some(Self::PartTime),
      "contract" => Some(Self::Contract),
      "internship" => Some(Self::Internship),
      "remote" => Some(Self::Remote),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::FullTime => "full_time",
      Self::PartTime => "part_time",
      Self::Contract => "contract",
      Self::Internship => "internship",
      Self::Remote => "remote",
    }
  }
}

/// Seniority the posting is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
  Entry,
  Mid,
  Senior,
  Lead,
}

impl ExperienceLevel {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "entry" => Some(Self::Entry),
      "mid" => Some(Self::Mid),
      "senior" => Some(Self::Senior),
      "lead" => Some(Self::Lead),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Entry => "entry",
      Self::Mid => "mid",
      Self::Senior => "senior",
      Self::Lead => "lead",
    }
  }
}

use serde::{Deserialize, Serialize};

/// Coarse access-control tag carried by every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  JobSeeker,
  Recruiter,
}

impl Role {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "job_seeker" => Some(Self::JobSeeker),
      "recruiter" => Some(Self::Recruiter),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::JobSeeker => "job_seeker",
      Self::Recruiter => "recruiter",
    }
  }

  /// Whether an account holding `self` may use a route gated on `required`
  pub fn grants(&self, required: Role) -> bool {
    match (*self, required) {
      (Self::JobSeeker, Role::JobSeeker) => true,
      (Self::Recruiter, Role::Recruiter) => true,
      (Self::JobSeeker, Role::Recruiter) | (Self::Recruiter, Role::JobSeeker) => false,
    }
  }
}

impl Default for Role {
  fn default() -> Self {
    Self::JobSeeker
  }
}

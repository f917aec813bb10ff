pub mod application;
pub mod item;
pub mod job;
pub mod user;

pub use application::ApplicationStatus;
pub use item::{ItemSort, ItemStatus, SortOrder};
pub use job::{ExperienceLevel, JobType};
pub use user::Role;

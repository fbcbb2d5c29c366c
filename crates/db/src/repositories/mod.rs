//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or an open transaction for the contribution write path) as the
//! first argument.

pub mod contribution_repo;
pub mod project_notification_repo;
pub mod project_repo;
pub mod reward_repo;
pub mod user_repo;

pub use contribution_repo::ContributionRepo;
pub use project_notification_repo::ProjectNotificationRepo;
pub use project_repo::ProjectRepo;
pub use reward_repo::RewardRepo;
pub use user_repo::UserRepo;

//! Crowdfund domain core.
//!
//! Pure domain logic with no I/O: lifecycle state machines for projects and
//! contributions, the funding aggregation seam and its observer, lifecycle
//! helpers, and presentation formatting. Persistence and delivery adapters
//! live in `crowdfund_db` and `crowdfund_events`.

pub mod channels;
pub mod contribution_state;
pub mod error;
pub mod funding;
pub mod lifecycle;
pub mod money;
pub mod pagination;
pub mod presentation;
pub mod project_state;
pub mod roles;
pub mod types;

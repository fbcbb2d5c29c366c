//! Write paths that span more than one repository.
//!
//! Contribution writes run the funding observer chain (recompute inside the
//! transaction, goal check after commit). Project transitions apply the
//! lifecycle guards. Both are shared by the HTTP handlers and the background
//! project finisher.

pub mod contributions;
pub mod projects;

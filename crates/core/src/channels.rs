//! Well-known notification channel name constants.
//!
//! These must match the values stored in `project_notifications.channel`.

/// Notification delivered by email to the recipient's address.
pub const CHANNEL_EMAIL: &str = "email";

/// Notification recorded for the in-app notification list only.
pub const CHANNEL_IN_APP: &str = "in_app";

//! External delivery channels for owner notifications.

pub mod email;

use async_trait::async_trait;
use crowdfund_core::funding::NotificationKind;

use self::email::EmailError;

/// A fully rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Render the email an owner receives for `kind`.
    pub fn for_owner(
        kind: NotificationKind,
        to: &str,
        owner_name: &str,
        project_name: &str,
    ) -> Self {
        let (subject, body) = match kind {
            NotificationKind::ProjectSuccess => (
                format!("[Crowdfund] {project_name} reached its goal"),
                format!(
                    "Hi {owner_name},\n\n\
                     Congratulations! Your project \"{project_name}\" has reached its funding goal.\n"
                ),
            ),
        };
        Self {
            to: to.to_string(),
            subject,
            body,
        }
    }
}

/// Sends rendered emails. Implemented over SMTP by
/// [`email::EmailDelivery`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

//! Crowdfund event bus and owner notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the canonical domain event envelope.
//! - [`BusOwnerNotifier`]: the core `OwnerNotifier` seam, publishing
//!   `project.success` events on the bus.
//! - [`NotificationDispatcher`]: consumes those events, records each
//!   `(project, kind)` once in the ledger, and delivers it.
//! - [`NotificationRetrier`]: periodically re-attempts undelivered entries.
//! - [`delivery`]: external delivery channels (email).

pub mod bus;
pub mod delivery;
pub mod dispatch;
pub mod notifier;
pub mod retry;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::{EmailMessage, Mailer};
pub use dispatch::{DispatchError, DispatchOutcome, NotificationDispatcher};
pub use notifier::BusOwnerNotifier;
pub use retry::NotificationRetrier;

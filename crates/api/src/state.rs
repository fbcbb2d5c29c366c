use std::sync::Arc;

use crowdfund_events::{BusOwnerNotifier, EventBus};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: crowdfund_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
    /// Hands goal-reached requests to the notification dispatcher.
    pub notifier: BusOwnerNotifier,
}

impl AppState {
    pub fn new(pool: crowdfund_db::DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            notifier: BusOwnerNotifier::new(Arc::clone(&event_bus)),
            event_bus,
        }
    }
}

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A requested lifecycle change is not an edge of the state machine.
    #[error("Invalid transition: cannot move {entity} from '{from}' to '{to}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The recomputed project total could not be durably written.
    #[error("Aggregation failure: {0}")]
    AggregationFailure(String),

    /// An owner notification could not be handed to the delivery collaborator.
    #[error("Notification dispatch failure: {0}")]
    NotificationDispatch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

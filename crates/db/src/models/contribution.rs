//! Contribution entity model and DTOs.

use crowdfund_core::contribution_state::ContributionState;
use crowdfund_core::error::CoreError;
use crowdfund_core::funding::ContributionRecord;
use crowdfund_core::types::{DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `contributions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contribution {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub value: Decimal,
    pub state: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contribution {
    pub fn contribution_state(&self) -> Result<ContributionState, CoreError> {
        self.state.parse()
    }

    /// The funding-relevant fields, as consumed by the contribution observer.
    pub fn record(&self) -> Result<ContributionRecord, CoreError> {
        Ok(ContributionRecord {
            id: self.id,
            project_id: self.project_id,
            user_id: self.user_id,
            value: self.value,
            state: self.contribution_state()?,
        })
    }
}

/// A row from the `contribution_transitions` audit table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContributionTransitionRow {
    pub id: DbId,
    pub contribution_id: DbId,
    pub from_state: String,
    pub to_state: String,
    pub created_at: Timestamp,
}

/// DTO for creating a contribution.
#[derive(Debug, Clone)]
pub struct CreateContribution {
    pub project_id: DbId,
    pub user_id: DbId,
    pub value: Decimal,
    pub state: ContributionState,
}

/// Request body for a contribution: the value and, for admins, an initial
/// state.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributionInput {
    pub value: Decimal,
    pub state: Option<ContributionState>,
}

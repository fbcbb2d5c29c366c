//! Reward entity model and DTOs.

use chrono::NaiveDate;
use crowdfund_core::presentation::RewardView;
use crowdfund_core::types::{DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `rewards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reward {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: String,
    pub minimum_value: Decimal,
    /// Annual yield percentage for investment-style rewards.
    pub yield_rate: Option<Decimal>,
    /// Maturity date.
    pub happens_at: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reward {
    pub fn view(&self) -> RewardView {
        RewardView {
            yield_rate: self.yield_rate,
            happens_at: self.happens_at,
        }
    }
}

/// DTO for creating a reward under a project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReward {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub minimum_value: Decimal,
    pub yield_rate: Option<Decimal>,
    pub happens_at: Option<NaiveDate>,
}

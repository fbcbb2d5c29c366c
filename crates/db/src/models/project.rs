//! Project entity model and DTOs.

use crowdfund_core::error::CoreError;
use crowdfund_core::lifecycle;
use crowdfund_core::presentation::ProjectView;
use crowdfund_core::project_state::ProjectState;
use crowdfund_core::types::{DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub goal: Decimal,
    pub total: Decimal,
    pub online_date: Option<Timestamp>,
    pub online_days: i32,
    pub state: String,
    pub location: Option<String>,
    pub address_neighborhood: Option<String>,
    pub video_url: Option<String>,
    pub video_thumbnail_url: Option<String>,
    pub uploaded_image_url: Option<String>,
    pub organization_type: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Parsed lifecycle state.
    pub fn project_state(&self) -> Result<ProjectState, CoreError> {
        self.state.parse()
    }

    /// When the online window closes, if the project has been scheduled.
    pub fn expires_at(&self) -> Option<Timestamp> {
        lifecycle::expires_at(self.online_date, self.online_days)
    }

    pub fn reached_goal(&self) -> bool {
        crowdfund_core::funding::reached_goal(self.total, self.goal)
    }

    /// Presentation read model for this row.
    pub fn view(&self) -> ProjectView {
        ProjectView {
            state: self.project_state().ok(),
            reached_goal: self.reached_goal(),
            online_date: self.online_date,
            expires_at: self.expires_at(),
            location: self.location.clone(),
            address_neighborhood: self.address_neighborhood.clone(),
            summary: self.summary.clone(),
            video_url: self.video_url.clone(),
            video_thumbnail_url: self.video_thumbnail_url.clone(),
            uploaded_image_url: self.uploaded_image_url.clone(),
            organization_type: self.organization_type.clone(),
        }
    }
}

/// DTO for creating a new project. The owner comes from the caller and the
/// state always starts as `draft`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub goal: Decimal,
    pub online_days: i32,
    pub location: Option<String>,
    pub address_neighborhood: Option<String>,
    pub video_url: Option<String>,
    pub video_thumbnail_url: Option<String>,
    pub uploaded_image_url: Option<String>,
    pub organization_type: Option<String>,
}

/// DTO for updating an existing project. All fields are optional.
///
/// `total` and `state` are not editable here: the total belongs to the
/// aggregator and the state moves only through guarded transitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub goal: Option<Decimal>,
    pub online_date: Option<Timestamp>,
    pub online_days: Option<i32>,
    pub location: Option<String>,
    pub address_neighborhood: Option<String>,
    pub video_url: Option<String>,
    pub video_thumbnail_url: Option<String>,
    pub uploaded_image_url: Option<String>,
    pub organization_type: Option<String>,
}

impl UpdateProject {
    /// Drop every submitted field the owner may not edit in `state`.
    pub fn restrict_for_owner(self, state: ProjectState) -> Self {
        use crowdfund_core::project_state::owner_may_edit;

        fn keep<T>(state: ProjectState, field: &str, value: Option<T>) -> Option<T> {
            value.filter(|_| owner_may_edit(state, field))
        }

        Self {
            name: keep(state, "name", self.name),
            headline: keep(state, "headline", self.headline),
            summary: keep(state, "summary", self.summary),
            goal: keep(state, "goal", self.goal),
            online_date: keep(state, "online_date", self.online_date),
            online_days: keep(state, "online_days", self.online_days),
            location: keep(state, "location", self.location),
            address_neighborhood: keep(state, "address_neighborhood", self.address_neighborhood),
            video_url: keep(state, "video_url", self.video_url),
            video_thumbnail_url: keep(state, "video_thumbnail_url", self.video_thumbnail_url),
            uploaded_image_url: keep(state, "uploaded_image_url", self.uploaded_image_url),
            organization_type: keep(state, "organization_type", self.organization_type),
        }
    }
}

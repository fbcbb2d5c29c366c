//! Contribution writes and the funding observer chain.
//!
//! Every write follows the same sequence:
//!
//! 1. open a transaction and lock the rows involved
//! 2. write the contribution (insert or guarded transition)
//! 3. [`ContributionObserver::observe`] recomputes the project total through
//!    a [`PgTotalAggregator`] bound to the same transaction
//! 4. commit
//! 5. [`ContributionObserver::on_saved`] checks the goal and requests the
//!    owner notification
//!
//! An aggregation failure aborts the transaction so the contribution and the
//! total are never out of step. A notification failure after commit is only
//! logged.

use chrono::Utc;
use crowdfund_core::contribution_state::{
    validate_initial_state, ContributionState, ContributionTransition,
};
use crowdfund_core::error::CoreError;
use crowdfund_core::funding::{
    ContributionChange, ContributionObserver, FundingSnapshot, NotificationOutcome, OwnerNotifier,
};
use crowdfund_core::lifecycle::ensure_accepts_contributions;
use crowdfund_core::money::validate_positive_amount;
use crowdfund_core::types::DbId;
use crowdfund_db::aggregator::PgTotalAggregator;
use crowdfund_db::models::contribution::{Contribution, ContributionInput, CreateContribution};
use crowdfund_db::repositories::{ContributionRepo, ProjectRepo};
use crowdfund_db::DbPool;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Result of a contribution write after the observer chain has run.
#[derive(Debug, Serialize)]
pub struct ContributionWrite {
    pub contribution: Contribution,
    /// The project's funding state right after the recompute.
    pub funding: FundingSnapshot,
    #[serde(skip)]
    pub notification: NotificationOutcome,
}

/// Who is creating a contribution.
#[derive(Debug, Clone, Copy)]
pub struct Contributor {
    pub user_id: DbId,
    /// Admins may record contributions as already `confirmed` and see
    /// every project, drafts included.
    pub is_admin: bool,
}

/// Create a contribution to `project_id` and run the observer chain.
pub async fn create_contribution<N: OwnerNotifier>(
    pool: &DbPool,
    observer: &ContributionObserver<N>,
    project_id: DbId,
    contributor: Contributor,
    input: &ContributionInput,
) -> AppResult<ContributionWrite> {
    validate_positive_amount(input.value, "value")?;
    let state = input.state.unwrap_or(ContributionState::Pending);
    validate_initial_state(state)?;
    if state == ContributionState::Confirmed && !contributor.is_admin {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only admins may record confirmed contributions".into(),
        )));
    }

    let mut tx = pool.begin().await?;

    let project = ProjectRepo::find_for_update(&mut tx, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    let project_state = project.project_state()?;
    // Drafts the caller cannot see do not exist for them.
    if !project_state.is_public()
        && !contributor.is_admin
        && project.user_id != contributor.user_id
    {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }));
    }
    ensure_accepts_contributions(project_state, project.expires_at(), Utc::now())?;

    let contribution = ContributionRepo::insert(
        &mut tx,
        &CreateContribution {
            project_id,
            user_id: contributor.user_id,
            value: input.value,
            state,
        },
    )
    .await?;

    let change = ContributionChange::Created(contribution.record()?);
    let funding = observer
        .observe(&mut PgTotalAggregator::new(&mut tx), &change)
        .await?;

    tx.commit().await?;

    tracing::info!(
        contribution_id = contribution.id,
        project_id,
        user_id = contributor.user_id,
        value = %contribution.value,
        state = %state,
        total = %funding.total,
        "Contribution created"
    );

    let notification = observer.on_saved(&funding).await;

    Ok(ContributionWrite {
        contribution,
        funding,
        notification,
    })
}

/// Move a contribution to `to` and run the observer chain.
///
/// `authorize` sees the locked contribution and the requested state and
/// decides whether the caller may apply the change. It runs before the edge
/// is validated, so callers without access never learn the current state.
pub async fn transition_contribution<N, F>(
    pool: &DbPool,
    observer: &ContributionObserver<N>,
    contribution_id: DbId,
    to: ContributionState,
    authorize: F,
) -> AppResult<ContributionWrite>
where
    N: OwnerNotifier,
    F: FnOnce(&Contribution, ContributionState) -> Result<(), CoreError>,
{
    let mut tx = pool.begin().await?;

    let current = ContributionRepo::find_for_update(&mut tx, contribution_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Contribution",
            id: contribution_id,
        }))?;

    authorize(&current, to)?;
    let transition = ContributionTransition::new(current.contribution_state()?, to)?;

    // The row is locked, so the guard only misses if the stored state is
    // not what we just read.
    let contribution = ContributionRepo::transition(&mut tx, contribution_id, transition)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Contribution {contribution_id} changed state concurrently"
            )))
        })?;

    let change = ContributionChange::Transitioned {
        contribution: contribution.record()?,
        transition,
    };
    let funding = observer
        .observe(&mut PgTotalAggregator::new(&mut tx), &change)
        .await?;

    tx.commit().await?;

    tracing::info!(
        contribution_id,
        project_id = contribution.project_id,
        from = %transition.from,
        to = %transition.to,
        total = %funding.total,
        "Contribution transitioned"
    );

    let notification = observer.on_saved(&funding).await;

    Ok(ContributionWrite {
        contribution,
        funding,
        notification,
    })
}

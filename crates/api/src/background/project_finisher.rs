//! Periodic end-of-window processing for projects.
//!
//! On every tick, expired `online` projects and `waiting_funds` projects are
//! moved to the state [`finish_decision`] picks. A project that finishes
//! `successful` re-requests the goal-reached owner notification, which the
//! notification ledger deduplicates.
//!
//! Each project is settled in its own transaction holding the project row
//! lock, the same lock every contribution write takes while recomputing the
//! total. The decision therefore always sees the committed total and pending
//! count together.

use std::time::Duration;

use chrono::Utc;
use crowdfund_core::funding::{ContributionObserver, FundingSnapshot, OwnerNotifier};
use crowdfund_core::lifecycle::finish_decision;
use crowdfund_core::project_state::ProjectState;
use crowdfund_core::types::{DbId, Timestamp};
use crowdfund_db::repositories::{ContributionRepo, ProjectRepo};
use crowdfund_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::engine::projects::transition_project;
use crate::error::AppResult;

/// Run the finisher loop every `interval` until `cancel` is triggered.
pub async fn run<N: OwnerNotifier>(
    pool: DbPool,
    notifier: N,
    interval: Duration,
    cancel: CancellationToken,
) {
    let observer = ContributionObserver::new(notifier);

    tracing::info!(
        interval_secs = interval.as_secs(),
        "Project finisher started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Project finisher stopping");
                break;
            }
            _ = ticker.tick() => {
                match finish_projects(&pool, &observer, Utc::now()).await {
                    Ok(0) => tracing::debug!("Project finisher: nothing to finish"),
                    Ok(finished) => tracing::info!(finished, "Project finisher: projects finished"),
                    Err(e) => tracing::error!(error = %e, "Project finisher: cycle failed"),
                }
            }
        }
    }
}

/// One finisher pass. Returns how many projects changed state.
///
/// A project that cannot be moved (for example because an admin changed it
/// concurrently) is logged and skipped; the rest of the batch still runs.
pub async fn finish_projects<N: OwnerNotifier>(
    pool: &DbPool,
    observer: &ContributionObserver<N>,
    now: Timestamp,
) -> AppResult<usize> {
    let candidates = ProjectRepo::list_finishable(pool, now).await?;
    let mut finished = 0;

    for project in candidates {
        match finish_one(pool, observer, project.id, now).await {
            Ok(true) => finished += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(project_id = project.id, error = %e, "Failed to finish project");
            }
        }
    }

    Ok(finished)
}

async fn finish_one<N: OwnerNotifier>(
    pool: &DbPool,
    observer: &ContributionObserver<N>,
    project_id: DbId,
    now: Timestamp,
) -> AppResult<bool> {
    let mut tx = pool.begin().await?;

    // The listed row may be stale; re-read it under the lock.
    let Some(project) = ProjectRepo::find_for_update(&mut tx, project_id).await? else {
        return Ok(false);
    };

    let snapshot = FundingSnapshot {
        project_id: project.id,
        owner_id: project.user_id,
        goal: project.goal,
        total: project.total,
        state: project.project_state()?,
    };
    let pending = ContributionRepo::pending_count(&mut *tx, project.id).await?;

    let Some(next) = finish_decision(&snapshot, project.expires_at(), pending, now) else {
        return Ok(false);
    };

    transition_project(&mut *tx, &project, next).await?;
    tx.commit().await?;

    if next == ProjectState::Successful {
        observer
            .on_saved(&FundingSnapshot {
                state: next,
                ..snapshot
            })
            .await;
    }
    Ok(true)
}

//! Project online-window arithmetic and end-of-window state decisions.

use chrono::Duration;

use crate::error::CoreError;
use crate::funding::FundingSnapshot;
use crate::project_state::ProjectState;
use crate::types::Timestamp;

/// Longest campaign window accepted, in days.
pub const MAX_ONLINE_DAYS: i32 = 365;

/// When the project's online window closes, if it has been scheduled.
pub fn expires_at(online_date: Option<Timestamp>, online_days: i32) -> Option<Timestamp> {
    online_date.map(|start| start + Duration::days(i64::from(online_days)))
}

/// Validate the length of the online window.
pub fn validate_online_days(online_days: i32) -> Result<(), CoreError> {
    if !(1..=MAX_ONLINE_DAYS).contains(&online_days) {
        return Err(CoreError::Validation(format!(
            "online_days must be between 1 and {MAX_ONLINE_DAYS}, got {online_days}"
        )));
    }
    Ok(())
}

/// Whether the window has closed at `now`. Unscheduled projects never expire.
pub fn is_expired(expires_at: Option<Timestamp>, now: Timestamp) -> bool {
    expires_at.is_some_and(|at| at <= now)
}

/// Whether a new contribution may be made to a project.
///
/// Projects take money while `online`, and keep taking it after reaching
/// their goal early (`successful`) until the window closes.
pub fn accepts_contributions(
    state: ProjectState,
    expires_at: Option<Timestamp>,
    now: Timestamp,
) -> bool {
    matches!(state, ProjectState::Online | ProjectState::Successful) && !is_expired(expires_at, now)
}

/// Reject contributions to projects that are not accepting them.
pub fn ensure_accepts_contributions(
    state: ProjectState,
    expires_at: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), CoreError> {
    if accepts_contributions(state, expires_at, now) {
        Ok(())
    } else if is_expired(expires_at, now) {
        Err(CoreError::Conflict(
            "Project is no longer accepting contributions: its online window has closed".into(),
        ))
    } else {
        Err(CoreError::Conflict(format!(
            "Project is not accepting contributions in state '{state}'"
        )))
    }
}

/// The online date to store when a project transitions to `next`.
///
/// Launching stamps `now` unless a launch date was already scheduled.
pub fn online_date_on_transition(
    next: ProjectState,
    current: Option<Timestamp>,
    now: Timestamp,
) -> Option<Timestamp> {
    match (next, current) {
        (ProjectState::Online, None) => Some(now),
        (_, current) => current,
    }
}

/// Decide the state a project should move to once its window has closed.
///
/// - expired `online` with pending contributions -> `waiting_funds`
/// - expired `online` otherwise -> `successful` or `failed` by goal
/// - `waiting_funds` with nothing pending -> `successful` or `failed` by goal
/// - anything else -> no change
pub fn finish_decision(
    snapshot: &FundingSnapshot,
    expires_at: Option<Timestamp>,
    pending_count: i64,
    now: Timestamp,
) -> Option<ProjectState> {
    let settled = if snapshot.reached_goal() {
        ProjectState::Successful
    } else {
        ProjectState::Failed
    };

    match snapshot.state {
        ProjectState::Online if is_expired(expires_at, now) => {
            if pending_count > 0 {
                Some(ProjectState::WaitingFunds)
            } else {
                Some(settled)
            }
        }
        ProjectState::WaitingFunds if pending_count == 0 => Some(settled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn snapshot(state: ProjectState, total: Decimal) -> FundingSnapshot {
        FundingSnapshot {
            project_id: 1,
            owner_id: 2,
            goal: dec!(1000),
            total,
            state,
        }
    }

    #[test]
    fn expires_after_online_days() {
        assert_eq!(expires_at(Some(at(1)), 10), Some(at(11)));
        assert_eq!(expires_at(None, 10), None);
    }

    #[test]
    fn online_days_bounds() {
        assert!(validate_online_days(1).is_ok());
        assert!(validate_online_days(MAX_ONLINE_DAYS).is_ok());
        assert!(validate_online_days(0).is_err());
        assert!(validate_online_days(MAX_ONLINE_DAYS + 1).is_err());
    }

    #[test]
    fn unscheduled_projects_never_expire() {
        assert!(!is_expired(None, at(20)));
        assert!(is_expired(Some(at(10)), at(10)));
        assert!(!is_expired(Some(at(10)), at(9)));
    }

    #[test]
    fn online_and_early_successful_accept_contributions() {
        assert!(accepts_contributions(ProjectState::Online, Some(at(20)), at(5)));
        assert!(accepts_contributions(ProjectState::Successful, Some(at(20)), at(5)));
        assert!(!accepts_contributions(ProjectState::Online, Some(at(4)), at(5)));
        assert!(!accepts_contributions(ProjectState::Draft, None, at(5)));
        assert!(!accepts_contributions(ProjectState::Failed, Some(at(20)), at(5)));
    }

    #[test]
    fn closed_window_error_mentions_window() {
        let err = ensure_accepts_contributions(ProjectState::Online, Some(at(4)), at(5))
            .unwrap_err();
        assert!(err.to_string().contains("online window has closed"));
        let err = ensure_accepts_contributions(ProjectState::Soon, None, at(5)).unwrap_err();
        assert!(err.to_string().contains("state 'soon'"));
    }

    #[test]
    fn launching_stamps_online_date_once() {
        assert_eq!(
            online_date_on_transition(ProjectState::Online, None, at(3)),
            Some(at(3))
        );
        assert_eq!(
            online_date_on_transition(ProjectState::Online, Some(at(1)), at(3)),
            Some(at(1))
        );
        assert_eq!(online_date_on_transition(ProjectState::Soon, None, at(3)), None);
    }

    #[test]
    fn running_project_is_left_alone() {
        let s = snapshot(ProjectState::Online, dec!(1500));
        assert_eq!(finish_decision(&s, Some(at(20)), 0, at(5)), None);
    }

    #[test]
    fn expired_project_with_pending_waits_for_funds() {
        let s = snapshot(ProjectState::Online, dec!(200));
        assert_eq!(
            finish_decision(&s, Some(at(4)), 3, at(5)),
            Some(ProjectState::WaitingFunds)
        );
    }

    #[test]
    fn expired_project_settles_by_goal() {
        let funded = snapshot(ProjectState::Online, dec!(1000));
        let short = snapshot(ProjectState::Online, dec!(999));
        assert_eq!(
            finish_decision(&funded, Some(at(4)), 0, at(5)),
            Some(ProjectState::Successful)
        );
        assert_eq!(
            finish_decision(&short, Some(at(4)), 0, at(5)),
            Some(ProjectState::Failed)
        );
    }

    #[test]
    fn waiting_funds_settles_when_nothing_pending() {
        let s = snapshot(ProjectState::WaitingFunds, dec!(1200));
        assert_eq!(finish_decision(&s, Some(at(4)), 1, at(5)), None);
        assert_eq!(
            finish_decision(&s, Some(at(4)), 0, at(5)),
            Some(ProjectState::Successful)
        );
    }

    #[test]
    fn terminal_projects_are_never_changed() {
        let s = snapshot(ProjectState::Successful, dec!(1200));
        assert_eq!(finish_decision(&s, Some(at(4)), 0, at(5)), None);
        let s = snapshot(ProjectState::Failed, dec!(0));
        assert_eq!(finish_decision(&s, Some(at(4)), 0, at(5)), None);
    }
}

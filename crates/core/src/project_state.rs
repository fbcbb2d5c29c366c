//! Project lifecycle states, transition rules, and the post-launch edit policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

/// Lifecycle state of a funding campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// Being prepared by its owner; not publicly visible.
    Draft,
    /// Announced but not yet accepting contributions.
    Soon,
    /// Accepting contributions inside its online window.
    Online,
    /// Window closed with contributions still awaiting confirmation.
    WaitingFunds,
    /// Goal met.
    Successful,
    /// Window closed without meeting the goal.
    Failed,
}

/// All project states, in lifecycle order.
pub const ALL_PROJECT_STATES: &[ProjectState] = &[
    ProjectState::Draft,
    ProjectState::Soon,
    ProjectState::Online,
    ProjectState::WaitingFunds,
    ProjectState::Successful,
    ProjectState::Failed,
];

impl ProjectState {
    /// Return the string stored in `projects.state`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Soon => "soon",
            Self::Online => "online",
            Self::WaitingFunds => "waiting_funds",
            Self::Successful => "successful",
            Self::Failed => "failed",
        }
    }

    /// Returns the set of states this state may transition to.
    ///
    /// Transition rules:
    /// - `draft`         -> `soon`, `online`
    /// - `soon`          -> `online`
    /// - `online`        -> `waiting_funds`, `successful`, `failed`
    /// - `waiting_funds` -> `successful`, `failed`
    /// - `successful`, `failed` are terminal
    pub fn valid_transitions(&self) -> &'static [ProjectState] {
        match self {
            Self::Draft => &[Self::Soon, Self::Online],
            Self::Soon => &[Self::Online],
            Self::Online => &[Self::WaitingFunds, Self::Successful, Self::Failed],
            Self::WaitingFunds => &[Self::Successful, Self::Failed],
            Self::Successful | Self::Failed => &[],
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether the project has been launched (is, or has been, online).
    pub fn is_launched(&self) -> bool {
        !matches!(self, Self::Draft | Self::Soon)
    }

    /// Whether the project is publicly listed.
    pub fn is_public(&self) -> bool {
        *self != Self::Draft
    }
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_PROJECT_STATES
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid project state '{s}'. Must be one of: {}",
                    ALL_PROJECT_STATES
                        .iter()
                        .map(ProjectState::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Validate that a project transition from `current` to `next` is allowed.
pub fn validate_transition(current: ProjectState, next: ProjectState) -> Result<(), CoreError> {
    if current.valid_transitions().contains(&next) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            entity: "project",
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Edit policy
// ---------------------------------------------------------------------------

/// Fields the owner may still change once the project has launched.
pub const POST_LAUNCH_EDITABLE_FIELDS: &[&str] = &["summary"];

/// Whether the owner of a project in `state` may change `field`.
///
/// Admins bypass this policy entirely.
pub fn owner_may_edit(state: ProjectState, field: &str) -> bool {
    !state.is_launched() || POST_LAUNCH_EDITABLE_FIELDS.contains(&field)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use ProjectState::*;

    #[test]
    fn states_round_trip_through_strings() {
        for state in ALL_PROJECT_STATES {
            assert_eq!(state.as_str().parse::<ProjectState>().unwrap(), *state);
        }
    }

    #[test]
    fn unknown_state_is_rejected() {
        let err = "launched".parse::<ProjectState>().unwrap_err();
        assert!(err.to_string().contains("Invalid project state 'launched'"));
    }

    #[test]
    fn draft_can_go_soon_or_directly_online() {
        assert!(validate_transition(Draft, Soon).is_ok());
        assert!(validate_transition(Draft, Online).is_ok());
        assert!(validate_transition(Draft, Successful).is_err());
    }

    #[test]
    fn online_can_finish_in_three_ways() {
        assert!(validate_transition(Online, WaitingFunds).is_ok());
        assert!(validate_transition(Online, Successful).is_ok());
        assert!(validate_transition(Online, Failed).is_ok());
        assert!(validate_transition(Online, Draft).is_err());
    }

    #[test]
    fn waiting_funds_resolves_to_a_terminal_state() {
        assert!(validate_transition(WaitingFunds, Successful).is_ok());
        assert!(validate_transition(WaitingFunds, Failed).is_ok());
        assert!(validate_transition(WaitingFunds, Online).is_err());
    }

    #[test]
    fn successful_and_failed_are_terminal() {
        assert!(Successful.is_terminal());
        assert!(Failed.is_terminal());
        for next in ALL_PROJECT_STATES {
            assert!(validate_transition(Successful, *next).is_err());
            assert!(validate_transition(Failed, *next).is_err());
        }
    }

    #[test]
    fn transitions_never_move_backwards() {
        let rank = |s: &ProjectState| ALL_PROJECT_STATES.iter().position(|x| x == s).unwrap();
        for from in ALL_PROJECT_STATES {
            for to in from.valid_transitions() {
                assert!(rank(to) > rank(from), "{from} -> {to} moves backwards");
            }
        }
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = validate_transition(Failed, Online).unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidTransition { entity: "project", ref from, ref to }
                if from == "failed" && to == "online"
        );
    }

    #[test]
    fn owner_edits_everything_before_launch() {
        assert!(owner_may_edit(Draft, "name"));
        assert!(owner_may_edit(Soon, "goal"));
    }

    #[test]
    fn owner_edits_only_summary_after_launch() {
        assert!(owner_may_edit(Online, "summary"));
        assert!(!owner_may_edit(Online, "name"));
        assert!(!owner_may_edit(Successful, "goal"));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&WaitingFunds).unwrap();
        assert_eq!(json, "\"waiting_funds\"");
    }
}

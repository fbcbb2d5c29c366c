//! Contribution lifecycle states and transition rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of a single pledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionState {
    /// Pledged, payment not yet confirmed.
    Pending,
    /// Payment confirmed; counts toward the project total.
    Confirmed,
    /// Confirmed payment returned to the contributor.
    Refunded,
    /// Abandoned before confirmation.
    Canceled,
}

/// All contribution states.
pub const ALL_CONTRIBUTION_STATES: &[ContributionState] = &[
    ContributionState::Pending,
    ContributionState::Confirmed,
    ContributionState::Refunded,
    ContributionState::Canceled,
];

impl ContributionState {
    /// Return the string stored in `contributions.state`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Refunded => "refunded",
            Self::Canceled => "canceled",
        }
    }

    /// Returns the set of states this state may transition to.
    ///
    /// - `pending`   -> `confirmed`, `canceled`
    /// - `confirmed` -> `refunded`
    /// - `refunded`, `canceled` are terminal
    pub fn valid_transitions(&self) -> &'static [ContributionState] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Canceled],
            Self::Confirmed => &[Self::Refunded],
            Self::Refunded | Self::Canceled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether a contribution in this state counts toward the project total.
    pub fn counts_toward_total(&self) -> bool {
        *self == Self::Confirmed
    }

    /// Whether a contribution may be created directly in this state.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for ContributionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContributionState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CONTRIBUTION_STATES
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid contribution state '{s}'. Must be one of: pending, confirmed, refunded, canceled"
                ))
            })
    }
}

/// A guarded state change of one contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContributionTransition {
    pub from: ContributionState,
    pub to: ContributionState,
}

impl ContributionTransition {
    /// Build a transition, rejecting edges outside the state machine.
    pub fn new(from: ContributionState, to: ContributionState) -> Result<Self, CoreError> {
        validate_transition(from, to)?;
        Ok(Self { from, to })
    }
}

/// Validate that a contribution transition from `current` to `next` is allowed.
pub fn validate_transition(
    current: ContributionState,
    next: ContributionState,
) -> Result<(), CoreError> {
    if current.valid_transitions().contains(&next) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            entity: "contribution",
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

/// Validate the state a contribution is created in.
pub fn validate_initial_state(state: ContributionState) -> Result<(), CoreError> {
    if state.is_initial() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Contributions cannot be created in state '{state}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ContributionState::*;

    #[test]
    fn pending_confirms_or_cancels() {
        assert!(validate_transition(Pending, Confirmed).is_ok());
        assert!(validate_transition(Pending, Canceled).is_ok());
        assert!(validate_transition(Pending, Refunded).is_err());
    }

    #[test]
    fn confirmed_can_only_be_refunded() {
        assert!(validate_transition(Confirmed, Refunded).is_ok());
        assert!(validate_transition(Confirmed, Canceled).is_err());
        assert!(validate_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn refunded_cannot_be_reconfirmed() {
        assert!(Refunded.is_terminal());
        assert!(validate_transition(Refunded, Confirmed).is_err());
    }

    #[test]
    fn canceled_is_terminal() {
        assert!(Canceled.is_terminal());
        for next in ALL_CONTRIBUTION_STATES {
            assert!(validate_transition(Canceled, *next).is_err());
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        for state in ALL_CONTRIBUTION_STATES {
            assert!(validate_transition(*state, *state).is_err());
        }
    }

    #[test]
    fn only_confirmed_counts_toward_total() {
        assert!(Confirmed.counts_toward_total());
        assert!(!Pending.counts_toward_total());
        assert!(!Refunded.counts_toward_total());
        assert!(!Canceled.counts_toward_total());
    }

    #[test]
    fn created_pending_or_confirmed_only() {
        assert!(validate_initial_state(Pending).is_ok());
        assert!(validate_initial_state(Confirmed).is_ok());
        assert!(validate_initial_state(Refunded).is_err());
        assert!(validate_initial_state(Canceled).is_err());
    }

    #[test]
    fn transition_constructor_applies_guard() {
        assert!(ContributionTransition::new(Confirmed, Refunded).is_ok());
        let err = ContributionTransition::new(Refunded, Confirmed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot move contribution from 'refunded' to 'confirmed'"
        );
    }

    #[test]
    fn parse_from_str() {
        assert_eq!("refunded".parse::<ContributionState>().unwrap(), Refunded);
        assert!("paid".parse::<ContributionState>().is_err());
    }
}

//! Project funding: the confirmed-total aggregation seam and the
//! contribution observer that drives it.
//!
//! A contribution write produces a [`ContributionChange`]. The caller hands
//! that change to [`ContributionObserver::observe`] inside the same unit of
//! work, which recomputes the project total through a [`TotalAggregator`].
//! After the unit of work commits, [`ContributionObserver::on_saved`] checks
//! the fresh [`FundingSnapshot`] and requests a `project_success` owner
//! notification when the goal is reached. At-most-once delivery per
//! `(project, kind)` is the [`OwnerNotifier`]'s job, not the observer's.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contribution_state::{ContributionState, ContributionTransition};
use crate::error::CoreError;
use crate::project_state::ProjectState;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Sum of the values of all confirmed contributions in `contributions`.
pub fn confirmed_total<I>(contributions: I) -> Decimal
where
    I: IntoIterator<Item = (ContributionState, Decimal)>,
{
    contributions
        .into_iter()
        .filter(|(state, _)| state.counts_toward_total())
        .map(|(_, value)| value)
        .sum()
}

/// Whether `total` meets or exceeds `goal`.
pub fn reached_goal(total: Decimal, goal: Decimal) -> bool {
    total >= goal
}

/// The funding-relevant view of a project immediately after a recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingSnapshot {
    pub project_id: DbId,
    pub owner_id: DbId,
    pub goal: Decimal,
    pub total: Decimal,
    pub state: ProjectState,
}

impl FundingSnapshot {
    pub fn reached_goal(&self) -> bool {
        reached_goal(self.total, self.goal)
    }
}

/// Computes and persists the authoritative confirmed total of one project.
///
/// Implementations must be idempotent and must return an error (never a
/// stale snapshot) when the new total could not be written.
#[async_trait]
pub trait TotalAggregator: Send {
    async fn recompute(&mut self, project_id: DbId) -> Result<FundingSnapshot, CoreError>;
}

// ---------------------------------------------------------------------------
// Owner notifications
// ---------------------------------------------------------------------------

/// Kinds of notification sent to a project owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The project's confirmed total reached its goal.
    ProjectSuccess,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectSuccess => "project_success",
        }
    }

    /// Event name published on the platform event bus for this kind.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ProjectSuccess => "project.success",
        }
    }

    /// Reverse of [`event_type`](Self::event_type).
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "project.success" => Some(Self::ProjectSuccess),
            _ => None,
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_success" => Ok(Self::ProjectSuccess),
            other => Err(CoreError::Validation(format!(
                "Invalid notification kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to notify a project's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerNotification {
    pub project_id: DbId,
    pub owner_id: DbId,
    pub kind: NotificationKind,
}

/// Accepts owner notification requests for deferred delivery.
///
/// Implementations guarantee at-most-once delivery per distinct
/// `(project_id, kind)` pair across retries and repeated requests.
#[async_trait]
pub trait OwnerNotifier: Send + Sync {
    async fn request(&self, notification: OwnerNotification) -> Result<(), CoreError>;
}

#[async_trait]
impl<T: OwnerNotifier + ?Sized> OwnerNotifier for &T {
    async fn request(&self, notification: OwnerNotification) -> Result<(), CoreError> {
        (**self).request(notification).await
    }
}

#[async_trait]
impl<T: OwnerNotifier + ?Sized> OwnerNotifier for std::sync::Arc<T> {
    async fn request(&self, notification: OwnerNotification) -> Result<(), CoreError> {
        (**self).request(notification).await
    }
}

// ---------------------------------------------------------------------------
// Contribution changes
// ---------------------------------------------------------------------------

/// The fields of a contribution the funding chain needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionRecord {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub value: Decimal,
    pub state: ContributionState,
}

/// What a contribution write changed. Returned by the write path and passed
/// explicitly to [`ContributionObserver::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionChange {
    Created(ContributionRecord),
    Transitioned {
        contribution: ContributionRecord,
        transition: ContributionTransition,
    },
}

impl ContributionChange {
    pub fn contribution(&self) -> &ContributionRecord {
        match self {
            Self::Created(contribution) => contribution,
            Self::Transitioned { contribution, .. } => contribution,
        }
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Result of the post-save goal check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Goal not reached; nothing requested.
    NotReached,
    /// Goal reached; the notifier accepted the request.
    Requested,
    /// Goal reached but the notifier rejected the request. Logged only.
    DispatchFailed,
}

/// Bridges contribution writes to project-level side effects.
pub struct ContributionObserver<N> {
    notifier: N,
}

impl<N: OwnerNotifier> ContributionObserver<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }

    /// Recompute the total of the contribution's project after creation.
    pub async fn on_created<A>(
        &self,
        aggregator: &mut A,
        contribution: &ContributionRecord,
    ) -> Result<FundingSnapshot, CoreError>
    where
        A: TotalAggregator + ?Sized,
    {
        tracing::debug!(
            contribution_id = contribution.id,
            project_id = contribution.project_id,
            state = %contribution.state,
            "Contribution created, recomputing project total"
        );
        Self::recompute(aggregator, contribution.project_id).await
    }

    /// Recompute the total of the contribution's project after a guarded
    /// state change, so refunds decrease the total as reliably as
    /// confirmations increase it.
    pub async fn on_transition<A>(
        &self,
        aggregator: &mut A,
        contribution: &ContributionRecord,
        transition: ContributionTransition,
    ) -> Result<FundingSnapshot, CoreError>
    where
        A: TotalAggregator + ?Sized,
    {
        tracing::debug!(
            contribution_id = contribution.id,
            project_id = contribution.project_id,
            from = %transition.from,
            to = %transition.to,
            "Contribution transitioned, recomputing project total"
        );
        Self::recompute(aggregator, contribution.project_id).await
    }

    /// Dispatch a [`ContributionChange`] to the matching hook.
    pub async fn observe<A>(
        &self,
        aggregator: &mut A,
        change: &ContributionChange,
    ) -> Result<FundingSnapshot, CoreError>
    where
        A: TotalAggregator + ?Sized,
    {
        match change {
            ContributionChange::Created(contribution) => {
                self.on_created(aggregator, contribution).await
            }
            ContributionChange::Transitioned {
                contribution,
                transition,
            } => {
                self.on_transition(aggregator, contribution, *transition)
                    .await
            }
        }
    }

    /// Request a `project_success` notification when the goal is reached.
    ///
    /// Runs after every save. Does not remember earlier requests. A notifier
    /// failure never fails the save that triggered it.
    pub async fn on_saved(&self, snapshot: &FundingSnapshot) -> NotificationOutcome {
        if !snapshot.reached_goal() {
            return NotificationOutcome::NotReached;
        }

        let notification = OwnerNotification {
            project_id: snapshot.project_id,
            owner_id: snapshot.owner_id,
            kind: NotificationKind::ProjectSuccess,
        };

        match self.notifier.request(notification).await {
            Ok(()) => {
                tracing::info!(
                    project_id = snapshot.project_id,
                    total = %snapshot.total,
                    goal = %snapshot.goal,
                    "Project reached goal, owner notification requested"
                );
                NotificationOutcome::Requested
            }
            Err(e) => {
                tracing::warn!(
                    project_id = snapshot.project_id,
                    error = %e,
                    "Failed to dispatch owner notification"
                );
                NotificationOutcome::DispatchFailed
            }
        }
    }

    async fn recompute<A>(aggregator: &mut A, project_id: DbId) -> Result<FundingSnapshot, CoreError>
    where
        A: TotalAggregator + ?Sized,
    {
        aggregator.recompute(project_id).await.inspect_err(|e| {
            tracing::error!(project_id, error = %e, "Project total recomputation failed");
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::contribution_state::ContributionState::*;

    const PROJECT_ID: DbId = 1;
    const OWNER_ID: DbId = 10;

    /// A project and its contributions held in memory.
    struct InMemoryLedger {
        goal: Decimal,
        stored_total: Decimal,
        contributions: Vec<ContributionRecord>,
        fail_writes: bool,
    }

    impl InMemoryLedger {
        fn with_goal(goal: Decimal) -> Self {
            Self {
                goal,
                stored_total: Decimal::ZERO,
                contributions: Vec::new(),
                fail_writes: false,
            }
        }

        fn create(&mut self, value: Decimal, state: ContributionState) -> ContributionChange {
            let record = ContributionRecord {
                id: self.contributions.len() as DbId + 1,
                project_id: PROJECT_ID,
                user_id: 100 + self.contributions.len() as DbId,
                value,
                state,
            };
            self.contributions.push(record.clone());
            ContributionChange::Created(record)
        }

        fn transition(&mut self, id: DbId, to: ContributionState) -> ContributionChange {
            let record = self
                .contributions
                .iter_mut()
                .find(|c| c.id == id)
                .expect("contribution exists");
            let transition = ContributionTransition::new(record.state, to).expect("valid edge");
            record.state = to;
            ContributionChange::Transitioned {
                contribution: record.clone(),
                transition,
            }
        }
    }

    #[async_trait]
    impl TotalAggregator for InMemoryLedger {
        async fn recompute(&mut self, project_id: DbId) -> Result<FundingSnapshot, CoreError> {
            if self.fail_writes {
                return Err(CoreError::AggregationFailure("disk full".into()));
            }
            self.stored_total = confirmed_total(
                self.contributions
                    .iter()
                    .filter(|c| c.project_id == project_id)
                    .map(|c| (c.state, c.value)),
            );
            Ok(FundingSnapshot {
                project_id,
                owner_id: OWNER_ID,
                goal: self.goal,
                total: self.stored_total,
                state: ProjectState::Online,
            })
        }
    }

    /// Records every request; optionally rejects them all.
    #[derive(Default)]
    struct RecordingNotifier {
        requests: Mutex<Vec<OwnerNotification>>,
        fail: bool,
    }

    #[async_trait]
    impl OwnerNotifier for RecordingNotifier {
        async fn request(&self, notification: OwnerNotification) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::NotificationDispatch("queue unavailable".into()));
            }
            self.requests.lock().unwrap().push(notification);
            Ok(())
        }
    }

    /// Collaborator that delivers each `(project, kind)` at most once.
    #[derive(Default)]
    struct DedupNotifier {
        delivered: Mutex<HashSet<(DbId, NotificationKind)>>,
    }

    #[async_trait]
    impl OwnerNotifier for DedupNotifier {
        async fn request(&self, notification: OwnerNotification) -> Result<(), CoreError> {
            self.delivered
                .lock()
                .unwrap()
                .insert((notification.project_id, notification.kind));
            Ok(())
        }
    }

    async fn save<N: OwnerNotifier>(
        observer: &ContributionObserver<N>,
        ledger: &mut InMemoryLedger,
        change: ContributionChange,
    ) -> (FundingSnapshot, NotificationOutcome) {
        let snapshot = observer.observe(ledger, &change).await.unwrap();
        let outcome = observer.on_saved(&snapshot).await;
        (snapshot, outcome)
    }

    // -- confirmed_total ----------------------------------------------------

    #[test]
    fn confirmed_total_ignores_other_states() {
        let total = confirmed_total([
            (Confirmed, dec!(100)),
            (Pending, dec!(50)),
            (Refunded, dec!(25)),
            (Canceled, dec!(10)),
            (Confirmed, dec!(0.50)),
        ]);
        assert_eq!(total, dec!(100.50));
    }

    #[test]
    fn confirmed_total_of_nothing_is_zero() {
        assert_eq!(confirmed_total(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn reached_goal_is_inclusive() {
        assert!(reached_goal(dec!(1000), dec!(1000)));
        assert!(reached_goal(dec!(1200), dec!(1000)));
        assert!(!reached_goal(dec!(999.99), dec!(1000)));
    }

    proptest! {
        #[test]
        fn confirmed_total_is_order_independent(
            (values, shuffled) in proptest::collection::vec(1i64..10_000_000, 0..30)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let as_confirmed = |cents: &Vec<i64>| {
                confirmed_total(cents.iter().map(|c| (Confirmed, Decimal::new(*c, 2))))
            };
            let expected: i64 = values.iter().sum();
            prop_assert_eq!(as_confirmed(&values), Decimal::new(expected, 2));
            prop_assert_eq!(as_confirmed(&values), as_confirmed(&shuffled));
        }

        #[test]
        fn recompute_is_idempotent(
            entries in proptest::collection::vec((1i64..1_000_000, 0usize..4), 0..20)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let mut ledger = InMemoryLedger::with_goal(dec!(1000));
                for (cents, state_index) in &entries {
                    let state = crate::contribution_state::ALL_CONTRIBUTION_STATES[*state_index];
                    ledger.create(Decimal::new(*cents, 2), state);
                }
                let first = ledger.recompute(PROJECT_ID).await.unwrap();
                let second = ledger.recompute(PROJECT_ID).await.unwrap();
                assert_eq!(first, second);
            });
        }
    }

    // -- observer -----------------------------------------------------------

    #[tokio::test]
    async fn creations_accumulate_and_reaching_goal_requests_once() {
        let notifier = RecordingNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(1000));

        let change = ledger.create(dec!(400), Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(400));
        assert_eq!(outcome, NotificationOutcome::NotReached);

        let change = ledger.create(dec!(300), Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(700));
        assert_eq!(outcome, NotificationOutcome::NotReached);

        let change = ledger.create(dec!(300), Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(1000));
        assert!(snapshot.reached_goal());
        assert_eq!(outcome, NotificationOutcome::Requested);

        let requests = notifier.requests.lock().unwrap();
        assert_eq!(
            *requests,
            vec![OwnerNotification {
                project_id: PROJECT_ID,
                owner_id: OWNER_ID,
                kind: NotificationKind::ProjectSuccess,
            }]
        );
    }

    #[tokio::test]
    async fn over_funding_recomputes_and_does_not_gate_on_earlier_requests() {
        let notifier = RecordingNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(1000));

        for value in [dec!(400), dec!(300), dec!(300)] {
            let change = ledger.create(value, Confirmed);
            save(&observer, &mut ledger, change).await;
        }

        let change = ledger.create(dec!(200), Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(1200));
        assert!(snapshot.reached_goal());
        // The observer asks again; deduplication belongs to the notifier.
        assert_eq!(outcome, NotificationOutcome::Requested);
        assert_eq!(notifier.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dedup_collaborator_delivers_success_once() {
        let notifier = DedupNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(1000));

        for value in [dec!(400), dec!(300), dec!(300), dec!(200)] {
            let change = ledger.create(value, Confirmed);
            save(&observer, &mut ledger, change).await;
        }

        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered.contains(&(PROJECT_ID, NotificationKind::ProjectSuccess)));
    }

    #[tokio::test]
    async fn refund_decreases_total_by_exact_value() {
        let notifier = RecordingNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(1000));

        let change = ledger.create(dec!(500), Confirmed);
        let (snapshot, _) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(500));

        let change = ledger.transition(1, Refunded);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, Decimal::ZERO);
        assert!(!snapshot.reached_goal());
        assert_eq!(outcome, NotificationOutcome::NotReached);
    }

    #[tokio::test]
    async fn goal_reached_is_reenterable_after_refund() {
        let notifier = RecordingNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(1000));

        let change = ledger.create(dec!(1000), Confirmed);
        let (snapshot, _) = save(&observer, &mut ledger, change).await;
        assert!(snapshot.reached_goal());

        let change = ledger.transition(1, Refunded);
        let (snapshot, _) = save(&observer, &mut ledger, change).await;
        assert!(!snapshot.reached_goal());

        let change = ledger.create(dec!(1000), Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert!(snapshot.reached_goal());
        assert_eq!(outcome, NotificationOutcome::Requested);
    }

    #[tokio::test]
    async fn pending_contribution_counts_only_once_confirmed() {
        let notifier = RecordingNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(100));

        let change = ledger.create(dec!(150), Pending);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, Decimal::ZERO);
        assert_eq!(outcome, NotificationOutcome::NotReached);

        let change = ledger.transition(1, Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(150));
        assert_eq!(outcome, NotificationOutcome::Requested);
    }

    #[tokio::test]
    async fn aggregation_failure_propagates() {
        let notifier = RecordingNotifier::default();
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(100));
        let change = ledger.create(dec!(150), Confirmed);
        ledger.fail_writes = true;

        let result = observer.observe(&mut ledger, &change).await;
        assert_matches!(result, Err(CoreError::AggregationFailure(_)));
        assert!(notifier.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn notifier_failure_is_not_fatal() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let observer = ContributionObserver::new(&notifier);
        let mut ledger = InMemoryLedger::with_goal(dec!(100));

        let change = ledger.create(dec!(150), Confirmed);
        let (snapshot, outcome) = save(&observer, &mut ledger, change).await;
        assert_eq!(snapshot.total, dec!(150));
        assert_eq!(outcome, NotificationOutcome::DispatchFailed);
    }

    #[test]
    fn notification_kind_event_type_round_trip() {
        let kind = NotificationKind::ProjectSuccess;
        assert_eq!(kind.as_str(), "project_success");
        assert_eq!(NotificationKind::from_event_type(kind.event_type()), Some(kind));
        assert_eq!(NotificationKind::from_event_type("project.created"), None);
    }
}

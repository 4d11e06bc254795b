//! A visitor's element selection on a raffle detail view.
//!
//! ```text
//! Idle ──toggle──▶ Selecting ──submit──▶ Submitted
//!  ▲                  │
//!  └──clear / last────┘        (any) ──discard──▶ Discarded
//!     element removed
//! ```
//!
//! The selection lives only as long as the view. On submit it is handed to
//! checkout as a [`CheckoutHandoff`] value; it is never persisted.
//!
//! When availability is refreshed while a selection is open, labels that
//! are no longer free are evicted and reported so the view can tell the
//! visitor.

use crate::reconciler::{Partition, normalize_label, sort_numeric};
use crate::types::{ElementLabel, Money, ParticipationRequest, Raffle, RaffleId};
use serde::{Deserialize, Serialize};
use sorteohub_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use thiserror::Error;

/// Selection lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionPhase {
    /// Nothing selected
    #[default]
    Idle,
    /// At least one element selected
    Selecting,
    /// Handed off to checkout (terminal)
    Submitted,
    /// View torn down (terminal)
    Discarded,
}

impl SelectionPhase {
    /// Whether no further transitions are accepted
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Discarded)
    }
}

/// Result of a toggle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Label appended to the selection
    Added,
    /// Label removed from the selection
    Removed,
    /// Label not free, or selection closed
    Ignored,
}

/// Selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Submit with nothing selected
    #[error("Nothing selected")]
    Empty,

    /// The selection was already submitted or discarded
    #[error("Selection is closed ({0:?})")]
    Closed(SelectionPhase),
}

/// What checkout receives on submit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutHandoff {
    /// Raffle being bought from
    pub raffle_id: RaffleId,
    /// Selected labels, in selection order
    pub labels: Vec<ElementLabel>,
    /// Price per element
    pub unit_price: Money,
    /// `labels.len() × unit_price`
    pub total: Money,
}

impl CheckoutHandoff {
    /// Participation body for these labels and the visitor's contact data
    #[must_use]
    pub fn into_participation(
        self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> ParticipationRequest {
        ParticipationRequest {
            labels: self.labels,
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            country: None,
            state: None,
            receipt_url: None,
        }
    }
}

/// Selection state for one raffle view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    raffle_id: RaffleId,
    partition: Partition,
    unit_price: Money,
    selected: Vec<ElementLabel>,
    phase: SelectionPhase,
    last_evicted: Vec<ElementLabel>,
}

impl SelectionState {
    /// Open an empty selection
    #[must_use]
    pub const fn new(raffle_id: RaffleId, partition: Partition, unit_price: Money) -> Self {
        Self {
            raffle_id,
            partition,
            unit_price,
            selected: Vec::new(),
            phase: SelectionPhase::Idle,
            last_evicted: Vec::new(),
        }
    }

    /// Open an empty selection for a fetched raffle
    #[must_use]
    pub fn for_raffle(raffle: &Raffle) -> Self {
        Self::new(
            raffle.id.clone(),
            Partition::from_raffle(raffle),
            raffle.unit_price,
        )
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> SelectionPhase {
        self.phase
    }

    /// Selected labels, in selection order
    #[must_use]
    pub fn selected(&self) -> &[ElementLabel] {
        &self.selected
    }

    /// Availability the selection is checked against
    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Labels evicted by the most recent refresh
    #[must_use]
    pub fn last_evicted(&self) -> &[ElementLabel] {
        &self.last_evicted
    }

    /// Whether `label` is selected
    #[must_use]
    pub fn is_selected(&self, label: &ElementLabel) -> bool {
        self.position(label).is_some()
    }

    fn position(&self, label: &ElementLabel) -> Option<usize> {
        let key = normalize_label(label);
        self.selected.iter().position(|l| normalize_label(l) == key)
    }

    /// Add or remove `label`
    ///
    /// Selected labels are removed. Free labels are appended. Anything else
    /// (sold, reserved, unknown, or a closed selection) is ignored.
    pub fn toggle(&mut self, label: &ElementLabel) -> ToggleOutcome {
        if self.phase.is_terminal() {
            tracing::debug!(phase = ?self.phase, %label, "Toggle on closed selection ignored");
            return ToggleOutcome::Ignored;
        }

        if let Some(index) = self.position(label) {
            self.selected.remove(index);
            self.sync_phase();
            return ToggleOutcome::Removed;
        }

        if !self.partition.is_free(label) {
            tracing::debug!(%label, "Toggle on unavailable element ignored");
            return ToggleOutcome::Ignored;
        }

        self.selected.push(label.clone());
        self.sync_phase();
        ToggleOutcome::Added
    }

    /// Empty the selection
    pub fn clear(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.selected.clear();
        self.last_evicted.clear();
        self.phase = SelectionPhase::Idle;
    }

    /// Close the selection and hand it to checkout
    ///
    /// # Errors
    ///
    /// - [`SelectionError::Empty`]: nothing is selected
    /// - [`SelectionError::Closed`]: already submitted or discarded
    pub fn submit(&mut self) -> Result<CheckoutHandoff, SelectionError> {
        if self.phase.is_terminal() {
            return Err(SelectionError::Closed(self.phase));
        }
        if self.selected.is_empty() {
            return Err(SelectionError::Empty);
        }

        self.phase = SelectionPhase::Submitted;
        Ok(CheckoutHandoff {
            raffle_id: self.raffle_id.clone(),
            labels: self.selected.clone(),
            unit_price: self.unit_price,
            total: self.total_price(),
        })
    }

    /// Tear down the selection
    pub fn discard(&mut self) {
        self.selected.clear();
        self.phase = SelectionPhase::Discarded;
    }

    /// Apply refreshed availability
    ///
    /// Selected labels that are no longer free are removed and returned.
    /// The remaining selection keeps its order.
    pub fn reconcile(&mut self, partition: Partition) -> Vec<ElementLabel> {
        if self.phase.is_terminal() {
            return Vec::new();
        }

        self.partition = partition;
        let (kept, evicted): (Vec<_>, Vec<_>) = std::mem::take(&mut self.selected)
            .into_iter()
            .partition(|label| self.partition.is_free(label));
        self.selected = kept;
        self.last_evicted.clone_from(&evicted);
        self.sync_phase();

        if !evicted.is_empty() {
            tracing::info!(raffle_id = %self.raffle_id, evicted = evicted.len(), "Selection lost elements on refresh");
        }
        evicted
    }

    /// Number of selected elements
    #[must_use]
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// `count × unit price`
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.unit_price.times(self.selected.len())
    }

    /// Selection for display, numerically sorted for numeric pools
    #[must_use]
    pub fn sorted_preview(&self) -> Vec<ElementLabel> {
        let mut preview = self.selected.clone();
        if self.partition.is_numeric() {
            sort_numeric(&mut preview);
        }
        preview
    }

    fn sync_phase(&mut self) {
        self.phase = if self.selected.is_empty() {
            SelectionPhase::Idle
        } else {
            SelectionPhase::Selecting
        };
    }
}

/// Selection actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionAction {
    /// Visitor clicked an element
    Toggle {
        /// Clicked label
        label: ElementLabel,
    },
    /// Visitor cleared the selection
    Clear,
    /// Visitor pressed "participar"
    Submit,
    /// View unmounted
    Discard,
    /// Raffle data was refreshed
    AvailabilityRefreshed {
        /// New availability
        partition: Partition,
    },
    /// Submit succeeded; carries the handoff for checkout
    CheckedOut {
        /// Value passed to checkout
        handoff: CheckoutHandoff,
    },
    /// Submit was rejected
    SubmitRejected {
        /// Why
        error: SelectionError,
    },
}

/// Reducer driving [`SelectionState`]
///
/// The handoff is delivered as a [`SelectionAction::CheckedOut`] feedback
/// action so the view receives it from `send_and_wait_for` instead of
/// reading it out of state.
#[derive(Clone, Debug, Default)]
pub struct SelectionReducer;

impl SelectionReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for SelectionReducer {
    type State = SelectionState;
    type Action = SelectionAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut SelectionState,
        action: SelectionAction,
        _env: &(),
    ) -> SmallVec<[Effect<SelectionAction>; 4]> {
        match action {
            SelectionAction::Toggle { label } => {
                state.toggle(&label);
                SmallVec::new()
            },
            SelectionAction::Clear => {
                state.clear();
                SmallVec::new()
            },
            SelectionAction::Submit => {
                let outcome = match state.submit() {
                    Ok(handoff) => SelectionAction::CheckedOut { handoff },
                    Err(error) => SelectionAction::SubmitRejected { error },
                };
                smallvec![async_effect! { Some(outcome) }]
            },
            SelectionAction::Discard => {
                state.discard();
                SmallVec::new()
            },
            SelectionAction::AvailabilityRefreshed { partition } => {
                state.reconcile(partition);
                SmallVec::new()
            },
            SelectionAction::CheckedOut { .. } | SelectionAction::SubmitRejected { .. } => {
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::reconciler::partition;
    use sorteohub_runtime::Store;
    use sorteohub_testing::{ReducerTest, assertions};
    use std::time::Duration;

    fn numbers(range: std::ops::RangeInclusive<i64>) -> Vec<ElementLabel> {
        range.map(ElementLabel::Number).collect()
    }

    fn hundred() -> SelectionState {
        let p = partition(
            &numbers(1..=100),
            &[ElementLabel::from("3"), ElementLabel::from("7")],
            &[ElementLabel::from("50")],
        );
        SelectionState::new(RaffleId::new("r1"), p, Money::from_units(50))
    }

    #[test]
    fn double_toggle_restores_selection() {
        let mut state = hundred();
        state.toggle(&ElementLabel::Number(1));
        let before = state.clone();

        assert_eq!(state.toggle(&ElementLabel::Number(42)), ToggleOutcome::Added);
        assert_eq!(state.toggle(&ElementLabel::Number(42)), ToggleOutcome::Removed);
        assert_eq!(state, before);
    }

    #[test]
    fn sold_and_reserved_toggles_are_ignored() {
        let mut state = hundred();
        assert_eq!(state.toggle(&ElementLabel::Number(3)), ToggleOutcome::Ignored);
        assert_eq!(state.toggle(&ElementLabel::from("50")), ToggleOutcome::Ignored);
        assert_eq!(state.toggle(&ElementLabel::Number(101)), ToggleOutcome::Ignored);
        assert_eq!(state.count(), 0);
        assert_eq!(state.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn string_and_number_toggle_the_same_element() {
        let mut state = hundred();
        state.toggle(&ElementLabel::Number(10));
        assert_eq!(state.toggle(&ElementLabel::from("10")), ToggleOutcome::Removed);
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn total_is_count_times_price() {
        let mut state = hundred();
        for n in [1, 2, 4] {
            state.toggle(&ElementLabel::Number(n));
        }
        assert_eq!(state.total_price(), Money::from_units(150));
        assert_eq!(state.phase(), SelectionPhase::Selecting);
    }

    #[test]
    fn select_then_clear_returns_to_idle() {
        let mut state = hundred();
        state.toggle(&ElementLabel::Number(10));
        state.toggle(&ElementLabel::Number(20));
        assert_eq!(state.count(), 2);

        state.clear();
        assert!(state.selected().is_empty());
        assert_eq!(state.total_price(), Money::ZERO);
        assert_eq!(state.total_price().to_string(), "$0");
        assert_eq!(state.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn removing_last_element_returns_to_idle() {
        let mut state = hundred();
        state.toggle(&ElementLabel::Number(10));
        state.toggle(&ElementLabel::Number(10));
        assert_eq!(state.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn preview_is_sorted_for_numeric_pools() {
        let mut state = hundred();
        for n in [30, 2, 11] {
            state.toggle(&ElementLabel::Number(n));
        }
        assert_eq!(state.selected()[0], ElementLabel::Number(30));
        assert_eq!(
            state.sorted_preview(),
            vec![ElementLabel::Number(2), ElementLabel::Number(11), ElementLabel::Number(30)]
        );
    }

    #[test]
    fn submit_requires_a_selection() {
        let mut state = hundred();
        assert_eq!(state.submit(), Err(SelectionError::Empty));
        assert_eq!(state.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn submit_hands_off_and_closes() {
        let mut state = hundred();
        state.toggle(&ElementLabel::Number(9));
        state.toggle(&ElementLabel::Number(8));

        let handoff = state.submit().unwrap();
        assert_eq!(handoff.labels, vec![ElementLabel::Number(9), ElementLabel::Number(8)]);
        assert_eq!(handoff.total, Money::from_units(100));
        assert_eq!(state.phase(), SelectionPhase::Submitted);

        assert_eq!(state.toggle(&ElementLabel::Number(1)), ToggleOutcome::Ignored);
        assert_eq!(
            state.submit(),
            Err(SelectionError::Closed(SelectionPhase::Submitted))
        );

        let request = handoff.into_participation("Ana", "ana@example.com", "5512345678");
        assert_eq!(request.labels, vec![ElementLabel::Number(9), ElementLabel::Number(8)]);
        assert_eq!(request.receipt_url, None);
    }

    #[test]
    fn discard_is_terminal() {
        let mut state = hundred();
        state.toggle(&ElementLabel::Number(9));
        state.discard();
        assert_eq!(state.phase(), SelectionPhase::Discarded);
        assert_eq!(state.count(), 0);
        state.clear();
        assert_eq!(state.phase(), SelectionPhase::Discarded);
    }

    #[test]
    fn refresh_evicts_elements_that_were_taken() {
        let mut state = hundred();
        for n in [10, 20, 30] {
            state.toggle(&ElementLabel::Number(n));
        }

        let refreshed = partition(
            &numbers(1..=100),
            &[ElementLabel::from("3"), ElementLabel::from("7"), ElementLabel::from("20")],
            &[ElementLabel::from("50"), ElementLabel::from("30")],
        );
        let evicted = state.reconcile(refreshed);

        assert_eq!(evicted, vec![ElementLabel::Number(20), ElementLabel::Number(30)]);
        assert_eq!(state.selected(), &[ElementLabel::Number(10)]);
        assert_eq!(state.last_evicted(), &evicted[..]);
        assert_eq!(state.phase(), SelectionPhase::Selecting);
    }

    #[test]
    fn reducer_toggle_and_refresh() {
        let refreshed = partition(&numbers(1..=100), &[ElementLabel::Number(10)], &[]);

        ReducerTest::new(SelectionReducer::new())
            .with_env(())
            .given_state(hundred())
            .when_actions([
                SelectionAction::Toggle { label: ElementLabel::Number(10) },
                SelectionAction::Toggle { label: ElementLabel::Number(11) },
                SelectionAction::AvailabilityRefreshed { partition: refreshed },
            ])
            .then_state(|s| {
                assert_eq!(s.selected(), &[ElementLabel::Number(11)]);
                assert_eq!(s.last_evicted(), &[ElementLabel::Number(10)]);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn reducer_submit_emits_outcome() {
        ReducerTest::new(SelectionReducer::new())
            .with_env(())
            .given_state(hundred())
            .when_action(SelectionAction::Submit)
            .then_state(|s| assert_eq!(s.phase(), SelectionPhase::Idle))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[tokio::test]
    async fn store_delivers_handoff_to_the_view() {
        let store = Store::new(hundred(), SelectionReducer::new(), ());
        store
            .send(SelectionAction::Toggle { label: ElementLabel::Number(5) })
            .await
            .unwrap();

        let outcome = store
            .send_and_wait_for(
                SelectionAction::Submit,
                |a| matches!(a, SelectionAction::CheckedOut { .. } | SelectionAction::SubmitRejected { .. }),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        let SelectionAction::CheckedOut { handoff } = outcome else {
            panic!("expected handoff, got {outcome:?}");
        };
        assert_eq!(handoff.labels, vec![ElementLabel::Number(5)]);
        assert_eq!(handoff.unit_price, Money::from_units(50));
        assert_eq!(store.state(SelectionState::phase).await, SelectionPhase::Submitted);
    }
}

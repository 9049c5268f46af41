//! Optimistic-UI bookkeeping for one mutable element, e.g. the favorite
//! heart on a job card.
//!
//! The element renders the staged guess immediately; only ground truth from
//! a live-subscription snapshot may settle the cell. Rapid repeated input
//! restages freely — the snapshot decides who won.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Idle,
    Optimistic,
    Confirmed,
    Reverted,
}

#[derive(Debug, Clone)]
pub struct OptimisticCell<T> {
    value: T,
    staged: Option<T>,
    state: CellState,
}

impl<T: Clone + PartialEq> OptimisticCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            staged: None,
            state: CellState::Idle,
        }
    }

    /// What the UI should render right now: the staged guess while one is
    /// outstanding, otherwise the last reconciled value.
    pub fn value(&self) -> &T {
        self.staged.as_ref().unwrap_or(&self.value)
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    /// Records an optimistic guess ahead of the store write.
    pub fn stage(&mut self, guess: T) {
        self.staged = Some(guess);
        self.state = CellState::Optimistic;
    }

    /// Applies ground truth from a subscription snapshot — the only path
    /// that can settle an outstanding guess. A snapshot arriving with no
    /// guess outstanding simply refreshes the value.
    pub fn reconcile(&mut self, ground_truth: T) {
        self.state = match self.state {
            CellState::Optimistic => {
                if self.staged.as_ref() == Some(&ground_truth) {
                    CellState::Confirmed
                } else {
                    CellState::Reverted
                }
            }
            _ => CellState::Idle,
        };
        self.value = ground_truth;
        self.staged = None;
    }
}

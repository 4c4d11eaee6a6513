use crate::issue::IssueDetails;

/// Selection/detail lifecycle for a single issue:
/// `Idle -> Selected -> LoadingDetails -> DetailsReady`, with a failed fetch
/// reverting to `Selected` (no payload) and the error kept alongside.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected {
        issue_key: String,
    },
    LoadingDetails {
        issue_key: String,
        generation: u64,
    },
    DetailsReady {
        issue_key: String,
        details: Box<IssueDetails>,
    },
}

/// Tracks the selection state machine and the generation token of the
/// in-flight detail fetch. A new selection bumps the token, so a response
/// from a superseded fetch is simply dropped instead of overwriting newer
/// state.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    state: SelectionState,
    detail_error: Option<String>,
    next_generation: u64,
}

impl SelectionTracker {
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_key(&self) -> Option<&str> {
        match &self.state {
            SelectionState::Idle => None,
            SelectionState::Selected { issue_key }
            | SelectionState::LoadingDetails { issue_key, .. }
            | SelectionState::DetailsReady { issue_key, .. } => Some(issue_key),
        }
    }

    pub fn details(&self) -> Option<&IssueDetails> {
        match &self.state {
            SelectionState::DetailsReady { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SelectionState::LoadingDetails { .. })
    }

    pub fn detail_error(&self) -> Option<&str> {
        self.detail_error.as_deref()
    }

    pub fn select(&mut self, issue_key: impl Into<String>) {
        self.detail_error = None;
        self.state = SelectionState::Selected {
            issue_key: issue_key.into(),
        };
    }

    /// Moves the current selection into `LoadingDetails` and returns the
    /// token the eventual response must present. `None` when nothing is
    /// selected.
    pub fn begin_loading(&mut self) -> Option<u64> {
        let issue_key = self.selected_key()?.to_owned();
        self.next_generation += 1;
        let generation = self.next_generation;
        self.detail_error = None;
        self.state = SelectionState::LoadingDetails {
            issue_key,
            generation,
        };
        Some(generation)
    }

    /// Accepts a completed fetch if it answers the in-flight generation;
    /// returns whether the payload was applied.
    pub fn apply_loaded(&mut self, generation: u64, details: IssueDetails) -> bool {
        match &self.state {
            SelectionState::LoadingDetails {
                issue_key,
                generation: current,
            } if *current == generation => {
                self.state = SelectionState::DetailsReady {
                    issue_key: issue_key.clone(),
                    details: Box::new(details),
                };
                true
            }
            _ => false,
        }
    }

    /// A failed fetch is non-fatal: the selection survives without a payload
    /// and the message is surfaced. Stale failures are dropped like stale
    /// successes.
    pub fn apply_failed(&mut self, generation: u64, error: impl Into<String>) -> bool {
        match &self.state {
            SelectionState::LoadingDetails {
                issue_key,
                generation: current,
            } if *current == generation => {
                self.state = SelectionState::Selected {
                    issue_key: issue_key.clone(),
                };
                self.detail_error = Some(error.into());
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::Idle;
        self.detail_error = None;
    }
}

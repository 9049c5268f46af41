//! Per-job "did you apply?" prompt machine.
//!
//! The prompt opens once, when a job's detail view is first shown, and
//! settles on an explicit answer. `Applied` is only reachable through
//! confirmation (which is when the store write fires); `Declined` stays
//! local and is never persisted. There are no timeout transitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyPromptState {
    Unknown,
    PendingResponse,
    Applied,
    Declined,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid apply-prompt transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: ApplyPromptState,
    pub to: ApplyPromptState,
}

#[derive(Debug, Clone)]
pub struct ApplyPrompt {
    state: ApplyPromptState,
}

impl ApplyPrompt {
    pub fn new() -> Self {
        Self {
            state: ApplyPromptState::Unknown,
        }
    }

    pub fn state(&self) -> ApplyPromptState {
        self.state
    }

    /// First open of the job's detail view.
    pub fn open_prompt(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ApplyPromptState::PendingResponse)
    }

    /// Explicit "yes, I applied". The caller is responsible for firing the
    /// corresponding store write.
    pub fn confirm(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ApplyPromptState::Applied)
    }

    /// Explicit "no". Local only.
    pub fn decline(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ApplyPromptState::Declined)
    }

    fn transition(&mut self, to: ApplyPromptState) -> Result<(), InvalidTransition> {
        use ApplyPromptState::*;

        let legal = matches!(
            (self.state, to),
            (Unknown, PendingResponse) | (PendingResponse, Applied) | (PendingResponse, Declined)
        );
        if !legal {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for ApplyPrompt {
    fn default() -> Self {
        Self::new()
    }
}

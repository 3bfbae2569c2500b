//! Resolution state machine
//!
//! INIT → LAYERS_LOADED → MERGED → VALIDATED → (SIGNING_RESOLVED) → RESOLVED
//!
//! FAILED_LOAD, FAILED_VALIDATION and FAILED_SIGNING are terminal and can be
//! entered from any state before RESOLVED.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolver state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionState {
    Init,
    LayersLoaded,
    Merged,
    Validated,
    /// Release variants only
    SigningResolved,
    Resolved,
    FailedLoad,
    FailedValidation,
    FailedSigning,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionState::Resolved
                | ResolutionState::FailedLoad
                | ResolutionState::FailedValidation
                | ResolutionState::FailedSigning
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ResolutionState::FailedLoad
                | ResolutionState::FailedValidation
                | ResolutionState::FailedSigning
        )
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: ResolutionState) -> bool {
        use ResolutionState::*;

        if self.is_terminal() {
            return false;
        }
        if target.is_failed() {
            return true;
        }

        matches!(
            (self, target),
            (Init, LayersLoaded)
                | (LayersLoaded, Merged)
                | (Merged, Validated)
                | (Validated, SigningResolved)
                | (Validated, Resolved)
                | (SigningResolved, Resolved)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Init => "INIT",
            ResolutionState::LayersLoaded => "LAYERS_LOADED",
            ResolutionState::Merged => "MERGED",
            ResolutionState::Validated => "VALIDATED",
            ResolutionState::SigningResolved => "SIGNING_RESOLVED",
            ResolutionState::Resolved => "RESOLVED",
            ResolutionState::FailedLoad => "FAILED_LOAD",
            ResolutionState::FailedValidation => "FAILED_VALIDATION",
            ResolutionState::FailedSigning => "FAILED_SIGNING",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors for state operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid state transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: ResolutionState,
    pub to: ResolutionState,
}

/// Tracks one run through the state machine
#[derive(Debug, Clone)]
pub struct StateTracker {
    state: ResolutionState,
    history: Vec<ResolutionState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            state: ResolutionState::Init,
            history: vec![ResolutionState::Init],
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[ResolutionState] {
        &self.history
    }

    pub fn advance(&mut self, to: ResolutionState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = %self.state, to = %to, "resolution state transition");
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

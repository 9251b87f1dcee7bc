//! Request lifecycle state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::risk_gate::GateOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Detected,
    Validated,
    RiskAssessed,
    Proceed,
    ProceedWithMitigation,
    Stop,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Detected => "detected",
            LifecycleState::Validated => "validated",
            LifecycleState::RiskAssessed => "risk_assessed",
            LifecycleState::Proceed => "proceed",
            LifecycleState::ProceedWithMitigation => "proceed_with_mitigation",
            LifecycleState::Stop => "stop",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Proceed | LifecycleState::ProceedWithMitigation | LifecycleState::Stop
        )
    }

    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Detected, Validated)
                | (Detected, Stop)
                | (Validated, RiskAssessed)
                | (RiskAssessed, Proceed)
                | (RiskAssessed, ProceedWithMitigation)
                | (RiskAssessed, Stop)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GateOutcome> for LifecycleState {
    fn from(outcome: GateOutcome) -> Self {
        match outcome {
            GateOutcome::Proceed => LifecycleState::Proceed,
            GateOutcome::ProceedWithMitigation => LifecycleState::ProceedWithMitigation,
            GateOutcome::Stop => LifecycleState::Stop,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Request already finished in state {0}")]
    Terminal(LifecycleState),

    #[error("Illegal transition {from} -> {to}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// Lifecycle of one request with its state trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLifecycle {
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Detected,
            history: vec![LifecycleState::Detected],
        }
    }

    /// Build a lifecycle by applying `states` in order from Detected
    pub fn replay(states: &[LifecycleState]) -> Result<Self, LifecycleError> {
        let mut lifecycle = Self::new();
        for state in states {
            lifecycle.transition(*state)?;
        }
        Ok(lifecycle)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn transition(&mut self, next: LifecycleState) -> Result<(), LifecycleError> {
        if self.state.is_terminal() {
            return Err(LifecycleError::Terminal(self.state));
        }
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

impl Default for RequestLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path() {
        let mut lifecycle = RequestLifecycle::new();
        lifecycle.transition(LifecycleState::Validated).unwrap();
        lifecycle.transition(LifecycleState::RiskAssessed).unwrap();
        lifecycle.transition(GateOutcome::ProceedWithMitigation.into()).unwrap();
        assert!(lifecycle.is_finished());
        assert_eq!(lifecycle.history().len(), 4);
    }

    #[test]
    fn test_failed_validation_stops_directly() {
        let mut lifecycle = RequestLifecycle::new();
        lifecycle.transition(LifecycleState::Stop).unwrap();
        assert_eq!(
            lifecycle.history(),
            &[LifecycleState::Detected, LifecycleState::Stop]
        );
    }

    #[test]
    fn test_terminal_accepts_nothing() {
        let mut lifecycle = RequestLifecycle::new();
        lifecycle.transition(LifecycleState::Stop).unwrap();
        assert_eq!(
            lifecycle.transition(LifecycleState::Validated),
            Err(LifecycleError::Terminal(LifecycleState::Stop))
        );
    }

    #[test]
    fn test_replay() {
        let lifecycle = RequestLifecycle::replay(&[
            LifecycleState::Validated,
            LifecycleState::RiskAssessed,
            LifecycleState::Proceed,
        ])
        .unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Proceed);
        assert!(RequestLifecycle::replay(&[LifecycleState::RiskAssessed]).is_err());
    }

    #[test]
    fn test_skipping_states_rejected() {
        let mut lifecycle = RequestLifecycle::new();
        let err = lifecycle.transition(LifecycleState::Proceed).unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalTransition { .. }));
        assert_eq!(lifecycle.state(), LifecycleState::Detected);
    }
}

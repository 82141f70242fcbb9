//! State machine trait for lifecycle phase enums.
//!
//! Provides a consistent interface for validating and performing phase
//! transitions (used by the per-connection session phase).

use super::ValidationError;

/// Trait for phase enums that represent state machines.
///
/// Implementors define valid transitions and get validated transition
/// methods for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestPhase {
        Open,
        Busy,
        Done,
    }

    impl StateMachine for TestPhase {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestPhase::*;
            matches!((self, target), (Open, Busy) | (Busy, Done))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestPhase::*;
            match self {
                Open => vec![Busy],
                Busy => vec![Done],
                Done => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        let next = TestPhase::Open.transition_to(TestPhase::Busy).unwrap();
        assert_eq!(next, TestPhase::Busy);
    }

    #[test]
    fn invalid_transition_fails() {
        assert!(TestPhase::Open.transition_to(TestPhase::Done).is_err());
    }

    #[test]
    fn terminal_state_has_no_transitions() {
        assert!(TestPhase::Done.is_terminal());
        assert!(!TestPhase::Open.is_terminal());
    }
}

//! Planner verdict for one domain/problem pair

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of a single planner invocation.
///
/// Produced exactly once per invocation and never mutated afterwards.
/// Expected failures (unsolvable, syntax error, timeout) are values of this
/// type, not errors; only a broken planner installation raises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The pair was accepted by the planner
    pub is_valid: bool,
    /// The planner reported a solution
    pub has_solution: bool,
    /// Diagnostic text; empty when valid
    pub error_message: String,
    /// Ordered grounded actions of the solution, when one was found
    pub plan: Option<Vec<String>>,
    /// Wall-clock time the invocation took
    pub elapsed: Duration,
}

impl ValidationResult {
    pub fn solved(plan: Vec<String>, elapsed: Duration) -> Self {
        Self {
            is_valid: true,
            has_solution: true,
            error_message: String::new(),
            plan: Some(plan),
            elapsed,
        }
    }

    pub fn failed(error_message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            is_valid: false,
            has_solution: false,
            error_message: error_message.into(),
            plan: None,
            elapsed,
        }
    }

    /// Valid AND solved; the loop's only success criterion
    pub fn success(&self) -> bool {
        self.is_valid && self.has_solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_both_flags() {
        let solved = ValidationResult::solved(vec!["(move a b)".into()], Duration::from_secs(1));
        assert!(solved.success());

        let valid_unsolved = ValidationResult {
            is_valid: true,
            has_solution: false,
            error_message: String::new(),
            plan: None,
            elapsed: Duration::ZERO,
        };
        assert!(!valid_unsolved.success());

        let failed = ValidationResult::failed("syntax error", Duration::ZERO);
        assert!(!failed.success());
    }
}

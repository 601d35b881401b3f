//! Domain layer - Core quest model with no external dependencies
//!
//! This layer contains:
//! - Entities: Lore, PddlDomain, PddlProblem, StoryGraph
//! - Value Objects: ValidationResult
//!
//! All types validate their structural invariants at construction and are
//! immutable by convention afterwards; a failed construction never yields a
//! partial object.

pub mod entities;
pub mod value_objects;

/// Construction-time validation failures for domain types.
///
/// Each variant names the offending field so callers can surface a precise
/// diagnostic instead of a generic message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A min/max pair where min exceeds max
    #[error("{field}: min {min} exceeds max {max}")]
    InvalidBounds {
        field: &'static str,
        min: u32,
        max: u32,
    },

    /// The graph's initial state is not present in the state map
    #[error("initial state '{0}' not found in states")]
    MissingInitialState(String),

    /// An action points at a state id that does not exist in the graph
    #[error("state '{state}': action '{action}' targets unknown state '{target}'")]
    UnknownTargetState {
        state: String,
        action: String,
        target: String,
    },

    /// Two actions within one state share an id
    #[error("state '{state}': duplicate action id '{action}'")]
    DuplicateActionId { state: String, action: String },

    /// PDDL content whose parentheses do not balance
    #[error("{artifact} '{name}': unbalanced parentheses in content")]
    UnbalancedParentheses {
        artifact: &'static str,
        name: String,
    },

    /// PDDL content missing the `(define` header
    #[error("{artifact} '{name}': content has no (define header")]
    MissingDefineHeader {
        artifact: &'static str,
        name: String,
    },

    /// A problem that references a different domain than the one paired with it
    #[error("problem '{problem}' references domain '{found}', expected '{expected}'")]
    DomainMismatch {
        problem: String,
        expected: String,
        found: String,
    },
}

//! Error types for plan construction and scheduling.
//!
//! Every fatal category aborts plan construction before any scheduling
//! begins. Infeasible candidate orderings are never errors; they are
//! ranked out by the fitness sentinel instead.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type PlanResult<T> = Result<T, PlanError>;

/// Fatal plan errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Estimate, measurement, date or time text that no grammar accepts.
    #[error("malformed {field} '{text}' on task '{task}' in {source_id}: {reason}")]
    Malformed {
        source_id: String,
        task: String,
        field: &'static str,
        text: String,
        reason: String,
    },

    /// A dependency reference matched zero or several tasks.
    #[error("cannot resolve dependency '{reference}' of task '{task}' in {source_id}: {reason}")]
    Reference {
        source_id: String,
        task: String,
        reference: String,
        reason: String,
    },

    /// Cycle, timed lineage or deadline ordering violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The greedy seed found no eligible task.
    #[error("no task order satisfies the dependency graph; unplaceable: {}", remaining.join(", "))]
    Infeasible { remaining: Vec<String> },

    /// Start or finish instant later than the sampled `now`.
    #[error("{field} of task '{task}' in {source_id} lies in the future")]
    Timing {
        source_id: String,
        task: String,
        field: &'static str,
    },

    /// An instant specification did not supply exactly one source.
    #[error("instant needs exactly one of hours, date, time or datetime; {supplied} supplied")]
    InstantSource { supplied: usize },

    #[error("invalid calendar: {0}")]
    Calendar(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_messages_carry_context() {
        let err = PlanError::Reference {
            source_id: "work.plan.md".into(),
            task: "deploy".into(),
            reference: "build".into(),
            reason: "no matching task".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("deploy"));
        assert!(msg.contains("work.plan.md"));
        assert!(msg.contains("build"));
    }

    #[test]
    fn test_validation_is_transparent() {
        let inner = ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            "Found cyclic dependencies: (\"a\" => \"b\" => \"a\")",
            vec!["a".into(), "b".into(), "a".into()],
        );
        let err: PlanError = inner.clone().into();
        assert_eq!(err.to_string(), inner.message);
    }

    #[test]
    fn test_infeasible_lists_tasks() {
        let err = PlanError::Infeasible {
            remaining: vec!["x".into(), "y".into()],
        };
        assert!(err.to_string().ends_with("x, y"));
    }
}

use crate::common::{Fact, StateId};
use crate::landmark::LandmarkId;

use thiserror::Error;

/// Incompatible combinations of heuristic options, landmark graph and task.
/// These are detected once, before any state is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("reasonable orderings should not be used for admissible heuristics")]
    ReasonableOrderings,

    #[error("cost partitioning does not support axioms")]
    Axioms,

    #[error("conditional effects not supported by the landmark generation method")]
    UnsupportedConditionalEffects,

    #[error("optimal cost sharing requires admissible=true")]
    OptimalRequiresAdmissible,
}

impl ConfigurationError {
    /// Whether the fault lies in the input (as opposed to a task feature the
    /// heuristic does not support).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ConfigurationError::ReasonableOrderings | ConfigurationError::OptimalRequiresAdmissible
        )
    }

    /// Process exit code reported by the driver for this fault.
    pub fn exit_code(&self) -> u8 {
        if self.is_input_error() {
            EXIT_INPUT_ERROR
        } else {
            EXIT_UNSUPPORTED
        }
    }
}

/// Exit code for a bad combination of options and landmark graph.
pub const EXIT_INPUT_ERROR: u8 = 33;
/// Exit code for a task feature the requested configuration cannot handle.
pub const EXIT_UNSUPPORTED: u8 = 34;

#[derive(Debug, Error)]
pub enum HeuristicError {
    #[error("state {0} was never announced to the heuristic")]
    UntrackedState(StateId),

    #[error("LP solver failed: {0}")]
    Lp(String),
}

/// Malformed task or landmark graph descriptions.
#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("cannot read problem file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported problem file format: {0}")]
    UnsupportedFormat(String),

    #[error("unknown variable {0}")]
    UnknownVariable(String),

    #[error("unknown value {value} for variable {variable}")]
    UnknownValue { variable: String, value: String },

    #[error("fact {0} does not exist in the task")]
    UnknownFact(Fact),

    #[error("unknown operator {0}")]
    UnknownOperator(usize),

    #[error("unknown operator name {0}")]
    UnknownOperatorName(String),

    #[error("unknown landmark {0}")]
    UnknownLandmark(usize),

    #[error("landmark {0} has no facts")]
    EmptyLandmark(LandmarkId),

    #[error("simple landmark {landmark} must have exactly one fact, got {facts}")]
    SimpleLandmarkArity { landmark: LandmarkId, facts: usize },

    #[error("fact {fact} belongs to both {first} and {second}")]
    DuplicateLandmarkFact {
        fact: Fact,
        first: LandmarkId,
        second: LandmarkId,
    },

    #[error("landmark {0} is ordered before itself")]
    SelfOrdering(LandmarkId),

    #[error("initial state assigns {found} variables, task has {expected}")]
    InitialStateArity { expected: usize, found: usize },
}

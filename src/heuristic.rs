mod cache;
mod lmcount;

pub use lmcount::{validate_configuration, LandmarkCountHeuristic};

use crate::common::{OperatorId, State};
use crate::error::HeuristicError;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeuristicValue {
    Estimate(u32),
    /// The goal cannot be reached from the evaluated state.
    DeadEnd,
}

impl HeuristicValue {
    pub fn is_dead_end(&self) -> bool {
        matches!(self, HeuristicValue::DeadEnd)
    }

    pub fn estimate(&self) -> Option<u32> {
        match self {
            HeuristicValue::Estimate(h) => Some(*h),
            HeuristicValue::DeadEnd => None,
        }
    }
}

impl fmt::Display for HeuristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeuristicValue::Estimate(h) => write!(f, "{h}"),
            HeuristicValue::DeadEnd => write!(f, "dead end"),
        }
    }
}

/// Interface a search algorithm uses to drive a heuristic.
pub trait Heuristic {
    fn notify_initial_state(&mut self, initial_state: &State);

    /// Must be called for every generated edge of the search. Returns whether
    /// the estimate of `child` may have changed; any memoised value for
    /// `child` is invalidated.
    fn notify_state_transition(
        &mut self,
        parent: &State,
        op: OperatorId,
        child: &State,
    ) -> Result<bool, HeuristicError>;

    fn evaluate(&mut self, state: &State) -> Result<HeuristicValue, HeuristicError>;

    /// Preferred operators found by the last call to `evaluate`.
    fn preferred_operators(&self) -> Vec<OperatorId>;

    fn is_preferred(&self, op: OperatorId) -> bool;

    /// Whether a reported dead end may be used to prune the state for good.
    fn dead_ends_are_reliable(&self) -> bool;
}

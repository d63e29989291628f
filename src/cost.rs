mod optimal;
mod uniform;

pub use optimal::OptimalCostAssignment;
pub use uniform::UniformCostAssignment;

use crate::common::Task;
use crate::error::HeuristicError;
use crate::landmark::{LandmarkGraph, LandmarkStatus};

use serde::{Deserialize, Serialize};

/// Backend used to solve the cost-sharing LP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LpSolverKind {
    /// Pure Rust dual simplex.
    #[default]
    Minilp,
}

/// Admissible estimate obtained by sharing operator costs among the landmarks
/// that still have to be achieved.
pub trait CostAssignment {
    /// Lower bound on the cost to reach the goal given the landmark statuses of
    /// the evaluated state. Never negative.
    fn cost_sharing_h_value(
        &self,
        graph: &LandmarkGraph,
        statuses: &[LandmarkStatus],
    ) -> Result<f64, HeuristicError>;
}

pub fn create_cost_assignment(
    task: &Task,
    optimal: bool,
    use_action_landmarks: bool,
    lp_solver: LpSolverKind,
) -> Box<dyn CostAssignment> {
    if optimal {
        Box::new(OptimalCostAssignment::new(task.operator_costs(), lp_solver))
    } else {
        Box::new(UniformCostAssignment::new(
            task.operator_costs(),
            use_action_landmarks,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::common::{Effect, Fact, Operator, Task, Variable};
    use crate::landmark::{LandmarkDefinition, LandmarkGraph, LandmarkGraphBuilder};

    fn operator(name: &str, cost: u32, effects: &[Fact]) -> Operator {
        Operator {
            name: name.to_string(),
            cost,
            preconditions: vec![],
            effects: effects
                .iter()
                .map(|fact| Effect {
                    conditions: vec![],
                    fact: *fact,
                })
                .collect(),
        }
    }

    /// Landmarks `a`, `b`, `c`; `o1` achieves `a` and `b`, `o2` achieves `b` and `c`.
    pub(crate) fn overlap_problem(first_cost: u32, second_cost: u32) -> (Task, LandmarkGraph) {
        let task = Task {
            variables: ["a", "b", "c"]
                .iter()
                .map(|name| Variable {
                    name: name.to_string(),
                    values: vec!["false".to_string(), "true".to_string()],
                })
                .collect(),
            operators: vec![
                operator("o1", first_cost, &[Fact::new(0, 1), Fact::new(1, 1)]),
                operator("o2", second_cost, &[Fact::new(1, 1), Fact::new(2, 1)]),
            ],
            axioms: vec![],
            initial_values: vec![0, 0, 0],
            goals: vec![Fact::new(0, 1), Fact::new(1, 1), Fact::new(2, 1)],
        };
        let mut builder = LandmarkGraphBuilder::new();
        for var in 0..3 {
            builder.add_landmark(LandmarkDefinition::simple(Fact::new(var, 1)).goal());
        }
        let graph = builder.build(&task).unwrap();
        (task, graph)
    }
}

use super::{CostAssignment, LpSolverKind};
use crate::error::HeuristicError;
use crate::landmark::{LandmarkGraph, LandmarkStatus};

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};
use tracing::trace;

/// Optimal cost partitioning over the landmarks, computed with an LP:
///
/// maximise   sum of cost(lm)
/// subject to sum of cost(lm) over the landmarks achieved by `op` <= cost(op)
///            cost(lm) = 0 for reached landmarks, cost(lm) >= 0 otherwise.
#[derive(Debug, Clone)]
pub struct OptimalCostAssignment {
    operator_costs: Vec<u32>,
    lp_solver: LpSolverKind,
}

impl OptimalCostAssignment {
    pub fn new(operator_costs: Vec<u32>, lp_solver: LpSolverKind) -> Self {
        OptimalCostAssignment {
            operator_costs,
            lp_solver,
        }
    }

    fn solve_with_minilp(
        &self,
        graph: &LandmarkGraph,
        statuses: &[LandmarkStatus],
    ) -> Result<f64, HeuristicError> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let mut rows: Vec<Vec<Variable>> = vec![Vec::new(); self.operator_costs.len()];

        for (node, status) in graph.nodes().iter().zip(statuses.iter().copied()) {
            let achievers = node.achievers(status);
            // A landmark nobody can pay for gets no cost at all.
            let upper_bound = if status == LandmarkStatus::Reached || achievers.is_empty() {
                0.0
            } else {
                f64::INFINITY
            };
            let column = problem.add_var(1.0, (0.0, upper_bound));
            if status != LandmarkStatus::Reached {
                for op in achievers {
                    rows[op.0].push(column);
                }
            }
        }

        // Operators achieving nothing open would only add empty rows.
        let mut num_rows = 0;
        for (op, row) in rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let mut expr = LinearExpr::empty();
            for column in row {
                expr.add(*column, 1.0);
            }
            problem.add_constraint(expr, ComparisonOp::Le, f64::from(self.operator_costs[op]));
            num_rows += 1;
        }
        trace!("cost partitioning LP with {num_rows} rows");

        problem
            .solve()
            .map(|solution| solution.objective())
            .map_err(|err| HeuristicError::Lp(err.to_string()))
    }
}

impl CostAssignment for OptimalCostAssignment {
    fn cost_sharing_h_value(
        &self,
        graph: &LandmarkGraph,
        statuses: &[LandmarkStatus],
    ) -> Result<f64, HeuristicError> {
        match self.lp_solver {
            LpSolverKind::Minilp => self.solve_with_minilp(graph, statuses),
        }
    }
}

use super::CostAssignment;
use crate::error::HeuristicError;
use crate::landmark::{LandmarkGraph, LandmarkNode, LandmarkStatus};

use tracing::trace;

/// Splits the cost of every operator uniformly among the unreached landmarks
/// it achieves; each landmark then takes the cheapest share offered.
#[derive(Debug, Clone)]
pub struct UniformCostAssignment {
    operator_costs: Vec<u32>,
    use_action_landmarks: bool,
}

impl UniformCostAssignment {
    pub fn new(operator_costs: Vec<u32>, use_action_landmarks: bool) -> Self {
        UniformCostAssignment {
            operator_costs,
            use_action_landmarks,
        }
    }
}

impl CostAssignment for UniformCostAssignment {
    fn cost_sharing_h_value(
        &self,
        graph: &LandmarkGraph,
        statuses: &[LandmarkStatus],
    ) -> Result<f64, HeuristicError> {
        let mut achieved_lms_by_op = vec![0usize; self.operator_costs.len()];
        let mut action_landmarks = vec![false; self.operator_costs.len()];
        let mut h = 0.0;

        let open: Vec<(&LandmarkNode, LandmarkStatus)> = graph
            .nodes()
            .iter()
            .zip(statuses.iter().copied())
            .filter(|(_, status)| *status != LandmarkStatus::Reached)
            .collect();

        // Landmarks with a single achiever make that operator an action
        // landmark, paid for in full exactly once.
        let mut counted = Vec::with_capacity(open.len());
        for (node, status) in &open {
            let achievers = node.achievers(*status);
            if self.use_action_landmarks && achievers.len() == 1 {
                if let Some(op) = achievers.iter().next() {
                    if !action_landmarks[op.0] {
                        action_landmarks[op.0] = true;
                        h += f64::from(self.operator_costs[op.0]);
                    }
                }
                counted.push(false);
            } else {
                for op in achievers {
                    achieved_lms_by_op[op.0] += 1;
                }
                counted.push(true);
            }
        }

        // Landmarks achieved by some action landmark are already paid for.
        let mut relevant = Vec::new();
        for ((node, status), was_counted) in open.iter().zip(counted) {
            let achievers = node.achievers(*status);
            if achievers.iter().any(|op| action_landmarks[op.0]) {
                if was_counted {
                    for op in achievers {
                        achieved_lms_by_op[op.0] -= 1;
                    }
                }
            } else {
                relevant.push((*node, *status));
            }
        }

        for (node, status) in relevant {
            let min_cost = node
                .achievers(status)
                .iter()
                .map(|op| {
                    let shared_by = achieved_lms_by_op[op.0];
                    debug_assert!(shared_by >= 1);
                    f64::from(self.operator_costs[op.0]) / shared_by as f64
                })
                .fold(None, |best: Option<f64>, cost| {
                    Some(best.map_or(cost, |best| best.min(cost)))
                });
            // Landmarks without achievers (derived ones) contribute nothing.
            if let Some(min_cost) = min_cost {
                trace!("{} gets shared cost {min_cost}", node.id());
                h += min_cost;
            }
        }

        Ok(h)
    }
}

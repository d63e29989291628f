use super::cache::HeuristicCache;
use super::{Heuristic, HeuristicValue};
use crate::common::{Fact, OperatorId, State, Task};
use crate::config::HeuristicOptions;
use crate::cost::{create_cost_assignment, CostAssignment};
use crate::error::{ConfigurationError, HeuristicError};
use crate::exploration::Exploration;
use crate::landmark::{
    LandmarkGraph, LandmarkNode, LandmarkSet, LandmarkStatusManager, StatusUpdate,
};
use crate::stat::EvaluationStats;

use std::collections::BTreeSet;
use tracing::{debug, info, instrument, trace, warn};

// Absorbs floating-point noise of the cost-sharing computation before rounding up.
const EPSILON: f64 = 0.01;

/// Checks that the requested options are sound for `task` and `graph`.
pub fn validate_configuration(
    task: &Task,
    graph: &LandmarkGraph,
    options: &HeuristicOptions,
) -> Result<(), ConfigurationError> {
    if !options.admissible {
        if options.optimal {
            return Err(ConfigurationError::OptimalRequiresAdmissible);
        }
        return Ok(());
    }

    if graph.uses_reasonable_orders() {
        Err(ConfigurationError::ReasonableOrderings)
    } else if task.has_axioms() {
        Err(ConfigurationError::Axioms)
    } else if task.has_conditional_effects() && !graph.supports_conditional_effects() {
        Err(ConfigurationError::UnsupportedConditionalEffects)
    } else {
        Ok(())
    }
}

// Negative values mean the graph or the cost assignment is broken.
fn to_estimate(h: i64) -> u32 {
    assert!(h >= 0, "landmark heuristic computed negative value {h}");
    u32::try_from(h).unwrap_or_else(|_| {
        warn!("heuristic value {h} does not fit into u32, clamped to {}", u32::MAX);
        u32::MAX
    })
}

/// The landmark-count heuristic: estimates the cost of the landmarks still
/// to be achieved and, optionally, marks operators leading to new landmarks
/// as preferred.
pub struct LandmarkCountHeuristic {
    task: Task,
    graph: LandmarkGraph,
    options: HeuristicOptions,
    status_manager: LandmarkStatusManager,
    cost_assignment: Option<Box<dyn CostAssignment>>,
    exploration: Exploration,
    preferred: BTreeSet<OperatorId>,
    cache: Option<HeuristicCache>,
    stats: EvaluationStats,
}

impl LandmarkCountHeuristic {
    pub fn new(
        task: Task,
        graph: LandmarkGraph,
        options: HeuristicOptions,
    ) -> Result<Self, ConfigurationError> {
        info!("Initializing landmarks count heuristic...");
        validate_configuration(&task, &graph, &options)?;

        let cost_assignment = options.admissible.then(|| {
            create_cost_assignment(
                &task,
                options.optimal,
                options.action_landmarks,
                options.lp_solver,
            )
        });
        let status_manager = LandmarkStatusManager::new(&graph);
        let exploration = Exploration::new(&task, options.max_exploration_expansions);
        info!(
            "Landmark graph with {} landmarks and {} orderings",
            graph.number_of_landmarks(),
            graph.number_of_edges()
        );

        Ok(LandmarkCountHeuristic {
            task,
            graph,
            options,
            status_manager,
            cost_assignment,
            exploration,
            preferred: BTreeSet::new(),
            cache: options.cache_estimates.then(HeuristicCache::default),
            stats: EvaluationStats::default(),
        })
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn graph(&self) -> &LandmarkGraph {
        &self.graph
    }

    pub fn statistics(&self) -> &EvaluationStats {
        &self.stats
    }

    /// Reached landmarks of a state announced through the notifications.
    pub fn reached_landmarks(&self, state: &State) -> Result<LandmarkSet, HeuristicError> {
        self.status_manager
            .reached_landmarks(state.id())
            .map(LandmarkSet::from_reached)
    }

    fn set_preferred(&mut self, op: OperatorId) {
        self.preferred.insert(op);
    }

    #[instrument(skip_all, name = "lmcount", fields(state = %state.id()), level = "debug")]
    fn compute_heuristic(&mut self, state: &State) -> Result<HeuristicValue, HeuristicError> {
        // A goal state may still count landmarks reached out of order.
        if self.task.is_goal(state) {
            return Ok(HeuristicValue::Estimate(0));
        }

        let Some(h) = self.heuristic_value(state)? else {
            return Ok(HeuristicValue::DeadEnd);
        };

        if !self.options.preferred_operators {
            return Ok(HeuristicValue::Estimate(h));
        }

        let reached = self.reached_landmarks(state)?;
        let all_reached = reached.len() == self.graph.number_of_landmarks();
        if !all_reached && self.generate_helpful_actions(state, &reached) {
            self.stats.helpful_action_hits += 1;
            return Ok(HeuristicValue::Estimate(h));
        }

        // Otherwise prefer the operators of a relaxed plan to the next layer.
        let leaves = self.collect_landmark_leaves(&reached);
        self.stats.exploration_calls += 1;
        if !self.exploration.plan_for_disj(&leaves, state) {
            self.exploration.clear_exported();
            self.stats.exploration_failures += 1;
            return Ok(HeuristicValue::DeadEnd);
        }
        let exported = self.exploration.exported_operators().to_vec();
        self.exploration.clear_exported();
        for op in exported {
            self.set_preferred(op);
        }

        Ok(HeuristicValue::Estimate(h))
    }

    // None signals a dead end detected from the landmark statuses.
    fn heuristic_value(&mut self, state: &State) -> Result<Option<u32>, HeuristicError> {
        let StatusUpdate { statuses, dead_end } =
            self.status_manager.update_status(&self.graph, state)?;
        if dead_end {
            return Ok(None);
        }

        let h = match &self.cost_assignment {
            Some(cost_assignment) => {
                let h_val = cost_assignment.cost_sharing_h_value(&self.graph, &statuses)?;
                (h_val - EPSILON).ceil() as i64
            }
            None => {
                let costs = self.graph.count_costs(&statuses);
                trace!(
                    "total cost {}, reached cost {}, needed cost {}",
                    costs.total,
                    costs.reached,
                    costs.needed
                );
                costs.estimate()
            }
        };

        Ok(Some(to_estimate(h)))
    }

    /// Facts of the landmarks which are not reached but whose predecessors
    /// all are.
    pub fn collect_landmark_leaves(&self, reached: &LandmarkSet) -> Vec<Fact> {
        self.graph
            .nodes()
            .iter()
            .filter(|node| self.options.disjunctive_leaves || !node.disjunctive)
            .filter(|node| {
                !reached.contains(node.id()) && !self.check_node_orders_disobeyed(node, reached)
            })
            .flat_map(|node| node.facts.iter().copied())
            .collect()
    }

    /// True iff some ordering predecessor of `node` has not been reached.
    pub fn check_node_orders_disobeyed(&self, node: &LandmarkNode, reached: &LandmarkSet) -> bool {
        node.parents.keys().any(|parent| !reached.contains(*parent))
    }

    /// Marks as preferred the applicable operators that achieve an
    /// interesting landmark. Achievers of simple landmarks take priority over
    /// achievers of disjunctive ones. Returns false if there is no such
    /// operator.
    pub fn generate_helpful_actions(&mut self, state: &State, reached: &LandmarkSet) -> bool {
        let mut simple_achievers = Vec::new();
        let mut disjunctive_achievers = Vec::new();

        for op_id in self.task.applicable_operators(state) {
            for fact in self.task.operator(op_id).new_effects(state) {
                let Some(landmark) = self.graph.landmark(fact) else {
                    continue;
                };
                if self.landmark_is_interesting(state, reached, landmark) {
                    if landmark.disjunctive {
                        disjunctive_achievers.push(op_id);
                    } else {
                        simple_achievers.push(op_id);
                    }
                }
            }
        }

        if simple_achievers.is_empty() && disjunctive_achievers.is_empty() {
            return false;
        }

        let helpful = if simple_achievers.is_empty() {
            disjunctive_achievers
        } else {
            simple_achievers
        };
        debug!("helpful actions: {helpful:?}");
        for op in helpful {
            self.set_preferred(op);
        }
        true
    }

    /// A landmark is interesting if it is not reached yet and all its
    /// predecessors are. Once every landmark has been reached, only goal
    /// landmarks that do not hold any more are interesting.
    pub fn landmark_is_interesting(
        &self,
        state: &State,
        reached: &LandmarkSet,
        landmark: &LandmarkNode,
    ) -> bool {
        if reached.len() != self.graph.number_of_landmarks() {
            if reached.contains(landmark.id()) {
                return false;
            }
            return !self.check_node_orders_disobeyed(landmark, reached);
        }
        landmark.is_goal && !landmark.is_true_in_state(state)
    }
}

impl Heuristic for LandmarkCountHeuristic {
    fn notify_initial_state(&mut self, initial_state: &State) {
        self.status_manager
            .set_landmarks_for_initial_state(&self.graph, initial_state);
        if let Some(cache) = self.cache.as_mut() {
            cache.mark_dirty(initial_state.id());
        }
    }

    fn notify_state_transition(
        &mut self,
        parent: &State,
        op: OperatorId,
        child: &State,
    ) -> Result<bool, HeuristicError> {
        let changed = self
            .status_manager
            .update_reached_landmarks(&self.graph, parent, child)?;
        trace!(
            "{} --{}--> {}: reached landmarks changed: {changed}",
            parent.id(),
            op,
            child.id()
        );
        // The status also depends on the state itself, so always recompute.
        if let Some(cache) = self.cache.as_mut() {
            cache.mark_dirty(child.id());
        }
        Ok(true)
    }

    fn evaluate(&mut self, state: &State) -> Result<HeuristicValue, HeuristicError> {
        self.preferred.clear();

        if let Some(entry) = self.cache.as_ref().and_then(|cache| cache.lookup(state.id())) {
            self.stats.cache_hits += 1;
            let value = entry.value;
            self.preferred.extend(entry.preferred.iter().copied());
            return Ok(value);
        }

        self.stats.evaluations += 1;
        let value = self.compute_heuristic(state)?;
        if value.is_dead_end() {
            self.stats.dead_ends += 1;
        }
        debug!("h({}) = {value}", state.id());

        if let Some(cache) = self.cache.as_mut() {
            cache.store(state.id(), value, self.preferred.iter().copied().collect());
            trace!("{} states cached", cache.len());
        }
        Ok(value)
    }

    fn preferred_operators(&self) -> Vec<OperatorId> {
        self.preferred.iter().copied().collect()
    }

    fn is_preferred(&self, op: OperatorId) -> bool {
        self.preferred.contains(&op)
    }

    fn dead_ends_are_reliable(&self) -> bool {
        if self.options.admissible {
            return true;
        }
        !self.task.has_axioms()
            && (!self.task.has_conditional_effects() || self.graph.supports_conditional_effects())
    }
}

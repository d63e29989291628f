use crate::common::{Fact, OperatorId, State, Task};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, instrument, trace};

/// Default bound on the number of facts the exploration may settle.
pub const DEFAULT_MAX_EXPANSIONS: usize = 1_000_000;

// Operator restricted to a single effect. Axioms become unary operators
// without an owning operator and with cost zero.
#[derive(Debug, Clone)]
struct UnaryOperator {
    operator: Option<OperatorId>,
    preconditions: Vec<usize>,
    effect: usize,
    base_cost: u64,
}

#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    AnyOf(&'a [Fact]),
    AllOf(&'a [Fact]),
}

/// Relaxed forward exploration (delete relaxation, additive costs) used to
/// find operators that lead towards a set of target facts.
#[derive(Debug, Clone)]
pub struct Exploration {
    fact_offsets: Vec<usize>,
    num_facts: usize,
    unary_operators: Vec<UnaryOperator>,
    precondition_of: Vec<Vec<usize>>,
    goals: Vec<Fact>,
    max_expansions: usize,
    exported_op_ids: Vec<OperatorId>,
    // scratch, reset on every exploration
    fact_cost: Vec<Option<u64>>,
    supporter: Vec<Option<usize>>,
    unsatisfied: Vec<usize>,
    reached_cost: Vec<u64>,
}

impl Exploration {
    pub fn new(task: &Task, max_expansions: usize) -> Self {
        let mut fact_offsets = Vec::with_capacity(task.num_variables());
        let mut num_facts = 0;
        for variable in &task.variables {
            fact_offsets.push(num_facts);
            num_facts += variable.values.len();
        }
        let index = |fact: &Fact| fact_offsets[fact.var] + fact.value;

        let mut unary_operators = Vec::new();
        for (op_id, op) in task.operators.iter().enumerate() {
            for effect in &op.effects {
                let mut preconditions: Vec<usize> = op
                    .preconditions
                    .iter()
                    .chain(&effect.conditions)
                    .map(index)
                    .collect();
                preconditions.sort_unstable();
                preconditions.dedup();
                unary_operators.push(UnaryOperator {
                    operator: Some(OperatorId(op_id)),
                    preconditions,
                    effect: index(&effect.fact),
                    base_cost: u64::from(op.cost),
                });
            }
        }
        for axiom in &task.axioms {
            let mut preconditions: Vec<usize> = axiom.conditions.iter().map(index).collect();
            preconditions.sort_unstable();
            preconditions.dedup();
            unary_operators.push(UnaryOperator {
                operator: None,
                preconditions,
                effect: index(&axiom.fact),
                base_cost: 0,
            });
        }

        let mut precondition_of = vec![Vec::new(); num_facts];
        for (unary_id, unary) in unary_operators.iter().enumerate() {
            for &fact in &unary.preconditions {
                precondition_of[fact].push(unary_id);
            }
        }

        let num_unary = unary_operators.len();
        Exploration {
            fact_offsets,
            num_facts,
            unary_operators,
            precondition_of,
            goals: task.goals.clone(),
            max_expansions,
            exported_op_ids: Vec::new(),
            fact_cost: vec![None; num_facts],
            supporter: vec![None; num_facts],
            unsatisfied: vec![0; num_unary],
            reached_cost: vec![0; num_unary],
        }
    }

    /// Operators of the last relaxed plan that are applicable in the explored
    /// state, in plan order. Callers clear the list once consumed.
    pub fn exported_operators(&self) -> &[OperatorId] {
        &self.exported_op_ids
    }

    pub fn clear_exported(&mut self) {
        self.exported_op_ids.clear();
    }

    /// Plans, in the relaxation, towards the cheapest reachable fact among
    /// `targets`, or towards all task goals when `targets` is empty. Returns
    /// false when no relaxed plan exists within the expansion bound.
    #[instrument(skip_all, name = "exploration", fields(state = %state.id(), targets = targets.len()), level = "debug")]
    pub fn plan_for_disj(&mut self, targets: &[Fact], state: &State) -> bool {
        let goals = std::mem::take(&mut self.goals);
        let target = if targets.is_empty() {
            Target::AllOf(&goals)
        } else {
            Target::AnyOf(targets)
        };
        let found = self.relaxed_exploration(target, state);
        let success = match found {
            Some(chosen) => {
                self.collect_relaxed_plan(&chosen, state);
                debug!("relaxed plan exports {:?}", self.exported_op_ids);
                true
            }
            None => {
                debug!("no relaxed plan reaches the targets");
                false
            }
        };
        self.goals = goals;
        success
    }

    fn fact_index(&self, fact: Fact) -> usize {
        self.fact_offsets[fact.var] + fact.value
    }

    fn reset(&mut self) {
        self.fact_cost.iter_mut().for_each(|cost| *cost = None);
        self.supporter.iter_mut().for_each(|supporter| *supporter = None);
        for (unary_id, unary) in self.unary_operators.iter().enumerate() {
            self.unsatisfied[unary_id] = unary.preconditions.len();
            self.reached_cost[unary_id] = 0;
        }
    }

    // Additive cost propagation from the facts of `state`. Returns the target
    // facts the relaxed plan must reach, or None.
    fn relaxed_exploration(&mut self, target: Target<'_>, state: &State) -> Option<Vec<usize>> {
        self.reset();

        let mut is_target = vec![false; self.num_facts];
        let target_facts = match target {
            Target::AnyOf(facts) | Target::AllOf(facts) => facts,
        };
        for fact in target_facts {
            is_target[self.fact_index(*fact)] = true;
        }
        let mut remaining = is_target.iter().filter(|&&flag| flag).count();
        if remaining == 0 {
            return Some(Vec::new());
        }

        let mut heap = BinaryHeap::new();
        for fact in state.facts() {
            let index = self.fact_index(fact);
            self.fact_cost[index] = Some(0);
            heap.push((Reverse(0u64), index));
        }
        for unary_id in 0..self.unary_operators.len() {
            if self.unsatisfied[unary_id] == 0 {
                self.trigger(unary_id, &mut heap);
            }
        }

        let mut reached_targets = Vec::new();
        let mut expansions = 0;
        while let Some((Reverse(cost), fact)) = heap.pop() {
            if self.fact_cost[fact].map_or(true, |best| cost > best) {
                continue;
            }

            expansions += 1;
            if expansions > self.max_expansions {
                debug!("exploration stopped after {} expansions", self.max_expansions);
                return None;
            }

            if is_target[fact] {
                is_target[fact] = false;
                reached_targets.push(fact);
                remaining -= 1;
                if matches!(target, Target::AnyOf(_)) || remaining == 0 {
                    trace!("targets settled after {expansions} expansions at cost {cost}");
                    return Some(reached_targets);
                }
            }

            for position in 0..self.precondition_of[fact].len() {
                let unary_id = self.precondition_of[fact][position];
                self.unsatisfied[unary_id] -= 1;
                self.reached_cost[unary_id] += cost;
                if self.unsatisfied[unary_id] == 0 {
                    self.trigger(unary_id, &mut heap);
                }
            }
        }

        None
    }

    fn trigger(&mut self, unary_id: usize, heap: &mut BinaryHeap<(Reverse<u64>, usize)>) {
        let unary = &self.unary_operators[unary_id];
        let cost = self.reached_cost[unary_id] + unary.base_cost;
        let effect = unary.effect;
        if self.fact_cost[effect].map_or(true, |best| cost < best) {
            self.fact_cost[effect] = Some(cost);
            self.supporter[effect] = Some(unary_id);
            heap.push((Reverse(cost), effect));
        }
    }

    // Walks best supporters back from the chosen targets and exports the
    // operators whose preconditions already hold in `state`.
    fn collect_relaxed_plan(&mut self, targets: &[usize], state: &State) {
        let mut in_plan = HashSet::new();
        let mut visited = vec![false; self.num_facts];
        let mut plan = Vec::new();
        let mut stack: Vec<(usize, bool)> =
            targets.iter().rev().map(|&fact| (fact, false)).collect();

        // Post-order, so supporters of preconditions come first.
        while let Some((fact, expanded)) = stack.pop() {
            let Some(unary_id) = self.supporter[fact] else {
                continue;
            };
            if expanded {
                plan.push(unary_id);
                continue;
            }
            if visited[fact] {
                continue;
            }
            visited[fact] = true;
            stack.push((fact, true));
            for &precondition in self.unary_operators[unary_id].preconditions.iter().rev() {
                if !visited[precondition] {
                    stack.push((precondition, false));
                }
            }
        }

        let holds_in_state: HashSet<usize> =
            state.facts().map(|fact| self.fact_index(fact)).collect();
        for unary_id in plan {
            let unary = &self.unary_operators[unary_id];
            let Some(op_id) = unary.operator else {
                continue;
            };
            let applicable = unary
                .preconditions
                .iter()
                .all(|fact| holds_in_state.contains(fact));
            if applicable && in_plan.insert(op_id) {
                self.exported_op_ids.push(op_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::task::tests::lamp_task;
    use crate::common::{Axiom, Effect, Operator, StateId, Variable};
    use crate::landmark::graph::tests::chain_task;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("trace")
            .try_init();
    }

    #[test]
    fn test_plan_towards_deep_target_exports_first_step() {
        init_tracing();
        let task = chain_task();
        let mut exploration = Exploration::new(&task, DEFAULT_MAX_EXPANSIONS);
        let state = task.initial_state();

        assert!(exploration.plan_for_disj(&[Fact::new(2, 1)], &state));
        assert_eq!(exploration.exported_operators(), &[OperatorId(0)]);
        exploration.clear_exported();
        assert!(exploration.exported_operators().is_empty());
    }

    #[test]
    fn test_cheapest_target_is_chosen() {
        init_tracing();
        let task = chain_task();
        let mut exploration = Exploration::new(&task, DEFAULT_MAX_EXPANSIONS);
        let state = State::new(StateId(1), vec![1, 0, 0]);

        assert!(exploration.plan_for_disj(&[Fact::new(2, 1), Fact::new(1, 1)], &state));
        assert_eq!(exploration.exported_operators(), &[OperatorId(1)]);
    }

    #[test]
    fn test_empty_targets_plan_for_goals() {
        init_tracing();
        let task = lamp_task();
        let mut exploration = Exploration::new(&task, DEFAULT_MAX_EXPANSIONS);
        let state = task.initial_state();

        // `flip` only lights the lamp once powered, so `power-on` is the helpful step.
        assert!(exploration.plan_for_disj(&[], &state));
        assert_eq!(exploration.exported_operators(), &[OperatorId(0)]);
    }

    #[test]
    fn test_unreachable_target_fails() {
        init_tracing();
        let task = chain_task();
        let mut exploration = Exploration::new(&task, DEFAULT_MAX_EXPANSIONS);
        let state = task.initial_state();

        // Nothing ever resets `a` to false.
        let advanced = State::new(StateId(1), vec![1, 0, 0]);
        assert!(!exploration.plan_for_disj(&[Fact::new(0, 0)], &advanced));
        assert!(exploration.exported_operators().is_empty());

        // A target already true needs no operator.
        assert!(exploration.plan_for_disj(&[Fact::new(0, 0)], &state));
        assert!(exploration.exported_operators().is_empty());
    }

    #[test]
    fn test_expansion_bound() {
        init_tracing();
        let task = chain_task();
        let mut exploration = Exploration::new(&task, 2);
        let state = task.initial_state();
        assert!(!exploration.plan_for_disj(&[Fact::new(2, 1)], &state));
    }

    #[test]
    fn test_axioms_are_not_exported() {
        init_tracing();
        let boolean = |name: &str| Variable {
            name: name.to_string(),
            values: vec!["false".to_string(), "true".to_string()],
        };
        let task = Task {
            variables: vec![boolean("raw"), boolean("derived")],
            operators: vec![Operator {
                name: "make-raw".to_string(),
                cost: 1,
                preconditions: vec![],
                effects: vec![Effect {
                    conditions: vec![],
                    fact: Fact::new(0, 1),
                }],
            }],
            axioms: vec![Axiom {
                conditions: vec![Fact::new(0, 1)],
                fact: Fact::new(1, 1),
            }],
            initial_values: vec![0, 0],
            goals: vec![Fact::new(1, 1)],
        };
        let mut exploration = Exploration::new(&task, DEFAULT_MAX_EXPANSIONS);

        assert!(exploration.plan_for_disj(&[Fact::new(1, 1)], &task.initial_state()));
        assert_eq!(exploration.exported_operators(), &[OperatorId(0)]);
    }
}

use crate::common::{Fact, OperatorId, State, Task};
use crate::error::ProblemError;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LandmarkId(pub usize);

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lm#{}", self.0)
    }
}

/// Kind of an ordering `parent -> child` between two landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Necessary,
    GreedyNecessary,
    Natural,
    Reasonable,
    ObedientReasonable,
}

impl EdgeType {
    pub fn is_reasonable(self) -> bool {
        matches!(self, EdgeType::Reasonable | EdgeType::ObedientReasonable)
    }
}

/// Per-state status of a landmark, derived from the reached vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkStatus {
    NotReached,
    Reached,
    /// Reached earlier on the path but false now and required again.
    NeededAgain,
}

#[derive(Debug, Clone)]
pub struct LandmarkNode {
    id: LandmarkId,
    pub facts: Vec<Fact>,
    pub disjunctive: bool,
    pub is_goal: bool,
    pub is_derived: bool,
    pub cost: u32,
    pub parents: BTreeMap<LandmarkId, EdgeType>,
    pub children: BTreeMap<LandmarkId, EdgeType>,
    pub first_achievers: BTreeSet<OperatorId>,
    pub possible_achievers: BTreeSet<OperatorId>,
}

impl LandmarkNode {
    pub fn id(&self) -> LandmarkId {
        self.id
    }

    pub fn is_true_in_state(&self, state: &State) -> bool {
        self.facts.iter().any(|fact| state.holds(*fact))
    }

    /// Operators whose cost may be attributed to this landmark under `status`.
    pub fn achievers(&self, status: LandmarkStatus) -> &BTreeSet<OperatorId> {
        match status {
            LandmarkStatus::NeededAgain => &self.possible_achievers,
            _ => &self.first_achievers,
        }
    }
}

/// Landmarks reached in the current evaluation context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandmarkSet(HashSet<LandmarkId>);

impl LandmarkSet {
    pub fn from_reached(reached: &[bool]) -> Self {
        LandmarkSet(
            reached
                .iter()
                .enumerate()
                .filter(|(_, &is_reached)| is_reached)
                .map(|(id, _)| LandmarkId(id))
                .collect(),
        )
    }

    pub fn contains(&self, id: LandmarkId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<LandmarkId> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = LandmarkId>>(iter: I) -> Self {
        LandmarkSet(iter.into_iter().collect())
    }
}

/// Aggregated landmark costs for one status assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LandmarkCosts {
    pub total: i64,
    pub reached: i64,
    pub needed: i64,
}

impl LandmarkCosts {
    pub fn estimate(&self) -> i64 {
        self.total - self.reached + self.needed
    }
}

/// Immutable landmark graph. Nodes live in an arena indexed by `LandmarkId`.
#[derive(Debug, Clone)]
pub struct LandmarkGraph {
    nodes: Vec<LandmarkNode>,
    simple_landmarks: HashMap<Fact, LandmarkId>,
    disjunctive_landmarks: HashMap<Fact, LandmarkId>,
    reasonable_orders: bool,
    conditional_effects_supported: bool,
    landmarks_cost: i64,
}

impl LandmarkGraph {
    pub fn number_of_landmarks(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.nodes.iter().map(|node| node.children.len()).sum()
    }

    pub fn number_of_goal_landmarks(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_goal).count()
    }

    pub fn nodes(&self) -> &[LandmarkNode] {
        &self.nodes
    }

    pub fn node(&self, id: LandmarkId) -> &LandmarkNode {
        &self.nodes[id.0]
    }

    /// Landmark owning `fact`, preferring a simple landmark over a disjunctive one.
    pub fn landmark(&self, fact: Fact) -> Option<&LandmarkNode> {
        self.simple_landmarks
            .get(&fact)
            .or_else(|| self.disjunctive_landmarks.get(&fact))
            .map(|id| self.node(*id))
    }

    pub fn uses_reasonable_orders(&self) -> bool {
        self.reasonable_orders
    }

    pub fn supports_conditional_effects(&self) -> bool {
        self.conditional_effects_supported
    }

    pub fn cost_of_landmarks(&self) -> i64 {
        self.landmarks_cost
    }

    pub fn count_costs(&self, statuses: &[LandmarkStatus]) -> LandmarkCosts {
        debug_assert_eq!(statuses.len(), self.nodes.len());

        let mut costs = LandmarkCosts {
            total: self.landmarks_cost,
            ..LandmarkCosts::default()
        };
        for (node, status) in self.nodes.iter().zip(statuses) {
            let cost = i64::from(node.cost);
            match status {
                LandmarkStatus::Reached => costs.reached += cost,
                LandmarkStatus::NeededAgain => {
                    costs.reached += cost;
                    costs.needed += cost;
                }
                LandmarkStatus::NotReached => {}
            }
        }
        costs
    }
}

/// Description of one landmark handed to [`LandmarkGraphBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandmarkDefinition {
    pub facts: Vec<Fact>,
    pub disjunctive: bool,
    pub is_goal: bool,
    pub is_derived: bool,
    pub cost: Option<u32>,
    pub first_achievers: Option<Vec<OperatorId>>,
}

impl LandmarkDefinition {
    pub fn simple(fact: Fact) -> Self {
        LandmarkDefinition {
            facts: vec![fact],
            disjunctive: false,
            is_goal: false,
            is_derived: false,
            cost: None,
            first_achievers: None,
        }
    }

    pub fn disjunctive(facts: Vec<Fact>) -> Self {
        LandmarkDefinition {
            facts,
            disjunctive: true,
            is_goal: false,
            is_derived: false,
            cost: None,
            first_achievers: None,
        }
    }

    pub fn goal(mut self) -> Self {
        self.is_goal = true;
        self
    }

    pub fn derived(mut self) -> Self {
        self.is_derived = true;
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_first_achievers(mut self, achievers: Vec<OperatorId>) -> Self {
        self.first_achievers = Some(achievers);
        self
    }
}

#[derive(Debug, Default)]
pub struct LandmarkGraphBuilder {
    landmarks: Vec<LandmarkDefinition>,
    orderings: Vec<(LandmarkId, LandmarkId, EdgeType)>,
    reasonable_orders: Option<bool>,
    conditional_effects_supported: bool,
}

impl LandmarkGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_landmark(&mut self, landmark: LandmarkDefinition) -> LandmarkId {
        self.landmarks.push(landmark);
        LandmarkId(self.landmarks.len() - 1)
    }

    pub fn add_ordering(&mut self, from: LandmarkId, to: LandmarkId, edge: EdgeType) -> &mut Self {
        self.orderings.push((from, to, edge));
        self
    }

    /// Overrides the flag otherwise inferred from the edge types.
    pub fn reasonable_orders(&mut self, used: bool) -> &mut Self {
        self.reasonable_orders = Some(used);
        self
    }

    pub fn conditional_effects_supported(&mut self, supported: bool) -> &mut Self {
        self.conditional_effects_supported = supported;
        self
    }

    pub fn build(self, task: &Task) -> Result<LandmarkGraph, ProblemError> {
        let mut nodes = Vec::with_capacity(self.landmarks.len());
        let mut simple_landmarks = HashMap::new();
        let mut disjunctive_landmarks = HashMap::new();

        for (index, definition) in self.landmarks.into_iter().enumerate() {
            let id = LandmarkId(index);
            if definition.facts.is_empty() {
                return Err(ProblemError::EmptyLandmark(id));
            }
            if !definition.disjunctive && definition.facts.len() != 1 {
                return Err(ProblemError::SimpleLandmarkArity {
                    landmark: id,
                    facts: definition.facts.len(),
                });
            }

            let owners = if definition.disjunctive {
                &mut disjunctive_landmarks
            } else {
                &mut simple_landmarks
            };
            for fact in &definition.facts {
                check_fact(task, *fact)?;
                if let Some(owner) = owners.insert(*fact, id) {
                    return Err(ProblemError::DuplicateLandmarkFact {
                        fact: *fact,
                        first: owner,
                        second: id,
                    });
                }
            }

            let possible_achievers = achievers_of(task, &definition.facts);
            let first_achievers = match definition.first_achievers {
                Some(achievers) => {
                    if let Some(op) = achievers.iter().find(|op| op.0 >= task.num_operators()) {
                        return Err(ProblemError::UnknownOperator(op.0));
                    }
                    achievers.into_iter().collect()
                }
                None => possible_achievers.clone(),
            };
            let cost = definition.cost.unwrap_or_else(|| {
                first_achievers
                    .iter()
                    .map(|op| task.operator(*op).cost)
                    .min()
                    .unwrap_or(0)
            });

            nodes.push(LandmarkNode {
                id,
                facts: definition.facts,
                disjunctive: definition.disjunctive,
                is_goal: definition.is_goal,
                is_derived: definition.is_derived,
                cost,
                parents: BTreeMap::new(),
                children: BTreeMap::new(),
                first_achievers,
                possible_achievers,
            });
        }

        let mut has_reasonable_edge = false;
        for (from, to, edge) in self.orderings {
            if from.0 >= nodes.len() {
                return Err(ProblemError::UnknownLandmark(from.0));
            }
            if to.0 >= nodes.len() {
                return Err(ProblemError::UnknownLandmark(to.0));
            }
            if from == to {
                return Err(ProblemError::SelfOrdering(from));
            }
            has_reasonable_edge |= edge.is_reasonable();
            nodes[from.0].children.insert(to, edge);
            nodes[to.0].parents.insert(from, edge);
        }

        let landmarks_cost = nodes.iter().map(|node| i64::from(node.cost)).sum();
        let graph = LandmarkGraph {
            nodes,
            simple_landmarks,
            disjunctive_landmarks,
            reasonable_orders: self.reasonable_orders.unwrap_or(has_reasonable_edge),
            conditional_effects_supported: self.conditional_effects_supported,
            landmarks_cost,
        };
        debug!(
            "landmark graph: {} landmarks, {} edges, total cost {}",
            graph.number_of_landmarks(),
            graph.number_of_edges(),
            graph.landmarks_cost
        );
        Ok(graph)
    }
}

fn check_fact(task: &Task, fact: Fact) -> Result<(), ProblemError> {
    match task.variables.get(fact.var) {
        Some(variable) if fact.value < variable.values.len() => Ok(()),
        _ => Err(ProblemError::UnknownFact(fact)),
    }
}

fn achievers_of(task: &Task, facts: &[Fact]) -> BTreeSet<OperatorId> {
    task.operators
        .iter()
        .enumerate()
        .filter(|(_, op)| {
            op.effects
                .iter()
                .any(|effect| facts.contains(&effect.fact))
        })
        .map(|(id, _)| OperatorId(id))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::task::tests::lamp_task;
    use crate::common::{Effect, Operator, StateId, Variable};

    fn unit_operator(name: &str, pre: Vec<Fact>, eff: Fact) -> Operator {
        Operator {
            name: name.to_string(),
            cost: 1,
            preconditions: pre,
            effects: vec![Effect {
                conditions: vec![],
                fact: eff,
            }],
        }
    }

    /// Three boolean variables `a`, `b`, `c` which must be set in order.
    pub(crate) fn chain_task() -> Task {
        let variables = ["a", "b", "c"]
            .iter()
            .map(|name| Variable {
                name: name.to_string(),
                values: vec!["false".to_string(), "true".to_string()],
            })
            .collect();
        Task {
            variables,
            operators: vec![
                unit_operator("set-a", vec![], Fact::new(0, 1)),
                unit_operator("set-b", vec![Fact::new(0, 1)], Fact::new(1, 1)),
                unit_operator("set-c", vec![Fact::new(1, 1)], Fact::new(2, 1)),
            ],
            axioms: vec![],
            initial_values: vec![0, 0, 0],
            goals: vec![Fact::new(2, 1)],
        }
    }

    /// Landmarks a -> b -> c, each of cost one, `c` being the goal.
    pub(crate) fn chain_graph(task: &Task) -> LandmarkGraph {
        let mut builder = LandmarkGraphBuilder::new();
        let a = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        let b = builder.add_landmark(LandmarkDefinition::simple(Fact::new(1, 1)));
        let c = builder.add_landmark(LandmarkDefinition::simple(Fact::new(2, 1)).goal());
        builder
            .add_ordering(a, b, EdgeType::GreedyNecessary)
            .add_ordering(b, c, EdgeType::GreedyNecessary);
        builder.build(task).unwrap()
    }

    #[test]
    fn test_build_chain() {
        let task = chain_task();
        let graph = chain_graph(&task);

        assert_eq!(graph.number_of_landmarks(), 3);
        assert_eq!(graph.number_of_edges(), 2);
        assert_eq!(graph.number_of_goal_landmarks(), 1);
        assert_eq!(graph.cost_of_landmarks(), 3);
        assert!(!graph.uses_reasonable_orders());

        let b = graph.node(LandmarkId(1));
        assert_eq!(b.parents.keys().copied().collect::<Vec<_>>(), vec![LandmarkId(0)]);
        assert_eq!(b.children.keys().copied().collect::<Vec<_>>(), vec![LandmarkId(2)]);
        assert_eq!(
            b.first_achievers.iter().copied().collect::<Vec<_>>(),
            vec![OperatorId(1)]
        );
    }

    #[test]
    fn test_fact_lookup_prefers_simple_landmark() {
        let task = chain_task();
        let mut builder = LandmarkGraphBuilder::new();
        let disjunction = builder.add_landmark(LandmarkDefinition::disjunctive(vec![
            Fact::new(0, 1),
            Fact::new(1, 1),
        ]));
        let simple = builder.add_landmark(LandmarkDefinition::simple(Fact::new(1, 1)));
        let graph = builder.build(&task).unwrap();

        assert_eq!(graph.landmark(Fact::new(0, 1)).map(|n| n.id()), Some(disjunction));
        assert_eq!(graph.landmark(Fact::new(1, 1)).map(|n| n.id()), Some(simple));
        assert!(graph.landmark(Fact::new(2, 1)).is_none());
    }

    #[test]
    fn test_reasonable_edge_sets_flag() {
        let task = chain_task();
        let mut builder = LandmarkGraphBuilder::new();
        let a = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        let b = builder.add_landmark(LandmarkDefinition::simple(Fact::new(1, 1)));
        builder.add_ordering(a, b, EdgeType::Reasonable);
        assert!(builder.build(&task).unwrap().uses_reasonable_orders());
    }

    #[test]
    fn test_invalid_definitions() {
        let task = chain_task();

        let mut builder = LandmarkGraphBuilder::new();
        let mut broken = LandmarkDefinition::simple(Fact::new(0, 1));
        broken.facts.push(Fact::new(1, 1));
        builder.add_landmark(broken);
        assert!(matches!(
            builder.build(&task),
            Err(ProblemError::SimpleLandmarkArity { facts: 2, .. })
        ));

        let mut builder = LandmarkGraphBuilder::new();
        builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        assert!(matches!(
            builder.build(&task),
            Err(ProblemError::DuplicateLandmarkFact { .. })
        ));

        let mut builder = LandmarkGraphBuilder::new();
        builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 7)));
        assert!(matches!(builder.build(&task), Err(ProblemError::UnknownFact(_))));

        let mut builder = LandmarkGraphBuilder::new();
        let a = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        builder.add_ordering(a, LandmarkId(4), EdgeType::Natural);
        assert!(matches!(builder.build(&task), Err(ProblemError::UnknownLandmark(4))));
    }

    #[test]
    fn test_count_costs() {
        let task = chain_task();
        let graph = chain_graph(&task);

        let costs = graph.count_costs(&[
            LandmarkStatus::Reached,
            LandmarkStatus::NeededAgain,
            LandmarkStatus::NotReached,
        ]);
        assert_eq!(costs.total, 3);
        assert_eq!(costs.reached, 2);
        assert_eq!(costs.needed, 1);
        assert_eq!(costs.estimate(), 2);
    }

    #[test]
    fn test_default_cost_is_cheapest_first_achiever() {
        let task = lamp_task();
        let mut builder = LandmarkGraphBuilder::new();
        let lamp = builder.add_landmark(LandmarkDefinition::simple(Fact::new(1, 1)).goal());
        let power = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        let free = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 0)));
        let graph = builder.build(&task).unwrap();

        assert_eq!(graph.node(lamp).cost, 2);
        assert_eq!(graph.node(power).cost, 1);
        assert_eq!(graph.node(free).cost, 0);

        let state = State::new(StateId(0), vec![1, 0]);
        assert!(graph.node(power).is_true_in_state(&state));
        assert!(!graph.node(lamp).is_true_in_state(&state));
    }
}

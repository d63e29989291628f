use super::State;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single variable assignment `var = value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fact {
    pub var: usize,
    pub value: usize,
}

impl Fact {
    pub fn new(var: usize, value: usize) -> Self {
        Fact { var, value }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}={}", self.var, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId(pub usize);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub values: Vec<String>,
}

/// An effect sets `fact` whenever all of its `conditions` hold in the state
/// the operator is applied in. Unconditional effects have no conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub conditions: Vec<Fact>,
    pub fact: Fact,
}

impl Effect {
    pub fn does_fire(&self, state: &State) -> bool {
        self.conditions.iter().all(|fact| state.holds(*fact))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub name: String,
    pub cost: u32,
    pub preconditions: Vec<Fact>,
    pub effects: Vec<Effect>,
}

impl Operator {
    pub fn is_applicable(&self, state: &State) -> bool {
        self.preconditions.iter().all(|fact| state.holds(*fact))
    }

    /// Effects which fire in `state` and make their fact true for the first time.
    pub fn new_effects<'a>(&'a self, state: &'a State) -> impl Iterator<Item = Fact> + 'a {
        self.effects
            .iter()
            .filter(move |effect| effect.does_fire(state) && !state.holds(effect.fact))
            .map(|effect| effect.fact)
    }
}

/// A derived-variable rule. Axioms are not evaluated on concrete states; they
/// only matter to the relaxed exploration and to the reliability of dead ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axiom {
    pub conditions: Vec<Fact>,
    pub fact: Fact,
}

/// Grounded planning task in finite-domain representation.
#[derive(Debug, Clone)]
pub struct Task {
    pub variables: Vec<Variable>,
    pub operators: Vec<Operator>,
    pub axioms: Vec<Axiom>,
    pub initial_values: Vec<usize>,
    pub goals: Vec<Fact>,
}

impl Task {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }

    pub fn operator(&self, op_id: OperatorId) -> &Operator {
        &self.operators[op_id.0]
    }

    pub fn operator_costs(&self) -> Vec<u32> {
        self.operators.iter().map(|op| op.cost).collect()
    }

    pub fn has_axioms(&self) -> bool {
        !self.axioms.is_empty()
    }

    pub fn has_conditional_effects(&self) -> bool {
        self.operators
            .iter()
            .flat_map(|op| op.effects.iter())
            .any(|effect| !effect.conditions.is_empty())
    }

    pub fn is_goal(&self, state: &State) -> bool {
        self.goals.iter().all(|fact| state.holds(*fact))
    }

    pub fn initial_state(&self) -> State {
        State::new(super::StateId(0), self.initial_values.clone())
    }

    pub fn applicable_operators<'a>(
        &'a self,
        state: &'a State,
    ) -> impl Iterator<Item = OperatorId> + 'a {
        self.operators
            .iter()
            .enumerate()
            .filter(move |(_, op)| op.is_applicable(state))
            .map(|(id, _)| OperatorId(id))
    }

    /// Successor of `state` under `op_id`. All effects are evaluated against the
    /// predecessor, so conditional effects see the old values.
    pub fn apply(&self, op_id: OperatorId, state: &State, successor_id: super::StateId) -> State {
        let op = self.operator(op_id);
        debug_assert!(op.is_applicable(state));

        let mut values = state.values().to_vec();
        for effect in &op.effects {
            if effect.does_fire(state) {
                values[effect.fact.var] = effect.fact.value;
            }
        }
        State::new(successor_id, values)
    }

    pub fn fact_name(&self, fact: Fact) -> String {
        match self.variables.get(fact.var) {
            Some(variable) => match variable.values.get(fact.value) {
                Some(value) => format!("{}={}", variable.name, value),
                None => format!("{}={}", variable.name, fact.value),
            },
            None => fact.to_string(),
        }
    }
}

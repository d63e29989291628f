use super::Fact;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a search state, handed out by the search that owns the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    id: StateId,
    values: Vec<usize>,
}

impl State {
    pub fn new(id: StateId, values: Vec<usize>) -> Self {
        State { id, values }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn values(&self) -> &[usize] {
        &self.values
    }

    pub fn holds(&self, fact: Fact) -> bool {
        self.values.get(fact.var) == Some(&fact.value)
    }

    pub fn facts(&self) -> impl Iterator<Item = Fact> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(var, &value)| Fact::new(var, value))
    }
}

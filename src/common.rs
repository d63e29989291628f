mod state;
pub(crate) mod task;

pub use state::{State, StateId};
pub use task::{Axiom, Effect, Fact, Operator, OperatorId, Task, Variable};

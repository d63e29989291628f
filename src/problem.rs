use crate::common::{Axiom, Effect, Fact, Operator, OperatorId, Task, Variable};
use crate::error::ProblemError;
use crate::landmark::{EdgeType, LandmarkDefinition, LandmarkGraph, LandmarkGraphBuilder, LandmarkId};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// `variable = value`, both given by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactYaml {
    pub var: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableYaml {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectYaml {
    #[serde(default)]
    pub conditions: Vec<FactYaml>,
    #[serde(flatten)]
    pub fact: FactYaml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorYaml {
    pub name: String,
    #[serde(default = "unit_cost")]
    pub cost: u32,
    #[serde(default)]
    pub preconditions: Vec<FactYaml>,
    pub effects: Vec<EffectYaml>,
}

fn unit_cost() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkYaml {
    pub facts: Vec<FactYaml>,
    #[serde(default)]
    pub disjunctive: bool,
    #[serde(default)]
    pub goal: bool,
    #[serde(default)]
    pub derived: bool,
    pub cost: Option<u32>,
    /// Operator names. Defaults to every operator achieving one of the facts.
    pub first_achievers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingYaml {
    pub from: usize,
    pub to: usize,
    #[serde(rename = "type")]
    pub edge: EdgeType,
}

/// On-disk description of a task together with its landmark graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemYaml {
    pub variables: Vec<VariableYaml>,
    pub operators: Vec<OperatorYaml>,
    #[serde(default)]
    pub axioms: Vec<EffectYaml>,
    /// Value name of every variable, in declaration order.
    pub initial: Vec<String>,
    pub goals: Vec<FactYaml>,
    #[serde(default)]
    pub landmarks: Vec<LandmarkYaml>,
    #[serde(default)]
    pub orderings: Vec<OrderingYaml>,
    pub reasonable_orders: Option<bool>,
    #[serde(default)]
    pub conditional_effects_supported: bool,
}

impl ProblemYaml {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProblemError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_reader(reader)?),
            Some("json") => Ok(serde_json::from_reader(reader)?),
            _ => Err(ProblemError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ProblemError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// A task and the landmark graph computed for it.
#[derive(Debug, Clone)]
pub struct Problem {
    pub task: Task,
    pub graph: LandmarkGraph,
}

impl Problem {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProblemError> {
        let path = path.as_ref();
        let problem = Problem::try_from(ProblemYaml::from_file(path)?)?;
        info!(
            "Loaded {:?}: {} variables, {} operators, {} landmarks",
            path,
            problem.task.num_variables(),
            problem.task.num_operators(),
            problem.graph.number_of_landmarks()
        );
        Ok(problem)
    }

    pub fn into_parts(self) -> (Task, LandmarkGraph) {
        (self.task, self.graph)
    }
}

impl TryFrom<ProblemYaml> for Problem {
    type Error = ProblemError;

    fn try_from(yaml: ProblemYaml) -> Result<Self, Self::Error> {
        let variables: Vec<Variable> = yaml
            .variables
            .into_iter()
            .map(|variable| Variable {
                name: variable.name,
                values: variable.values,
            })
            .collect();

        if yaml.initial.len() != variables.len() {
            return Err(ProblemError::InitialStateArity {
                expected: variables.len(),
                found: yaml.initial.len(),
            });
        }
        let initial_values = variables
            .iter()
            .zip(&yaml.initial)
            .map(|(variable, value)| value_index(variable, value))
            .collect::<Result<Vec<_>, _>>()?;

        let operators = yaml
            .operators
            .into_iter()
            .map(|op| {
                Ok(Operator {
                    name: op.name,
                    cost: op.cost,
                    preconditions: resolve_facts(&variables, &op.preconditions)?,
                    effects: op
                        .effects
                        .iter()
                        .map(|effect| {
                            Ok(Effect {
                                conditions: resolve_facts(&variables, &effect.conditions)?,
                                fact: resolve_fact(&variables, &effect.fact)?,
                            })
                        })
                        .collect::<Result<_, ProblemError>>()?,
                })
            })
            .collect::<Result<Vec<_>, ProblemError>>()?;

        let axioms = yaml
            .axioms
            .iter()
            .map(|axiom| {
                Ok(Axiom {
                    conditions: resolve_facts(&variables, &axiom.conditions)?,
                    fact: resolve_fact(&variables, &axiom.fact)?,
                })
            })
            .collect::<Result<Vec<_>, ProblemError>>()?;

        let goals = resolve_facts(&variables, &yaml.goals)?;
        let task = Task {
            variables,
            operators,
            axioms,
            initial_values,
            goals,
        };

        let mut builder = LandmarkGraphBuilder::new();
        for landmark in &yaml.landmarks {
            let mut definition = LandmarkDefinition {
                facts: resolve_facts(&task.variables, &landmark.facts)?,
                disjunctive: landmark.disjunctive,
                is_goal: landmark.goal,
                is_derived: landmark.derived,
                cost: landmark.cost,
                first_achievers: None,
            };
            if let Some(names) = &landmark.first_achievers {
                let achievers = names
                    .iter()
                    .map(|name| operator_by_name(&task, name))
                    .collect::<Result<Vec<_>, _>>()?;
                definition = definition.with_first_achievers(achievers);
            }
            builder.add_landmark(definition);
        }
        for ordering in &yaml.orderings {
            builder.add_ordering(LandmarkId(ordering.from), LandmarkId(ordering.to), ordering.edge);
        }
        if let Some(used) = yaml.reasonable_orders {
            builder.reasonable_orders(used);
        }
        builder.conditional_effects_supported(yaml.conditional_effects_supported);

        let graph = builder.build(&task)?;
        Ok(Problem { task, graph })
    }
}

/// Looks an operator up by its name.
pub fn operator_by_name(task: &Task, name: &str) -> Result<OperatorId, ProblemError> {
    task.operators
        .iter()
        .position(|op| op.name == name)
        .map(OperatorId)
        .ok_or_else(|| ProblemError::UnknownOperatorName(name.to_string()))
}

fn value_index(variable: &Variable, value: &str) -> Result<usize, ProblemError> {
    variable
        .values
        .iter()
        .position(|candidate| candidate == value)
        .ok_or_else(|| ProblemError::UnknownValue {
            variable: variable.name.clone(),
            value: value.to_string(),
        })
}

fn resolve_fact(variables: &[Variable], fact: &FactYaml) -> Result<Fact, ProblemError> {
    let var = variables
        .iter()
        .position(|variable| variable.name == fact.var)
        .ok_or_else(|| ProblemError::UnknownVariable(fact.var.clone()))?;
    Ok(Fact::new(var, value_index(&variables[var], &fact.value)?))
}

fn resolve_facts(variables: &[Variable], facts: &[FactYaml]) -> Result<Vec<Fact>, ProblemError> {
    facts.iter().map(|fact| resolve_fact(variables, fact)).collect()
}

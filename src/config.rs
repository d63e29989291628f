use crate::cost::LpSolverKind;
use crate::exploration::DEFAULT_MAX_EXPANSIONS;

use anyhow::anyhow;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(
    name = "Rust lmcount",
    about = "Landmark-count heuristic with preferred operators.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the problem file (YAML or JSON)")]
    pub problem_path: Option<String>,

    #[arg(long, help = "Get admissible estimates (cost partitioning)", num_args = 0..=1, default_missing_value = "true")]
    pub admissible: Option<bool>,

    #[arg(long, help = "Use optimal (LP-based) cost sharing", num_args = 0..=1, default_missing_value = "true")]
    pub optimal: Option<bool>,

    #[arg(long, help = "Identify preferred operators", num_args = 0..=1, default_missing_value = "true")]
    pub preferred_operators: Option<bool>,

    #[arg(long, help = "Use action landmarks in uniform cost sharing", num_args = 0..=1, default_missing_value = "true")]
    pub action_landmarks: Option<bool>,

    #[arg(long, value_enum, help = "LP solver used for optimal cost sharing")]
    pub lp_solver: Option<LpSolverKind>,

    #[arg(long, help = "Memoise estimates per state", num_args = 0..=1, default_missing_value = "true")]
    pub cache_estimates: Option<bool>,

    #[arg(long, help = "Let the exploration also target disjunctive landmarks", num_args = 0..=1, default_missing_value = "true")]
    pub disjunctive_leaves: Option<bool>,

    #[arg(long, help = "Bound on facts settled by the relaxed exploration")]
    pub max_exploration_expansions: Option<usize>,

    #[arg(long, help = "Operator names to replay from the initial state", use_value_delimiter = true)]
    pub plan: Vec<String>,

    #[arg(long, help = "Number of random-walk steps to evaluate")]
    pub random_walk: Option<usize>,

    #[arg(long, help = "Seed for the random walk")]
    pub seed: Option<u64>,

    #[arg(long, help = "Log level when RUST_LOG is unset", default_value = "info")]
    pub log_level: String,
}

/// Options of the landmark-count heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicOptions {
    pub admissible: bool,
    pub optimal: bool,
    pub preferred_operators: bool,
    pub action_landmarks: bool,
    pub lp_solver: LpSolverKind,
    pub cache_estimates: bool,
    pub disjunctive_leaves: bool,
    pub max_exploration_expansions: usize,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        HeuristicOptions {
            admissible: false,
            optimal: false,
            preferred_operators: false,
            action_landmarks: true,
            lp_solver: LpSolverKind::default(),
            cache_estimates: true,
            disjunctive_leaves: false,
            max_exploration_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub problem_path: String,
    pub heuristic: HeuristicOptions,
    pub plan: Vec<String>,
    pub random_walk: usize,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            problem_path: "task_file/test/chain.yaml".to_string(),
            heuristic: HeuristicOptions::default(),
            plan: Vec::new(),
            random_walk: 0,
            seed: 0,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(problem_path) = &cli.problem_path {
            self.problem_path = problem_path.clone();
        }

        let options = &mut self.heuristic;
        if let Some(admissible) = cli.admissible {
            options.admissible = admissible;
        }
        if let Some(optimal) = cli.optimal {
            options.optimal = optimal;
        }
        if let Some(preferred_operators) = cli.preferred_operators {
            options.preferred_operators = preferred_operators;
        }
        if let Some(action_landmarks) = cli.action_landmarks {
            options.action_landmarks = action_landmarks;
        }
        if let Some(lp_solver) = cli.lp_solver {
            options.lp_solver = lp_solver;
        }
        if let Some(cache_estimates) = cli.cache_estimates {
            options.cache_estimates = cache_estimates;
        }
        if let Some(disjunctive_leaves) = cli.disjunctive_leaves {
            options.disjunctive_leaves = disjunctive_leaves;
        }
        if let Some(max_expansions) = cli.max_exploration_expansions {
            options.max_exploration_expansions = max_expansions;
        }

        if !cli.plan.is_empty() {
            self.plan = cli.plan.clone();
        }
        if let Some(steps) = cli.random_walk {
            self.random_walk = steps;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.heuristic.optimal && !self.heuristic.admissible {
            return Err(anyhow!(
                "optimal cost sharing only makes sense with admissible=true"
            ));
        }

        if self.heuristic.max_exploration_expansions == 0 {
            return Err(anyhow!(
                "max_exploration_expansions must be positive, got 0"
            ));
        }

        if !self.plan.is_empty() && self.random_walk > 0 {
            return Err(anyhow!(
                "replaying a plan and a random walk are mutually exclusive"
            ));
        }
        Ok(())
    }
}

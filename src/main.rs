use lmcount_rust::common::{OperatorId, State, StateId, Task};
use lmcount_rust::config::{Cli, Config};
use lmcount_rust::heuristic::{Heuristic, LandmarkCountHeuristic};
use lmcount_rust::problem::{operator_by_name, Problem};

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{error, info, warn};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let (task, graph) = Problem::from_file(&config.problem_path)
        .with_context(|| format!("error loading problem: {}", config.problem_path))?
        .into_parts();
    let mut heuristic = match LandmarkCountHeuristic::new(task, graph, config.heuristic) {
        Ok(heuristic) => heuristic,
        Err(err) => {
            error!("invalid heuristic configuration: {err}");
            return Ok(ExitCode::from(err.exit_code()));
        }
    };

    let mut state = heuristic.task().initial_state();
    heuristic.notify_initial_state(&state);
    report(&mut heuristic, &state, None)?;

    if !config.plan.is_empty() {
        for (step, name) in config.plan.iter().enumerate() {
            let op = operator_by_name(heuristic.task(), name)?;
            if !heuristic.task().operator(op).is_applicable(&state) {
                bail!("operator {name} is not applicable in step {}", step + 1);
            }
            state = transition(&mut heuristic, &state, op, step + 1)?;
            report(&mut heuristic, &state, Some(op))?;
        }
        if !heuristic.task().is_goal(&state) {
            warn!("plan does not reach the goal");
        }
    } else if config.random_walk > 0 {
        let mut rng = StdRng::seed_from_u64(config.seed);
        for step in 1..=config.random_walk {
            let applicable: Vec<OperatorId> =
                heuristic.task().applicable_operators(&state).collect();
            let Some(&op) = applicable.choose(&mut rng) else {
                info!("No applicable operator after {} steps", step - 1);
                break;
            };
            state = transition(&mut heuristic, &state, op, step)?;
            report(&mut heuristic, &state, Some(op))?;
        }
    }

    info!(
        "Dead ends are {}",
        if heuristic.dead_ends_are_reliable() {
            "reliable"
        } else {
            "unreliable"
        }
    );
    heuristic.statistics().print();

    Ok(ExitCode::SUCCESS)
}

fn transition(
    heuristic: &mut LandmarkCountHeuristic,
    parent: &State,
    op: OperatorId,
    step: usize,
) -> anyhow::Result<State> {
    let child = heuristic.task().apply(op, parent, StateId(step));
    heuristic.notify_state_transition(parent, op, &child)?;
    Ok(child)
}

fn report(
    heuristic: &mut LandmarkCountHeuristic,
    state: &State,
    op: Option<OperatorId>,
) -> anyhow::Result<()> {
    let value = heuristic.evaluate(state)?;
    let task = heuristic.task();
    let preferred: Vec<&str> = heuristic
        .preferred_operators()
        .into_iter()
        .map(|op| task.operator(op).name.as_str())
        .collect();
    info!(
        "{} {} [{}] h = {} preferred {:?}",
        state.id(),
        op.map_or("<initial>", |op| task.operator(op).name.as_str()),
        describe(task, state),
        value,
        preferred
    );
    Ok(())
}

fn describe(task: &Task, state: &State) -> String {
    state
        .facts()
        .map(|fact| task.fact_name(fact))
        .collect::<Vec<_>>()
        .join(", ")
}

use std::error::Error;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Distribution;
use crate::agents::{AgentType, Agents};
use crate::logger::{Logger, LogEvent};
use crate::simulationrun::SimulationRun;
use crate::utils;
use crate::logln;
use crate::errln;

/// Function type for scenario entry functions
pub type ScenarioFn = fn(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn Error>>;

/// Entry in the scenario catalog
#[derive(Clone)]
pub struct ScenarioEntry {
    pub short_name: &'static str,
    pub run: ScenarioFn,
}

// Create an inventory collection for scenario entries
inventory::collect!(ScenarioEntry);

/// Get all registered scenarios from the catalog
pub fn get_scenario_catalog() -> Vec<ScenarioEntry> {
    inventory::iter::<ScenarioEntry>
        .into_iter()
        .map(|entry| entry.clone())
        .collect()
}

// Scenario modules
pub mod vcg_truthful;
pub mod balanced_bidding;
pub mod reserve_price;

/// Build `num_agents` agents of one type with per-click values drawn from a log-normal distribution
/// The same iteration seed always yields the same values, so variants of a scenario face identical bidders
pub fn prepare_agents(agent_type: AgentType, num_agents: usize, value_mean: f64, value_stddev: f64, budget: f64) -> Agents {
    let mut rng = StdRng::seed_from_u64(utils::get_seed(7337));
    let value_dist = utils::lognormal_dist(value_mean, value_stddev);

    let mut agents = Agents::new();
    for i in 0..num_agents {
        let value = (value_dist.sample(&mut rng) * 100.0).round() / 100.0;
        agents.add(format!("Agent {}", i), agent_type.clone(), value, budget);
    }
    agents
}

/// Log a validation as passed or failed, collecting the message of failed ones
pub fn check(logger: &mut Logger, errors: &mut Vec<String>, passed: bool, msg: String) {
    if passed {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
        errors.push(msg);
    }
}

/// Validate the per-round invariants of a run
pub fn check_run_invariants(logger: &mut Logger, errors: &mut Vec<String>, variant: &str, simulation_run: &SimulationRun) {
    let violations = simulation_run.check_invariants();
    for violation in violations.iter().take(5) {
        errln!(logger, LogEvent::Simulation, "{}: {}", variant, violation);
    }
    check(logger, errors, violations.is_empty(),
        format!("{}: allocation and payment invariants hold in all {} rounds ({} violations)", variant, simulation_run.history.len(), violations.len()));
}

/// Turn collected validation failures into the scenario result
pub fn finish(scenario_name: &str, errors: Vec<String>) -> Result<(), Box<dyn Error>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Scenario '{}' validation failed:\n{}", scenario_name, errors.join("\n")).into())
    }
}

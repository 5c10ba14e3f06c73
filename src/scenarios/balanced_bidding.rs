/// This scenario lets balanced bidding agents play repeated rounds under VCG and under GSP.
///
/// Every agent starts at half its value and then best-responds to the previous round.
/// A third variant runs VCG with noisy log-normal clicks, so the agents forecast from click
/// counts that change every round.
///
/// It validates:
/// - Per-round allocation and payment invariants hold in every variant
/// - No agent ever bids above its value
/// - No agent ends with negative utility, since nobody pays more than they bid

use crate::agents::AgentType;
use crate::clicks::{ClickGeneratorCosine, ClickGeneratorLogNormal, ClickGeneratorTrait};
use crate::gsp::Gsp;
use crate::mechanism::MechanismTrait;
use crate::scenarios::{check, check_run_invariants, finish, prepare_agents};
use crate::simulationrun::{Marketplace, SimulationRun, SimulationStat};
use crate::vcg::Vcg;
use crate::logger::{Logger, LogEvent};
use crate::logln;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "balanced_bidding",
    run,
});

const NUM_ROUNDS: usize = 48;

/// Prepare a marketplace of balanced bidding agents under the given mechanism and click model
fn prepare_marketplace(mechanism: Box<dyn MechanismTrait>, click_generator: Box<dyn ClickGeneratorTrait>) -> Result<Marketplace, Box<dyn std::error::Error>> {
    let agents = prepare_agents(
        AgentType::BALANCED_BIDDING,
        5,     // num_agents
        10.0,  // value_mean
        4.0,   // value_stddev
        1e9,   // budget - effectively unlimited
    );
    Ok(Marketplace::new(
        agents,
        mechanism,
        click_generator,
        4,    // num_slots
        0.0,  // reserve
    )?)
}

/// Validations shared by all variants
fn validate_variant(logger: &mut Logger, errors: &mut Vec<String>, variant: &str, marketplace: &Marketplace, simulation_run: &SimulationRun, stats: &SimulationStat) {
    check_run_invariants(logger, errors, variant, simulation_run);

    let overbids = simulation_run.history.rounds().iter()
        .flat_map(|round| round.bids.iter())
        .filter(|bid| bid.amount > marketplace.agents.agents[bid.bidder_id].value() + 1e-9)
        .count();
    check(logger, errors, overbids == 0,
        format!("{}: no agent bids above its value ({} overbids)", variant, overbids));

    let worst_utility = stats.agent_stats.iter()
        .map(|agent_stat| agent_stat.utility())
        .fold(f64::INFINITY, f64::min);
    check(logger, errors, worst_utility >= -1e-6,
        format!("{}: every agent ends with non-negative utility (lowest {:.2})", variant, worst_utility));
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "=== Scenario: Balanced bidding under VCG and GSP ===");

    let marketplace_vcg = prepare_marketplace(Box::new(Vcg), Box::new(ClickGeneratorCosine::default()))?;
    let (run_vcg, stats_vcg) = marketplace_vcg.run_variant(
        "Running balanced bidding under VCG",
        scenario_name,
        "vcg",
        NUM_ROUNDS,
        logger,
    )?;

    let marketplace_gsp = prepare_marketplace(Box::new(Gsp), Box::new(ClickGeneratorCosine::default()))?;
    let (run_gsp, stats_gsp) = marketplace_gsp.run_variant(
        "Running balanced bidding under GSP",
        scenario_name,
        "gsp",
        NUM_ROUNDS,
        logger,
    )?;

    let marketplace_noisy = prepare_marketplace(Box::new(Vcg), ClickGeneratorLogNormal::new(50.0, 20.0, 0.7))?;
    let (run_noisy, stats_noisy) = marketplace_noisy.run_variant(
        "Running balanced bidding under VCG with noisy clicks",
        scenario_name,
        "vcg-noisy-clicks",
        NUM_ROUNDS,
        logger,
    )?;

    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "Revenue VCG / GSP / VCG noisy clicks: {:.2} / {:.2} / {:.2}",
        stats_vcg.overall_stat.total_revenue, stats_gsp.overall_stat.total_revenue, stats_noisy.overall_stat.total_revenue);

    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "=== Validation Results ===");
    let mut errors: Vec<String> = Vec::new();

    validate_variant(logger, &mut errors, "VCG", &marketplace_vcg, &run_vcg, &stats_vcg);
    validate_variant(logger, &mut errors, "GSP", &marketplace_gsp, &run_gsp, &stats_gsp);
    validate_variant(logger, &mut errors, "VCG noisy clicks", &marketplace_noisy, &run_noisy, &stats_noisy);

    finish(scenario_name, errors)
}

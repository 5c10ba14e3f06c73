/// This scenario runs the same truthful bidders once under VCG and once under GSP.
///
/// It validates:
/// - Per-round allocation and payment invariants hold under both mechanisms
/// - With identical truthful bids both mechanisms allocate efficiently, so welfare is the same
/// - VCG revenue never exceeds GSP revenue, round by round and in total

use crate::agents::AgentType;
use crate::clicks::ClickGeneratorCosine;
use crate::gsp::Gsp;
use crate::mechanism::MechanismTrait;
use crate::scenarios::{check, check_run_invariants, finish, prepare_agents};
use crate::simulationrun::Marketplace;
use crate::logger::{Logger, LogEvent};
use crate::logln;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "vcg_truthful",
    run,
});

const NUM_ROUNDS: usize = 48;

/// Prepare a marketplace of truthful agents under the given mechanism
fn prepare_marketplace(mechanism: Box<dyn MechanismTrait>) -> Result<Marketplace, Box<dyn std::error::Error>> {
    let agents = prepare_agents(
        AgentType::TRUTHFUL,
        6,     // num_agents
        10.0,  // value_mean
        3.0,   // value_stddev
        1e9,   // budget - effectively unlimited
    );
    Ok(Marketplace::new(
        agents,
        mechanism,
        ClickGeneratorCosine::new(
            60.0,  // top_clicks
            20.0,  // amplitude
            12.0,  // period
            0.7,   // decay
        ),
        4,    // num_slots
        0.0,  // reserve
    )?)
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "=== Scenario: Truthful bidding under VCG and GSP ===");

    let marketplace_vcg = prepare_marketplace(Box::new(crate::vcg::Vcg))?;
    let (run_vcg, stats_vcg) = marketplace_vcg.run_variant(
        "Running truthful agents under VCG",
        scenario_name,
        "vcg",
        NUM_ROUNDS,
        logger,
    )?;

    let marketplace_gsp = prepare_marketplace(Box::new(Gsp))?;
    let (run_gsp, stats_gsp) = marketplace_gsp.run_variant(
        "Running truthful agents under GSP",
        scenario_name,
        "gsp",
        NUM_ROUNDS,
        logger,
    )?;

    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "=== Validation Results ===");
    let mut errors: Vec<String> = Vec::new();

    check_run_invariants(logger, &mut errors, "VCG", &run_vcg);
    check_run_invariants(logger, &mut errors, "GSP", &run_gsp);

    let welfare_vcg = stats_vcg.overall_stat.total_welfare;
    let welfare_gsp = stats_gsp.overall_stat.total_welfare;
    check(logger, &mut errors, (welfare_vcg - welfare_gsp).abs() <= 1e-6 * welfare_gsp.max(1.0),
        format!("Truthful welfare is the same under both mechanisms: {:.2} == {:.2}", welfare_vcg, welfare_gsp));

    let rounds_vcg_above = stats_vcg.revenue_per_round.iter()
        .zip(stats_gsp.revenue_per_round.iter())
        .filter(|(vcg, gsp)| **vcg > **gsp + 1e-9)
        .count();
    check(logger, &mut errors, rounds_vcg_above == 0,
        format!("VCG revenue <= GSP revenue in every round ({} rounds above)", rounds_vcg_above));

    let revenue_vcg = stats_vcg.overall_stat.total_revenue;
    let revenue_gsp = stats_gsp.overall_stat.total_revenue;
    check(logger, &mut errors, revenue_vcg <= revenue_gsp + 1e-9,
        format!("Total VCG revenue <= total GSP revenue: {:.2} <= {:.2}", revenue_vcg, revenue_gsp));

    finish(scenario_name, errors)
}

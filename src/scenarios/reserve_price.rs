/// This scenario runs balanced bidding agents under VCG without a reserve and with a positive reserve.
///
/// It validates:
/// - Per-round invariants hold in both variants
/// - With the reserve on, every price per click is at least the reserve
/// - The reserve never increases the number of slots sold
/// - Agents whose value is below the reserve never win a slot

use crate::agents::AgentType;
use crate::clicks::ClickGeneratorFixed;
use crate::scenarios::{check, check_run_invariants, finish, prepare_agents};
use crate::simulationrun::Marketplace;
use crate::vcg::Vcg;
use crate::logger::{Logger, LogEvent};
use crate::logln;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "reserve_price",
    run,
});

const NUM_ROUNDS: usize = 48;
const RESERVE: f64 = 6.0;

/// Prepare a VCG marketplace of balanced bidding agents with the given reserve
fn prepare_marketplace(reserve: f64) -> Result<Marketplace, Box<dyn std::error::Error>> {
    let agents = prepare_agents(
        AgentType::BALANCED_BIDDING,
        6,     // num_agents
        9.0,   // value_mean
        4.0,   // value_stddev
        1e9,   // budget - effectively unlimited
    );
    Ok(Marketplace::new(
        agents,
        Box::new(Vcg),
        ClickGeneratorFixed::new(vec![60.0, 40.0, 20.0]),
        3,        // num_slots
        reserve,  // reserve
    )?)
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "=== Scenario: VCG reserve price ===");

    let marketplace_open = prepare_marketplace(0.0)?;
    let (run_open, stats_open) = marketplace_open.run_variant(
        "Running VCG without reserve",
        scenario_name,
        "no-reserve",
        NUM_ROUNDS,
        logger,
    )?;

    let marketplace_reserve = prepare_marketplace(RESERVE)?;
    let (run_reserve, stats_reserve) = marketplace_reserve.run_variant(
        &format!("Running VCG with reserve {:.2}", RESERVE),
        scenario_name,
        "reserve",
        NUM_ROUNDS,
        logger,
    )?;

    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "Revenue without / with reserve: {:.2} / {:.2}",
        stats_open.overall_stat.total_revenue, stats_reserve.overall_stat.total_revenue);

    logln!(logger, LogEvent::Scenario, "");
    logln!(logger, LogEvent::Scenario, "=== Validation Results ===");
    let mut errors: Vec<String> = Vec::new();

    check_run_invariants(logger, &mut errors, "No reserve", &run_open);
    check_run_invariants(logger, &mut errors, "Reserve", &run_reserve);

    let lowest_price = run_reserve.history.rounds().iter()
        .flat_map(|round| round.per_click_payments.iter().copied())
        .fold(f64::INFINITY, f64::min);
    check(logger, &mut errors, lowest_price >= RESERVE - 1e-9,
        format!("Every price per click respects the reserve: lowest {:.4} >= {:.2}", lowest_price, RESERVE));

    let slots_open: usize = stats_open.agent_stats.iter().map(|agent_stat| agent_stat.slots_won).sum();
    let slots_reserve: usize = stats_reserve.agent_stats.iter().map(|agent_stat| agent_stat.slots_won).sum();
    check(logger, &mut errors, slots_reserve <= slots_open,
        format!("Reserve does not increase slots sold: {} <= {}", slots_reserve, slots_open));

    let low_value_wins: usize = marketplace_reserve.agents.agents.iter()
        .filter(|agent| agent.value() < RESERVE)
        .map(|agent| stats_reserve.agent_stats[agent.agent_id()].slots_won)
        .sum();
    check(logger, &mut errors, low_value_wins == 0,
        format!("Agents valued below the reserve never win ({} wins)", low_value_wins));

    finish(scenario_name, errors)
}

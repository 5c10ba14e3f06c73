use crate::agents::AgentType;
use crate::clicks::ClickGeneratorCosine;
use crate::gsp::Gsp;
use crate::history::History;
use crate::logger::Logger;
use crate::mechanism::MechanismTrait;
use crate::scenarios::prepare_agents;
use crate::simulationrun::{Marketplace, SimulationRun, SimulationStat};
use crate::vcg::Vcg;
use plotters::prelude::*;
use std::fs;

const NUM_ROUNDS: usize = 72;

/// Run the reference balanced bidding market under one mechanism
fn run_reference(mechanism: Box<dyn MechanismTrait>) -> Result<(Marketplace, SimulationRun), Box<dyn std::error::Error>> {
    let agents = prepare_agents(AgentType::BALANCED_BIDDING, 5, 10.0, 4.0, 1e9);
    let marketplace = Marketplace::new(agents, mechanism, Box::new(ClickGeneratorCosine::default()), 4, 1.0)?;
    // Charts only need the history, so nothing is logged
    let mut logger = Logger::new();
    let simulation_run = SimulationRun::new(&marketplace, NUM_ROUNDS, &mut logger)?;
    Ok((marketplace, simulation_run))
}

/// (round, bid) points of one agent, rounds where it did not bid are skipped
fn bid_series(history: &History, agent_id: usize) -> Vec<(f64, f64)> {
    history.rounds().iter()
        .enumerate()
        .filter_map(|(t, round)| {
            round.bids.iter()
                .find(|bid| bid.bidder_id == agent_id)
                .map(|bid| (t as f64, bid.amount))
        })
        .collect()
}

/// Upper end of a chart's y axis, never an empty range
fn y_upper(values: impl Iterator<Item = f64>) -> f64 {
    let y_max = values.fold(0.0, f64::max);
    if y_max > 0.0 { y_max * 1.1 } else { 1.0 }
}

/// Main function to generate all per-round charts
pub fn generate_round_charts() -> Result<(), Box<dyn std::error::Error>> {
    // Create charts directory if it doesn't exist
    fs::create_dir_all("charts")?;

    let (marketplace_vcg, run_vcg) = run_reference(Box::new(Vcg))?;
    let (_, run_gsp) = run_reference(Box::new(Gsp))?;
    if run_vcg.history.is_empty() || run_gsp.history.is_empty() {
        return Err("Reference simulation produced no rounds".into());
    }

    let stats_vcg = SimulationStat::new(&marketplace_vcg, &run_vcg);
    let revenue_gsp: Vec<f64> = run_gsp.history.rounds().iter().map(|round| round.revenue()).collect();

    generate_revenue_chart(&stats_vcg.revenue_per_round, &revenue_gsp)?;
    generate_bids_chart(&marketplace_vcg, &run_vcg.history)?;

    Ok(())
}

/// Revenue of every round under VCG and GSP
fn generate_revenue_chart(revenue_vcg: &[f64], revenue_gsp: &[f64]) -> Result<(), Box<dyn std::error::Error>> {
    let filepath = "charts/revenue_per_round.png";
    let root = BitMapBackend::new(&filepath, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = revenue_vcg.len().max(revenue_gsp.len()).max(1) as f64;
    let y_max = y_upper(revenue_vcg.iter().chain(revenue_gsp.iter()).copied());

    let mut chart = ChartBuilder::on(&root)
        .caption("Revenue per Round (balanced bidding)", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    chart.configure_mesh()
        .x_desc("Round")
        .y_desc("Revenue")
        .draw()?;

    chart.draw_series(LineSeries::new(
        revenue_vcg.iter().enumerate().map(|(t, revenue)| (t as f64, *revenue)),
        &BLUE,
    ))?
    .label("VCG")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart.draw_series(LineSeries::new(
        revenue_gsp.iter().enumerate().map(|(t, revenue)| (t as f64, *revenue)),
        &RED,
    ))?
    .label("GSP")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("Generated: {}", filepath);
    Ok(())
}

/// Bid of every agent in every round, with each agent's value as a faint line
fn generate_bids_chart(marketplace: &Marketplace, history: &History) -> Result<(), Box<dyn std::error::Error>> {
    let filepath = "charts/bids_per_round.png";
    let root = BitMapBackend::new(&filepath, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = history.len().max(1) as f64;
    let y_max = y_upper(marketplace.agents.agents.iter().map(|agent| agent.value()));

    let mut chart = ChartBuilder::on(&root)
        .caption("Bids per Round (balanced bidding under VCG)", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    chart.configure_mesh()
        .x_desc("Round")
        .y_desc("Bid per click")
        .draw()?;

    for agent in &marketplace.agents.agents {
        let color = Palette99::pick(agent.agent_id()).to_rgba();

        chart.draw_series(LineSeries::new(bid_series(history, agent.agent_id()), &color))?
            .label(format!("{} (value {:.2})", agent.agent_name(), agent.value()))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));

        chart.draw_series(LineSeries::new(
            vec![(0.0, agent.value()), (x_max, agent.value())],
            &color.mix(0.3),
        ))?;
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("Generated: {}", filepath);
    Ok(())
}

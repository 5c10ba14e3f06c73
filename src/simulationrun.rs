/// This file contains the Marketplace and the SimulationRun, which plays a given number of auction rounds.
///
/// Every round:
/// - the click model sets the clicks of each slot
/// - every agent with budget left submits a bid, seeing only the rounds played so far
/// - the mechanism allocates the slots and prices them
/// - winners are charged price per click times the clicks of their slot
/// - the round is appended to the history, which the agents read in the next round
///
/// SimulationStat then aggregates the history into per-agent and overall statistics.

use rand::{rngs::StdRng, SeedableRng};
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use crate::agent::RoundContext;
use crate::agents::Agents;
use crate::bids::Bid;
use crate::clicks::ClickGeneratorTrait;
use crate::errors::{validate_reserve, AuctionError};
use crate::history::{History, Round};
use crate::logger::{Logger, LogEvent, FileReceiver, sanitize_filename};
use crate::mechanism::MechanismTrait;
use crate::utils::{get_seed, TOTAL_SIMULATION_RUNS, VERBOSE_AUCTION};
use crate::logln;
use crate::warnln;

/// Tolerance used when checking payments against bids and the reserve
const PRICE_TOLERANCE: f64 = 1e-9;

/// Marketplace containing agents, the auction mechanism and the click model
pub struct Marketplace {
    pub agents: Agents,
    pub mechanism: Box<dyn MechanismTrait>,
    pub click_generator: Box<dyn ClickGeneratorTrait>,
    pub num_slots: usize,
    pub reserve: f64,
}

impl Marketplace {
    /// Create a new Marketplace
    /// Fails if the reserve price is negative or not a number
    pub fn new(agents: Agents, mechanism: Box<dyn MechanismTrait>, click_generator: Box<dyn ClickGeneratorTrait>, num_slots: usize, reserve: f64) -> Result<Self, AuctionError> {
        validate_reserve(reserve)?;
        Ok(Self {
            agents,
            mechanism,
            click_generator,
            num_slots,
            reserve,
        })
    }

    /// Print initialization information about the marketplace
    pub fn printout(&self, logger: &mut Logger) {
        logln!(logger, LogEvent::Simulation, "Mechanism: {}", self.mechanism.get_mechanism_type());
        logln!(logger, LogEvent::Simulation, "Slots: {}, reserve: {:.2}", self.num_slots, self.reserve);
        logln!(logger, LogEvent::Simulation, "Clicks: {}", self.click_generator.get_click_model_type());
        if self.agents.is_empty() {
            warnln!(logger, LogEvent::Simulation, "Marketplace has no agents, every round will be empty");
        } else {
            logln!(logger, LogEvent::Simulation, "Initialized {} agents", self.agents.len());
        }
    }

    /// Run one simulation variant with logging setup and cleanup
    ///
    /// # Arguments
    /// * `variant_description` - Description of the variant being run
    /// * `scenario_name` - Name of the scenario (for log file paths)
    /// * `variant_name` - Name of the variant (for log file paths)
    /// * `num_rounds` - Number of auction rounds to play
    /// * `logger` - Logger for event-based logging
    ///
    /// # Returns
    /// The simulation run together with its statistics
    pub fn run_variant(
        &self,
        variant_description: &str,
        scenario_name: &str,
        variant_name: &str,
        num_rounds: usize,
        logger: &mut Logger,
    ) -> Result<(SimulationRun, SimulationStat), Box<dyn Error>> {
        let scenario_dir = sanitize_filename(scenario_name);
        let variant_file = sanitize_filename(variant_name);

        let rounds_receiver_id = logger.add_receiver(FileReceiver::new(&PathBuf::from(format!("log/{}/rounds-{}.log", scenario_dir, variant_file)), vec![LogEvent::Round, LogEvent::Simulation])?);
        let variant_receiver_id = logger.add_receiver(FileReceiver::new(&PathBuf::from(format!("log/{}/variant-{}.log", scenario_dir, variant_file)), vec![LogEvent::Variant])?);
        let auctions_receiver_id = if VERBOSE_AUCTION.load(Ordering::Relaxed) {
            let receiver_id = logger.add_receiver(FileReceiver::new(&PathBuf::from(format!("log/{}/auctions-{}.csv", scenario_dir, variant_file)), vec![LogEvent::Auction])?);
            logln!(logger, LogEvent::Auction, "round,reserve,clicks,bids,allocation,per_click_payments");
            Some(receiver_id)
        } else {
            None
        };

        logln!(logger, LogEvent::Variant, "\n=== {} ===", variant_description);
        self.printout(logger);

        let result = SimulationRun::new(self, num_rounds, logger);

        if let Some(id) = auctions_receiver_id {
            logger.remove_receiver(id);
        }

        let outcome = match result {
            Ok(simulation_run) => {
                let stats = SimulationStat::new(self, &simulation_run);
                stats.printout(&self.agents, logger);
                Ok((simulation_run, stats))
            }
            Err(e) => Err(e.into()),
        };

        logger.remove_receiver(variant_receiver_id);
        logger.remove_receiver(rounds_receiver_id);
        outcome
    }
}

/// Result of playing all rounds of one simulation
pub struct SimulationRun {
    pub history: History,
    /// Round in which each agent first sat out because its budget was spent
    pub budget_exhausted_round: Vec<Option<usize>>,
}

impl SimulationRun {
    /// Play `num_rounds` rounds on the marketplace
    /// Any error from an agent or from the mechanism stops the run and is returned to the caller
    pub fn new(marketplace: &Marketplace, num_rounds: usize, logger: &mut Logger) -> Result<Self, AuctionError> {
        let num_agents = marketplace.agents.len();
        let reserve = marketplace.reserve;

        // Use deterministic seeds for reproducible results
        let mut rng_ties = StdRng::seed_from_u64(get_seed(5115));
        let mut rng_clicks = StdRng::seed_from_u64(get_seed(6226));

        let mut history = History::new();
        let mut spent = vec![0.0; num_agents];
        let mut budget_exhausted_round: Vec<Option<usize>> = vec![None; num_agents];

        for t in 0..num_rounds {
            let clicks = marketplace.click_generator.generate_clicks(t, marketplace.num_slots, &mut rng_clicks);

            let mut bids = Vec::with_capacity(num_agents);
            let context = RoundContext::new(t, &history, reserve, marketplace.mechanism.as_ref());
            for agent in &marketplace.agents.agents {
                let agent_id = agent.agent_id();
                if spent[agent_id] >= agent.budget() {
                    if budget_exhausted_round[agent_id].is_none() {
                        budget_exhausted_round[agent_id] = Some(t);
                        warnln!(logger, LogEvent::Round, "Round {}: agent {} ({}) spent {:.2} of budget {:.2}, no longer bidding", t, agent_id, agent.agent_name(), spent[agent_id], agent.budget());
                    }
                    continue;
                }

                let amount = if t == 0 {
                    agent.initial_bid(reserve)
                } else {
                    agent.bid(&context)?
                };
                if !amount.is_finite() || amount < 0.0 {
                    return Err(AuctionError::InvalidInput(format!("agent {} ({}) bid {} in round {}", agent_id, agent.agent_name(), amount, t)));
                }
                bids.push(Bid::new(agent_id, amount));
            }

            let outcome = marketplace.mechanism.compute(&clicks, reserve, &bids, &mut rng_ties)?;
            if outcome.is_empty() {
                logln!(logger, LogEvent::Round, "Round {}: no bid cleared the reserve {:.2}", t, reserve);
            }

            for (slot, (winner, price)) in outcome.allocation.iter().zip(outcome.per_click_payments.iter()).enumerate() {
                spent[*winner] += price * clicks[slot];
            }

            let round = Round {
                bids,
                clicks,
                reserve,
                allocation: outcome.allocation,
                per_click_payments: outcome.per_click_payments,
            };
            log_round(t, &round, logger);
            history.push(round);
        }

        TOTAL_SIMULATION_RUNS.fetch_add(1, Ordering::Relaxed);

        Ok(Self {
            history,
            budget_exhausted_round,
        })
    }

    /// Check the per-round properties every mechanism here must satisfy
    /// Returns one message per violation, empty when everything holds
    ///
    /// - allocation and payments have the same length
    /// - allocation size is min(bids clearing the reserve, slots)
    /// - every price per click is between the reserve and the winner's own bid
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (t, round) in self.history.rounds().iter().enumerate() {
            if round.allocation.len() != round.per_click_payments.len() {
                violations.push(format!("round {}: {} winners but {} payments", t, round.allocation.len(), round.per_click_payments.len()));
                continue;
            }

            let clearing = round.bids.iter().filter(|bid| bid.amount >= round.reserve).count();
            let expected = clearing.min(round.clicks.len());
            if round.allocation.len() != expected {
                violations.push(format!("round {}: {} winners, expected {}", t, round.allocation.len(), expected));
            }

            for (slot, (winner, price)) in round.allocation.iter().zip(round.per_click_payments.iter()).enumerate() {
                let own_bid = round.bids.iter()
                    .find(|bid| bid.bidder_id == *winner)
                    .map(|bid| bid.amount)
                    .unwrap_or(f64::NAN);
                if !(*price >= round.reserve - PRICE_TOLERANCE) {
                    violations.push(format!("round {} slot {}: price {:.4} below reserve {:.4}", t, slot, price, round.reserve));
                }
                if !(*price <= own_bid + PRICE_TOLERANCE) {
                    violations.push(format!("round {} slot {}: agent {} pays {:.4} above its bid {:.4}", t, slot, winner, price, own_bid));
                }
            }
        }
        violations
    }
}

/// Log a round summary, and the full round as CSV when auction logging is on
fn log_round(t: usize, round: &Round, logger: &mut Logger) {
    let winners: Vec<String> = round.allocation.iter()
        .zip(round.per_click_payments.iter())
        .map(|(winner, price)| format!("{}@{:.2}", winner, price))
        .collect();
    logln!(logger, LogEvent::Round, "Round {}: {} bids, winners [{}], revenue {:.2}", t, round.bids.len(), winners.join(", "), round.revenue());

    if VERBOSE_AUCTION.load(Ordering::Relaxed) {
        let join = |values: Vec<String>| values.join(";");
        let csv_fields = vec![
            format!("{}", t),
            format!("{:.4}", round.reserve),
            join(round.clicks.iter().map(|c| format!("{:.1}", c)).collect()),
            join(round.bids.iter().map(|b| format!("{}:{:.4}", b.bidder_id, b.amount)).collect()),
            join(round.allocation.iter().map(|id| id.to_string()).collect()),
            join(round.per_click_payments.iter().map(|p| format!("{:.4}", p)).collect()),
        ];
        logln!(logger, LogEvent::Auction, "{}", csv_fields.join(","));
    }
}

/// Statistics for a single agent over all rounds
#[derive(Debug, Clone, Default)]
pub struct AgentStat {
    pub slots_won: usize,
    pub clicks_obtained: f64,
    pub total_spend: f64,
    pub total_value: f64,
    pub top_slot_wins: usize,
    /// Round in which the agent stopped bidding because its budget was spent
    pub budget_exhausted_round: Option<usize>,
}

impl AgentStat {
    pub fn utility(&self) -> f64 {
        self.total_value - self.total_spend
    }
}

/// Overall statistics for the simulation
#[derive(Debug, Clone, Default)]
pub struct OverallStat {
    pub total_revenue: f64,
    pub total_welfare: f64,
    pub empty_rounds: usize,
}

/// Complete simulation statistics
pub struct SimulationStat {
    pub agent_stats: Vec<AgentStat>,
    pub overall_stat: OverallStat,
    pub revenue_per_round: Vec<f64>,
}

impl SimulationStat {
    /// Aggregate statistics from a finished simulation run
    pub fn new(marketplace: &Marketplace, simulation_run: &SimulationRun) -> Self {
        let mut agent_stats: Vec<AgentStat> = vec![AgentStat::default(); marketplace.agents.len()];
        for (agent_stat, exhausted) in agent_stats.iter_mut().zip(simulation_run.budget_exhausted_round.iter()) {
            agent_stat.budget_exhausted_round = *exhausted;
        }
        let mut overall_stat = OverallStat::default();
        let mut revenue_per_round = Vec::with_capacity(simulation_run.history.len());

        for round in simulation_run.history.rounds() {
            if round.allocation.is_empty() {
                overall_stat.empty_rounds += 1;
            }
            for (slot, (winner, price)) in round.allocation.iter().zip(round.per_click_payments.iter()).enumerate() {
                let clicks = round.clicks[slot];
                let value = marketplace.agents.agents[*winner].value() * clicks;

                let agent_stat = &mut agent_stats[*winner];
                agent_stat.slots_won += 1;
                if slot == 0 {
                    agent_stat.top_slot_wins += 1;
                }
                agent_stat.clicks_obtained += clicks;
                agent_stat.total_spend += price * clicks;
                agent_stat.total_value += value;

                overall_stat.total_welfare += value;
            }
            let revenue = round.revenue();
            overall_stat.total_revenue += revenue;
            revenue_per_round.push(revenue);
        }

        Self {
            agent_stats,
            overall_stat,
            revenue_per_round,
        }
    }

    /// Output agent statistics
    pub fn printout_agents(&self, agents: &Agents, logger: &mut Logger, event: LogEvent) {
        for (index, agent_stat) in self.agent_stats.iter().enumerate() {
            let agent = &agents.agents[index];
            logln!(logger, event, "\nAgent {} ({}) - {} (value {:.2}, budget {:.2})",
                     agent.agent_id(), agent.agent_name(), agent.get_strategy_type(), agent.value(), agent.budget());
            logln!(logger, event, "  Slots won (all/top): {} / {}", agent_stat.slots_won, agent_stat.top_slot_wins);
            logln!(logger, event, "  Clicks: {:.0}", agent_stat.clicks_obtained);
            logln!(logger, event, "  Spend / value / utility: {:.2} / {:.2} / {:.2}",
                     agent_stat.total_spend, agent_stat.total_value, agent_stat.utility());
            if let Some(t) = agent_stat.budget_exhausted_round {
                logln!(logger, event, "  Budget spent, stopped bidding in round {}", t);
            }
        }
    }

    /// Output only overall statistics
    pub fn printout_overall(&self, logger: &mut Logger) {
        logln!(logger, LogEvent::Variant, "\n=== Overall Statistics ===");
        logln!(logger, LogEvent::Variant, "Rounds (all/empty): {} / {}", self.revenue_per_round.len(), self.overall_stat.empty_rounds);
        logln!(logger, LogEvent::Variant, "Total revenue: {:.2}", self.overall_stat.total_revenue);
        let revenue_share = if self.overall_stat.total_welfare > 0.0 {
            self.overall_stat.total_revenue / self.overall_stat.total_welfare
        } else {
            0.0
        };
        logln!(logger, LogEvent::Variant, "Total welfare: {:.2} (revenue share: {:.4})", self.overall_stat.total_welfare, revenue_share);
    }

    /// Output complete statistics
    pub fn printout(&self, agents: &Agents, logger: &mut Logger) {
        logln!(logger, LogEvent::Variant, "\n=== Agent Statistics ===");
        self.printout_agents(agents, logger, LogEvent::Variant);
        self.printout_overall(logger);
    }
}

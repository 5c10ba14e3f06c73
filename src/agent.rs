use crate::errors::AuctionError;
use crate::history::{History, Round};
use crate::mechanism::MechanismTrait;

/// Everything an agent may look at when deciding its bid for round `t`
/// Only rounds before `t` are visible through `history`
/// `mechanism` is the one running the auction, agents query it for slot price ranges
pub struct RoundContext<'a> {
    pub t: usize,
    pub history: &'a History,
    pub reserve: f64,
    pub mechanism: &'a dyn MechanismTrait,
}

impl<'a> RoundContext<'a> {
    pub fn new(t: usize, history: &'a History, reserve: f64, mechanism: &'a dyn MechanismTrait) -> Self {
        Self { t, history, reserve, mechanism }
    }

    /// The round just before `t`
    /// Panics at t == 0 or when the round was not recorded, since bid() is never called for round 0
    pub fn previous_round(&self) -> &'a Round {
        if self.t == 0 {
            panic!("Round context for t = 0 has no previous round, use initial_bid instead");
        }
        self.history.round(self.t - 1)
    }
}

/// Trait for agents bidding in repeated slot auctions
pub trait AgentTrait {
    /// Get the agent ID
    fn agent_id(&self) -> usize;

    /// Get the agent name
    fn agent_name(&self) -> &str;

    /// Private value per click
    fn value(&self) -> f64;

    /// Total amount the agent is willing to spend over the whole simulation
    fn budget(&self) -> f64;

    /// Bid for round 0, when there is no history yet
    fn initial_bid(&self, reserve: f64) -> f64;

    /// Bid for round `context.t` (t >= 1), decided from previous rounds only
    fn bid(&self, context: &RoundContext) -> Result<f64, AuctionError>;

    /// Get a string representation of the bidding strategy
    fn get_strategy_type(&self) -> String;
}

/// Agent that always bids its value
pub struct AgentTruthful {
    pub agent_id: usize,
    pub agent_name: String,
    pub value: f64,
    pub budget: f64,
}

impl AgentTrait for AgentTruthful {
    fn agent_id(&self) -> usize { self.agent_id }
    fn agent_name(&self) -> &str { &self.agent_name }
    fn value(&self) -> f64 { self.value }
    fn budget(&self) -> f64 { self.budget }

    fn initial_bid(&self, _reserve: f64) -> f64 {
        self.value
    }

    fn bid(&self, _context: &RoundContext) -> Result<f64, AuctionError> {
        Ok(self.value)
    }

    fn get_strategy_type(&self) -> String {
        "Truthful".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bids::Bid;
    use crate::gsp::Gsp;

    #[test]
    fn test_truthful_bids_value() {
        let agent = AgentTruthful { agent_id: 0, agent_name: "T".to_string(), value: 42.0, budget: 100.0 };
        let mut history = History::new();
        history.push(Round {
            bids: vec![Bid::new(0, 42.0)],
            clicks: vec![10.0],
            reserve: 0.0,
            allocation: vec![0],
            per_click_payments: vec![0.0],
        });
        assert_eq!(agent.initial_bid(50.0), 42.0);
        assert_eq!(agent.bid(&RoundContext::new(1, &history, 0.0, &Gsp)), Ok(42.0));
    }

    #[test]
    #[should_panic(expected = "no previous round")]
    fn test_previous_round_at_zero_panics() {
        let history = History::new();
        RoundContext::new(0, &history, 0.0, &Gsp).previous_round();
    }

    #[test]
    #[should_panic(expected = "Round 1 is not available in history")]
    fn test_previous_round_missing_panics() {
        let history = History::new();
        RoundContext::new(2, &history, 0.0, &Gsp).previous_round();
    }
}

use crate::bids::Bid;
use crate::errors::AuctionError;

/// Record of one completed round
/// Created once after allocation and never changed afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub bids: Vec<Bid>,
    pub clicks: Vec<f64>,
    pub reserve: f64,
    pub allocation: Vec<usize>,
    pub per_click_payments: Vec<f64>,
}

impl Round {
    /// Total amount collected by the mechanism in this round
    pub fn revenue(&self) -> f64 {
        self.per_click_payments.iter()
            .zip(self.clicks.iter())
            .map(|(price, clicks)| price * clicks)
            .sum()
    }
}

/// Append-only log of rounds, indexed by round number
#[derive(Debug, Clone, Default)]
pub struct History {
    rounds: Vec<Round>,
}

impl History {
    pub fn new() -> Self {
        Self { rounds: Vec::new() }
    }

    /// Get round `t`
    /// Panics when the round has not been recorded: asking for the future is a caller bug
    pub fn round(&self, t: usize) -> &Round {
        match self.rounds.get(t) {
            Some(round) => round,
            None => panic!("{}", AuctionError::HistoryUnavailable { round: t }),
        }
    }

    /// Append the next round and return its index
    pub fn push(&mut self, round: Round) -> usize {
        self.rounds.push(round);
        self.rounds.len() - 1
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }
}

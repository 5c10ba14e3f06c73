use crate::bids::{sort_descending, validate_bids, Bid};
use crate::errors::{validate_clicks, validate_reserve, AuctionError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Result of running a mechanism for one round
/// `allocation[k]` is the bidder placed in slot k and `per_click_payments[k]` its price per click
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionOutcome {
    pub allocation: Vec<usize>,
    pub per_click_payments: Vec<f64>,
}

impl AuctionOutcome {
    /// No bid cleared the reserve
    pub fn empty() -> Self {
        Self {
            allocation: Vec::new(),
            per_click_payments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allocation.is_empty()
    }
}

/// Trait for slot auction mechanisms
pub trait MechanismTrait {
    /// Allocate slots and compute per-click payments
    ///
    /// # Arguments
    /// * `slot_clicks` - Click count for each slot, top slot first
    /// * `reserve` - Bids strictly below the reserve are ignored
    /// * `bids` - All bids of the round, in any order
    /// * `rng` - Random source used only to break exact ties
    fn compute(&self, slot_clicks: &[f64], reserve: f64, bids: &[Bid], rng: &mut StdRng) -> Result<AuctionOutcome, AuctionError>;

    /// Range of bids that lands a bidder in `slot` given the other bids
    /// Returns (min_bid, max_bid) where max_bid is None for the top slot
    fn bid_range_for_slot(&self, slot: usize, slot_clicks: &[f64], reserve: f64, other_bids: &[Bid]) -> (f64, Option<f64>);

    /// Get a string representation of the mechanism
    fn get_mechanism_type(&self) -> String;
}

/// Bids that clear the reserve, in slot order
/// Holds both the winners and the valid bids ranked below the last slot
pub struct RankedBids {
    pub valid: Vec<Bid>,
    pub num_allocated: usize,
}

impl RankedBids {
    pub fn allocated(&self) -> &[Bid] {
        &self.valid[..self.num_allocated]
    }
}

/// Validate inputs and rank the bids that clear the reserve
/// Valid bids are shuffled before the stable sort so that exact ties are broken uniformly at random
/// while bids with different amounts always keep their descending order
pub fn rank_valid_bids(slot_clicks: &[f64], reserve: f64, bids: &[Bid], rng: &mut StdRng) -> Result<RankedBids, AuctionError> {
    validate_reserve(reserve)?;
    validate_clicks(slot_clicks)?;
    validate_bids(bids)?;

    let mut valid: Vec<Bid> = bids.iter().filter(|bid| bid.amount >= reserve).copied().collect();
    valid.shuffle(rng);
    sort_descending(&mut valid);

    let num_allocated = valid.len().min(slot_clicks.len());
    Ok(RankedBids { valid, num_allocated })
}

use crate::errors::AuctionError;
use std::collections::HashSet;

/// A single bid submitted for one round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid {
    pub bidder_id: usize,
    pub amount: f64,
}

impl Bid {
    pub fn new(bidder_id: usize, amount: f64) -> Self {
        Self { bidder_id, amount }
    }
}

/// Reject negative or non-finite amounts and repeated bidder ids
pub fn validate_bids(bids: &[Bid]) -> Result<(), AuctionError> {
    let mut seen = HashSet::with_capacity(bids.len());
    for bid in bids {
        if !bid.amount.is_finite() || bid.amount < 0.0 {
            return Err(AuctionError::InvalidInput(format!("bidder {} submitted invalid amount {}", bid.bidder_id, bid.amount)));
        }
        if !seen.insert(bid.bidder_id) {
            return Err(AuctionError::InvalidInput(format!("bidder {} submitted more than one bid", bid.bidder_id)));
        }
    }
    Ok(())
}

/// Sort bids from highest to lowest amount
/// The sort is stable, so bids with equal amounts keep their relative order
pub fn sort_descending(bids: &mut [Bid]) {
    bids.sort_by(|a, b| b.amount.total_cmp(&a.amount));
}

/// Snapshot of every bid except the one from `bidder_id`
pub fn bids_excluding(bids: &[Bid], bidder_id: usize) -> Vec<Bid> {
    bids.iter().filter(|bid| bid.bidder_id != bidder_id).copied().collect()
}

use crate::bids::{sort_descending, Bid};
use crate::errors::AuctionError;
use crate::mechanism::{rank_valid_bids, AuctionOutcome, MechanismTrait};
use rand::rngs::StdRng;

/// Generalized second price: each winner pays the next valid bid below it, floored at the reserve
pub struct Gsp;

impl MechanismTrait for Gsp {
    fn compute(&self, slot_clicks: &[f64], reserve: f64, bids: &[Bid], rng: &mut StdRng) -> Result<AuctionOutcome, AuctionError> {
        let ranked = rank_valid_bids(slot_clicks, reserve, bids, rng)?;
        if ranked.num_allocated == 0 {
            return Ok(AuctionOutcome::empty());
        }

        let allocation = ranked.allocated().iter().map(|bid| bid.bidder_id).collect();
        let per_click_payments = (0..ranked.num_allocated)
            .map(|k| match ranked.valid.get(k + 1) {
                Some(next) => next.amount.max(reserve),
                None => reserve,
            })
            .collect();

        Ok(AuctionOutcome { allocation, per_click_payments })
    }

    fn bid_range_for_slot(&self, slot: usize, slot_clicks: &[f64], reserve: f64, other_bids: &[Bid]) -> (f64, Option<f64>) {
        bid_range_for_slot(slot, slot_clicks, reserve, other_bids)
    }

    fn get_mechanism_type(&self) -> String {
        "GSP".to_string()
    }
}

/// Range of bids that puts a bidder into `slot`, assuming the other bids stay as given
///
/// `min_bid` ties the `slot`-th highest other bid, `max_bid` ties the bid one rank above.
/// When there are not enough other bids the missing prices fall back to the reserve.
/// The top slot has no upper bound, so its `max_bid` is None.
/// Bid ranges do not depend on clicks; `_slot_clicks` keeps the signature shared with the mechanisms.
pub fn bid_range_for_slot(slot: usize, _slot_clicks: &[f64], reserve: f64, other_bids: &[Bid]) -> (f64, Option<f64>) {
    let mut sorted = other_bids.to_vec();
    sort_descending(&mut sorted);

    let tie_price = |rank: usize| -> f64 {
        match sorted.get(rank) {
            Some(bid) => bid.amount.max(reserve),
            None => reserve,
        }
    };

    let min_bid = tie_price(slot);
    let max_bid = if slot == 0 { None } else { Some(tie_price(slot - 1)) };
    (min_bid, max_bid)
}

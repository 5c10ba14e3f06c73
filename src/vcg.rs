/// Vickrey-Clarke-Groves payments for slot auctions.
///
/// The allocation is the same as in GSP: bids that clear the reserve are ranked from highest to
/// lowest and the top ones take the slots. Each winner is then charged the externality it imposes
/// on the others: how much more value the other bidders would obtain if it were absent.
///
/// When the winner at rank k leaves, everyone ranked below moves up a slot and the best bidder
/// that did not win anything fills the last slot. Social value is always counted with every bid
/// floored at the reserve, so the counterfactual replacement is never cheaper than the reserve.

use crate::bids::Bid;
use crate::errors::AuctionError;
use crate::gsp;
use crate::mechanism::{rank_valid_bids, AuctionOutcome, MechanismTrait};
use rand::rngs::StdRng;

pub struct Vcg;

impl MechanismTrait for Vcg {
    fn compute(&self, slot_clicks: &[f64], reserve: f64, bids: &[Bid], rng: &mut StdRng) -> Result<AuctionOutcome, AuctionError> {
        let ranked = rank_valid_bids(slot_clicks, reserve, bids, rng)?;
        if ranked.num_allocated == 0 {
            return Ok(AuctionOutcome::empty());
        }

        let allocated = ranked.allocated();
        let replacement = replacement_bid(allocated, bids, reserve);

        let mut per_click_payments = Vec::with_capacity(allocated.len());
        for k in 0..allocated.len() {
            let clicks = slot_clicks[k];
            if clicks == 0.0 {
                return Err(AuctionError::ArithmeticDegeneracy {
                    slot: k,
                    reason: "allocated slot has zero clicks, per-click payment is undefined".to_string(),
                });
            }
            per_click_payments.push(total_payment(k, allocated, replacement, slot_clicks, reserve) / clicks);
        }

        Ok(AuctionOutcome {
            allocation: allocated.iter().map(|bid| bid.bidder_id).collect(),
            per_click_payments,
        })
    }

    fn bid_range_for_slot(&self, slot: usize, slot_clicks: &[f64], reserve: f64, other_bids: &[Bid]) -> (f64, Option<f64>) {
        // Bid ranges are the same for GSP and VCG
        gsp::bid_range_for_slot(slot, slot_clicks, reserve, other_bids)
    }

    fn get_mechanism_type(&self) -> String {
        "VCG".to_string()
    }
}

/// Highest bid in the whole pool from a bidder that won no slot, floored at the reserve
/// Includes bids that did not clear the reserve. Falls back to the reserve when every bidder won a slot.
fn replacement_bid(allocated: &[Bid], bids: &[Bid], reserve: f64) -> f64 {
    bids.iter()
        .filter(|bid| !allocated.iter().any(|winner| winner.bidder_id == bid.bidder_id))
        .map(|bid| bid.amount)
        .fold(None, |best: Option<f64>, amount| Some(best.map_or(amount, |b| b.max(amount))))
        .map_or(reserve, |amount| amount.max(reserve))
}

/// Total (not per-click) payment of the winner at rank `k`
///
/// With weakly decreasing clicks the externality is never negative. When a lower slot gets more
/// clicks than the one above, moving everyone up can lower the others' value and the raw
/// difference turns negative. Such a winner pays 0: payments stay non-negative and the winner is
/// never paid for taking its slot.
fn total_payment(k: usize, allocated: &[Bid], replacement: f64, slot_clicks: &[f64], reserve: f64) -> f64 {
    // Others shift up one slot and the replacement takes the last one
    let mut without_k: Vec<f64> = allocated.iter()
        .enumerate()
        .filter(|(i, _)| *i != k)
        .map(|(_, bid)| bid.amount.max(reserve))
        .collect();
    without_k.push(replacement);

    let value_without_k: f64 = without_k.iter()
        .zip(slot_clicks.iter())
        .map(|(amount, clicks)| amount * clicks)
        .sum();

    let value_of_others_with_k: f64 = allocated.iter()
        .zip(slot_clicks.iter())
        .enumerate()
        .filter(|(i, _)| *i != k)
        .map(|(_, (bid, clicks))| bid.amount.max(reserve) * clicks)
        .sum();

    (value_without_k - value_of_others_with_k).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gsp::Gsp;
    use rand::{Rng, SeedableRng};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_single_slot_is_second_price() {
        let mut rng = StdRng::seed_from_u64(11);
        let bids = vec![Bid::new(1, 10.0), Bid::new(2, 6.0), Bid::new(3, 2.0)];
        let outcome = Vcg.compute(&[10.0], 0.0, &bids, &mut rng).unwrap();
        assert_eq!(outcome.allocation, vec![1]);
        assert_eq!(outcome.per_click_payments.len(), 1);
        assert!((outcome.per_click_payments[0] - 6.0).abs() < EPS);
    }

    #[test]
    fn test_two_slots_externality() {
        let mut rng = StdRng::seed_from_u64(11);
        let bids = vec![Bid::new(3, 2.0), Bid::new(1, 10.0), Bid::new(2, 6.0)];
        let outcome = Vcg.compute(&[10.0, 5.0], 0.0, &bids, &mut rng).unwrap();
        assert_eq!(outcome.allocation, vec![1, 2]);
        // Slot 0: 6 * (10 - 5) + 2 * 5 = 40 over 10 clicks
        assert!((outcome.per_click_payments[0] - 4.0).abs() < EPS);
        // Slot 1: 2 * 5 over 5 clicks
        assert!((outcome.per_click_payments[1] - 2.0).abs() < EPS);
    }

    #[test]
    fn test_replacement_below_reserve_is_floored() {
        let mut rng = StdRng::seed_from_u64(11);
        let bids = vec![Bid::new(1, 10.0), Bid::new(2, 6.0), Bid::new(3, 2.0)];
        let outcome = Vcg.compute(&[10.0, 5.0], 3.0, &bids, &mut rng).unwrap();
        assert_eq!(outcome.allocation, vec![1, 2]);
        // Bidder 3 does not clear the reserve but still stands in as replacement at the reserve
        assert!((outcome.per_click_payments[0] - 4.5).abs() < EPS);
        assert!((outcome.per_click_payments[1] - 3.0).abs() < EPS);
    }

    #[test]
    fn test_exhausted_pool_falls_back_to_reserve() {
        let mut rng = StdRng::seed_from_u64(11);
        let bids = vec![Bid::new(1, 10.0), Bid::new(2, 6.0)];
        let outcome = Vcg.compute(&[10.0, 5.0, 2.0], 1.0, &bids, &mut rng).unwrap();
        assert_eq!(outcome.allocation, vec![1, 2]);
        // Slot 0: 6 * (10 - 5) + 1 * 5 = 35
        assert!((outcome.per_click_payments[0] - 3.5).abs() < EPS);
        assert!((outcome.per_click_payments[1] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_exhausted_pool_without_reserve_is_free() {
        let mut rng = StdRng::seed_from_u64(11);
        let outcome = Vcg.compute(&[10.0, 5.0], 0.0, &[Bid::new(4, 9.0)], &mut rng).unwrap();
        assert_eq!(outcome.allocation, vec![4]);
        assert_eq!(outcome.per_click_payments, vec![0.0]);
    }

    #[test]
    fn test_empty_market() {
        let mut rng = StdRng::seed_from_u64(11);
        let outcome = Vcg.compute(&[10.0, 5.0], 5.0, &[Bid::new(1, 4.9), Bid::new(2, 0.0)], &mut rng).unwrap();
        assert_eq!(outcome, AuctionOutcome::empty());

        let outcome = Vcg.compute(&[10.0, 5.0], 0.0, &[], &mut rng).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_rising_clicks_clamp_payment_at_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let bids = vec![Bid::new(1, 10.0), Bid::new(2, 6.0), Bid::new(3, 2.0)];
        // Without bidder 1, bidder 2 moves from 20 to 5 clicks: 6 * 5 + 2 * 20 - 6 * 20 = -50
        assert_eq!(total_payment(0, &bids[..2], 2.0, &[5.0, 20.0], 0.0), 0.0);
        let outcome = Vcg.compute(&[5.0, 20.0], 0.0, &bids, &mut rng).unwrap();
        assert_eq!(outcome.allocation, vec![1, 2]);
        assert_eq!(outcome.per_click_payments[0], 0.0);
        // Bidder 2 still pays the replacement: 2 * 20 over 20 clicks
        assert!((outcome.per_click_payments[1] - 2.0).abs() < EPS);
    }

    #[test]
    fn test_no_slots() {
        let mut rng = StdRng::seed_from_u64(11);
        let outcome = Vcg.compute(&[], 0.0, &[Bid::new(1, 4.0)], &mut rng).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_zero_click_slot_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(11);
        let bids = vec![Bid::new(1, 10.0), Bid::new(2, 6.0)];
        let result = Vcg.compute(&[10.0, 0.0], 0.0, &bids, &mut rng);
        assert!(matches!(result, Err(AuctionError::ArithmeticDegeneracy { slot: 1, .. })));
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(matches!(Vcg.compute(&[10.0], -1.0, &[Bid::new(1, 1.0)], &mut rng), Err(AuctionError::InvalidInput(_))));
        assert!(matches!(Vcg.compute(&[-10.0], 0.0, &[Bid::new(1, 1.0)], &mut rng), Err(AuctionError::InvalidInput(_))));
        assert!(matches!(Vcg.compute(&[10.0], 0.0, &[Bid::new(1, -1.0)], &mut rng), Err(AuctionError::InvalidInput(_))));
    }

    #[test]
    fn test_tie_breaking_has_no_bias() {
        let mut rng = StdRng::seed_from_u64(2024);
        let bids = vec![Bid::new(1, 5.0), Bid::new(2, 5.0), Bid::new(3, 1.0)];
        let runs = 4000;
        let mut wins_of_1 = 0;
        for _ in 0..runs {
            let outcome = Vcg.compute(&[10.0], 0.0, &bids, &mut rng).unwrap();
            // The loser of the tie sets the price either way
            assert!((outcome.per_click_payments[0] - 5.0).abs() < EPS);
            if outcome.allocation[0] == 1 {
                wins_of_1 += 1;
            }
        }
        // Binomial(4000, 0.5) has stddev ~32, allow ~5 stddev
        assert!((wins_of_1 as i64 - 2000).abs() < 160, "bidder 1 won {} of {} ties", wins_of_1, runs);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let bids = vec![Bid::new(1, 5.0), Bid::new(2, 5.0), Bid::new(3, 5.0)];
        let a = Vcg.compute(&[10.0, 5.0], 0.0, &bids, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = Vcg.compute(&[10.0, 5.0], 0.0, &bids, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_randomized_rationality_and_allocation_size() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let num_slots = rng.gen_range(0..6);
            let mut clicks = Vec::with_capacity(num_slots);
            let mut current = rng.gen_range(10.0..100.0);
            for _ in 0..num_slots {
                clicks.push(current);
                current *= rng.gen_range(0.3..1.0);
            }
            let reserve = if rng.gen_bool(0.5) { 0.0 } else { rng.gen_range(0.0..5.0) };
            let num_bids = rng.gen_range(0..8);
            let bids: Vec<Bid> = (0..num_bids)
                .map(|id| Bid::new(id, (rng.gen_range(0.0..10.0_f64) * 2.0).round() / 2.0))
                .collect();

            let outcome = Vcg.compute(&clicks, reserve, &bids, &mut rng).unwrap();
            let clearing = bids.iter().filter(|b| b.amount >= reserve).count();
            assert_eq!(outcome.allocation.len(), clearing.min(num_slots));
            assert_eq!(outcome.allocation.len(), outcome.per_click_payments.len());

            let gsp = Gsp.compute(&clicks, reserve, &bids, &mut rng).unwrap();
            for (k, (winner, price)) in outcome.allocation.iter().zip(outcome.per_click_payments.iter()).enumerate() {
                let own_bid = bids.iter().find(|b| b.bidder_id == *winner).unwrap().amount;
                assert!(*price >= reserve - EPS, "price {} below reserve {}", price, reserve);
                assert!(*price <= own_bid + EPS, "price {} above bid {}", price, own_bid);
                // VCG never charges more than GSP for the same slot
                assert!(*price <= gsp.per_click_payments[k] + EPS);
            }
        }
    }
}

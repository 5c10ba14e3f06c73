/// Balanced bidding agent
///
/// Each round the agent assumes every other agent repeats its bid from the previous round.
/// Under that assumption it:
///
/// - computes the price of tying each slot (slot_info)
/// - computes the utility of winning each slot at that price (expected_utils)
/// - targets the slot with the highest utility (target_slot)
/// - bids so that winning the target slot at its price is worth exactly as much as winning the
///   slot above at the bid itself (bid)
///
/// The agent keeps no state between rounds, everything is derived from the previous round.

use crate::agent::{AgentTrait, RoundContext};
use crate::bids::{bids_excluding, Bid};
use crate::errors::AuctionError;
use crate::mechanism::MechanismTrait;
use crate::utils::argmax_index;

/// Price range that wins a slot, assuming the other bids stay as in the previous round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotInfo {
    pub slot_id: usize,
    pub min_bid: f64,
    pub max_bid: f64,
}

pub struct AgentBalancedBidding {
    pub agent_id: usize,
    pub agent_name: String,
    pub value: f64,
    pub budget: f64,
}

impl AgentBalancedBidding {
    /// Price range of every slot of the previous round
    /// The top slot has no price above it, so its max_bid is twice its min_bid
    pub fn slot_info(&self, context: &RoundContext) -> Vec<SlotInfo> {
        let previous = context.previous_round();
        let other_bids = bids_excluding(&previous.bids, self.agent_id);
        slot_info_from(context.mechanism, &previous.clicks, context.reserve, &other_bids)
    }

    /// Utility of winning each slot at its tie price
    pub fn expected_utils(&self, context: &RoundContext) -> Vec<f64> {
        let previous = context.previous_round();
        let other_bids = bids_excluding(&previous.bids, self.agent_id);
        expected_utils_from(self.value, context.reserve, &previous.clicks, &other_bids)
    }

    /// Slot with the highest expected utility, lowest slot index on ties
    pub fn target_slot(&self, context: &RoundContext) -> SlotInfo {
        let utils = self.expected_utils(context);
        let info = self.slot_info(context);
        info[argmax_index(&utils).unwrap_or(0)]
    }
}

impl AgentTrait for AgentBalancedBidding {
    fn agent_id(&self) -> usize { self.agent_id }
    fn agent_name(&self) -> &str { &self.agent_name }
    fn value(&self) -> f64 { self.value }
    fn budget(&self) -> f64 { self.budget }

    fn initial_bid(&self, _reserve: f64) -> f64 {
        self.value / 2.0
    }

    fn bid(&self, context: &RoundContext) -> Result<f64, AuctionError> {
        let previous = context.previous_round();
        let target = self.target_slot(context);
        balanced_bid(self.value, context.reserve, &previous.clicks, &target)
    }

    fn get_strategy_type(&self) -> String {
        "Balanced bidding".to_string()
    }
}

/// Slot price ranges for a snapshot of the other agents' bids, as reported by `mechanism`
/// Always reports at least one slot, even when no click data is known
pub fn slot_info_from(mechanism: &dyn MechanismTrait, clicks: &[f64], reserve: f64, other_bids: &[Bid]) -> Vec<SlotInfo> {
    let num_slots = clicks.len().max(1);
    (0..num_slots)
        .map(|slot_id| {
            let (min_bid, max_bid) = mechanism.bid_range_for_slot(slot_id, clicks, reserve, other_bids);
            SlotInfo {
                slot_id,
                min_bid,
                max_bid: max_bid.unwrap_or(2.0 * min_bid),
            }
        })
        .collect()
}

/// Expected utility per slot for a snapshot of the other agents' bids
///
/// A zero bid stands in for the agent itself, so slot j costs the j-th highest of the other
/// bids (or nothing when there are fewer bidders than slots), floored at the reserve.
/// Slots with unknown clicks are worth nothing.
pub fn expected_utils_from(value: f64, reserve: f64, clicks: &[f64], other_bids: &[Bid]) -> Vec<f64> {
    let num_slots = clicks.len().max(1);

    let mut prices: Vec<f64> = other_bids.iter().map(|bid| bid.amount).collect();
    prices.push(0.0);
    prices.sort_by(|a, b| b.total_cmp(a));

    (0..num_slots)
        .map(|j| {
            let slot_clicks = clicks.get(j).copied().unwrap_or(0.0);
            let price = prices.get(j).copied().unwrap_or(0.0).max(reserve);
            slot_clicks * (value - price)
        })
        .collect()
}

/// Bid for a chosen target slot
///
/// - min_bid above value: winning is not worth it, bid the value
/// - lower slot: solve clicks[s] * (value - min_bid) = clicks[s-1] * (value - bid), then respect the reserve
///   and never go below zero
/// - top slot: bid the value, or nothing when the value does not reach the reserve
pub fn balanced_bid(value: f64, reserve: f64, clicks: &[f64], target: &SlotInfo) -> Result<f64, AuctionError> {
    if target.min_bid > value {
        return Ok(value);
    }

    let slot = target.slot_id;
    if slot == 0 {
        return Ok(if value < reserve { 0.0 } else { value });
    }

    let clicks_above = clicks.get(slot - 1).copied().unwrap_or(0.0);
    if clicks_above == 0.0 {
        return Err(AuctionError::ArithmeticDegeneracy {
            slot: slot - 1,
            reason: "slot above the target has zero clicks, balanced bid is undefined".to_string(),
        });
    }
    let clicks_target = clicks.get(slot).copied().unwrap_or(0.0);

    let bid = value - (clicks_target / clicks_above) * (value - target.min_bid);
    if bid < reserve && reserve < value {
        Ok(reserve)
    } else if bid < reserve && reserve > value {
        Ok(0.0)
    } else {
        // Clicks rising below the target can push the bid under zero
        Ok(bid.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gsp::Gsp;
    use crate::history::{History, Round};
    use crate::vcg::Vcg;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const EPS: f64 = 1e-9;

    fn agent(value: f64) -> AgentBalancedBidding {
        AgentBalancedBidding {
            agent_id: 0,
            agent_name: "BB".to_string(),
            value,
            budget: 1000.0,
        }
    }

    /// History with a single round in which agent 0 bid `own_bid` and the others bid `other_bids`
    fn history_with(own_bid: f64, other_bids: &[f64], clicks: &[f64]) -> History {
        let mut bids = vec![Bid::new(0, own_bid)];
        for (index, amount) in other_bids.iter().enumerate() {
            bids.push(Bid::new(index + 1, *amount));
        }
        let mut history = History::new();
        history.push(Round {
            bids,
            clicks: clicks.to_vec(),
            reserve: 0.0,
            allocation: Vec::new(),
            per_click_payments: Vec::new(),
        });
        history
    }

    #[test]
    fn test_initial_bid_is_half_value() {
        assert_eq!(agent(10.0).initial_bid(0.0), 5.0);
        assert_eq!(agent(10.0).initial_bid(8.0), 5.0);
    }

    #[test]
    fn test_two_slot_example() {
        let history = history_with(5.0, &[7.0, 3.0], &[10.0, 5.0]);
        let context = RoundContext::new(1, &history, 0.0, &Gsp);
        let bb = agent(10.0);

        let info = bb.slot_info(&context);
        assert_eq!(info, vec![
            SlotInfo { slot_id: 0, min_bid: 7.0, max_bid: 14.0 },
            SlotInfo { slot_id: 1, min_bid: 3.0, max_bid: 7.0 },
        ]);

        // 10 * (10 - 7) and 5 * (10 - 3)
        assert_eq!(bb.expected_utils(&context), vec![30.0, 35.0]);
        assert_eq!(bb.target_slot(&context).slot_id, 1);

        // 10 - (5 / 10) * (10 - 3)
        let bid = bb.bid(&context).unwrap();
        assert!((bid - 6.5).abs() < EPS);
    }

    #[test]
    fn test_own_previous_bid_is_ignored() {
        // Whatever agent 0 bid last round must not change its own forecast
        let low = history_with(0.0, &[7.0, 3.0], &[10.0, 5.0]);
        let high = history_with(100.0, &[7.0, 3.0], &[10.0, 5.0]);
        let bb = agent(10.0);
        assert_eq!(bb.expected_utils(&RoundContext::new(1, &low, 0.0, &Gsp)), bb.expected_utils(&RoundContext::new(1, &high, 0.0, &Gsp)));
    }

    #[test]
    fn test_top_slot_bids_value() {
        let history = history_with(5.0, &[2.0, 1.0], &[10.0, 5.0]);
        let context = RoundContext::new(1, &history, 0.0, &Gsp);
        let bb = agent(10.0);
        // 10 * (10 - 2) = 80 beats 5 * (10 - 1) = 45
        assert_eq!(bb.target_slot(&context).slot_id, 0);
        assert_eq!(bb.bid(&context), Ok(10.0));
    }

    #[test]
    fn test_not_expecting_to_win_bids_value() {
        let history = history_with(5.0, &[20.0, 15.0], &[10.0, 5.0]);
        let context = RoundContext::new(1, &history, 0.0, &Gsp);
        let bb = agent(10.0);
        let target = bb.target_slot(&context);
        assert!(target.min_bid > 10.0);
        assert_eq!(bb.bid(&context), Ok(10.0));
    }

    #[test]
    fn test_fewer_bidders_than_slots() {
        let history = history_with(5.0, &[8.0], &[10.0, 6.0, 3.0]);
        let context = RoundContext::new(1, &history, 1.0, &Gsp);
        let bb = agent(10.0);
        // Slot 1 costs the agent's own synthetic zero bid, floored at the reserve; slot 2 likewise
        assert_eq!(bb.expected_utils(&context), vec![20.0, 54.0, 27.0]);
        let info = bb.slot_info(&context);
        assert_eq!(info[2], SlotInfo { slot_id: 2, min_bid: 1.0, max_bid: 1.0 });
        // Target is slot 1 with min_bid 1.0: 10 - (6 / 10) * (10 - 1)
        assert!((bb.bid(&context).unwrap() - 4.6).abs() < EPS);
    }

    #[test]
    fn test_no_click_data_targets_top_slot() {
        let history = history_with(5.0, &[4.0], &[]);
        let context = RoundContext::new(1, &history, 0.0, &Gsp);
        let bb = agent(10.0);
        assert_eq!(bb.expected_utils(&context), vec![0.0]);
        assert_eq!(bb.slot_info(&context).len(), 1);
        assert_eq!(bb.bid(&context), Ok(10.0));
    }

    #[test]
    fn test_zero_clicks_above_target_is_degenerate() {
        let history = history_with(5.0, &[7.0, 3.0], &[0.0, 5.0]);
        let context = RoundContext::new(1, &history, 0.0, &Gsp);
        let bb = agent(10.0);
        assert_eq!(bb.target_slot(&context).slot_id, 1);
        assert!(matches!(bb.bid(&context), Err(AuctionError::ArithmeticDegeneracy { slot: 0, .. })));
    }

    #[test]
    #[should_panic(expected = "no previous round")]
    fn test_bid_in_round_zero_panics() {
        let history = History::new();
        let _ = agent(10.0).bid(&RoundContext::new(0, &history, 0.0, &Gsp));
    }

    #[test]
    fn test_balanced_bid_reserve_branches() {
        let target = SlotInfo { slot_id: 1, min_bid: 2.0, max_bid: 4.0 };
        // Increasing clicks push the balanced bid below min_bid: 10 - 2 * 8 = -6
        assert_eq!(balanced_bid(10.0, 3.0, &[5.0, 10.0], &target), Ok(3.0));
        // Reserve above value: withdraw
        assert_eq!(balanced_bid(10.0, 12.0, &[5.0, 10.0], &target), Ok(0.0));
        // Reserve equal to value falls through to the computed bid, floored at zero
        assert_eq!(balanced_bid(10.0, 10.0, &[5.0, 10.0], &target), Ok(0.0));
    }

    #[test]
    fn test_rising_clicks_never_give_negative_bid() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..500 {
            let clicks = vec![rng.gen_range(1.0..20.0), rng.gen_range(20.0..60.0)];
            let value = rng.gen_range(1.0..20.0);
            let reserve = if rng.gen_bool(0.5) { value } else { rng.gen_range(0.0..value) };
            let target = SlotInfo { slot_id: 1, min_bid: rng.gen_range(0.0..value), max_bid: value };
            let bid = balanced_bid(value, reserve, &clicks, &target).unwrap();
            assert!(bid >= 0.0 && bid <= value, "bid {} outside [0, {}]", bid, value);
        }
    }

    /// Mechanism reporting the same price range for every slot
    struct FlatRange(f64);

    impl MechanismTrait for FlatRange {
        fn compute(&self, _slot_clicks: &[f64], _reserve: f64, _bids: &[Bid], _rng: &mut StdRng) -> Result<crate::mechanism::AuctionOutcome, AuctionError> {
            Ok(crate::mechanism::AuctionOutcome::empty())
        }

        fn bid_range_for_slot(&self, slot: usize, _slot_clicks: &[f64], _reserve: f64, _other_bids: &[Bid]) -> (f64, Option<f64>) {
            if slot == 0 { (self.0, None) } else { (self.0, Some(self.0)) }
        }

        fn get_mechanism_type(&self) -> String {
            "Flat".to_string()
        }
    }

    #[test]
    fn test_slot_info_comes_from_the_running_mechanism() {
        let history = history_with(5.0, &[7.0, 3.0], &[10.0, 5.0]);
        let bb = agent(10.0);

        let info = bb.slot_info(&RoundContext::new(1, &history, 0.0, &FlatRange(2.5)));
        assert_eq!(info, vec![
            SlotInfo { slot_id: 0, min_bid: 2.5, max_bid: 5.0 },
            SlotInfo { slot_id: 1, min_bid: 2.5, max_bid: 2.5 },
        ]);

        // VCG and GSP report the same ranges
        let gsp_info = bb.slot_info(&RoundContext::new(1, &history, 0.0, &Gsp));
        let vcg_info = bb.slot_info(&RoundContext::new(1, &history, 0.0, &Vcg));
        assert_eq!(gsp_info, vcg_info);
        assert_eq!(vcg_info[1], SlotInfo { slot_id: 1, min_bid: 3.0, max_bid: 7.0 });
    }

    #[test]
    fn test_balanced_bid_top_slot_branches() {
        let target = SlotInfo { slot_id: 0, min_bid: 4.0, max_bid: 8.0 };
        assert_eq!(balanced_bid(10.0, 0.0, &[10.0], &target), Ok(10.0));
        assert_eq!(balanced_bid(10.0, 10.0, &[10.0], &target), Ok(10.0));
        assert_eq!(balanced_bid(10.0, 11.0, &[10.0], &target), Ok(0.0));
        // min_bid above value takes priority over the top slot rule
        let target = SlotInfo { slot_id: 0, min_bid: 12.0, max_bid: 24.0 };
        assert_eq!(balanced_bid(10.0, 0.0, &[10.0], &target), Ok(10.0));
    }

    #[test]
    fn test_balance_equation_holds() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut checked = 0;
        for _ in 0..500 {
            let num_slots = rng.gen_range(2..6);
            let mut clicks = Vec::with_capacity(num_slots);
            let mut current = rng.gen_range(20.0..100.0);
            for _ in 0..num_slots {
                clicks.push(current);
                current *= rng.gen_range(0.4..0.95);
            }
            let others: Vec<f64> = (0..rng.gen_range(1..7)).map(|_| rng.gen_range(0.0..20.0)).collect();
            let value = rng.gen_range(1.0..20.0);
            let reserve = rng.gen_range(0.0..1.0);

            let history = history_with(0.0, &others, &clicks);
            let context = RoundContext::new(1, &history, reserve, &Gsp);
            let bb = agent(value);
            let target = bb.target_slot(&context);
            let bid = bb.bid(&context).unwrap();
            assert!(bid <= value + EPS);

            if target.slot_id > 0 && target.min_bid <= value && bid >= reserve {
                let s = target.slot_id;
                let lhs = clicks[s - 1] * (value - bid);
                let rhs = clicks[s] * (value - target.min_bid);
                assert!((lhs - rhs).abs() < 1e-6, "{} != {}", lhs, rhs);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }
}

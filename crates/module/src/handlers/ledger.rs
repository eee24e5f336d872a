//! Bet intake and encrypted aggregate maintenance.

use market_types::constants::PUBLIC_TOTAL_DIVISOR;
use market_types::{derive_bettor_factor, Bet, MarketEvent, MarketStatus};

use crate::error::MarketError;
use crate::state::MarketState;

use super::{CallContext, HandlerResult};

/// Handle PlaceBet call. The attached call value is the stake.
///
/// The stake and prediction are folded into the market's encrypted
/// aggregates. The public totals move by a seed-distorted fraction of the
/// stake; they exist for display and never feed settlement.
pub fn handle_place_bet(
    state: &mut MarketState,
    ctx: &CallContext,
    market_id: u64,
    prediction: bool,
) -> HandlerResult<()> {
    if state.config.paused {
        return Err(MarketError::Paused);
    }

    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    if market.status != MarketStatus::Active {
        return Err(MarketError::InvalidStatus {
            expected: MarketStatus::Active,
            got: market.status,
        });
    }
    if ctx.timestamp >= market.end_time {
        return Err(MarketError::BettingClosed);
    }

    if state.bets.contains_key(&(market_id, ctx.sender)) {
        return Err(MarketError::AlreadyBet);
    }

    let stake = ctx.value;
    if stake < state.params.min_bet {
        return Err(MarketError::BetBelowMinimum {
            min: state.params.min_bet,
            got: stake,
        });
    }
    if stake > state.params.max_bet {
        return Err(MarketError::BetAboveMaximum {
            max: state.params.max_bet,
            got: stake,
        });
    }

    let obfuscation_seed = market.obfuscation_seed;
    let side_total = if prediction {
        market.yes_cipher_total
    } else {
        market.no_cipher_total
    };

    // Encrypt the position and fold the stake into its side's aggregate.
    let encrypted_amount = state.mint_trivial(stake);
    let encrypted_prediction = state.mint_trivial(prediction as u64);
    let factor = derive_bettor_factor(obfuscation_seed, &ctx.sender);
    let obfuscated_value = state.mint_add_plain(encrypted_amount, factor);
    let new_side_total = state.mint_add(side_total, encrypted_amount);

    let decoy_delta = ((stake as u128 * factor as u128) / PUBLIC_TOTAL_DIVISOR as u128) as u64;

    let bet = Bet {
        market_id,
        bettor: ctx.sender,
        encrypted_amount,
        encrypted_prediction,
        obfuscated_value,
        stake,
        prediction,
        placed_at: ctx.timestamp,
        claimed: false,
        access: vec![ctx.sender],
    };

    state.vault.deposit(stake);
    state.bets.insert((market_id, ctx.sender), bet);
    state
        .market_bettors
        .entry(market_id)
        .or_default()
        .push(ctx.sender);

    let market = state
        .get_market_mut(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;
    if prediction {
        market.yes_cipher_total = new_side_total;
        market.public_yes_total = market.public_yes_total.saturating_add(decoy_delta);
    } else {
        market.no_cipher_total = new_side_total;
        market.public_no_total = market.public_no_total.saturating_add(decoy_delta);
    }

    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::BetPlaced {
            market_id,
            bettor: ctx.sender,
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::registry::handle_create_market;
    use super::super::testing::{context_at, funded_context, test_context, test_state};
    use super::*;
    use market_types::constants::{MAX_BET, MIN_BET};
    use market_types::CipherOp;

    const T0: u64 = 1_700_000_000;

    fn state_with_market() -> (MarketState, u64) {
        let mut state = test_state([0u8; 32]);
        let ctx = test_context([1u8; 32]);
        let market_id =
            handle_create_market(&mut state, &ctx, "Will it ship?".to_string(), 86_400).unwrap();
        (state, market_id)
    }

    #[test]
    fn test_place_bet() {
        let (mut state, market_id) = state_with_market();
        let bettor = [2u8; 32];
        let ctx = funded_context(bettor, T0 + 100, 2_000_000);

        handle_place_bet(&mut state, &ctx, market_id, true).unwrap();

        let bet = state.bets.get(&(market_id, bettor)).unwrap();
        assert_eq!(bet.stake, 2_000_000);
        assert!(bet.prediction);
        assert!(!bet.claimed);
        assert_eq!(bet.access, vec![bettor]);

        assert_eq!(state.vault.balance(), 2_000_000);
        assert_eq!(state.market_bettors[&market_id], vec![bettor]);

        // Two ops from creation plus four per bet: stake, prediction,
        // obfuscated value, and the new side aggregate.
        assert_eq!(state.cipher_ops.len(), 6);
        let market = state.get_market(market_id).unwrap();
        assert_eq!(*state.cipher_ops[5].handle(), market.yes_cipher_total);
        assert!(matches!(state.cipher_ops[5], CipherOp::Add { .. }));
    }

    #[test]
    fn test_public_totals_are_distorted() {
        let (mut state, market_id) = state_with_market();
        let bettor = [2u8; 32];
        let stake = 10_000_000;
        let ctx = funded_context(bettor, T0 + 100, stake);

        handle_place_bet(&mut state, &ctx, market_id, true).unwrap();

        let market = state.get_market(market_id).unwrap();
        let factor = derive_bettor_factor(market.obfuscation_seed, &bettor);
        let expected = stake * factor / PUBLIC_TOTAL_DIVISOR;

        assert_eq!(market.public_yes_total, expected);
        assert_eq!(market.public_no_total, 0);
        // The distorted total always undercuts the actual stake.
        assert!(market.public_yes_total < stake);
    }

    #[test]
    fn test_place_bet_below_minimum() {
        let (mut state, market_id) = state_with_market();
        let ctx = funded_context([2u8; 32], T0 + 100, MIN_BET - 1);

        let result = handle_place_bet(&mut state, &ctx, market_id, true);
        assert!(matches!(result, Err(MarketError::BetBelowMinimum { .. })));

        // Exactly the minimum is accepted.
        let ctx = funded_context([2u8; 32], T0 + 100, MIN_BET);
        assert!(handle_place_bet(&mut state, &ctx, market_id, true).is_ok());
    }

    #[test]
    fn test_place_bet_above_maximum() {
        let (mut state, market_id) = state_with_market();
        let ctx = funded_context([2u8; 32], T0 + 100, MAX_BET + 1);

        let result = handle_place_bet(&mut state, &ctx, market_id, true);
        assert!(matches!(result, Err(MarketError::BetAboveMaximum { .. })));

        // Exactly the maximum is accepted.
        let ctx = funded_context([2u8; 32], T0 + 100, MAX_BET);
        assert!(handle_place_bet(&mut state, &ctx, market_id, true).is_ok());
    }

    #[test]
    fn test_place_bet_twice() {
        let (mut state, market_id) = state_with_market();
        let bettor = [2u8; 32];
        let ctx = funded_context(bettor, T0 + 100, 2_000_000);

        handle_place_bet(&mut state, &ctx, market_id, true).unwrap();
        let result = handle_place_bet(&mut state, &ctx, market_id, false);
        assert!(matches!(result, Err(MarketError::AlreadyBet)));
    }

    #[test]
    fn test_place_bet_after_deadline() {
        let (mut state, market_id) = state_with_market();

        // The deadline itself is already closed.
        let ctx = funded_context([2u8; 32], T0 + 86_400, 2_000_000);
        let result = handle_place_bet(&mut state, &ctx, market_id, true);
        assert!(matches!(result, Err(MarketError::BettingClosed)));

        // One second before is still open.
        let ctx = funded_context([2u8; 32], T0 + 86_399, 2_000_000);
        assert!(handle_place_bet(&mut state, &ctx, market_id, true).is_ok());
    }

    #[test]
    fn test_place_bet_unknown_market() {
        let mut state = test_state([0u8; 32]);
        let ctx = funded_context([2u8; 32], T0, 2_000_000);

        let result = handle_place_bet(&mut state, &ctx, 42, true);
        assert!(matches!(result, Err(MarketError::MarketNotFound(42))));
    }

    #[test]
    fn test_place_bet_while_paused() {
        let (mut state, market_id) = state_with_market();
        state.config.paused = true;
        let ctx = funded_context([2u8; 32], T0 + 100, 2_000_000);

        let result = handle_place_bet(&mut state, &ctx, market_id, true);
        assert!(matches!(result, Err(MarketError::Paused)));
    }

    #[test]
    fn test_both_sides_accumulate_independently() {
        let (mut state, market_id) = state_with_market();

        let yes_ctx = funded_context([2u8; 32], T0 + 100, 2_000_000);
        handle_place_bet(&mut state, &yes_ctx, market_id, true).unwrap();

        let no_ctx = funded_context([3u8; 32], T0 + 200, 4_000_000);
        handle_place_bet(&mut state, &no_ctx, market_id, false).unwrap();

        let market = state.get_market(market_id).unwrap();
        assert_ne!(market.yes_cipher_total, market.no_cipher_total);
        assert_eq!(state.vault.balance(), 6_000_000);
        assert_eq!(state.num_bettors(market_id), 2);
    }

    #[test]
    fn test_rejects_with_state_untouched() {
        let (mut state, market_id) = state_with_market();
        let ops_before = state.cipher_ops.len();

        let ctx = funded_context([2u8; 32], T0 + 100, MIN_BET - 1);
        let _ = handle_place_bet(&mut state, &ctx, market_id, true);

        assert_eq!(state.cipher_ops.len(), ops_before);
        assert_eq!(state.vault.balance(), 0);
        assert!(state.bets.is_empty());
    }

    #[test]
    fn test_deadline_checked_before_stake_band() {
        let (mut state, market_id) = state_with_market();

        let ctx = context_at([2u8; 32], T0 + 86_400);
        let result = handle_place_bet(&mut state, &ctx, market_id, true);
        assert!(matches!(result, Err(MarketError::BettingClosed)));
    }
}

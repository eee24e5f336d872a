//! Market creation.

use market_types::constants::{MAX_MARKET_DURATION_SECS, MAX_QUESTION_LEN};
use market_types::{derive_obfuscation_seed, Market, MarketEvent, MarketStatus};

use crate::error::MarketError;
use crate::state::MarketState;

use super::{CallContext, HandlerResult};

/// Handle CreateMarket call.
pub fn handle_create_market(
    state: &mut MarketState,
    ctx: &CallContext,
    question: String,
    duration_secs: u64,
) -> HandlerResult<u64> {
    if state.config.paused {
        return Err(MarketError::Paused);
    }

    if question.is_empty() {
        return Err(MarketError::EmptyQuestion);
    }
    if question.len() > MAX_QUESTION_LEN {
        return Err(MarketError::QuestionTooLong {
            got: question.len(),
            max: MAX_QUESTION_LEN,
        });
    }

    if duration_secs == 0 || duration_secs > MAX_MARKET_DURATION_SECS {
        return Err(MarketError::InvalidDuration(duration_secs));
    }
    let end_time = ctx
        .timestamp
        .checked_add(duration_secs)
        .ok_or(MarketError::TimestampOverflow)?;

    let market_id = state.allocate_market_id();
    let obfuscation_seed = derive_obfuscation_seed(ctx.timestamp, &ctx.sender, market_id);

    // Both pools start as encrypted zeros so every later bet has an
    // aggregate to fold into.
    let yes_cipher_total = state.mint_trivial(0);
    let no_cipher_total = state.mint_trivial(0);

    let market = Market {
        id: market_id,
        creator: ctx.sender,
        question,
        status: MarketStatus::Active,
        created_at: ctx.timestamp,
        end_time,
        yes_cipher_total,
        no_cipher_total,
        public_yes_total: 0,
        public_no_total: 0,
        obfuscation_seed,
        decryption_request_id: None,
        resolution_request_time: None,
        outcome: None,
        settled_yes_pool: None,
        settled_no_pool: None,
        emergency_withdrawn: false,
    };

    state.markets.insert(market_id, market);
    state.market_bettors.insert(market_id, Vec::new());
    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::MarketCreated {
            market_id,
            creator: ctx.sender,
            end_time,
        },
    );

    Ok(market_id)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{test_context, test_state};
    use super::*;
    use market_types::CipherOp;

    #[test]
    fn test_create_market() {
        let mut state = test_state([0u8; 32]);
        let creator = [1u8; 32];
        let ctx = test_context(creator);

        let market_id = handle_create_market(
            &mut state,
            &ctx,
            "Will the bridge reopen this quarter?".to_string(),
            86_400,
        )
        .unwrap();

        assert_eq!(market_id, 1);
        let market = state.get_market(market_id).unwrap();
        assert_eq!(market.creator, creator);
        assert_eq!(market.status, MarketStatus::Active);
        assert_eq!(market.end_time, ctx.timestamp + 86_400);
        assert_eq!(market.public_yes_total, 0);
        assert_eq!(market.public_no_total, 0);
        assert_eq!(market.decryption_request_id, None);
        assert!(!market.emergency_withdrawn);

        // Both aggregates start as encrypted zeros in the cipher log.
        assert_eq!(state.cipher_ops.len(), 2);
        assert!(matches!(
            state.cipher_ops[0],
            CipherOp::TrivialEncrypt { value: 0, .. }
        ));

        assert_eq!(state.events.len(), 1);
        assert!(matches!(
            state.events[0].event,
            MarketEvent::MarketCreated { market_id: 1, .. }
        ));
    }

    #[test]
    fn test_create_market_empty_question() {
        let mut state = test_state([0u8; 32]);
        let ctx = test_context([1u8; 32]);

        let result = handle_create_market(&mut state, &ctx, String::new(), 86_400);
        assert!(matches!(result, Err(MarketError::EmptyQuestion)));
    }

    #[test]
    fn test_create_market_question_too_long() {
        let mut state = test_state([0u8; 32]);
        let ctx = test_context([1u8; 32]);

        let result =
            handle_create_market(&mut state, &ctx, "q".repeat(MAX_QUESTION_LEN + 1), 86_400);
        assert!(matches!(
            result,
            Err(MarketError::QuestionTooLong { got: 501, .. })
        ));

        // Exactly at the limit is accepted.
        let result = handle_create_market(&mut state, &ctx, "q".repeat(MAX_QUESTION_LEN), 86_400);
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_market_invalid_duration() {
        let mut state = test_state([0u8; 32]);
        let ctx = test_context([1u8; 32]);

        let result = handle_create_market(&mut state, &ctx, "question".to_string(), 0);
        assert!(matches!(result, Err(MarketError::InvalidDuration(0))));

        let result = handle_create_market(
            &mut state,
            &ctx,
            "question".to_string(),
            MAX_MARKET_DURATION_SECS + 1,
        );
        assert!(matches!(result, Err(MarketError::InvalidDuration(_))));

        // A full year is accepted.
        let result = handle_create_market(
            &mut state,
            &ctx,
            "question".to_string(),
            MAX_MARKET_DURATION_SECS,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_market_timestamp_overflow() {
        let mut state = test_state([0u8; 32]);
        let mut ctx = test_context([1u8; 32]);
        ctx.timestamp = u64::MAX - 10;

        let result = handle_create_market(&mut state, &ctx, "question".to_string(), 100);
        assert!(matches!(result, Err(MarketError::TimestampOverflow)));
    }

    #[test]
    fn test_create_market_while_paused() {
        let mut state = test_state([0u8; 32]);
        state.config.paused = true;
        let ctx = test_context([1u8; 32]);

        let result = handle_create_market(&mut state, &ctx, "question".to_string(), 86_400);
        assert!(matches!(result, Err(MarketError::Paused)));
    }

    #[test]
    fn test_obfuscation_seeds_differ_across_markets() {
        let mut state = test_state([0u8; 32]);
        let ctx = test_context([1u8; 32]);

        let a = handle_create_market(&mut state, &ctx, "first".to_string(), 86_400).unwrap();
        let b = handle_create_market(&mut state, &ctx, "second".to_string(), 86_400).unwrap();

        let seed_a = state.get_market(a).unwrap().obfuscation_seed;
        let seed_b = state.get_market(b).unwrap().obfuscation_seed;
        assert_ne!(seed_a, seed_b);
    }
}

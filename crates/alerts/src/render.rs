//! Reply texts and opportunity rendering.

use crate::commands::{InvalidParams, HELP_KEYWORD};
use crate::transport::Choice;
use spread_core::TransactionFact;

pub const SESSION_STARTED: &str = "Session started. Send 'stop' to cancel.";
pub const SESSION_ACTIVE: &str = "Session is already active.";
pub const SESSION_CANCELLED: &str = "Session cancelled.";
pub const NO_ACTIVE_SESSION: &str = "No active session.";
pub const SESSION_EXPIRED: &str =
    "Your scanning session expired and has been stopped. Send new parameters to start again.";
pub const SESSION_INTERRUPTED: &str =
    "The bot was restarted and your scanning session has been stopped. Send your parameters again to resume.";
pub const TRY_LATER: &str = "All scanning slots are busy right now. Please try again later.";
pub const NO_TRANSACTIONS: &str = "No transactions.";
pub const NOT_UNDERSTOOD: &str =
    "This action is not supported by the bot, or something was entered incorrectly.";
pub const NO_LONGER_TRACKED: &str =
    "Oops 😀 this deal is no longer tracked because it stopped being interesting for you.";
pub const CHOOSE_DEAL: &str = "Choose a deal that suits you:";

pub const INSTRUCTIONS: &str = "\
Hi! I am a chat bot for exchange analytics. I look for the most profitable \
cross-exchange transfers for spot trading.

Send the USDT amount (integer), the minimum spread and the maximum spread in %, \
separated by spaces, for example: 100 0.3 0.8
The older two-number form with a single spread (for example 100 0.3) also works.

While scanning I send you new deals as they appear. Send 'all' to see every deal \
currently tracked, tap a deal to get its full order-book details, and send 'stop' \
to end the scan.";

/// Reply for numeric input that failed validation.
pub fn invalid_params(err: &InvalidParams) -> String {
    format!("{err}. Send '{HELP_KEYWORD}' to see the expected format.")
}

/// Button label: `🟢 {symbol}: {coins} ({spread}%) 📕 {from} -> 📗 {to}`.
pub fn deal_label(fact: &TransactionFact) -> String {
    format!(
        "🟢 {}: {:.2} ({:.2}%) 📕 {} -> 📗 {}",
        fact.symbol, fact.coin_amount, fact.spread, fact.market_from, fact.market_to
    )
}

/// One selectable entry per opportunity, routed by `from/to/symbol`.
pub fn deal_choices(facts: &[TransactionFact]) -> Vec<Choice> {
    facts
        .iter()
        .map(|fact| Choice {
            label: deal_label(fact),
            payload: fact.route().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spread_core::{OrderLevel, SessionId};

    fn fact() -> TransactionFact {
        TransactionFact {
            session_id: SessionId(1),
            symbol: "TRX".to_string(),
            chain: "TRC20".to_string(),
            market_from: "BYBIT".to_string(),
            market_to: "MEXC".to_string(),
            spread: 0.724,
            withdraw_fee: 1.0,
            withdraw_max: 50000.0,
            coin_amount: 812.456,
            ask_order_count: 1,
            ask_cost: 100.0,
            ask_orders: vec![OrderLevel::new(0.1231, 812.456)],
            bid_order_count: 1,
            bid_cost: 100.72,
            bid_orders: vec![OrderLevel::new(0.124, 812.456)],
            delivered: false,
            updated_at: None,
        }
    }

    #[test]
    fn test_deal_label() {
        assert_eq!(deal_label(&fact()), "🟢 TRX: 812.46 (0.72%) 📕 BYBIT -> 📗 MEXC");
    }

    #[test]
    fn test_choices_carry_route() {
        let choices = deal_choices(&[fact()]);
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].payload, "BYBIT/MEXC/TRX");
    }

    #[test]
    fn test_invalid_params_text() {
        let text = invalid_params(&InvalidParams::InvertedRange);
        assert!(text.starts_with("The minimum spread must not exceed the maximum spread."));
    }
}

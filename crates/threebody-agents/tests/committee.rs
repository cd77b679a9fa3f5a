//! End-to-end checks of the thinking stage: reasoning text through the parser,
//! and the rule-based path when the provider is down.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use threebody_agents::test_support::ScriptedProvider;
use threebody_agents::{parse_decision, FallbackRule, ReasoningClient};
use threebody_models::{Decision, MarketSnapshot, Sentiment, TradeAction, ERROR_AGENT};

fn snapshot(rsi: f64) -> MarketSnapshot {
    MarketSnapshot::new("BTC/USDT", "USDT", dec!(84321.5))
        .unwrap()
        .with_rsi(Some(rsi))
        .with_sentiment(Sentiment::Bearish, Some(250))
}

async fn think(
    client: &ReasoningClient,
    rule: &FallbackRule,
    snapshot: &MarketSnapshot,
) -> Decision {
    match client.deliberate(snapshot).await {
        Ok(raw) => parse_decision(&raw, snapshot),
        Err(_) => rule.decide(snapshot),
    }
}

#[tokio::test]
async fn fenced_committee_answer_is_normalized() {
    let reply = "Warren: too risky.\nChad: send it.\n```json\n{\"winner\": \"Chad\", \"decision\": \"buy\", \"amount_percent\": 1.5, \"reason\": \"Oversold bounce\", \"asset\": \"DOGE/USDT\"}\n```";
    let client = ReasoningClient::new(Arc::new(ScriptedProvider::replying(reply)));
    let snap = snapshot(24.0);

    let d = think(&client, &FallbackRule::default(), &snap).await;
    assert_eq!(d.agent, "Chad");
    assert_eq!(d.action, TradeAction::Buy);
    assert_eq!(d.fraction, Decimal::ONE);
    assert_eq!(d.rationale, "Oversold bounce");
    assert_eq!(d.target_asset, "BTC/USDT");
}

#[tokio::test]
async fn prose_only_answer_becomes_parse_error_hold() {
    let client = ReasoningClient::new(Arc::new(ScriptedProvider::replying(
        "The committee could not agree today.",
    )));
    let d = think(&client, &FallbackRule::default(), &snapshot(24.0)).await;
    assert_eq!(d.action, TradeAction::Hold);
    assert_eq!(d.agent, ERROR_AGENT);
    assert_eq!(d.fraction, Decimal::ZERO);
}

#[tokio::test]
async fn provider_outage_uses_rule() {
    let provider = Arc::new(ScriptedProvider::failing());
    let client = ReasoningClient::new(provider.clone());
    let rule = FallbackRule::default();

    let oversold = think(&client, &rule, &snapshot(22.0)).await;
    assert_eq!(oversold.action, TradeAction::Buy);
    assert_eq!(oversold.agent, "Chad");
    assert_eq!(oversold.fraction, dec!(0.1));

    let neutral = think(&client, &rule, &snapshot(50.0)).await;
    assert_eq!(neutral.action, TradeAction::Hold);
    assert_eq!(neutral.agent, "Warren");

    assert_eq!(provider.calls(), 2);
}

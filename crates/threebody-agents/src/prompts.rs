use threebody_models::{MarketSnapshot, Persona};

/// Framing sent as the system message by providers that support one.
pub const SYSTEM_PROMPT: &str = "You are an AI investment committee managing a crypto treasury. \
     You answer with a single JSON object and nothing else.";

/// Example payload embedded in the prompt so the model knows the shape.
fn response_schema(asset: &str) -> String {
    let example = serde_json::json!({
        "winner": "Name of the agent who won (Warren/Chad/Atlas)",
        "decision": "BUY, SELL or HOLD",
        "amount_percent": 0.1,
        "reason": "A one-sentence summary of the winning logic",
        "asset": asset,
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

fn committee_roster() -> String {
    Persona::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}: {}", i + 1, p.name(), p.temperament()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the debate prompt for one snapshot. Pure: the same snapshot always
/// yields the same prompt.
pub fn committee_prompt(snapshot: &MarketSnapshot) -> String {
    let tie_breaker = Persona::tie_breaker();
    format!(
        "You are an AI Investment Committee managing a crypto treasury.\n\n\
         ## THE COMMITTEE MEMBERS\n\n\
         {roster}\n\n\
         ## MARKET DATA\n\n\
         {summary}\n\n\
         ## TASK\n\n\
         Simulate a short debate between these three. {averse} and {seeking} should argue. \
         {tie_breaker} decides.\n\
         The amount_percent is the fraction of the stablecoin treasury to deploy, \
         between 0.0 and 1.0. Use 0.0 for HOLD.\n\n\
         ## OUTPUT FORMAT\n\n\
         Return ONLY a JSON object (no markdown, no conversation text outside JSON) \
         with this structure:\n\
         {schema}",
        roster = committee_roster(),
        summary = snapshot.summary(),
        averse = Persona::Warren,
        seeking = Persona::Chad,
        tie_breaker = tie_breaker,
        schema = response_schema(&snapshot.target_asset),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot::new("BTC/USDT", "USDT", dec!(85000))
            .unwrap()
            .with_rsi(Some(25.0))
    }

    #[test]
    fn prompt_names_all_personas() {
        let prompt = committee_prompt(&snapshot());
        for persona in Persona::ALL {
            assert!(prompt.contains(persona.name()), "missing {persona}");
        }
        assert!(prompt.contains("Atlas decides"));
    }

    #[test]
    fn prompt_embeds_snapshot_and_schema() {
        let prompt = committee_prompt(&snapshot());
        assert!(prompt.contains("RSI(14): 25.00"));
        assert!(prompt.contains("\"amount_percent\""));
        assert!(prompt.contains("\"asset\": \"BTC/USDT\""));
    }

    #[test]
    fn prompt_is_deterministic() {
        let snapshot = snapshot();
        assert_eq!(committee_prompt(&snapshot), committee_prompt(&snapshot));
    }
}

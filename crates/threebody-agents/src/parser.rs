use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use threebody_models::{Decision, MarketSnapshot, Persona, TradeAction};
use tracing::{debug, warn};

use crate::error::AgentError;

pub const DEFAULT_RATIONALE: &str = "Consensus reached";

const AGENT_KEYS: &[&str] = &["winner", "agent"];
const ACTION_KEYS: &[&str] = &["decision", "action"];
const FRACTION_KEYS: &[&str] = &["amount_percent", "decision_percent", "fraction"];
const RATIONALE_KEYS: &[&str] = &["reason", "rationale"];

/// Remove code-fence markers wrapped around the whole response.
///
/// Handles ```` ```json ```` / ```` ``` ```` openers (with or without a newline)
/// and a trailing ```` ``` ````. Fences in the middle of the text are left for
/// [`extract_json`].
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(i) if rest[..i].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[i + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common model response formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Here is the decision:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON object found in response (length={})",
        text.len()
    )))
}

/// Extract JSON from a markdown code block (```json ... ``` or ``` ... ```)
fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                let extracted = text[json_start..json_start + end].trim();
                return Some(extracted.to_string());
            }
        }
    }

    None
}

/// Find the first balanced { ... } in the text.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn decode_object(raw: &str) -> Option<Map<String, Value>> {
    let json_str = extract_json(strip_code_fences(raw)).ok()?;
    match serde_json::from_str::<Value>(&json_str).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerce a JSON number or numeric string to a decimal fraction.
/// `"10%"` reads as 0.10. Anything else is `None`.
///
/// Finite values beyond decimal range are clamped to `[0, 1]` first, so a
/// huge amount still reads as "everything" rather than as unparseable.
fn coerce_fraction(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(clamped_f64)),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => {
                    let pct = pct.trim();
                    Decimal::from_str(pct)
                        .ok()
                        .map(|d| d / Decimal::ONE_HUNDRED)
                        .or_else(|| {
                            pct.parse::<f64>()
                                .ok()
                                .and_then(|f| clamped_f64(f / 100.0))
                        })
                }
                None => Decimal::from_str(s)
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(clamped_f64)),
            }
        }
        _ => None,
    }
}

fn clamped_f64(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    Decimal::from_f64(f.clamp(0.0, 1.0))
}

/// Turn raw reasoning text into a complete [`Decision`]. Never fails.
///
/// Each field falls back independently when missing or malformed. The
/// target asset always comes from `snapshot`, whatever the text says.
pub fn parse_decision(raw: &str, snapshot: &MarketSnapshot) -> Decision {
    let Some(object) = decode_object(raw) else {
        warn!(
            length = raw.len(),
            "Reasoning output has no decodable JSON object, holding"
        );
        return Decision::parse_error(snapshot.target_asset.clone());
    };

    let agent = string_field(&object, AGENT_KEYS)
        .unwrap_or_else(|| Persona::tie_breaker().name().to_string());

    let action = match string_field(&object, ACTION_KEYS) {
        Some(word) => TradeAction::parse_loose(&word).unwrap_or_else(|| {
            warn!(action = %word, "Unknown action in reasoning output, holding");
            TradeAction::Hold
        }),
        None => TradeAction::Hold,
    };

    let fraction = FRACTION_KEYS
        .iter()
        .filter_map(|k| object.get(*k))
        .find_map(coerce_fraction)
        .unwrap_or(Decimal::ZERO);

    let rationale =
        string_field(&object, RATIONALE_KEYS).unwrap_or_else(|| DEFAULT_RATIONALE.to_string());

    if let Some(claimed) = object.get("asset").and_then(Value::as_str) {
        if claimed != snapshot.target_asset {
            warn!(
                claimed,
                expected = %snapshot.target_asset,
                "Ignoring asset named in reasoning output"
            );
        }
    }

    let decision = Decision::new(
        agent,
        action,
        fraction,
        rationale,
        snapshot.target_asset.clone(),
    );
    if decision.fraction != fraction {
        debug!(raw = %fraction, clamped = %decision.fraction, "Fraction clamped");
    }
    decision
}

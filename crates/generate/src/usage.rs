use serde::Serialize;
use serde_json::Value;
use std::fmt;

const COUNTER_KEYWORDS: [&str; 3] = ["token", "usage", "count"];

/// Token counts for a single generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub cached_input_tokens: u64,
    pub output_tokens: u64,
    /// Set when any count is an approximation rather than reported by the service
    pub used_estimate: bool,
}

impl TokenUsage {
    /// Usage of a call that never produced output: the prompt estimate only.
    pub fn prompt_estimate(prompt: &str) -> Self {
        Self {
            input_tokens: estimate_tokens(prompt),
            cached_input_tokens: 0,
            output_tokens: 0,
            used_estimate: true,
        }
    }

    fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.cached_input_tokens == 0 && self.output_tokens == 0
    }
}

/// Rough token estimate of about four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    (text.chars().count() as u64 / 4).max(1)
}

/// Derive token usage from a raw generation response.
///
/// Ollama's `prompt_eval_count` / `eval_count` counters are used when present.
/// Otherwise the whole response is scanned for numeric fields with token-like
/// keys, and when nothing usable turns up both sides are estimated from the
/// prompt and response text.
pub fn extract_usage(raw: &Value, prompt: &str, response_text: &str) -> TokenUsage {
    if let Some(usage) = ollama_counters(raw, prompt) {
        return usage;
    }

    let mut counters = Vec::new();
    collect_counters(raw, &mut counters);

    let mut usage = TokenUsage::default();
    // Whether the current input figure came from splitting a combined total
    let mut input_from_total = false;
    for (key, value) in counters {
        let has = |needle: &str| key.contains(needle);

        if has("input") && has("cached") {
            usage.cached_input_tokens = value;
        } else if has("cached") && !has("input") && !has("output") {
            usage.cached_input_tokens = value;
        } else if has("input") && has("token") {
            usage.input_tokens = value;
            input_from_total = false;
        } else if has("output") || has("generation") || has("response") {
            usage.output_tokens = value;
        } else if has("total") && has("token") {
            // Only a combined figure: attribute the prompt estimate to input
            usage.input_tokens = estimate_tokens(prompt).min(value);
            usage.output_tokens = value - usage.input_tokens;
            input_from_total = true;
        }
    }
    usage.used_estimate = input_from_total;

    if usage.is_empty() {
        return TokenUsage {
            input_tokens: estimate_tokens(prompt),
            cached_input_tokens: 0,
            output_tokens: estimate_tokens(response_text),
            used_estimate: true,
        };
    }

    usage
}

fn ollama_counters(raw: &Value, prompt: &str) -> Option<TokenUsage> {
    let output_tokens = raw.get("eval_count")?.as_u64()?;

    // Ollama leaves out prompt_eval_count when the prompt was served from cache
    let (input_tokens, used_estimate) = match raw.get("prompt_eval_count").and_then(Value::as_u64) {
        Some(count) => (count, false),
        None => (estimate_tokens(prompt), true),
    };

    Some(TokenUsage {
        input_tokens,
        cached_input_tokens: 0,
        output_tokens,
        used_estimate,
    })
}

/// Numeric fields whose lowercased key looks like a counter, in document order.
fn collect_counters(value: &Value, found: &mut Vec<(String, u64)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = key.to_lowercase();
                let is_counter_key = COUNTER_KEYWORDS.iter().any(|kw| key.contains(kw));
                match numeric(child) {
                    Some(n) if is_counter_key => found.push((key, n)),
                    _ => collect_counters(child, found),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_counters(item, found);
            }
        }
        _ => {}
    }
}

fn numeric(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        _ => None,
    }
}

/// Running token totals for one processing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub cached_input_tokens: u64,
    pub output_tokens: u64,
    pub requests: usize,
    pub used_estimate: bool,
}

impl UsageTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, usage: &TokenUsage) {
        self.input_tokens += usage.input_tokens;
        self.cached_input_tokens += usage.cached_input_tokens;
        self.output_tokens += usage.output_tokens;
        self.requests += 1;
        self.used_estimate |= usage.used_estimate;
    }
}

impl fmt::Display for UsageTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Requests: {}", self.requests)?;
        writeln!(f, "  Input tokens: {}", self.input_tokens)?;
        writeln!(f, "  Cached input tokens: {}", self.cached_input_tokens)?;
        write!(f, "  Output tokens: {}", self.output_tokens)?;
        if self.used_estimate {
            write!(f, "\n  Note: some counts are estimates (not reported by the service)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_input_and_output_tokens() {
        let raw = json!({"response": "[]", "input_tokens": 50, "output_tokens": 20});
        let usage = extract_usage(&raw, "prompt text", "[]");

        assert_eq!(usage.input_tokens, 50);
        assert_eq!(usage.output_tokens, 20);
        assert_eq!(usage.cached_input_tokens, 0);
        assert!(!usage.used_estimate);
    }

    #[test]
    fn test_no_counters_falls_back_to_estimate() {
        let prompt = "p".repeat(400);
        let response = "r".repeat(81);
        let raw = json!({"model": "llama3.1:8b", "response": response, "done": true});

        let usage = extract_usage(&raw, &prompt, &response);
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 20);
        assert!(usage.used_estimate);
    }

    #[test]
    fn test_ollama_counters_are_exact() {
        let raw = json!({"response": "[]", "prompt_eval_count": 812, "eval_count": 344, "total_duration": 5_000_000});
        let usage = extract_usage(&raw, "prompt", "[]");

        assert_eq!(usage.input_tokens, 812);
        assert_eq!(usage.output_tokens, 344);
        assert!(!usage.used_estimate);
    }

    /// A complete non-streaming `/api/generate` reply.
    fn ollama_reply() -> Value {
        json!({
            "model": "llama3.1:8b",
            "created_at": "2024-09-30T14:02:11.512Z",
            "response": "[]",
            "done": true,
            "done_reason": "stop",
            "context": [128006, 882, 128007, 271, 791, 4320],
            "total_duration": 5_043_500_667u64,
            "load_duration": 5_025_959u64,
            "prompt_eval_count": 26,
            "prompt_eval_duration": 325_953_000u64,
            "eval_count": 290,
            "eval_duration": 4_709_213_000u64
        })
    }

    #[test]
    fn test_full_ollama_reply_uses_counters_only() {
        let usage = extract_usage(&ollama_reply(), "prompt", "[]");
        assert_eq!(
            usage,
            TokenUsage {
                input_tokens: 26,
                cached_input_tokens: 0,
                output_tokens: 290,
                used_estimate: false,
            }
        );
    }

    #[test]
    fn test_durations_and_context_are_not_counted() {
        let mut raw = ollama_reply();
        let map = raw.as_object_mut().unwrap();
        map.remove("prompt_eval_count");
        map.remove("eval_count");

        let prompt = "p".repeat(200);
        let response = "r".repeat(40);
        let usage = extract_usage(&raw, &prompt, &response);

        assert_eq!(
            usage,
            TokenUsage {
                input_tokens: 50,
                cached_input_tokens: 0,
                output_tokens: 10,
                used_estimate: true,
            }
        );
    }

    #[test]
    fn test_cached_prompt_without_prompt_counter() {
        let raw = json!({"eval_count": 10});
        let usage = extract_usage(&raw, &"x".repeat(40), "");

        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 10);
        assert!(usage.used_estimate);
    }

    #[test]
    fn test_nested_counters_and_cached_input() {
        let raw = json!({
            "response": "[]",
            "meta": {
                "usage": {"input_tokens": 120, "cached_input_tokens": 30},
                "stats": [{"generation_tokens": 45}]
            }
        });
        let usage = extract_usage(&raw, "prompt", "[]");

        assert_eq!(usage.input_tokens, 120);
        assert_eq!(usage.cached_input_tokens, 30);
        assert_eq!(usage.output_tokens, 45);
        assert!(!usage.used_estimate);
    }

    #[test]
    fn test_total_only_is_split_by_prompt_estimate() {
        let prompt = "q".repeat(40); // estimates to 10 tokens
        let raw = json!({"usage": {"total_tokens": 100}});
        let usage = extract_usage(&raw, &prompt, "");

        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 90);
        assert!(usage.used_estimate);
    }

    #[test]
    fn test_explicit_input_after_total_is_exact() {
        let raw = json!({"usage": {"total_tokens": 100, "input_tokens": 70, "output_tokens": 30}});
        let usage = extract_usage(&raw, &"q".repeat(40), "");

        assert_eq!(usage.input_tokens, 70);
        assert_eq!(usage.output_tokens, 30);
        assert!(!usage.used_estimate);
    }

    #[test]
    fn test_total_smaller_than_prompt_estimate() {
        let prompt = "q".repeat(400);
        let raw = json!({"total_tokens": 30});
        let usage = extract_usage(&raw, &prompt, "");

        assert_eq!(usage.input_tokens, 30);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn test_float_and_negative_counters() {
        let raw = json!({"input_tokens": 12.9, "output_tokens": -4});
        let usage = extract_usage(&raw, "prompt", "");

        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens(&"a".repeat(400)), 100);
    }

    #[test]
    fn test_totals_accumulate_and_remember_estimates() {
        let mut totals = UsageTotals::new();
        totals.record(&TokenUsage {
            input_tokens: 50,
            cached_input_tokens: 5,
            output_tokens: 20,
            used_estimate: false,
        });
        assert!(!totals.used_estimate);

        totals.record(&TokenUsage::prompt_estimate(&"p".repeat(80)));

        assert_eq!(totals.input_tokens, 70);
        assert_eq!(totals.cached_input_tokens, 5);
        assert_eq!(totals.output_tokens, 20);
        assert_eq!(totals.requests, 2);
        assert!(totals.used_estimate);
        assert!(totals.to_string().contains("estimates"));
    }
}

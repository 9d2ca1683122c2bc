//! Per-model token pricing.
//!
//! Prices are USD per one million tokens. Costs come out as exact
//! [`Usd`] amounts so that summing many small answers never drifts.

use serde::{Deserialize, Serialize};

use crate::usd::Usd;

/// Nano-dollars in one dollar, divided by one million tokens.
const NANOS_PER_MILLION_TOKENS: f64 = 1_000.0;

/// Per-model pricing for cost estimation (USD per 1M tokens).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Price per 1M input tokens.
    pub input_per_million: f64,
    /// Price per 1M output tokens.
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of one completion with the given token counts.
    pub fn estimate_cost(&self, prompt_tokens: u32, completion_tokens: u32) -> Usd {
        let nanos = f64::from(prompt_tokens) * self.input_per_million * NANOS_PER_MILLION_TOKENS
            + f64::from(completion_tokens) * self.output_per_million * NANOS_PER_MILLION_TOKENS;
        Usd::from_nanos(nanos.round() as i64)
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        // Mid-range estimate for models not in the table.
        Self::new(3.0, 15.0)
    }
}

/// Look up pricing for a model by name, if it is a known model.
///
/// Matches on the segment after the last `/` so that `"openai/gpt-4o-mini"`
/// and `"gpt-4o-mini"` resolve the same way.
pub fn known_pricing(model: &str) -> Option<ModelPricing> {
    let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();

    let pricing = if name.contains("gpt-4o-mini") || name.contains("4o-mini") {
        ModelPricing::new(0.15, 0.60)
    } else if name.contains("gpt-4.1-nano") {
        ModelPricing::new(0.10, 0.40)
    } else if name.contains("gpt-4.1-mini") {
        ModelPricing::new(0.40, 1.60)
    } else if name.contains("gpt-4.1") {
        ModelPricing::new(2.0, 8.0)
    } else if name.contains("gpt-4o") || name.contains("gpt-4") {
        ModelPricing::new(2.50, 10.0)
    } else if name.starts_with("o1") || name.starts_with("o3") {
        ModelPricing::new(15.0, 60.0)
    } else if name.contains("opus") {
        ModelPricing::new(15.0, 75.0)
    } else if name.contains("sonnet") {
        ModelPricing::new(3.0, 15.0)
    } else if name.contains("haiku") {
        ModelPricing::new(0.25, 1.25)
    } else if name.contains("deepseek") {
        ModelPricing::new(0.27, 1.10)
    } else {
        return None;
    };
    Some(pricing)
}

/// Pricing for a model, falling back to [`ModelPricing::default()`] for
/// unknown names.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    known_pricing(model).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt_4o_mini_rates() {
        let p = pricing_for_model("gpt-4o-mini");
        assert_eq!(p, ModelPricing::new(0.15, 0.60));
        // 1000 * 0.15 / 1e6 + 500 * 0.6 / 1e6 = 0.00045
        assert_eq!(p.estimate_cost(1000, 500).to_string(), "0.00045");
    }

    #[test]
    fn provider_prefix_is_ignored() {
        assert_eq!(
            pricing_for_model("openai/gpt-4o-mini"),
            pricing_for_model("gpt-4o-mini")
        );
    }

    #[test]
    fn mini_is_not_mistaken_for_full_model() {
        assert_eq!(pricing_for_model("gpt-4o"), ModelPricing::new(2.50, 10.0));
        assert_eq!(pricing_for_model("GPT-4o-Mini"), ModelPricing::new(0.15, 0.60));
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        assert!(known_pricing("my-local-llama").is_none());
        assert_eq!(pricing_for_model("my-local-llama"), ModelPricing::default());
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(ModelPricing::default().estimate_cost(0, 0), Usd::ZERO);
    }

    #[test]
    fn single_token_keeps_sub_cent_precision() {
        // 0.15 USD / 1M tokens = 150 nano-dollars per token.
        let p = ModelPricing::new(0.15, 0.60);
        assert_eq!(p.estimate_cost(1, 0).nanos(), 150);
        assert_eq!(p.estimate_cost(0, 1).nanos(), 600);
    }

    #[test]
    fn deserializes_config_override() {
        let p: ModelPricing =
            serde_json::from_str(r#"{"input_per_million": 1.0, "output_per_million": 2.0}"#)
                .unwrap();
        assert_eq!(p.estimate_cost(1_000_000, 1_000_000).to_string(), "3");
    }
}

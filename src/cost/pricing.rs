//! Model pricing definitions for cost calculation.
//!
//! Prices can be customized via environment variables or programmatically.
//! Default rates follow the published per-1K-token prices of the models the
//! gate fronts. A model absent from the table costs zero; that is an explicit
//! fallback for unpriced models, not an error.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const KTOK: Decimal = dec!(1000);

/// Per-1K-token rates for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_ktok: Decimal,
    pub output_per_ktok: Decimal,
}

impl ModelPricing {
    pub const fn new(input_per_ktok: Decimal, output_per_ktok: Decimal) -> Self {
        Self {
            input_per_ktok,
            output_per_ktok,
        }
    }

    pub fn calculate(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let input = Decimal::from(input_tokens) / KTOK * self.input_per_ktok;
        let output = Decimal::from(output_tokens) / KTOK * self.output_per_ktok;
        input + output
    }
}

/// Immutable mapping from model identifier to rates, loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
}

impl PricingTable {
    pub fn builder() -> PricingTableBuilder {
        PricingTableBuilder::new()
    }

    /// The standard table with environment overrides applied.
    pub fn from_env() -> Self {
        PricingTableBuilder::new().with_defaults().from_env().build()
    }

    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(&model.to_lowercase())
    }

    /// Cost for a request against `model`; zero for unknown models.
    pub fn calculate(&self, model: &str, input_tokens: u64, output_tokens: u64) -> Decimal {
        self.get(model)
            .map(|pricing| pricing.calculate(input_tokens, output_tokens))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct PricingTableBuilder {
    models: HashMap<String, ModelPricing>,
}

impl PricingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(self) -> Self {
        self.model("gpt-3.5-turbo", ModelPricing::new(dec!(0.0010), dec!(0.0020)))
            .model("gpt-4", ModelPricing::new(dec!(0.03), dec!(0.06)))
            .model("gpt-4-turbo", ModelPricing::new(dec!(0.01), dec!(0.03)))
            .model(
                "gpt-4-turbo-preview",
                ModelPricing::new(dec!(0.01), dec!(0.03)),
            )
    }

    pub fn model(mut self, name: impl Into<String>, pricing: ModelPricing) -> Self {
        self.models.insert(name.into().to_lowercase(), pricing);
        self
    }

    pub fn model_rates(self, name: impl Into<String>, input: Decimal, output: Decimal) -> Self {
        self.model(name, ModelPricing::new(input, output))
    }

    /// Override rates for already-registered models from the environment:
    /// `PROMPT_GATE_PRICING_<MODEL>_INPUT` / `_OUTPUT`, with the model name
    /// uppercased and non-alphanumerics mapped to underscores.
    pub fn from_env(mut self) -> Self {
        let names: Vec<String> = self.models.keys().cloned().collect();
        for name in names {
            if let Some(pricing) = Self::parse_env_pricing(&name) {
                self.models.insert(name, pricing);
            }
        }
        self
    }

    fn parse_env_pricing(model: &str) -> Option<ModelPricing> {
        let key: String = model
            .to_uppercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let input = std::env::var(format!("PROMPT_GATE_PRICING_{key}_INPUT"))
            .ok()?
            .parse::<Decimal>()
            .ok()?;
        let output = std::env::var(format!("PROMPT_GATE_PRICING_{key}_OUTPUT"))
            .ok()?
            .parse::<Decimal>()
            .ok()?;
        Some(ModelPricing::new(input, output))
    }

    pub fn build(self) -> PricingTable {
        PricingTable {
            models: self.models,
        }
    }
}

//! Approximate request cost from token usage and a per-model pricing table.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::ConfigError;
use crate::llm::Usage;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Prices in USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    #[serde(default)]
    pub cached_input: Option<f64>,
    pub output: f64,
}

impl ModelPricing {
    const fn new(input: f64, cached_input: f64, output: f64) -> Self {
        Self {
            input,
            cached_input: Some(cached_input),
            output,
        }
    }
}

const BUILTIN_PRICING: &[(&str, ModelPricing)] = &[
    ("gpt-5.2", ModelPricing::new(1.75, 0.175, 14.00)),
    ("gpt-5.1", ModelPricing::new(1.25, 0.125, 10.00)),
    ("gpt-5", ModelPricing::new(1.25, 0.125, 10.00)),
    ("gpt-5-mini", ModelPricing::new(0.25, 0.025, 2.00)),
    ("gpt-5-nano", ModelPricing::new(0.05, 0.005, 0.40)),
    ("gpt-4.1", ModelPricing::new(2.00, 0.50, 8.00)),
    ("gpt-4.1-mini", ModelPricing::new(0.40, 0.10, 1.60)),
    ("gpt-4.1-nano", ModelPricing::new(0.10, 0.025, 0.40)),
    ("gpt-4o", ModelPricing::new(2.50, 1.25, 10.00)),
    ("gpt-4o-mini", ModelPricing::new(0.15, 0.075, 0.60)),
    ("gpt-realtime", ModelPricing::new(4.00, 0.40, 16.00)),
    ("gpt-realtime-mini", ModelPricing::new(0.60, 0.06, 2.40)),
    ("o1", ModelPricing::new(15.00, 7.50, 60.00)),
    ("o3", ModelPricing::new(2.00, 0.50, 8.00)),
];

/// Model name to pricing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PricingTable {
    models: BTreeMap<String, ModelPricing>,
}

impl PricingTable {
    /// Prices shipped with the binary.
    pub fn builtin() -> Self {
        Self {
            models: BUILTIN_PRICING
                .iter()
                .map(|(name, pricing)| (name.to_string(), *pricing))
                .collect(),
        }
    }

    /// Parse a JSON object of `model -> {input, cached_input?, output}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            models: serde_json::from_str(json)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&content).map_err(|e| ConfigError::Pricing {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded pricing for {} model(s) from {}", table.len(), path.display());
        Ok(table)
    }

    /// Pricing file from configuration, or the built-in table when none is
    /// configured or present.
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        match config.pricing_path() {
            Some((path, _)) => Self::from_file(&path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Why no cost figure could be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostUnavailable {
    UnknownModel(String),
    UsageNotReported,
}

impl fmt::Display for CostUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostUnavailable::UnknownModel(model) => write!(f, "no pricing for model '{}'", model),
            CostUnavailable::UsageNotReported => write!(f, "token usage not reported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CostEstimate {
    Estimated {
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
        usd: f64,
    },
    Unavailable(CostUnavailable),
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostEstimate::Estimated { usd, .. } => write!(f, "${:.6}", usd),
            CostEstimate::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

/// Estimate the cost of a request.
///
/// Only server-reported usage is priced; estimated token counts yield
/// [`CostUnavailable::UsageNotReported`].
pub fn estimate(table: &PricingTable, model: &str, usage: Option<&Usage>) -> CostEstimate {
    let Some(pricing) = table.get(model) else {
        return CostEstimate::Unavailable(CostUnavailable::UnknownModel(model.to_string()));
    };

    let Some(usage) = usage.filter(|u| !u.estimated) else {
        return CostEstimate::Unavailable(CostUnavailable::UsageNotReported);
    };

    let usd = (usage.prompt_tokens as f64 / TOKENS_PER_UNIT) * pricing.input
        + (usage.completion_tokens as f64 / TOKENS_PER_UNIT) * pricing.output;

    CostEstimate::Estimated {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        usd,
    }
}

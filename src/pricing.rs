//! # Pricing Module
//!
//! Provides model-specific pricing information for cost calculations.
//!
//! ## Pricing Structure
//!
//! Each model family has a per-token rate for:
//! - Input tokens
//! - Output tokens
//! - Cache creation (fixed 1.25x input price)
//! - Cache reads (fixed 0.1x input price)
//!
//! Model ids outside the table are priced at the default (Opus) tier.
//!
//! Prices can be overridden via environment variables, in USD per million
//! tokens; the override applies only when all four are set and parse:
//! - `CLAUDE_PRICE_INPUT`
//! - `CLAUDE_PRICE_OUTPUT`
//! - `CLAUDE_PRICE_CACHE_CREATE`
//! - `CLAUDE_PRICE_CACHE_READ`

use std::env;

use crate::models::TokenCounts;

pub const CACHE_CREATE_MULTIPLIER: f64 = 1.25;
pub const CACHE_READ_MULTIPLIER: f64 = 0.10;

const PER_MILLION: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    Input,
    Output,
    CacheCreate,
    CacheRead,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub in_per_tok: f64,
    pub out_per_tok: f64,
    pub cache_create_per_tok: f64,
    pub cache_read_per_tok: f64,
}

impl Pricing {
    /// Rates from input/output prices in USD per million tokens
    pub const fn per_million(input: f64, output: f64) -> Self {
        let in_pt = input * PER_MILLION;
        Self {
            in_per_tok: in_pt,
            out_per_tok: output * PER_MILLION,
            cache_create_per_tok: in_pt * CACHE_CREATE_MULTIPLIER,
            cache_read_per_tok: in_pt * CACHE_READ_MULTIPLIER,
        }
    }

    pub fn rate(&self, category: TokenCategory) -> f64 {
        match category {
            TokenCategory::Input => self.in_per_tok,
            TokenCategory::Output => self.out_per_tok,
            TokenCategory::CacheCreate => self.cache_create_per_tok,
            TokenCategory::CacheRead => self.cache_read_per_tok,
        }
    }

    pub fn cost_of(&self, counts: &TokenCounts) -> f64 {
        counts.input as f64 * self.in_per_tok
            + counts.output as f64 * self.out_per_tok
            + counts.cache_create as f64 * self.cache_create_per_tok
            + counts.cache_read as f64 * self.cache_read_per_tok
    }
}

pub const DEFAULT_PRICING: Pricing = Pricing::per_million(15.0, 75.0);

/// Known model families, most specific first
static PRICE_TABLE: &[(&str, Pricing)] = &[
    ("opus-4-6", Pricing::per_million(5.0, 25.0)),
    ("opus-4-5", Pricing::per_million(5.0, 25.0)),
    ("opus-4-1", Pricing::per_million(15.0, 75.0)),
    ("opus-4", Pricing::per_million(15.0, 75.0)),
    ("3-opus", Pricing::per_million(15.0, 75.0)),
    ("sonnet", Pricing::per_million(3.0, 15.0)),
    ("haiku-4-5", Pricing::per_million(1.0, 5.0)),
    ("3-5-haiku", Pricing::per_million(0.8, 4.0)),
    ("3-haiku", Pricing::per_million(0.25, 1.25)),
    ("haiku", Pricing::per_million(1.0, 5.0)),
    ("opus", Pricing::per_million(15.0, 75.0)),
];

/// Normalize display names and dotted versions: "Claude 3.5 Haiku" -> "claude-3-5-haiku"
fn normalize_model_id(model_id: &str) -> String {
    model_id
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '.' || c == ' ' || c == '_' { '-' } else { c })
        .collect()
}

pub(crate) fn static_pricing_lookup(model_id: &str) -> Option<Pricing> {
    let m = normalize_model_id(model_id);
    PRICE_TABLE
        .iter()
        .find(|(pattern, _)| m.contains(pattern))
        .map(|(_, p)| *p)
}

fn env_price(var: &str) -> Option<f64> {
    env::var(var)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn pricing_from_env() -> Option<Pricing> {
    let input = env_price("CLAUDE_PRICE_INPUT")?;
    let output = env_price("CLAUDE_PRICE_OUTPUT")?;
    let cache_create = env_price("CLAUDE_PRICE_CACHE_CREATE")?;
    let cache_read = env_price("CLAUDE_PRICE_CACHE_READ")?;
    Some(Pricing {
        in_per_tok: input * PER_MILLION,
        out_per_tok: output * PER_MILLION,
        cache_create_per_tok: cache_create * PER_MILLION,
        cache_read_per_tok: cache_read * PER_MILLION,
    })
}

/// Rates for a model id. Never fails: env overrides win, then the table,
/// then [`DEFAULT_PRICING`].
pub fn pricing_for_model(model_id: &str) -> Pricing {
    if let Some(p) = pricing_from_env() {
        return p;
    }
    static_pricing_lookup(model_id).unwrap_or(DEFAULT_PRICING)
}

pub fn cost(model_id: &str, category: TokenCategory, count: u64) -> f64 {
    pricing_for_model(model_id).rate(category) * count as f64
}

/// Cost of one record's counts; a missing model is priced at the default tier
pub fn record_cost(model_id: Option<&str>, counts: &TokenCounts) -> f64 {
    match model_id {
        Some(m) => pricing_for_model(m).cost_of(counts),
        None => pricing_from_env().unwrap_or(DEFAULT_PRICING).cost_of(counts),
    }
}

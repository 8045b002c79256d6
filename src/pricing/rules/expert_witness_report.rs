//! Expert witness report pricing.
//!
//! Three hourly-priced stages. Two totalisation modes exist in production
//! and both are preserved here as explicit variants:
//!
//! - `HourlyAllStages` (registered): each stage bills hourly price x hours
//!   (stage 1 has a 7 hour minimum) and every selected stage sums into the
//!   quote, with add-ons, GST, and discount on top.
//! - `FirstStageOnly`: the catalog deployment's behavior. Stages are
//!   billed individually in the breakdown at their flat prices, but only
//!   stage 1 contributes to `quote_price`. The display/total asymmetry is
//!   intentional, pending product clarification.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::{finalize_quote, quote_only};
use crate::pricing::input::{validate_stages, validation, PropertyCategory};
use crate::pricing::responses::{QuoteBreakdown, StagePrice};
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

/// Stage 1 cannot be booked for fewer hours than this.
const MIN_HOURS_STAGE_1: i64 = 7;
const MAX_STAGE: i64 = 3;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "expert_witness_report",
    catalog_type: "expert_witness_report",
    note_env: "EXPERT_WITNESS_NOTE",
    fields: &[
        TariffField {
            name: "stage_1_hourly_price",
            env_key: "EXPERT_WITNESS_STAGE_1_PRICE",
            catalog_keys: &["document_review_and_inspection_hourly_price"],
            default: 350,
        },
        TariffField {
            name: "stage_2_hourly_price",
            env_key: "EXPERT_WITNESS_STAGE_2_PRICE",
            catalog_keys: &["detailed_report_preparation_hourly_price"],
            default: 350,
        },
        TariffField {
            name: "stage_3_hourly_price",
            env_key: "EXPERT_WITNESS_STAGE_3_PRICE",
            catalog_keys: &["repair_cost_estimate_hourly_price"],
            default: 350,
        },
    ],
};

/// How selected stages roll up into the quote total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalMode {
    /// Hourly billing; every selected stage sums into the total.
    HourlyAllStages,
    /// Flat stage prices in the breakdown; only stage 1 in the total.
    FirstStageOnly,
}

fn default_hours_stage_1() -> i64 {
    MIN_HOURS_STAGE_1
}

#[derive(Debug, Deserialize)]
struct Input {
    stages: Vec<Value>,
    property_category: String,
    #[serde(default = "default_hours_stage_1")]
    number_of_hours_stage_1: i64,
    #[serde(default)]
    number_of_hours_stage_2: i64,
    #[serde(default)]
    number_of_hours_stage_3: i64,
    #[serde(default)]
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
}

fn stage_hourly_price(tariffs: &Tariffs, stage: i64) -> i64 {
    match stage {
        1 => tariffs.price("stage_1_hourly_price"),
        2 => tariffs.price("stage_2_hourly_price"),
        _ => tariffs.price("stage_3_hourly_price"),
    }
}

fn validate(input: &Input, mode: TotalMode) -> Result<Vec<i64>, AppError> {
    PropertyCategory::parse(&input.property_category)?;
    let mut selected = validate_stages(&input.stages, MAX_STAGE)?;
    selected.sort_unstable();

    // Hour minimums only apply to hourly billing.
    if mode == TotalMode::HourlyAllStages {
        if input.number_of_hours_stage_1 < MIN_HOURS_STAGE_1 {
            return Err(validation("'number_of_hours_stage_1' must be an integer >= 7"));
        }
        if input.number_of_hours_stage_2 < 0 {
            return Err(validation("'number_of_hours_stage_2' must be an integer >= 0"));
        }
        if input.number_of_hours_stage_3 < 0 {
            return Err(validation("'number_of_hours_stage_3' must be an integer >= 0"));
        }
    }
    Ok(selected)
}

fn compute(
    input: &Input,
    mode: TotalMode,
    tariffs: &Tariffs,
    addon_prices: &AddonPriceTable,
) -> Result<QuoteBreakdown, AppError> {
    let selected = validate(input, mode)?;

    match mode {
        TotalMode::HourlyAllStages => {
            let hours = |stage: i64| match stage {
                1 => input.number_of_hours_stage_1,
                2 => input.number_of_hours_stage_2,
                _ => input.number_of_hours_stage_3,
            };

            let stage_prices: Vec<StagePrice> = selected
                .iter()
                .map(|&stage| StagePrice {
                    stage,
                    price: stage_hourly_price(tariffs, stage) * hours(stage),
                })
                .collect();
            let pre_addon_price: i64 = stage_prices.iter().map(|s| s.price).sum();

            let addons = calculate_addons(&input.addons.selection(), addon_prices);
            Ok(finalize_quote(
                pre_addon_price,
                Some(stage_prices),
                addons,
                tariffs.gst_percentage(),
                input.discount,
                tariffs.note().to_string(),
            ))
        }
        TotalMode::FirstStageOnly => {
            let stage_prices: Vec<StagePrice> = selected
                .iter()
                .map(|&stage| StagePrice { stage, price: stage_hourly_price(tariffs, stage) })
                .collect();

            // Only stage 1 contributes to the total, whatever was selected.
            let quote_price = stage_hourly_price(tariffs, 1);
            Ok(quote_only(quote_price, Some(stage_prices), tariffs.note().to_string()))
        }
    }
}

#[derive(Debug)]
pub struct ExpertWitnessReport {
    mode: TotalMode,
}

impl ExpertWitnessReport {
    /// The add-on-aware variant served by the dispatcher.
    pub fn hourly() -> Self {
        Self { mode: TotalMode::HourlyAllStages }
    }

    /// The catalog deployment's variant.
    pub fn first_stage_only() -> Self {
        Self { mode: TotalMode::FirstStageOnly }
    }
}

#[async_trait]
impl PricingRule for ExpertWitnessReport {
    fn key(&self) -> &'static str {
        TARIFF_SPEC.service
    }

    async fn calculate(
        &self,
        params: Map<String, Value>,
        ctx: &PricingContext,
    ) -> Result<QuoteBreakdown, AppError> {
        let input: Input = parse_params(params)?;
        // validate before touching the tariff source
        validate(&input, self.mode)?;
        let tariffs = ctx.tariffs(&TARIFF_SPEC).await?;
        compute(&input, self.mode, &tariffs, &ctx.addon_prices)
    }
}

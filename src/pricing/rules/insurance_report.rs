//! Insurance report pricing.
//!
//! Three stages with fixed base prices. Stage 1 never varies; when the
//! estimated damage loss exceeds the threshold, every started 100k of
//! extra loss adds a configured step price to stage 2 and to stage 3
//! independently.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::{extra_above, finalize_quote, step_count};
use crate::pricing::input::{validate_stages, validation, PropertyCategory};
use crate::pricing::responses::{QuoteBreakdown, StagePrice};
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

/// Loss bucket size above the threshold.
const LOSS_STEP: i64 = 100_000;
const MAX_STAGE: i64 = 3;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "insurance_report",
    catalog_type: "insurance_report",
    note_env: "INSURANCE_NOTE",
    fields: &[
        TariffField {
            name: "stage_1_price",
            env_key: "INSURANCE_STAGE_1_PRICE",
            catalog_keys: &["document_review_and_inspection_fix_price"],
            default: 1500,
        },
        TariffField {
            name: "stage_2_price",
            env_key: "INSURANCE_STAGE_2_PRICE",
            catalog_keys: &["detailed_report_preparation_fix_price"],
            default: 1500,
        },
        TariffField {
            name: "stage_3_price",
            env_key: "INSURANCE_STAGE_3_PRICE",
            catalog_keys: &["repair_cost_estimate_fix_price"],
            default: 1500,
        },
        TariffField {
            name: "threshold_loss",
            env_key: "INSURANCE_THRESHOLD_LOSS",
            catalog_keys: &["estimated_damage_loss_up_to"],
            default: 100_000,
        },
        TariffField {
            name: "stage_2_step_price",
            env_key: "INSURANCE_STAGE_2_STEP_PRICE",
            catalog_keys: &["every_100k_loss_price_stage_2_price"],
            default: 1000,
        },
        TariffField {
            name: "stage_3_step_price",
            env_key: "INSURANCE_STAGE_3_STEP_PRICE",
            catalog_keys: &["every_100k_loss_price_stage_3_price"],
            default: 1000,
        },
    ],
};

#[derive(Debug, Deserialize)]
struct Input {
    stages: Vec<Value>,
    estimated_damage_loss: i64,
    property_category: String,
    #[serde(default)]
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
}

fn validate(input: &Input) -> Result<Vec<i64>, AppError> {
    if input.estimated_damage_loss < 0 {
        return Err(validation("'estimated_damage_loss' must be a non-negative integer"));
    }
    PropertyCategory::parse(&input.property_category)?;
    let mut selected = validate_stages(&input.stages, MAX_STAGE)?;
    selected.sort_unstable();
    Ok(selected)
}

fn compute(input: &Input, tariffs: &Tariffs, addon_prices: &AddonPriceTable) -> Result<QuoteBreakdown, AppError> {
    let selected = validate(input)?;

    let extra_loss = extra_above(input.estimated_damage_loss, tariffs.price("threshold_loss"));
    let steps = step_count(extra_loss, LOSS_STEP);

    let stage_prices: Vec<StagePrice> = selected
        .iter()
        .map(|&stage| {
            let price = match stage {
                // stage 1 is always fixed
                1 => tariffs.price("stage_1_price"),
                2 => tariffs.price("stage_2_price") + steps * tariffs.price("stage_2_step_price"),
                _ => tariffs.price("stage_3_price") + steps * tariffs.price("stage_3_step_price"),
            };
            StagePrice { stage, price }
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

#[derive(Debug)]
pub struct InsuranceReport;

#[async_trait]
impl PricingRule for InsuranceReport {
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
        validate(&input)?;
        let tariffs = ctx.tariffs(&TARIFF_SPEC).await?;
        compute(&input, &tariffs, &ctx.addon_prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;

    fn tariffs() -> Tariffs {
        let values: HashMap<&'static str, i64> =
            TARIFF_SPEC.fields.iter().map(|f| (f.name, f.default)).collect();
        Tariffs::new(values, dec!(10), String::new())
    }

    fn input(stages: Vec<Value>, loss: i64) -> Input {
        Input {
            stages,
            estimated_damage_loss: loss,
            property_category: "residential".to_string(),
            discount: 0,
            addons: AddonParams::default(),
        }
    }

    fn no_addons() -> AddonPriceTable {
        AddonPriceTable::from_pairs(&[])
    }

    #[test]
    fn test_loss_steps_hit_stages_two_and_three_only() {
        // 250k loss, 100k threshold -> 150k extra -> 2 steps of 1000
        let quote = compute(
            &input(vec![json!(1), json!(2), json!(3)], 250_000),
            &tariffs(),
            &no_addons(),
        )
        .unwrap();
        let stages = quote.stage_prices.as_ref().unwrap();
        assert_eq!(stages[0], StagePrice { stage: 1, price: 1500 });
        assert_eq!(stages[1], StagePrice { stage: 2, price: 3500 });
        assert_eq!(stages[2], StagePrice { stage: 3, price: 3500 });
        assert_eq!(quote.quote_price, 8500);
    }

    #[test]
    fn test_no_steps_at_or_below_threshold() {
        let quote = compute(
            &input(vec![json!(1), json!(2), json!(3)], 100_000),
            &tariffs(),
            &no_addons(),
        )
        .unwrap();
        assert_eq!(quote.quote_price, 4500);
    }

    #[test]
    fn test_partial_bucket_rounds_up() {
        // 100_001 loss -> 1 extra -> one full step
        let quote = compute(&input(vec![json!(2)], 100_001), &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 2500);
    }

    #[test]
    fn test_different_step_prices_per_stage() {
        let mut values: HashMap<&'static str, i64> =
            TARIFF_SPEC.fields.iter().map(|f| (f.name, f.default)).collect();
        values.insert("stage_2_step_price", 800);
        values.insert("stage_3_step_price", 1200);
        let tariffs = Tariffs::new(values, dec!(10), String::new());

        let quote =
            compute(&input(vec![json!(2), json!(3)], 200_000), &tariffs, &no_addons()).unwrap();
        let stages = quote.stage_prices.as_ref().unwrap();
        assert_eq!(stages[0].price, 1500 + 800);
        assert_eq!(stages[1].price, 1500 + 1200);
    }

    #[test]
    fn test_validation() {
        assert!(compute(&input(vec![json!(1)], -1), &tariffs(), &no_addons()).is_err());
        assert!(compute(&input(vec![json!(4)], 0), &tariffs(), &no_addons()).is_err());
        assert!(compute(&input(vec![], 0), &tariffs(), &no_addons()).is_err());
        let mut bad = input(vec![json!(1)], 0);
        bad.property_category = "house".to_string();
        assert!(compute(&bad, &tariffs(), &no_addons()).is_err());
    }
}

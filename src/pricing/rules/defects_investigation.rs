//! Defects investigation pricing.
//!
//! Two stages with flat configured prices, simply summed. No surcharges.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::finalize_quote;
use crate::pricing::input::{validate_stages, PropertyCategory};
use crate::pricing::responses::{QuoteBreakdown, StagePrice};
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

const MAX_STAGE: i64 = 2;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "defects_investigation",
    catalog_type: "defects_investigation",
    note_env: "DEFECTS_INVESTIGATION_NOTE",
    fields: &[
        TariffField {
            name: "stage_1_price",
            env_key: "DEFECTS_INVESTIGATION_STAGE_1_PRICE",
            catalog_keys: &["document_review_and_inspection_fix_price"],
            default: 1500,
        },
        TariffField {
            name: "stage_2_price",
            env_key: "DEFECTS_INVESTIGATION_STAGE_2_PRICE",
            catalog_keys: &["detailed_report_preparation_fix_price"],
            default: 1500,
        },
    ],
};

#[derive(Debug, Deserialize)]
struct Input {
    stages: Vec<Value>,
    property_category: String,
    #[serde(default)]
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
}

fn validate(input: &Input) -> Result<Vec<i64>, AppError> {
    PropertyCategory::parse(&input.property_category)?;
    let mut selected = validate_stages(&input.stages, MAX_STAGE)?;
    selected.sort_unstable();
    Ok(selected)
}

fn compute(input: &Input, tariffs: &Tariffs, addon_prices: &AddonPriceTable) -> Result<QuoteBreakdown, AppError> {
    let selected = validate(input)?;

    let stage_prices: Vec<StagePrice> = selected
        .iter()
        .map(|&stage| StagePrice {
            stage,
            price: if stage == 1 {
                tariffs.price("stage_1_price")
            } else {
                tariffs.price("stage_2_price")
            },
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
pub struct DefectsInvestigation;

#[async_trait]
impl PricingRule for DefectsInvestigation {
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

    fn input(stages: Vec<Value>) -> Input {
        Input {
            stages,
            property_category: "commercial".to_string(),
            discount: 0,
            addons: AddonParams::default(),
        }
    }

    fn no_addons() -> AddonPriceTable {
        AddonPriceTable::from_pairs(&[])
    }

    #[test]
    fn test_simple_sum_of_selected_stages() {
        let quote = compute(&input(vec![json!(1), json!(2)]), &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 3000);
        assert_eq!(quote.gst, Some(300));
        assert_eq!(quote.stage_prices.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_single_stage() {
        let quote = compute(&input(vec![json!(2)]), &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 1500);
        assert_eq!(
            quote.stage_prices.as_ref().unwrap()[0],
            StagePrice { stage: 2, price: 1500 }
        );
    }

    #[test]
    fn test_stage_three_is_out_of_range() {
        assert!(compute(&input(vec![json!(3)]), &tariffs(), &no_addons()).is_err());
    }

    #[test]
    fn test_invalid_category() {
        let mut bad = input(vec![json!(1)]);
        bad.property_category = "office".to_string();
        assert!(compute(&bad, &tariffs(), &no_addons()).is_err());
    }
}

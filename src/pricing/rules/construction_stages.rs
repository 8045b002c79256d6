//! Construction stage inspection pricing (catalog-priced variant).
//!
//! Customers buy any subset of stages 1..6, each with its own base price.
//! Area above 25 sq adds a step surcharge to every selected stage; extra
//! levels and the granny flat are quote-level surcharges. No add-on, GST,
//! or discount layer.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::calculators::{extra_above, quote_only, step_count};
use crate::pricing::input::{validate_stages, validation, PropertyCategory};
use crate::pricing::responses::{QuoteBreakdown, StagePrice};
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

/// Up to this area there is no area surcharge.
pub(crate) const INCLUDED_AREA_SQ: i64 = 25;
/// Each block of 1..5 sq above the inclusion adds one step surcharge.
pub(crate) const AREA_STEP_SQ: i64 = 5;
const INCLUDED_LEVELS: i64 = 1;
const MAX_STAGE: i64 = 6;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "construction_stages",
    catalog_type: "construction_stages",
    note_env: "CONSTRUCTION_NOTE",
    fields: &[
        TariffField {
            name: "stage_1_price",
            env_key: "CONSTRUCTION_STAGE_1_PRICE",
            catalog_keys: &["bored_piers_screw_piles_price"],
            default: 490,
        },
        TariffField {
            name: "stage_2_price",
            env_key: "CONSTRUCTION_STAGE_2_PRICE",
            catalog_keys: &["slab_pre_pour_price"],
            default: 490,
        },
        TariffField {
            name: "stage_3_price",
            env_key: "CONSTRUCTION_STAGE_3_PRICE",
            catalog_keys: &["frame_inspection_price"],
            default: 490,
        },
        TariffField {
            name: "stage_4_price",
            env_key: "CONSTRUCTION_STAGE_4_PRICE",
            catalog_keys: &["lockup_pre_plaster_price"],
            default: 490,
        },
        TariffField {
            name: "stage_5_price",
            env_key: "CONSTRUCTION_STAGE_5_PRICE",
            catalog_keys: &["fixing_including_waterproofing_price"],
            default: 490,
        },
        TariffField {
            name: "stage_6_price",
            env_key: "CONSTRUCTION_STAGE_6_PRICE",
            catalog_keys: &["completion_pci_pre_handover_price"],
            default: 590,
        },
        TariffField {
            name: "extra_level_price",
            env_key: "CONSTRUCTION_EXTRA_LEVEL_PRICE",
            catalog_keys: &["extra_level_price"],
            default: 50,
        },
        TariffField {
            name: "extra_5_sq_price",
            env_key: "CONSTRUCTION_EXTRA_5_SQ_PRICE",
            catalog_keys: &["extra_5_sq_price"],
            default: 50,
        },
        TariffField {
            name: "granny_flat_price",
            env_key: "CONSTRUCTION_GRANNY_FLAT_PRICE",
            catalog_keys: &["granny_flat_price"],
            default: 300,
        },
    ],
};

pub(crate) fn stage_field(stage: i64) -> &'static str {
    match stage {
        1 => "stage_1_price",
        2 => "stage_2_price",
        3 => "stage_3_price",
        4 => "stage_4_price",
        5 => "stage_5_price",
        _ => "stage_6_price",
    }
}

fn default_levels() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct Input {
    stages: Vec<Value>,
    area_sq: i64,
    property_category: String,
    #[serde(default = "default_levels")]
    levels: i64,
    #[serde(default)]
    granny_flat: bool,
}

fn validate(input: &Input) -> Result<Vec<i64>, AppError> {
    if input.area_sq < 0 {
        return Err(validation("'area_sq' must be a non-negative integer"));
    }
    if input.levels < 1 {
        return Err(validation("'levels' must be an integer >= 1"));
    }
    PropertyCategory::parse(&input.property_category)?;
    let mut selected = validate_stages(&input.stages, MAX_STAGE)?;
    selected.sort_unstable();
    Ok(selected)
}

fn compute(input: &Input, tariffs: &Tariffs) -> Result<QuoteBreakdown, AppError> {
    let selected = validate(input)?;

    let area_steps = step_count(extra_above(input.area_sq, INCLUDED_AREA_SQ), AREA_STEP_SQ);
    let per_stage_area_surcharge = area_steps * tariffs.price("extra_5_sq_price");

    let stage_prices: Vec<StagePrice> = selected
        .iter()
        .map(|&stage| StagePrice {
            stage,
            price: tariffs.price(stage_field(stage)) + per_stage_area_surcharge,
        })
        .collect();
    let stages_component: i64 = stage_prices.iter().map(|s| s.price).sum();

    let levels_surcharge =
        extra_above(input.levels, INCLUDED_LEVELS) * tariffs.price("extra_level_price");
    let granny_surcharge = if input.granny_flat { tariffs.price("granny_flat_price") } else { 0 };

    let quote_price = stages_component + levels_surcharge + granny_surcharge;
    Ok(quote_only(quote_price, Some(stage_prices), tariffs.note().to_string()))
}

#[derive(Debug)]
pub struct ConstructionStages;

#[async_trait]
impl PricingRule for ConstructionStages {
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
        compute(&input, &tariffs)
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

    fn input(stages: Vec<Value>, area_sq: i64) -> Input {
        Input {
            stages,
            area_sq,
            property_category: "residential".to_string(),
            levels: 1,
            granny_flat: false,
        }
    }

    #[test]
    fn test_area_steps_apply_to_every_selected_stage() {
        // 35 sq -> 10 extra -> 2 steps -> +100 per stage
        let quote = compute(&input(vec![json!(1), json!(3)], 35), &tariffs()).unwrap();
        let stages = quote.stage_prices.as_ref().unwrap();
        assert_eq!(stages[0], StagePrice { stage: 1, price: 590 });
        assert_eq!(stages[1], StagePrice { stage: 3, price: 590 });
        assert_eq!(quote.quote_price, 1180);
        assert_eq!(quote.gst, None);
    }

    #[test]
    fn test_no_surcharge_at_or_below_inclusion() {
        let quote = compute(&input(vec![json!(6)], 25), &tariffs()).unwrap();
        assert_eq!(quote.quote_price, 590);
    }

    #[test]
    fn test_levels_and_granny_flat_are_quote_level() {
        let mut input = input(vec![json!(1), json!(2)], 20);
        input.levels = 3;
        input.granny_flat = true;
        let quote = compute(&input, &tariffs()).unwrap();
        // stages 490 + 490, +2 extra levels * 50, +300 granny flat
        assert_eq!(quote.quote_price, 980 + 100 + 300);
        // per-stage prices unchanged by levels/granny
        assert_eq!(quote.stage_prices.as_ref().unwrap()[0].price, 490);
    }

    #[test]
    fn test_stage_breakdown_is_sorted_and_deduplicated() {
        let quote = compute(&input(vec![json!(5), json!(2), json!(5)], 0), &tariffs()).unwrap();
        let stages: Vec<i64> = quote.stage_prices.unwrap().iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec![2, 5]);
    }

    #[test]
    fn test_validation() {
        assert!(compute(&input(vec![json!(1)], -1), &tariffs()).is_err());
        assert!(compute(&input(vec![], 10), &tariffs()).is_err());
        assert!(compute(&input(vec![json!(7)], 10), &tariffs()).is_err());

        let mut bad = input(vec![json!(1)], 10);
        bad.levels = 0;
        assert!(compute(&bad, &tariffs()).is_err());
    }
}

//! Construction stage inspection pricing (add-on-aware variant).
//!
//! Same stage/area structure as the catalog variant, with two per-stage
//! differences: the granny-flat surcharge is added to every selected stage
//! rather than once, and the out-of-area travel cost (per-km price x km)
//! is folded into every stage price instead of the add-on layer. Levels
//! stay a quote-level surcharge. Remaining add-ons, GST, and the discount
//! apply on top.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::{extra_above, finalize_quote, step_count};
use crate::pricing::input::{validate_stages, validation, PropertyCategory};
use crate::pricing::responses::{QuoteBreakdown, StagePrice};
use crate::pricing::rules::construction_stages::{stage_field, AREA_STEP_SQ, INCLUDED_AREA_SQ};
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{trunc_to_i64, ServiceTariffSpec, TariffField, Tariffs};

use rust_decimal::Decimal;

const INCLUDED_LEVELS: i64 = 1;
const MAX_STAGE: i64 = 6;

// The stage tariffs are shared with the catalog variant: same environment
// variables, own catalog row label.
pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "new_construction_stages",
    catalog_type: "new_construction_stages",
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
    #[serde(default)]
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
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

fn compute(input: &Input, tariffs: &Tariffs, addon_prices: &AddonPriceTable) -> Result<QuoteBreakdown, AppError> {
    let selected = validate(input)?;

    let area_steps = step_count(extra_above(input.area_sq, INCLUDED_AREA_SQ), AREA_STEP_SQ);
    let per_stage_area_surcharge = area_steps * tariffs.price("extra_5_sq_price");

    let per_stage_granny_surcharge =
        if input.granny_flat { tariffs.price("granny_flat_price") } else { 0 };

    // Travel is billed into every stage price, not through the add-on layer.
    let km = input.addons.out_of_area_travel_surcharge_per_km.max(0);
    let per_km = addon_prices.price_per_km().unwrap_or(Decimal::ZERO);
    let per_stage_travel_surcharge = trunc_to_i64(per_km * Decimal::from(km));

    let stage_prices: Vec<StagePrice> = selected
        .iter()
        .map(|&stage| StagePrice {
            stage,
            price: tariffs.price(stage_field(stage))
                + per_stage_area_surcharge
                + per_stage_granny_surcharge
                + per_stage_travel_surcharge,
        })
        .collect();
    let stages_component: i64 = stage_prices.iter().map(|s| s.price).sum();

    let levels_surcharge =
        extra_above(input.levels, INCLUDED_LEVELS) * tariffs.price("extra_level_price");

    let pre_addon_price = stages_component + levels_surcharge;

    let addons = calculate_addons(&input.addons.selection_without_travel(), addon_prices);
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
pub struct NewConstructionStages;

#[async_trait]
impl PricingRule for NewConstructionStages {
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

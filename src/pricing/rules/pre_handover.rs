//! Pre-handover inspection pricing.
//!
//! Branches on the property type: houses reuse the construction stage-6
//! shape (base price, area steps, granny flat, extra levels); apartments
//! reuse the pre-settlement room allocation. Add-ons, GST, and the
//! discount apply to both paths.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::{
    allocated_rooms_charge, extra_above, finalize_quote, step_count,
};
use crate::pricing::input::{validation, PropertyCategory, PropertyType};
use crate::pricing::responses::QuoteBreakdown;
use crate::pricing::rules::construction_stages::{AREA_STEP_SQ, INCLUDED_AREA_SQ};
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

const INCLUDED_COMBINED_ROOMS: i64 = 2;
const INCLUDED_LEVELS: i64 = 1;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "pre_handover",
    catalog_type: "pre_handover",
    note_env: "PRE_HANDOVER_NOTE",
    fields: &[
        // House path (stage-6 shape)
        TariffField {
            name: "house_base_price",
            env_key: "PRE_HANDOVER_HOUSE_BASE_PRICE",
            catalog_keys: &["house_base_price"],
            default: 590,
        },
        TariffField {
            name: "extra_5_sq_price",
            env_key: "PRE_HANDOVER_EXTRA_5_SQ_PRICE",
            catalog_keys: &["extra_5_sq_price"],
            default: 50,
        },
        TariffField {
            name: "extra_level_price",
            env_key: "PRE_HANDOVER_EXTRA_LEVEL_PRICE",
            catalog_keys: &["extra_level_price"],
            default: 50,
        },
        TariffField {
            name: "granny_flat_price",
            env_key: "PRE_HANDOVER_GRANNY_FLAT_PRICE",
            catalog_keys: &["granny_flat_price"],
            default: 300,
        },
        // Apartment path (pre-settlement shape)
        TariffField {
            name: "apartment_base_price",
            env_key: "PRE_HANDOVER_APARTMENT_BASE_PRICE",
            catalog_keys: &["apartment_base_price"],
            default: 400,
        },
        TariffField {
            name: "bedroom_price",
            env_key: "PRE_HANDOVER_BEDROOM_PRICE",
            catalog_keys: &["bedrooms_price", "bedroom_price"],
            default: 50,
        },
        TariffField {
            name: "bathroom_price",
            env_key: "PRE_HANDOVER_BATHROOM_PRICE",
            catalog_keys: &["bathroom_price"],
            default: 50,
        },
    ],
};

fn default_levels() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct Input {
    property_type: String,
    property_category: String,
    #[serde(default)]
    bedrooms: i64,
    #[serde(default)]
    bathrooms: i64,
    #[serde(default)]
    area_sq: i64,
    #[serde(default = "default_levels")]
    levels: i64,
    #[serde(default)]
    granny_flat: bool,
    #[serde(default)]
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
}

fn validate(input: &Input) -> Result<PropertyType, AppError> {
    let property_type = PropertyType::parse(&input.property_type)?;
    PropertyCategory::parse(&input.property_category)?;

    match property_type {
        PropertyType::House => {
            if input.area_sq < 0 {
                return Err(validation("'area_sq' must be a non-negative integer"));
            }
            if input.levels < 1 {
                return Err(validation("'levels' must be an integer >= 1"));
            }
        }
        PropertyType::Apartment => {
            if input.bedrooms < 0 || input.bathrooms < 0 {
                return Err(validation("Bedrooms and bathrooms must be non-negative integers."));
            }
        }
    }
    Ok(property_type)
}

fn compute(input: &Input, tariffs: &Tariffs, addon_prices: &AddonPriceTable) -> Result<QuoteBreakdown, AppError> {
    let property_type = validate(input)?;

    let pre_addon_price = match property_type {
        PropertyType::House => {
            let area_steps = step_count(extra_above(input.area_sq, INCLUDED_AREA_SQ), AREA_STEP_SQ);
            let area_surcharge = area_steps * tariffs.price("extra_5_sq_price");
            let granny_surcharge =
                if input.granny_flat { tariffs.price("granny_flat_price") } else { 0 };
            let levels_surcharge =
                extra_above(input.levels, INCLUDED_LEVELS) * tariffs.price("extra_level_price");

            tariffs.price("house_base_price") + area_surcharge + granny_surcharge + levels_surcharge
        }
        PropertyType::Apartment => {
            let rooms_charge = allocated_rooms_charge(
                input.bedrooms,
                input.bathrooms,
                tariffs.price("bedroom_price"),
                tariffs.price("bathroom_price"),
                INCLUDED_COMBINED_ROOMS,
            );

            tariffs.price("apartment_base_price") + rooms_charge
        }
    };

    let addons = calculate_addons(&input.addons.selection(), addon_prices);
    Ok(finalize_quote(
        pre_addon_price,
        None,
        addons,
        tariffs.gst_percentage(),
        input.discount,
        tariffs.note().to_string(),
    ))
}

#[derive(Debug)]
pub struct PreHandover;

#[async_trait]
impl PricingRule for PreHandover {
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

//! Dilapidation inspection pricing.
//!
//! Same room/level/basement/granny-flat rule as pre-purchase, but priced
//! straight from the shared services catalog: no add-on layer, no GST, no
//! discount. The quote is the price.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::calculators::{
    combined_rooms_charge, extra_above, preferred_unit_price, quote_only,
};
use crate::pricing::input::{validation, PropertyCategory};
use crate::pricing::responses::QuoteBreakdown;
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

const INCLUDED_COMBINED_ROOMS: i64 = 2;
const INCLUDED_LEVELS: i64 = 1;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "dilapidation",
    catalog_type: "dilapidation",
    note_env: "DILAPIDATION_NOTE",
    fields: &[
        TariffField {
            name: "base_price",
            env_key: "DILAPIDATION_BASE_PRICE",
            catalog_keys: &["base_price"],
            default: 400,
        },
        TariffField {
            name: "bedroom_price",
            env_key: "DILAPIDATION_BEDROOM_PRICE",
            catalog_keys: &["bedrooms_price", "bedroom_price"],
            default: 50,
        },
        TariffField {
            name: "bathroom_price",
            env_key: "DILAPIDATION_BATHROOM_PRICE",
            catalog_keys: &["bathroom_price"],
            default: 50,
        },
        TariffField {
            name: "extra_level_price",
            env_key: "DILAPIDATION_EXTRA_LEVEL_PRICE",
            catalog_keys: &["extra_level_price"],
            default: 100,
        },
        TariffField {
            name: "basement_price",
            env_key: "DILAPIDATION_BASEMENT_PRICE",
            catalog_keys: &["basement_price"],
            default: 150,
        },
        TariffField {
            name: "granny_flat_price",
            env_key: "DILAPIDATION_GRANNY_FLAT_PRICE",
            catalog_keys: &["granny_flat_price"],
            default: 350,
        },
    ],
};

#[derive(Debug, Deserialize)]
struct Input {
    bedrooms: i64,
    bathrooms: i64,
    property_category: String,
    #[serde(default)]
    levels: i64,
    #[serde(default)]
    basement: bool,
    #[serde(default)]
    granny_flat: bool,
}

fn validate(input: &Input) -> Result<(), AppError> {
    if input.bedrooms < 0 || input.bathrooms < 0 || input.levels < 0 {
        return Err(validation(
            "Bedrooms, bathrooms, and levels must be non-negative integers.",
        ));
    }
    PropertyCategory::parse(&input.property_category)?;
    Ok(())
}

fn compute(input: &Input, tariffs: &Tariffs) -> Result<QuoteBreakdown, AppError> {
    validate(input)?;

    let unit_price =
        preferred_unit_price(tariffs.price("bedroom_price"), tariffs.price("bathroom_price"));
    let rooms_charge =
        combined_rooms_charge(input.bedrooms, input.bathrooms, unit_price, INCLUDED_COMBINED_ROOMS);
    let levels_charge = extra_above(input.levels, INCLUDED_LEVELS) * tariffs.price("extra_level_price");
    let basement_charge = if input.basement { tariffs.price("basement_price") } else { 0 };
    let granny_flat_charge = if input.granny_flat { tariffs.price("granny_flat_price") } else { 0 };

    let quote_price = tariffs.price("base_price")
        + rooms_charge
        + levels_charge
        + basement_charge
        + granny_flat_charge;

    Ok(quote_only(quote_price, None, tariffs.note().to_string()))
}

#[derive(Debug)]
pub struct Dilapidation;

#[async_trait]
impl PricingRule for Dilapidation {
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

//! Drug resistance testing pricing.
//!
//! Fixed base price, no stage structure. Only add-ons, GST, and the
//! discount vary the quote.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::finalize_quote;
use crate::pricing::input::PropertyCategory;
use crate::pricing::responses::QuoteBreakdown;
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "drug_resistance",
    catalog_type: "drug_resistance",
    note_env: "DRUG_RESISTANCE_NOTE",
    fields: &[TariffField {
        name: "base_price",
        env_key: "DRUG_RESISTANCE_BASE_PRICE",
        catalog_keys: &["base_price"],
        default: 400,
    }],
};

#[derive(Debug, Deserialize)]
struct Input {
    property_category: String,
    #[serde(default)]
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
}

fn validate(input: &Input) -> Result<(), AppError> {
    PropertyCategory::parse(&input.property_category)?;
    Ok(())
}

fn compute(input: &Input, tariffs: &Tariffs, addon_prices: &AddonPriceTable) -> Result<QuoteBreakdown, AppError> {
    validate(input)?;

    let addons = calculate_addons(&input.addons.selection(), addon_prices);
    Ok(finalize_quote(
        tariffs.price("base_price"),
        None,
        addons,
        tariffs.gst_percentage(),
        input.discount,
        tariffs.note().to_string(),
    ))
}

#[derive(Debug)]
pub struct DrugResistance;

#[async_trait]
impl PricingRule for DrugResistance {
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

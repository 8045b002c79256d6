//! Apartment pre-settlement inspection pricing.
//!
//! The base price covers 2 combined rooms. Unlike pre-purchase, extra
//! bedrooms and bathrooms are charged at their own unit prices, with the
//! free slots allocated to the pricier room type first. Levels are never
//! charged for apartments.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::{allocated_rooms_charge, finalize_quote};
use crate::pricing::input::{validation, PropertyCategory};
use crate::pricing::responses::QuoteBreakdown;
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

const INCLUDED_COMBINED_ROOMS: i64 = 2;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "apartment_pre_settlement",
    // The catalog labels this service with dashes.
    catalog_type: "apartment-pre-settlement",
    note_env: "APARTMENT_PRE_SETTLEMENT_NOTE",
    fields: &[
        TariffField {
            name: "base_price",
            env_key: "APARTMENT_PRE_SETTLEMENT_BASE_PRICE",
            catalog_keys: &["base_price"],
            default: 400,
        },
        TariffField {
            name: "bedroom_price",
            env_key: "APARTMENT_PRE_SETTLEMENT_BEDROOM_PRICE",
            catalog_keys: &["bedrooms_price", "bedroom_price"],
            default: 50,
        },
        TariffField {
            name: "bathroom_price",
            env_key: "APARTMENT_PRE_SETTLEMENT_BATHROOM_PRICE",
            catalog_keys: &["bathroom_price"],
            default: 50,
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
    discount: i64,
    #[serde(flatten)]
    addons: AddonParams,
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

fn compute(input: &Input, tariffs: &Tariffs, addon_prices: &AddonPriceTable) -> Result<QuoteBreakdown, AppError> {
    validate(input)?;

    let rooms_charge = allocated_rooms_charge(
        input.bedrooms,
        input.bathrooms,
        tariffs.price("bedroom_price"),
        tariffs.price("bathroom_price"),
        INCLUDED_COMBINED_ROOMS,
    );

    let pre_addon_price = tariffs.price("base_price") + rooms_charge;

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
pub struct ApartmentPreSettlement;

#[async_trait]
impl PricingRule for ApartmentPreSettlement {
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
    use std::collections::HashMap;

    fn tariffs_with(bedroom: i64, bathroom: i64) -> Tariffs {
        let mut values: HashMap<&'static str, i64> =
            TARIFF_SPEC.fields.iter().map(|f| (f.name, f.default)).collect();
        values.insert("bedroom_price", bedroom);
        values.insert("bathroom_price", bathroom);
        Tariffs::new(values, dec!(10), String::new())
    }

    fn input(bedrooms: i64, bathrooms: i64) -> Input {
        Input {
            bedrooms,
            bathrooms,
            property_category: "residential".to_string(),
            levels: 0,
            discount: 0,
            addons: AddonParams::default(),
        }
    }

    fn no_addons() -> AddonPriceTable {
        AddonPriceTable::from_pairs(&[])
    }

    #[test]
    fn test_free_rooms_consume_pricier_type_first() {
        // bedroom 50 > bathroom 40: both free slots go to bedrooms,
        // both bathrooms charged at 40 -> 400 + 80 = 480
        let quote = compute(&input(2, 2), &tariffs_with(50, 40), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 480);
        assert_eq!(quote.gst, Some(48));
        assert_eq!(quote.price_including_gst, Some(528));
    }

    #[test]
    fn test_free_rooms_mirrored_when_bathrooms_pricier() {
        let quote = compute(&input(2, 2), &tariffs_with(40, 50), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 480);
    }

    #[test]
    fn test_levels_are_never_charged() {
        let mut input = input(1, 1);
        input.levels = 5;
        let quote = compute(&input, &tariffs_with(50, 50), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 400);
    }

    #[test]
    fn test_spillover_to_other_type() {
        // one bedroom uses one free slot, the other slot covers a bathroom,
        // remaining 2 bathrooms at 40
        let quote = compute(&input(1, 3), &tariffs_with(50, 40), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 400 + 80);
    }

    #[test]
    fn test_validation() {
        assert!(compute(&input(-1, 0), &tariffs_with(50, 40), &no_addons()).is_err());
        let mut bad = input(1, 1);
        bad.property_category = "villa".to_string();
        assert!(compute(&bad, &tariffs_with(50, 40), &no_addons()).is_err());
    }

    #[test]
    fn test_idempotent_for_same_input() {
        let a = compute(&input(2, 2), &tariffs_with(50, 40), &no_addons()).unwrap();
        let b = compute(&input(2, 2), &tariffs_with(50, 40), &no_addons()).unwrap();
        assert_eq!(a, b);
    }
}

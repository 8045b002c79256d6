//! Pre-purchase inspection pricing.
//!
//! The base price covers 2 combined rooms (bedrooms + bathrooms) and the
//! first level. Extra rooms are charged at a single unit price, extra
//! levels per level, and the basement/granny-flat options as flat
//! surcharges. Add-ons, GST, and the discount apply on top.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::addons::{calculate_addons, AddonParams, AddonPriceTable};
use crate::pricing::calculators::{
    combined_rooms_charge, extra_above, finalize_quote, preferred_unit_price,
};
use crate::pricing::input::{validation, PropertyCategory};
use crate::pricing::responses::QuoteBreakdown;
use crate::pricing::rules::{parse_params, PricingRule};
use crate::pricing::source::PricingContext;
use crate::pricing::tariffs::{ServiceTariffSpec, TariffField, Tariffs};

/// Combined bedrooms + bathrooms covered by the base price.
const INCLUDED_COMBINED_ROOMS: i64 = 2;
/// First level covered by the base price.
const INCLUDED_LEVELS: i64 = 1;

pub const TARIFF_SPEC: ServiceTariffSpec = ServiceTariffSpec {
    service: "pre_purchase",
    catalog_type: "pre_purchase",
    note_env: "PRE_PURCHASE_NOTE",
    fields: &[
        TariffField {
            name: "base_price",
            env_key: "PRE_PURCHASE_BASE_PRICE",
            catalog_keys: &["base_price"],
            default: 400,
        },
        TariffField {
            name: "bedroom_price",
            env_key: "PRE_PURCHASE_BEDROOM_PRICE",
            catalog_keys: &["bedrooms_price", "bedroom_price"],
            default: 50,
        },
        TariffField {
            name: "bathroom_price",
            env_key: "PRE_PURCHASE_BATHROOM_PRICE",
            catalog_keys: &["bathroom_price"],
            default: 50,
        },
        TariffField {
            name: "extra_level_price",
            env_key: "PRE_PURCHASE_EXTRA_LEVEL_PRICE",
            catalog_keys: &["extra_level_price"],
            default: 100,
        },
        TariffField {
            name: "basement_price",
            env_key: "PRE_PURCHASE_BASEMENT_PRICE",
            catalog_keys: &["basement_price"],
            default: 150,
        },
        TariffField {
            name: "granny_flat_price",
            env_key: "PRE_PURCHASE_GRANNY_FLAT_PRICE",
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

    let unit_price =
        preferred_unit_price(tariffs.price("bedroom_price"), tariffs.price("bathroom_price"));
    let rooms_charge =
        combined_rooms_charge(input.bedrooms, input.bathrooms, unit_price, INCLUDED_COMBINED_ROOMS);
    let levels_charge = extra_above(input.levels, INCLUDED_LEVELS) * tariffs.price("extra_level_price");
    let basement_charge = if input.basement { tariffs.price("basement_price") } else { 0 };
    let granny_flat_charge = if input.granny_flat { tariffs.price("granny_flat_price") } else { 0 };

    let pre_addon_price = tariffs.price("base_price")
        + rooms_charge
        + levels_charge
        + basement_charge
        + granny_flat_charge;

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
pub struct PrePurchase;

#[async_trait]
impl PricingRule for PrePurchase {
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

    fn tariffs() -> Tariffs {
        let values: HashMap<&'static str, i64> = TARIFF_SPEC
            .fields
            .iter()
            .map(|f| (f.name, f.default))
            .collect();
        Tariffs::new(values, dec!(10), String::new())
    }

    fn input(bedrooms: i64, bathrooms: i64, levels: i64) -> Input {
        Input {
            bedrooms,
            bathrooms,
            property_category: "residential".to_string(),
            levels,
            basement: false,
            granny_flat: false,
            discount: 0,
            addons: AddonParams::default(),
        }
    }

    fn no_addons() -> AddonPriceTable {
        AddonPriceTable::from_pairs(&[])
    }

    #[test]
    fn test_base_price_covers_two_rooms_and_one_level() {
        let quote = compute(&input(1, 1, 1), &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 400);
        assert_eq!(quote.gst, Some(40));
        assert_eq!(quote.price_including_gst, Some(440));
        assert_eq!(quote.payable_price, Some(440));
    }

    #[test]
    fn test_extra_rooms_and_levels_charged() {
        // 5 rooms total -> 3 extra at 50; 3 levels -> 2 extra at 100
        let quote = compute(&input(3, 2, 3), &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 400 + 150 + 200);
    }

    #[test]
    fn test_basement_and_granny_flat_surcharges() {
        let mut input = input(1, 1, 1);
        input.basement = true;
        input.granny_flat = true;
        let quote = compute(&input, &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.quote_price, 400 + 150 + 350);
    }

    #[test]
    fn test_addons_fold_into_quote() {
        let table = AddonPriceTable::from_pairs(&[("pest_inspection", Some(dec!(80)))]);
        let mut input = input(1, 1, 1);
        input.addons.pest_inspection = true;
        let quote = compute(&input, &tariffs(), &table).unwrap();
        assert_eq!(quote.quote_price, 480);
        assert_eq!(quote.addons_total, Some(80));
        assert_eq!(quote.addons.as_ref().unwrap()[0].name, "pest_inspection");
    }

    #[test]
    fn test_discount_applies_after_gst() {
        let mut input = input(1, 1, 1);
        input.discount = 100;
        let quote = compute(&input, &tariffs(), &no_addons()).unwrap();
        assert_eq!(quote.price_including_gst, Some(440));
        assert_eq!(quote.payable_price, Some(340));
    }

    #[test]
    fn test_negative_counts_rejected() {
        let err = compute(&input(-1, 1, 0), &tariffs(), &no_addons()).unwrap_err();
        assert!(err.to_string().contains("non-negative"));
        assert!(compute(&input(1, -1, 0), &tariffs(), &no_addons()).is_err());
        assert!(compute(&input(1, 1, -1), &tariffs(), &no_addons()).is_err());
    }

    #[test]
    fn test_invalid_category_rejected() {
        let mut input = input(1, 1, 1);
        input.property_category = "home".to_string();
        let err = compute(&input, &tariffs(), &no_addons()).unwrap_err();
        assert!(err.to_string().contains("property_category"));
    }

    #[test]
    fn test_bathroom_price_used_when_bedroom_price_unset() {
        let mut values: HashMap<&'static str, i64> =
            TARIFF_SPEC.fields.iter().map(|f| (f.name, f.default)).collect();
        values.insert("bedroom_price", 0);
        values.insert("bathroom_price", 60);
        let tariffs = Tariffs::new(values, dec!(10), String::new());

        let quote = compute(&input(3, 1, 1), &tariffs, &no_addons()).unwrap();
        // 2 extra rooms at the bathroom price
        assert_eq!(quote.quote_price, 400 + 120);
    }
}

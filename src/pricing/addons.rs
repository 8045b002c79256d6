//! Add-on pricing applied uniformly across services.
//!
//! Add-ons are priced independently of the core service rules. Unit prices
//! come from `ADDON_*` environment variables; an unset variable or the
//! sentinel value `XXX` marks the add-on as currently unpriced.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// The travel surcharge is the only quantity-based add-on (km driven).
pub const ADDON_TRAVEL_PER_KM: &str = "out_of_area_travel_surcharge_per_km";

/// Priced add-on catalog: add-on name and the environment variable holding
/// its unit price.
const PRICED_ADDONS: &[(&str, &str)] = &[
    (ADDON_TRAVEL_PER_KM, "ADDON_OUT_OF_AREA_TRAVEL_SURCHARGE_PER_KM"),
    ("pest_inspection", "ADDON_PEST_INSPECTION"),
    ("drug_residue", "ADDON_DRUG_RESIDUE"),
    ("thermal_imaging_moisture_meter", "ADDON_THERMAL_IMAGING_MOISTURE_METER"),
    ("drone_roof_inspection", "ADDON_DRONE_ROOF_INSPECTION"),
    ("video", "ADDON_VIDEO"),
];

/// Unit prices for the add-on catalog. `Some(None)` on lookup means the
/// add-on exists but has no configured price.
#[derive(Debug, Clone)]
pub struct AddonPriceTable {
    prices: HashMap<String, Option<Decimal>>,
}

impl AddonPriceTable {
    pub fn from_env() -> Self {
        let prices = PRICED_ADDONS
            .iter()
            .map(|(name, env_key)| (name.to_string(), parse_addon_price(std::env::var(env_key).ok())))
            .collect();
        Self { prices }
    }

    pub fn from_pairs(pairs: &[(&str, Option<Decimal>)]) -> Self {
        Self {
            prices: pairs.iter().map(|(name, price)| (name.to_string(), *price)).collect(),
        }
    }

    /// Outer `None` means the name is not in the catalog at all.
    fn lookup(&self, name: &str) -> Option<Option<Decimal>> {
        self.prices.get(name).copied()
    }

    /// Per-km travel price, used by rules that fold travel into stage
    /// prices instead of the add-on layer. Unpriced reads as zero there.
    pub fn price_per_km(&self) -> Option<Decimal> {
        self.lookup(ADDON_TRAVEL_PER_KM).flatten()
    }
}

fn parse_addon_price(raw: Option<String>) -> Option<Decimal> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("xxx") {
        return None;
    }
    trimmed.parse::<Decimal>().ok()
}

/// A single add-on selection: either a flag or a quantity.
#[derive(Debug, Clone, Copy)]
pub enum AddonValue {
    Flag(bool),
    Quantity(i64),
}

/// Ordered selection; breakdown order follows it.
pub type AddonSelection = Vec<(&'static str, AddonValue)>;

/// One applied add-on with its unit price and computed cost.
#[derive(Debug, Clone, PartialEq)]
pub struct AddonCharge {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub cost: Decimal,
}

/// Result of an add-on calculation.
#[derive(Debug, Clone, Default)]
pub struct AddonOutcome {
    pub total: Decimal,
    pub breakdown: Vec<AddonCharge>,
    /// Requested add-ons that exist in the catalog but carry no price.
    pub unavailable: Vec<String>,
}

/// Price a selection of add-ons against the catalog.
///
/// Unselected (false/zero) entries are skipped, names outside the catalog
/// are dropped silently, and unpriced entries contribute nothing but are
/// reported in `unavailable`.
pub fn calculate_addons(selection: &[(&'static str, AddonValue)], table: &AddonPriceTable) -> AddonOutcome {
    let mut outcome = AddonOutcome::default();

    for (name, value) in selection {
        let quantity = match value {
            AddonValue::Flag(true) => 1,
            AddonValue::Flag(false) => continue,
            AddonValue::Quantity(q) if *q > 0 => *q,
            AddonValue::Quantity(_) => continue,
        };

        let Some(price) = table.lookup(name) else {
            continue;
        };
        let Some(unit_price) = price else {
            outcome.unavailable.push(name.to_string());
            continue;
        };

        let cost = unit_price * Decimal::from(quantity);
        outcome.breakdown.push(AddonCharge {
            name: name.to_string(),
            unit_price,
            quantity,
            cost,
        });
        outcome.total += cost;
    }

    outcome
}

/// Add-on request parameters shared by every add-on-aware service.
///
/// The shed/roof/express options are accepted for forward compatibility
/// but are not in the priced catalog yet, so selecting them never charges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddonParams {
    #[serde(default)]
    pub shed_garage_carport_inspection: bool,
    #[serde(default)]
    pub roof_void_inspection: bool,
    #[serde(default)]
    pub express_report_delivery: bool,
    #[serde(default)]
    pub out_of_area_travel_surcharge_per_km: i64,
    #[serde(default)]
    pub pest_inspection: bool,
    #[serde(default)]
    pub drug_residue: bool,
    #[serde(default)]
    pub thermal_imaging_moisture_meter: bool,
    #[serde(default)]
    pub drone_roof_inspection: bool,
    #[serde(default)]
    pub video: bool,
}

impl AddonParams {
    /// Full selection in presentation order.
    pub fn selection(&self) -> AddonSelection {
        let mut selection = vec![
            ("shed_garage_carport_inspection", AddonValue::Flag(self.shed_garage_carport_inspection)),
            ("roof_void_inspection", AddonValue::Flag(self.roof_void_inspection)),
            ("express_report_delivery", AddonValue::Flag(self.express_report_delivery)),
            (ADDON_TRAVEL_PER_KM, AddonValue::Quantity(self.out_of_area_travel_surcharge_per_km)),
        ];
        selection.extend(self.flag_tail());
        selection
    }

    /// Selection with the travel surcharge left out, for rules that fold
    /// travel into their stage prices instead.
    pub fn selection_without_travel(&self) -> AddonSelection {
        let mut selection = vec![
            ("shed_garage_carport_inspection", AddonValue::Flag(self.shed_garage_carport_inspection)),
            ("roof_void_inspection", AddonValue::Flag(self.roof_void_inspection)),
            ("express_report_delivery", AddonValue::Flag(self.express_report_delivery)),
        ];
        selection.extend(self.flag_tail());
        selection
    }

    fn flag_tail(&self) -> AddonSelection {
        vec![
            ("pest_inspection", AddonValue::Flag(self.pest_inspection)),
            ("drug_residue", AddonValue::Flag(self.drug_residue)),
            ("thermal_imaging_moisture_meter", AddonValue::Flag(self.thermal_imaging_moisture_meter)),
            ("drone_roof_inspection", AddonValue::Flag(self.drone_roof_inspection)),
            ("video", AddonValue::Flag(self.video)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table() -> AddonPriceTable {
        AddonPriceTable::from_pairs(&[
            (ADDON_TRAVEL_PER_KM, Some(dec!(2))),
            ("pest_inspection", Some(dec!(80))),
            ("drug_residue", None),
            ("video", Some(dec!(120))),
        ])
    }

    // ==================== calculate_addons tests ====================

    #[test]
    fn test_boolean_and_quantity_addons() {
        let selection = vec![
            ("pest_inspection", AddonValue::Flag(true)),
            (ADDON_TRAVEL_PER_KM, AddonValue::Quantity(20)),
        ];
        let outcome = calculate_addons(&selection, &table());

        assert_eq!(outcome.total, dec!(120));
        assert_eq!(outcome.breakdown.len(), 2);
        assert_eq!(outcome.breakdown[0].name, "pest_inspection");
        assert_eq!(outcome.breakdown[0].unit_price, dec!(80));
        assert_eq!(outcome.breakdown[0].quantity, 1);
        assert_eq!(outcome.breakdown[0].cost, dec!(80));
        assert_eq!(outcome.breakdown[1].name, ADDON_TRAVEL_PER_KM);
        assert_eq!(outcome.breakdown[1].quantity, 20);
        assert_eq!(outcome.breakdown[1].cost, dec!(40));
        assert!(outcome.unavailable.is_empty());
    }

    #[test]
    fn test_unselected_addons_are_skipped() {
        let selection = vec![
            ("pest_inspection", AddonValue::Flag(false)),
            (ADDON_TRAVEL_PER_KM, AddonValue::Quantity(0)),
        ];
        let outcome = calculate_addons(&selection, &table());
        assert_eq!(outcome.total, dec!(0));
        assert!(outcome.breakdown.is_empty());
    }

    #[test]
    fn test_unknown_addon_is_dropped_silently() {
        let selection = vec![("shed_garage_carport_inspection", AddonValue::Flag(true))];
        let outcome = calculate_addons(&selection, &table());
        assert_eq!(outcome.total, dec!(0));
        assert!(outcome.breakdown.is_empty());
        assert!(outcome.unavailable.is_empty());
    }

    #[test]
    fn test_unpriced_addon_is_reported_unavailable() {
        let selection = vec![
            ("drug_residue", AddonValue::Flag(true)),
            ("video", AddonValue::Flag(true)),
        ];
        let outcome = calculate_addons(&selection, &table());
        assert_eq!(outcome.total, dec!(120));
        assert_eq!(outcome.unavailable, vec!["drug_residue".to_string()]);
    }

    #[test]
    fn test_fractional_per_km_price() {
        let table = AddonPriceTable::from_pairs(&[(ADDON_TRAVEL_PER_KM, Some(dec!(2.5)))]);
        let selection = vec![(ADDON_TRAVEL_PER_KM, AddonValue::Quantity(3))];
        let outcome = calculate_addons(&selection, &table);
        assert_eq!(outcome.total, dec!(7.5));
    }

    #[test]
    fn test_negative_quantity_is_skipped() {
        let selection = vec![(ADDON_TRAVEL_PER_KM, AddonValue::Quantity(-5))];
        let outcome = calculate_addons(&selection, &table());
        assert_eq!(outcome.total, dec!(0));
        assert!(outcome.breakdown.is_empty());
    }

    // ==================== price table tests ====================

    #[test]
    fn test_parse_addon_price_sentinels() {
        assert_eq!(parse_addon_price(None), None);
        assert_eq!(parse_addon_price(Some("XXX".to_string())), None);
        assert_eq!(parse_addon_price(Some("xxx".to_string())), None);
        assert_eq!(parse_addon_price(Some("".to_string())), None);
        assert_eq!(parse_addon_price(Some("garbage".to_string())), None);
        assert_eq!(parse_addon_price(Some("2.5".to_string())), Some(dec!(2.5)));
        assert_eq!(parse_addon_price(Some(" 80 ".to_string())), Some(dec!(80)));
    }

    #[test]
    fn test_selection_order_is_stable() {
        let params = AddonParams {
            pest_inspection: true,
            out_of_area_travel_surcharge_per_km: 10,
            ..Default::default()
        };
        let names: Vec<&str> = params.selection().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "shed_garage_carport_inspection",
                "roof_void_inspection",
                "express_report_delivery",
                ADDON_TRAVEL_PER_KM,
                "pest_inspection",
                "drug_residue",
                "thermal_imaging_moisture_meter",
                "drone_roof_inspection",
                "video",
            ]
        );
        assert!(!params
            .selection_without_travel()
            .iter()
            .any(|(n, _)| *n == ADDON_TRAVEL_PER_KM));
    }
}

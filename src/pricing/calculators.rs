//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no configuration or network access.
//! Every rule composes its quote from these helpers so the inclusion,
//! step-surcharge, and GST/discount conventions stay identical across
//! services.

use rust_decimal::Decimal;

use crate::pricing::addons::AddonOutcome;
use crate::pricing::responses::{AddonLine, QuoteBreakdown, StagePrice};
use crate::pricing::tariffs::trunc_to_i64;

/// Units beyond an inclusion threshold (never negative).
pub fn extra_above(count: i64, included: i64) -> i64 {
    (count - included).max(0)
}

/// Number of step surcharges for `extra` units in buckets of `step`,
/// rounded up. Zero extra means zero steps.
pub fn step_count(extra: i64, step: i64) -> i64 {
    if extra > 0 {
        (extra + step - 1) / step
    } else {
        0
    }
}

/// Unit price for combined extra rooms: the bedroom price when it is set,
/// otherwise the bathroom price.
pub fn preferred_unit_price(primary: i64, fallback: i64) -> i64 {
    if primary != 0 {
        primary
    } else {
        fallback
    }
}

/// Charge for combined extra rooms beyond the inclusion, at a single unit
/// price regardless of room type.
pub fn combined_rooms_charge(bedrooms: i64, bathrooms: i64, unit_price: i64, included: i64) -> i64 {
    let total_rooms = bedrooms.max(0) + bathrooms.max(0);
    extra_above(total_rooms, included) * unit_price
}

/// Room charge with the free slots allocated to the higher-priced room
/// type first (minimizes the total charge), spilling the remainder to the
/// other type.
pub fn allocated_rooms_charge(
    bedrooms: i64,
    bathrooms: i64,
    bedroom_unit: i64,
    bathroom_unit: i64,
    included: i64,
) -> i64 {
    let mut remaining_free = included;
    let mut chargeable_bedrooms = bedrooms.max(0);
    let mut chargeable_bathrooms = bathrooms.max(0);

    if bedroom_unit >= bathroom_unit {
        let free = chargeable_bedrooms.min(remaining_free);
        chargeable_bedrooms -= free;
        remaining_free -= free;

        let free = chargeable_bathrooms.min(remaining_free);
        chargeable_bathrooms -= free;
    } else {
        let free = chargeable_bathrooms.min(remaining_free);
        chargeable_bathrooms -= free;
        remaining_free -= free;

        let free = chargeable_bedrooms.min(remaining_free);
        chargeable_bedrooms -= free;
    }

    chargeable_bedrooms * bedroom_unit + chargeable_bathrooms * bathroom_unit
}

/// Compose the full quote: fold the add-on total into the pre-addon price,
/// truncate to whole units, then derive GST, the GST-inclusive price, and
/// the discounted payable price.
///
/// The post-addon quote is truncated before GST so that
/// `price_including_gst == quote_price + gst` and
/// `payable_price == max(0, price_including_gst - discount)` hold exactly.
pub fn finalize_quote(
    pre_addon_price: i64,
    stage_prices: Option<Vec<StagePrice>>,
    addons: AddonOutcome,
    gst_percentage: Decimal,
    discount: i64,
    note: String,
) -> QuoteBreakdown {
    let quote_price = trunc_to_i64(Decimal::from(pre_addon_price) + addons.total);
    let gst = trunc_to_i64(Decimal::from(quote_price) * gst_percentage / Decimal::from(100));
    let price_including_gst = quote_price + gst;

    let discount = discount.max(0);
    let payable_price = (price_including_gst - discount).max(0);

    let addon_lines: Vec<AddonLine> = addons
        .breakdown
        .iter()
        .map(|charge| AddonLine {
            name: charge.name.clone(),
            price: trunc_to_i64(charge.cost),
        })
        .collect();

    QuoteBreakdown {
        stage_prices,
        quote_price,
        gst: Some(gst),
        price_including_gst: Some(price_including_gst),
        discount: Some(discount),
        payable_price: Some(payable_price),
        addons: if addon_lines.is_empty() { None } else { Some(addon_lines) },
        addons_total: Some(trunc_to_i64(addons.total)),
        note,
    }
}

/// Quote without the add-on/GST/discount layer (catalog-priced services).
pub fn quote_only(quote_price: i64, stage_prices: Option<Vec<StagePrice>>, note: String) -> QuoteBreakdown {
    QuoteBreakdown {
        stage_prices,
        quote_price,
        gst: None,
        price_including_gst: None,
        discount: None,
        payable_price: None,
        addons: None,
        addons_total: None,
        note,
    }
}

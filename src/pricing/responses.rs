//! Response DTOs for the quote API.

use serde::Serialize;

/// One independently priced work stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePrice {
    pub stage: i64,
    pub price: i64,
}

/// One applied add-on in the response (cost truncated to whole units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonLine {
    pub name: String,
    pub price: i64,
}

/// The quote returned to the caller.
///
/// Only `quote_price` and `note` are always present; the stage breakdown
/// and the add-on/GST/discount layer appear for the services that carry
/// them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_prices: Option<Vec<StagePrice>>,
    pub quote_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_including_gst: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payable_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<AddonLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons_total: Option<i64>,
    pub note: String,
}

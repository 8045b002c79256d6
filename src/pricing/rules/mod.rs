//! Per-service pricing rules and the static registry the dispatcher uses.
//!
//! Every service is one `PricingRule` implementation registered under its
//! canonical key at startup. Requested identifiers go through the alias
//! table first, so legacy spellings and dashed forms keep working.

pub mod apartment_pre_settlement;
pub mod construction_stages;
pub mod defects_investigation;
pub mod dilapidation;
pub mod drug_resistance;
pub mod expert_witness_report;
pub mod insurance_report;
pub mod new_construction_stages;
pub mod pre_handover;
pub mod pre_purchase;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::pricing::responses::QuoteBreakdown;
use crate::pricing::source::PricingContext;

/// A pricing rule for one service: validated parameters in, quote out.
#[async_trait]
pub trait PricingRule: Send + Sync + std::fmt::Debug {
    /// Canonical service key this rule is registered under.
    fn key(&self) -> &'static str;

    /// Price one request. `params` is the normalized parameter bag;
    /// unknown fields are ignored, malformed known fields are rejected.
    async fn calculate(
        &self,
        params: Map<String, Value>,
        ctx: &PricingContext,
    ) -> Result<QuoteBreakdown, AppError>;
}

/// Deserialize a normalized parameter bag into a rule's input struct.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(params)).map_err(|e| AppError::Validation(e.to_string()))
}

/// Requested identifier -> canonical service key. Identifiers are trimmed
/// and lower-cased before lookup; unknown identifiers pass through as-is
/// and fail at the registry instead.
const SERVICE_ALIASES: &[(&str, &str)] = &[
    // Legacy service codes
    ("oi-950-1", "pre_purchase"),
    ("oi-950-3", "new_construction_stages"),
    ("prepurchase", "pre_purchase"),
    ("pre-purchase", "pre_purchase"),
    ("pre_purchase", "pre_purchase"),
    ("pre-sales", "pre_sales"),
    ("presales", "pre_sales"),
    ("pre_sales", "pre_sales"),
    ("dilapidation", "dilapidation"),
    ("construction_stages", "construction_stages"),
    ("construction-stages", "construction_stages"),
    ("new_construction_stages", "new_construction_stages"),
    ("new-construction-stages", "new_construction_stages"),
    ("apartment-pre-settlement", "apartment_pre_settlement"),
    ("apartment_pre_settlement", "apartment_pre_settlement"),
    ("insurance_report", "insurance_report"),
    ("insurance-report", "insurance_report"),
    ("defects_investigation", "defects_investigation"),
    ("defects-investigation", "defects_investigation"),
    ("expert_witness_report", "expert_witness_report"),
    ("expert-witness-report", "expert_witness_report"),
    ("pre_handover", "pre_handover"),
    ("pre-handover", "pre_handover"),
    ("prehandover", "pre_handover"),
    ("drug_resistance", "drug_resistance"),
    ("drug-resistance", "drug_resistance"),
    ("drugresistance", "drug_resistance"),
    // Aliased but not implemented in this revision; resolves, then fails
    // with service-not-found at the registry.
    ("building_and_pest", "building_and_pest"),
    ("building-and-pest", "building_and_pest"),
    ("buildingandpest", "building_and_pest"),
    ("building_pest", "building_and_pest"),
    ("building-pest", "building_and_pest"),
];

/// Static fallback note per service, used when a rule returns a blank note.
const SERVICE_NOTES: &[(&str, &str)] = &[
    ("pre_purchase", "this is a test note for pre_purchase"),
    ("dilapidation", "this is a test note for dilapidation"),
    ("construction_stages", "this is a test note for construction stages"),
    ("new_construction_stages", "this is a test note for new construction stages"),
    ("apartment_pre_settlement", "this is a test note for apartment pre-settlement"),
    ("insurance_report", "this is a test note for insurance report"),
    ("defects_investigation", "this is a test note for defects investigation"),
    ("expert_witness_report", "this is a test note for expert witness report"),
    ("pre_handover", "this is a test note for pre-handover"),
    ("drug_resistance", "this is a test note for drug resistance"),
];

const DEFAULT_NOTE: &str = "this is a test note";

/// Compile-time-known mapping from canonical service key to rule
/// implementation, populated once at process start.
pub struct ServiceRegistry {
    rules: HashMap<&'static str, Arc<dyn PricingRule>>,
    aliases: HashMap<&'static str, &'static str>,
    notes: HashMap<&'static str, &'static str>,
}

impl ServiceRegistry {
    /// Registry with every implemented service.
    pub fn with_default_services() -> Self {
        let mut registry = Self {
            rules: HashMap::new(),
            aliases: SERVICE_ALIASES.iter().copied().collect(),
            notes: SERVICE_NOTES.iter().copied().collect(),
        };

        registry.register(Arc::new(pre_purchase::PrePurchase));
        registry.register(Arc::new(dilapidation::Dilapidation));
        registry.register(Arc::new(apartment_pre_settlement::ApartmentPreSettlement));
        registry.register(Arc::new(construction_stages::ConstructionStages));
        registry.register(Arc::new(new_construction_stages::NewConstructionStages));
        registry.register(Arc::new(insurance_report::InsuranceReport));
        registry.register(Arc::new(defects_investigation::DefectsInvestigation));
        registry.register(Arc::new(expert_witness_report::ExpertWitnessReport::hourly()));
        registry.register(Arc::new(drug_resistance::DrugResistance));
        registry.register(Arc::new(pre_handover::PreHandover));

        registry
    }

    pub fn register(&mut self, rule: Arc<dyn PricingRule>) {
        self.rules.insert(rule.key(), rule);
    }

    /// Canonical key for a requested identifier.
    pub fn canonical(&self, requested: &str) -> String {
        let key = requested.trim().to_lowercase();
        match self.aliases.get(key.as_str()) {
            Some(canonical) => canonical.to_string(),
            None => key,
        }
    }

    /// Resolve a requested identifier to its rule, failing with
    /// service-not-found for unknown or unimplemented services.
    pub fn resolve(&self, requested: &str) -> Result<(String, Arc<dyn PricingRule>), AppError> {
        let canonical = self.canonical(requested);
        match self.rules.get(canonical.as_str()) {
            Some(rule) => Ok((canonical, rule.clone())),
            None => Err(AppError::ServiceNotFound(canonical)),
        }
    }

    pub fn fallback_note(&self, canonical: &str) -> &'static str {
        self.notes.get(canonical).copied().unwrap_or(DEFAULT_NOTE)
    }

    pub fn service_count(&self) -> usize {
        self.rules.len()
    }
}

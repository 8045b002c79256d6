//! Validated input primitives shared by the pricing rules.
//!
//! Normalization happens at the HTTP boundary; past it, malformed input is
//! rejected, never coerced. Each helper produces the exact validation
//! message the dispatcher returns to the caller.

use serde_json::Value;

use crate::error::AppError;

/// Residential/commercial discriminator required by every service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyCategory {
    Residential,
    Commercial,
}

impl PropertyCategory {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_lowercase().as_str() {
            "residential" => Ok(Self::Residential),
            "commercial" => Ok(Self::Commercial),
            _ => Err(validation(
                "property_category must be either 'residential' or 'commercial'",
            )),
        }
    }
}

/// House/apartment discriminator used by the pre-handover service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    House,
    Apartment,
}

impl PropertyType {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_lowercase().as_str() {
            "house" => Ok(Self::House),
            "apartment" => Ok(Self::Apartment),
            _ => Err(validation("property_type must be either 'house' or 'apartment'")),
        }
    }
}

/// Validate a stage selection: non-empty, integers only, within
/// `1..=max_stage`, deduplicated preserving first occurrence.
pub fn validate_stages(stages: &[Value], max_stage: i64) -> Result<Vec<i64>, AppError> {
    if stages.is_empty() {
        return Err(validation("'stages' must include at least one stage"));
    }

    let mut normalized = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for value in stages {
        let stage = value
            .as_i64()
            .ok_or_else(|| validation("'stages' must contain integers only"))?;
        if stage < 1 || stage > max_stage {
            return Err(validation(&format!(
                "'stages' values must be between 1 and {}",
                max_stage
            )));
        }
        if seen.insert(stage) {
            normalized.push(stage);
        }
    }
    Ok(normalized)
}

pub fn validation(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

//! Quote estimation route handlers

use axum::{extract::State, Json};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::pricing::QuoteBreakdown;
use crate::routes::normalize::normalize_params;
use crate::AppState;

/// Estimate a quote for one service.
///
/// The payload carries the service identifier plus an open-ended bag of
/// service-specific parameters; unknown fields are accepted and ignored.
pub async fn estimate(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<QuoteBreakdown>> {
    let Value::Object(mut body) = payload else {
        return Err(AppError::Validation("Request body must be a JSON object".to_string()));
    };

    let service = match body.remove("service") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => {
            return Err(AppError::Validation(
                "Missing required 'service' in payload".to_string(),
            ))
        }
    };

    let (canonical, rule) = state.registry.resolve(&service)?;
    let params = normalize_params(body);

    tracing::debug!("Estimating quote for service {}", canonical);
    let mut quote = rule.calculate(params, &state.pricing).await?;

    // The rule's own note wins; otherwise fall back to the static
    // per-service note.
    if quote.note.trim().is_empty() {
        quote.note = state.registry.fallback_note(&canonical).to_string();
    }

    Ok(Json(quote))
}

/// Liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "services": state.registry.service_count(),
        "tariff_cache": state.pricing.cache_stats(),
    }))
}

/// Drop every cached tariff table so the next quote re-resolves.
pub async fn invalidate_cache(State(state): State<AppState>) -> Json<Value> {
    state.pricing.invalidate();
    Json(serde_json::json!({"status": "invalidated"}))
}

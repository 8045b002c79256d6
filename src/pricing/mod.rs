//! Pricing engine for property-inspection services.
//!
//! Pure calculation helpers, the add-on layer, tariff resolution, and one
//! pricing rule per service. Every quote is a stateless function of the
//! request parameters plus the resolved tariff table.

pub mod addons;
pub mod calculators;
pub mod input;
pub mod responses;
pub mod rules;
pub mod source;
pub mod tariffs;

// Re-export commonly used items
pub use responses::QuoteBreakdown;
pub use rules::ServiceRegistry;
pub use source::{CatalogTariffSource, EnvTariffSource, PricingContext, TariffSource};

//! Built-in analyzer units

pub mod compatibility;
pub mod freshness;
pub mod overlap;

use std::sync::Arc;

pub use compatibility::CompatibilityUnit;
pub use freshness::FreshnessUnit;
pub use overlap::OverlapUnit;

use crate::unit::AnalyzerUnit;

/// Every built-in unit, in a stable order
pub fn default_units() -> Vec<Arc<dyn AnalyzerUnit>> {
    vec![
        Arc::new(CompatibilityUnit),
        Arc::new(FreshnessUnit),
        Arc::new(OverlapUnit),
    ]
}

#[cfg(test)]
mod tests;

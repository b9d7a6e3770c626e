//! Feature derivation for the carbon intensity target.
//!
//! Order of derivation:
//! 1. calendar components from the timestamp
//! 2. sine/cosine pairs for hour (24) and day of week (7)
//! 3. allow-list retention (absent features are reported, not fatal)
//! 4. centered rolling-median smoothing, returned as a separate table
//! 5. lags 1..=N of the target
//! 6. pairwise products of the interaction bases
//! 7. removal of rows left incomplete by lagging

use super::calendar::{add_calendar_features, encode_cyclical, CALENDAR_COLUMNS};
use super::lags::{add_interaction_features, add_lag_features};
use crate::core::ObservationTable;
use crate::error::{ForecastError, Result};
use crate::preprocess::TARGET_COLUMN;
use crate::transform::apply_rolling_median;
use tracing::{info, warn};

/// Features kept after calendar encoding, besides the target.
pub const DEFAULT_SELECTED_FEATURES: &[&str] = &[
    "year",
    "month",
    "day",
    "hour_sin",
    "hour_cos",
    "dayofweek_sin",
    "dayofweek_cos",
    "carbon_rate_avg",
    "power_origin_percent_fossil_avg",
    "power_origin_percent_renewable_avg",
    "power_consumption_coal_avg",
    "power_consumption_gas_avg",
    "power_consumption_oil_avg",
    "power_consumption_biomass_avg",
    "power_consumption_hydro_avg",
    "power_consumption_nuclear_avg",
    "power_consumption_solar_avg",
    "power_consumption_wind_avg",
    "power_production_solar_avg",
    "power_production_wind_avg",
    "total_production_avg",
    "total_consumption_avg",
    "total_import_avg",
    "total_export_avg",
];

/// Bases whose pairwise products become interaction features.
pub const DEFAULT_INTERACTION_FEATURES: &[&str] = &[
    "power_origin_percent_fossil_avg",
    "carbon_rate_avg",
    "power_consumption_coal_avg",
    "power_origin_percent_renewable_avg",
];

/// Configuration for [`FeatureEngineer`].
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Target column; lagged, never used in interactions.
    pub target: String,
    /// Allow-list of retained features.
    pub selected_features: Vec<String>,
    /// Number of target lags (1..=lags).
    pub lags: usize,
    /// Interaction bases.
    pub interaction_features: Vec<String>,
    /// Centered rolling-median window.
    pub smoothing_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            target: TARGET_COLUMN.to_string(),
            selected_features: DEFAULT_SELECTED_FEATURES.iter().map(|s| s.to_string()).collect(),
            lags: 24,
            interaction_features: DEFAULT_INTERACTION_FEATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            smoothing_window: 5,
        }
    }
}

impl FeatureConfig {
    pub fn with_selected_features(mut self, features: Vec<String>) -> Self {
        self.selected_features = features;
        self
    }

    pub fn with_interaction_features(mut self, features: Vec<String>) -> Self {
        self.interaction_features = features;
        self
    }

    pub fn with_lags(mut self, lags: usize) -> Self {
        self.lags = lags;
        self
    }

    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    /// Allow-listed features read from the input rather than derived from
    /// the timestamp. These, with the target, are what the imputer sees.
    pub fn observed_features(&self) -> Vec<String> {
        self.selected_features
            .iter()
            .filter(|f| !is_calendar_feature(f))
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.interaction_features.iter().any(|f| *f == self.target) {
            return Err(ForecastError::InvalidParameter(format!(
                "target '{}' cannot be an interaction base",
                self.target
            )));
        }
        if self.smoothing_window == 0 {
            return Err(ForecastError::InvalidParameter(
                "smoothing window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether `name` is a calendar column or one of its sin/cos encodings.
fn is_calendar_feature(name: &str) -> bool {
    CALENDAR_COLUMNS.iter().any(|c| {
        name == *c
            || name
                .strip_prefix(*c)
                .is_some_and(|rest| rest == "_sin" || rest == "_cos")
    })
}

/// Output of [`FeatureEngineer::transform`].
#[derive(Debug, Clone)]
pub struct EngineeredFeatures {
    /// Feature table, complete rows only.
    pub table: ObservationTable,
    /// Rolling-median smoothing of the retained columns (not merged).
    pub smoothed: ObservationTable,
    /// Allow-listed features that were absent.
    pub skipped_features: Vec<String>,
    /// Rows removed for incomplete lag history.
    pub dropped_rows: usize,
}

/// Keep the allow-listed features that exist, followed by the target.
///
/// Returns the narrowed table and the allow-listed names that were absent.
pub fn retain_features(
    table: &ObservationTable,
    selected: &[String],
    target: &str,
) -> Result<(ObservationTable, Vec<String>)> {
    table.require_column(target)?;

    let (present, skipped): (Vec<&String>, Vec<&String>) = selected
        .iter()
        .filter(|f| f.as_str() != target)
        .partition(|f| table.has_column(f));

    let mut names: Vec<&str> = present.iter().map(|s| s.as_str()).collect();
    names.push(target);
    let retained = table.select(&names)?;

    Ok((retained, skipped.into_iter().cloned().collect()))
}

/// Derives the model-ready feature table from a cleaned, imputed table.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn transform(&self, table: &ObservationTable) -> Result<EngineeredFeatures> {
        self.config.validate()?;
        let target = self.config.target.as_str();

        let derived = add_calendar_features(table)?;
        let derived = encode_cyclical(&derived, "hour", 24.0)?;
        let derived = encode_cyclical(&derived, "dayofweek", 7.0)?;
        info!(
            rows = derived.len(),
            columns = derived.n_columns(),
            "derived calendar and cyclical features"
        );

        let (retained, skipped_features) =
            retain_features(&derived, &self.config.selected_features, target)?;
        if !skipped_features.is_empty() {
            warn!(
                skipped = skipped_features.len(),
                features = ?skipped_features,
                "allow-listed features absent from table"
            );
        }
        info!(
            rows = retained.len(),
            columns = retained.n_columns(),
            "retained selected features"
        );

        let smoothed = apply_rolling_median(
            &retained,
            &retained.column_names(),
            self.config.smoothing_window,
        )?;

        let lagged = add_lag_features(&retained, target, self.config.lags)?;
        let bases: Vec<&str> = self
            .config
            .interaction_features
            .iter()
            .map(|s| s.as_str())
            .collect();
        let interacted = add_interaction_features(&lagged, &bases)?;

        let (table, dropped_rows) = interacted.drop_incomplete_rows();
        info!(
            rows = table.len(),
            columns = table.n_columns(),
            dropped = dropped_rows,
            "added lag and interaction features"
        );

        Ok(EngineeredFeatures {
            table,
            smoothed,
            skipped_features,
            dropped_rows,
        })
    }
}

//! Feature engineering for hourly grid observations.
//!
//! Calendar components, cyclical encodings, target lags and pairwise
//! interactions, composed by [`FeatureEngineer`].
//!
//! # Example
//!
//! ```
//! use carbon_forecast::features::{cyclical, lag, pairs};
//!
//! let (sin, cos) = cyclical(6.0, 24.0);
//! assert!((sin - 1.0).abs() < 1e-12 && cos.abs() < 1e-12);
//!
//! let lagged = lag(&[1.0, 2.0, 3.0], 1);
//! assert!(lagged[0].is_nan());
//!
//! assert_eq!(pairs(&["a", "b", "c"]).len(), 3);
//! ```

pub mod calendar;
pub mod engineer;
pub mod lags;

pub use calendar::{add_calendar_features, cyclical, encode_cyclical, CALENDAR_COLUMNS};
pub use engineer::{
    retain_features, EngineeredFeatures, FeatureConfig, FeatureEngineer,
    DEFAULT_INTERACTION_FEATURES, DEFAULT_SELECTED_FEATURES,
};
pub use lags::{
    add_interaction_features, add_lag_features, interaction, interaction_name, lag, lag_name,
    pairs,
};

//! Stage orchestration: raw file to scored model.
//!
//! ```text
//! read → clean → retain → impute → engineer features → scale → split → write splits
//!                                                                        ↓
//!                                             tune → train on train+val → evaluate on test
//! ```
//!
//! When all three split files already exist in the output directory the
//! preprocessing stages are skipped and the splits are read back instead.
//! Split files written before a later stage fails are left in place.

use crate::core::{ObservationTable, RawTable};
use crate::error::{ForecastError, Result};
use crate::features::{retain_features, FeatureConfig, FeatureEngineer};
use crate::io::{read_raw_table, read_table, write_table};
use crate::models::{AdditiveRegressor, HyperParams, Regressor};
use crate::preprocess::{
    chronological_split, clean, CleanReport, CleanerConfig, KnnImputer, Split, SplitConfig,
    SplitSizes,
};
use crate::transform::{FittedScaler, StandardScaler};
use crate::tuning::{
    evaluate_model, train_model, Evaluation, ParameterGrid, Tuner, TuningOutcome,
};
use crate::utils::ErrorMetrics;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File names of the train, validation and test splits.
pub const SPLIT_FILES: [&str; 3] = [
    "preprocessed_train.csv",
    "preprocessed_val.csv",
    "preprocessed_test.csv",
];

/// Configuration for every pipeline stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cleaner: CleanerConfig,
    /// Donor rows used by the KNN imputer.
    pub imputer_neighbors: usize,
    pub features: FeatureConfig,
    pub split: SplitConfig,
    /// Fit the scaler on the whole table before splitting (otherwise on
    /// the train slice only).
    pub fit_scaler_before_split: bool,
    pub grid: ParameterGrid,
    /// Directory holding the split files.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleaner: CleanerConfig::default(),
            imputer_neighbors: 5,
            features: FeatureConfig::default(),
            split: SplitConfig::default(),
            fit_scaler_before_split: true,
            grid: ParameterGrid::default(),
            output_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineConfig {
    pub fn with_cleaner(mut self, cleaner: CleanerConfig) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn with_imputer_neighbors(mut self, k: usize) -> Self {
        self.imputer_neighbors = k;
        self
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_fit_scaler_before_split(mut self, before: bool) -> Self {
        self.fit_scaler_before_split = before;
        self
    }

    pub fn with_grid(mut self, grid: ParameterGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    fn target(&self) -> &str {
        &self.features.target
    }
}

/// Output of [`prepare`].
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split: Split,
    /// Rolling-median smoothing of the retained features.
    pub smoothed: ObservationTable,
    pub clean_report: CleanReport,
    /// Cells filled by the imputer.
    pub imputed_cells: usize,
    /// Allow-listed features absent from the input.
    pub skipped_features: Vec<String>,
    pub scaler: FittedScaler,
}

/// Run cleaning, imputation, feature engineering, scaling and splitting.
pub fn prepare(raw: &RawTable, config: &PipelineConfig) -> Result<PreparedData> {
    let (cleaned, clean_report) = clean(raw, &config.cleaner)?;

    // only retained features reach the imputer
    let (observed, _) = retain_features(
        &cleaned,
        &config.features.observed_features(),
        config.target(),
    )?;
    let imputer = KnnImputer::new(config.imputer_neighbors)?;
    let (imputed, imputed_cells) = imputer.impute(&observed)?;
    info!(
        rows = imputed.len(),
        columns = imputed.n_columns(),
        neighbors = imputer.n_neighbors(),
        "shape after imputation"
    );

    let engineered = FeatureEngineer::new(config.features.clone()).transform(&imputed)?;
    if engineered.table.is_empty() {
        return Err(ForecastError::InsufficientData {
            needed: config.features.lags + 1,
            got: imputed.len(),
        });
    }

    let scaler = StandardScaler::new(&[config.target()]);
    let (split, fitted) = if config.fit_scaler_before_split {
        let (scaled, fitted) = scaler.fit_transform(&engineered.table)?;
        (chronological_split(&scaled, &config.split)?, fitted)
    } else {
        let split = chronological_split(&engineered.table, &config.split)?;
        let fitted = scaler.fit(&split.train)?;
        let split = Split {
            train: fitted.transform(&split.train)?,
            validation: fitted.transform(&split.validation)?,
            test: fitted.transform(&split.test)?,
        };
        (split, fitted)
    };

    let sizes = split.sizes();
    info!(
        train = sizes.train,
        validation = sizes.validation,
        test = sizes.test,
        scaler_before_split = config.fit_scaler_before_split,
        "split prepared"
    );

    Ok(PreparedData {
        split,
        smoothed: engineered.smoothed,
        clean_report,
        imputed_cells,
        skipped_features: engineered.skipped_features,
        scaler: fitted,
    })
}

/// Paths of the three split files under `dir`.
pub fn split_paths(dir: &Path) -> [PathBuf; 3] {
    SPLIT_FILES.map(|name| dir.join(name))
}

/// Write the splits to `dir`, creating it if needed.
pub fn write_split(dir: &Path, split: &Split) -> Result<()> {
    fs::create_dir_all(dir)?;
    let [train, validation, test] = split_paths(dir);
    write_table(&train, &split.train)?;
    write_table(&validation, &split.validation)?;
    write_table(&test, &split.test)?;
    info!(dir = %dir.display(), "wrote preprocessed splits");
    Ok(())
}

/// Read previously written splits, or `None` unless all three exist.
pub fn load_cached_split(dir: &Path) -> Result<Option<Split>> {
    let paths = split_paths(dir);
    if !paths.iter().all(|p| p.is_file()) {
        return Ok(None);
    }
    let [train, validation, test] = paths;
    Ok(Some(Split {
        train: read_table(&train)?,
        validation: read_table(&validation)?,
        test: read_table(&test)?,
    }))
}

/// Tuning, refit and test results for one regressor.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub tuning: TuningOutcome,
    pub params: HyperParams,
    /// Validation error of the refit model.
    pub validation: ErrorMetrics,
    pub evaluation: Evaluation,
}

/// Grid-search `regressor`, refit with the best parameters and score the test slice.
pub fn tune_and_evaluate<R>(
    regressor: &R,
    split: &Split,
    config: &PipelineConfig,
) -> Result<ModelReport>
where
    R: Regressor + Sync,
{
    let target = config.target();
    let tuning = Tuner::new(config.grid.clone())
        .with_target(target)
        .tune(regressor, &split.train, &split.validation)?;

    let params = tuning.best.trial.params;
    let trained = train_model(regressor, &params, &split.train, &split.validation, target)?;
    let evaluation = evaluate_model(regressor, &trained, &split.test, target)?;

    Ok(ModelReport {
        tuning,
        params,
        validation: trained.validation,
        evaluation,
    })
}

/// Summary of a full [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Whether the splits were read from existing files.
    pub from_cache: bool,
    pub sizes: SplitSizes,
    pub report: ModelReport,
}

/// Full pipeline with the bundled [`AdditiveRegressor`].
pub fn run(data_path: &Path, config: &PipelineConfig) -> Result<RunSummary> {
    let (split, from_cache) = match load_cached_split(&config.output_dir)? {
        Some(split) => {
            info!(dir = %config.output_dir.display(), "using existing preprocessed splits");
            (split, true)
        }
        None => {
            info!(path = %data_path.display(), "preprocessing raw data");
            let raw = read_raw_table(data_path)?;
            let prepared = prepare(&raw, config)?;
            write_split(&config.output_dir, &prepared.split)?;
            (prepared.split, false)
        }
    };

    let report = tune_and_evaluate(&AdditiveRegressor::default(), &split, config)?;
    Ok(RunSummary {
        from_cache,
        sizes: split.sizes(),
        report,
    })
}

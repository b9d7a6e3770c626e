//! Chronological train / validation / test split.

use crate::core::ObservationTable;
use crate::error::{ForecastError, Result};

/// Fractions of rows given to the training and validation slices.
///
/// The test slice takes the remainder, so the three sizes always sum to the
/// table length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    pub train_ratio: f64,
    pub validation_ratio: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.7,
            validation_ratio: 0.15,
        }
    }
}

impl SplitConfig {
    pub fn new(train_ratio: f64, validation_ratio: f64) -> Result<Self> {
        let config = Self {
            train_ratio,
            validation_ratio,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let valid = self.train_ratio > 0.0
            && self.validation_ratio >= 0.0
            && self.train_ratio + self.validation_ratio <= 1.0;
        if !valid {
            return Err(ForecastError::InvalidParameter(format!(
                "split ratios must satisfy 0 < train, 0 <= validation, \
                 train + validation <= 1 (got {} and {})",
                self.train_ratio, self.validation_ratio
            )));
        }
        Ok(())
    }

    /// Row counts for a table of `n` rows.
    ///
    /// Out-of-range ratios on a hand-built config are clamped so the sizes
    /// still sum to `n`; [`chronological_split`] rejects them outright.
    pub fn sizes(&self, n: usize) -> SplitSizes {
        // float-to-int casts saturate: negative and NaN become 0
        let train = (((n as f64) * self.train_ratio).floor() as usize).min(n);
        let validation = (((n as f64) * self.validation_ratio).floor() as usize).min(n - train);
        SplitSizes {
            train,
            validation,
            test: n - train - validation,
        }
    }
}

/// Row counts of each slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

impl SplitSizes {
    pub fn total(&self) -> usize {
        self.train + self.validation + self.test
    }
}

/// Three contiguous, chronologically ordered slices of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: ObservationTable,
    pub validation: ObservationTable,
    pub test: ObservationTable,
}

impl Split {
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.train.len(),
            validation: self.validation.len(),
            test: self.test.len(),
        }
    }

    /// Train followed by validation, the history the regressor is fit on.
    pub fn history(&self) -> Result<ObservationTable> {
        self.train.concat(&self.validation)
    }
}

/// Split a table into train / validation / test along the time axis.
pub fn chronological_split(table: &ObservationTable, config: &SplitConfig) -> Result<Split> {
    config.validate()?;
    let sizes = config.sizes(table.len());
    let val_end = sizes.train + sizes.validation;

    Ok(Split {
        train: table.slice(0, sizes.train)?,
        validation: table.slice(sizes.train, val_end)?,
        test: table.slice(val_end, table.len())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn table(n: usize) -> ObservationTable {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
        let x = (0..n).map(|i| i as f64).collect();
        ObservationTable::from_pairs(ts, vec![("x".to_string(), x)]).unwrap()
    }

    #[test]
    fn default_sizes() {
        let sizes = SplitConfig::default().sizes(100);
        assert_eq!(
            sizes,
            SplitSizes {
                train: 70,
                validation: 15,
                test: 15
            }
        );
    }

    #[test]
    fn test_absorbs_remainder() {
        let sizes = SplitConfig::default().sizes(101);
        assert_eq!(sizes.train, 70);
        assert_eq!(sizes.validation, 15);
        assert_eq!(sizes.test, 16);
        assert_eq!(sizes.total(), 101);
    }

    #[test]
    fn tiny_tables() {
        for n in 0..10 {
            assert_eq!(SplitConfig::default().sizes(n).total(), n);
        }
        let sizes = SplitConfig::default().sizes(3);
        assert_eq!((sizes.train, sizes.validation, sizes.test), (2, 0, 1));
    }

    #[test]
    fn slices_are_contiguous_and_ordered() {
        let t = table(20);
        let split = chronological_split(&t, &SplitConfig::default()).unwrap();
        assert_eq!(split.sizes().total(), 20);
        assert_eq!(split.train.column("x").unwrap().last(), Some(&13.0));
        assert_eq!(split.validation.column("x").unwrap().first(), Some(&14.0));
        assert_eq!(split.test.column("x").unwrap().first(), Some(&17.0));

        let rebuilt = split.history().unwrap().concat(&split.test).unwrap();
        assert_eq!(rebuilt, t);
    }

    #[test]
    fn hand_built_ratios_are_clamped() {
        let greedy = SplitConfig {
            train_ratio: 1.5,
            validation_ratio: 0.3,
        };
        assert_eq!(
            greedy.sizes(10),
            SplitSizes {
                train: 10,
                validation: 0,
                test: 0
            }
        );

        let negative = SplitConfig {
            train_ratio: -0.2,
            validation_ratio: f64::NAN,
        };
        assert_eq!(negative.sizes(10).test, 10);
        assert!(chronological_split(&table(10), &greedy).is_err());
    }

    #[test]
    fn invalid_ratios() {
        assert!(SplitConfig::new(0.0, 0.1).is_err());
        assert!(SplitConfig::new(0.9, 0.2).is_err());
        assert!(SplitConfig::new(0.5, -0.1).is_err());
        assert!(SplitConfig::new(0.8, 0.2).is_ok());
    }
}

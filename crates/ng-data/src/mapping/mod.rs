//! Mapping a numeric source range onto an attribute range
//!
//! A [`NumericMapping`] is configured by the caller, then prepared against
//! the source values it will be applied to. Preparation resolves the source
//! range and rejects unusable configurations before any row is written.

pub mod autofill;
mod gradient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use autofill::{map_to_category_colors, map_to_color, map_to_numeric_range, AutofillOutcome};
pub use gradient::{category_color, ColorGradient};

/// Invalid mapping configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("no numeric source values to map")]
    EmptySource,

    #[error("logarithmic mapping needs positive values, found {0}")]
    NonPositiveLogValue(f64),

    #[error("source minimum {min} is greater than maximum {max}")]
    InvertedSourceRange { min: f64, max: f64 },

    #[error("mapping bounds must be finite numbers")]
    NonFiniteBound,
}

/// How source values are spread over the destination range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MappingMode {
    #[default]
    Linear,
    Logarithmic,
}

/// Configuration for mapping a source column onto a destination range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericMapping {
    #[serde(default)]
    pub mode: MappingMode,
    /// Explicit source bounds; None means "take it from the data"
    pub source_min: Option<f64>,
    pub source_max: Option<f64>,
    pub dest_min: f64,
    pub dest_max: f64,
    /// Drop values more than one standard deviation from the mean when
    /// computing the source range from the data
    #[serde(default)]
    pub ignore_outliers: bool,
}

impl NumericMapping {
    /// Linear mapping onto `dest_min..=dest_max` with the source range taken
    /// from the data
    pub fn linear(dest_min: f64, dest_max: f64) -> Self {
        Self {
            mode: MappingMode::Linear,
            source_min: None,
            source_max: None,
            dest_min,
            dest_max,
            ignore_outliers: false,
        }
    }

    pub fn logarithmic(dest_min: f64, dest_max: f64) -> Self {
        Self {
            mode: MappingMode::Logarithmic,
            ..Self::linear(dest_min, dest_max)
        }
    }

    pub fn with_source_range(mut self, min: f64, max: f64) -> Self {
        self.source_min = Some(min);
        self.source_max = Some(max);
        self
    }

    pub fn ignoring_outliers(mut self) -> Self {
        self.ignore_outliers = true;
        self
    }

    /// Resolve the source range against the values the mapping will be
    /// applied to, validating the configuration.
    pub fn prepare(&self, source_values: &[f64]) -> Result<PreparedMapping, MappingError> {
        let explicit = [self.source_min, self.source_max, Some(self.dest_min), Some(self.dest_max)];
        if explicit.iter().flatten().any(|bound| !bound.is_finite()) {
            return Err(MappingError::NonFiniteBound);
        }

        let data: Vec<f64> = source_values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();

        let (source_min, source_max) = match (self.source_min, self.source_max) {
            (Some(min), Some(max)) => (min, max),
            (min, max) => {
                if data.is_empty() {
                    return Err(MappingError::EmptySource);
                }
                if self.mode == MappingMode::Logarithmic {
                    if let Some(bad) = data.iter().find(|v| **v <= 0.0) {
                        return Err(MappingError::NonPositiveLogValue(*bad));
                    }
                }
                let (data_min, data_max) = if self.ignore_outliers {
                    range_without_outliers(&data)
                } else {
                    range_of(&data)
                };
                (min.unwrap_or(data_min), max.unwrap_or(data_max))
            }
        };

        if source_min > source_max {
            return Err(MappingError::InvertedSourceRange {
                min: source_min,
                max: source_max,
            });
        }
        if self.mode == MappingMode::Logarithmic {
            for bound in [source_min, source_max] {
                if bound <= 0.0 {
                    return Err(MappingError::NonPositiveLogValue(bound));
                }
            }
        }

        Ok(PreparedMapping {
            mode: self.mode,
            source_min,
            source_max,
            dest_min: self.dest_min,
            dest_max: self.dest_max,
        })
    }
}

fn range_of(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

/// Range of the values within one population standard deviation of the
/// mean. Falls back to the full range if no value is that close.
fn range_without_outliers(values: &[f64]) -> (f64, f64) {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let deviation = variance.sqrt();

    let inliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() <= deviation)
        .collect();

    if inliers.is_empty() {
        range_of(values)
    } else {
        range_of(&inliers)
    }
}

/// A mapping with its source range resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedMapping {
    mode: MappingMode,
    source_min: f64,
    source_max: f64,
    dest_min: f64,
    dest_max: f64,
}

impl PreparedMapping {
    pub fn source_range(&self) -> (f64, f64) {
        (self.source_min, self.source_max)
    }

    /// Position of a value within the source range, 0..=1.
    ///
    /// Values outside the range are clamped to it.
    pub fn fraction(&self, value: f64) -> f64 {
        if self.source_max == self.source_min {
            return 0.0;
        }
        let value = value.clamp(self.source_min, self.source_max);
        match self.mode {
            MappingMode::Linear => (value - self.source_min) / (self.source_max - self.source_min),
            MappingMode::Logarithmic => {
                (value.ln() - self.source_min.ln()) / (self.source_max.ln() - self.source_min.ln())
            }
        }
    }

    /// Map a source value onto the destination range
    pub fn map(&self, value: f64) -> f64 {
        self.dest_min + self.fraction(value) * (self.dest_max - self.dest_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_range_from_data() {
        let prepared = NumericMapping::linear(1.0, 10.0)
            .prepare(&[2.0, 4.0, 6.0, f64::NAN])
            .unwrap();

        assert_eq!(prepared.source_range(), (2.0, 6.0));
        assert_eq!(prepared.map(2.0), 1.0);
        assert_eq!(prepared.map(4.0), 5.5);
        assert_eq!(prepared.map(6.0), 10.0);
        assert_eq!(prepared.map(100.0), 10.0);
    }

    #[test]
    fn test_explicit_range_clamps() {
        let prepared = NumericMapping::linear(0.0, 100.0)
            .with_source_range(10.0, 20.0)
            .prepare(&[0.0, 15.0, 50.0])
            .unwrap();
        assert_eq!(prepared.map(0.0), 0.0);
        assert_eq!(prepared.map(15.0), 50.0);
        assert_eq!(prepared.map(50.0), 100.0);
    }

    #[test]
    fn test_logarithmic_mapping() {
        let prepared = NumericMapping::logarithmic(0.0, 2.0)
            .prepare(&[1.0, 10.0, 100.0])
            .unwrap();
        assert!((prepared.map(10.0) - 1.0).abs() < 1e-12);
        assert_eq!(prepared.map(100.0), 2.0);
    }

    #[test]
    fn test_logarithmic_rejects_non_positive() {
        assert_eq!(
            NumericMapping::logarithmic(0.0, 1.0).prepare(&[5.0, 0.0, 3.0]),
            Err(MappingError::NonPositiveLogValue(0.0))
        );
        assert_eq!(
            NumericMapping::logarithmic(0.0, 1.0)
                .with_source_range(-1.0, 10.0)
                .prepare(&[5.0]),
            Err(MappingError::NonPositiveLogValue(-1.0))
        );
    }

    #[test]
    fn test_outliers_excluded_from_range_but_still_mapped() {
        let values = [10.0, 11.0, 12.0, 11.0, 10.0, 12.0, 1000.0];
        let prepared = NumericMapping::linear(0.0, 1.0)
            .ignoring_outliers()
            .prepare(&values)
            .unwrap();

        assert_eq!(prepared.source_range(), (10.0, 12.0));
        assert_eq!(prepared.map(1000.0), 1.0);
        assert_eq!(prepared.map(11.0), 0.5);
    }

    #[test]
    fn test_invalid_configurations() {
        assert_eq!(
            NumericMapping::linear(0.0, 1.0).prepare(&[]),
            Err(MappingError::EmptySource)
        );
        assert_eq!(
            NumericMapping::linear(0.0, 1.0)
                .with_source_range(5.0, 1.0)
                .prepare(&[]),
            Err(MappingError::InvertedSourceRange { min: 5.0, max: 1.0 })
        );
        assert_eq!(
            NumericMapping::linear(0.0, f64::NAN).prepare(&[1.0]),
            Err(MappingError::NonFiniteBound)
        );
    }

    #[test]
    fn test_single_valued_source_maps_to_minimum() {
        let prepared = NumericMapping::linear(3.0, 9.0).prepare(&[4.0, 4.0]).unwrap();
        assert_eq!(prepared.map(4.0), 3.0);
    }
}

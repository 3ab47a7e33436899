//! The parameter bundle consumed by the practice generation engine.
//!
//! The bundle is loaded once per run and shared read-only across all
//! practice generation calls. Values are range-checked by the engine
//! operation that consumes them, just before sampling, so a bad value
//! surfaces as a `Configuration` error rather than a strange sample.

use serde::Deserialize;

use crate::error::{Result, SynthEhrError};

/// The five ethnicity categories sampled jointly; `white` is derived as the
/// remainder and therefore has no row in the correlation structure. The
/// order here is the order of the conditional exclusion chain and of every
/// row and column in the correlation matrix.
pub const CORRELATED_ETHNICITIES: [&str; 5] = ["south_asian", "black", "other", "mixed", "unknown"];

/// Correlation structure for the joint ethnicity draw.
#[derive(Debug, Clone, Deserialize)]
pub struct EthnicityConfig {
    pub correlation_matrix: [[f64; 5]; 5],
    pub means: [f64; 5],
    pub standard_deviations: [f64; 5],
    pub ethnicity_names: [String; 5],
}

impl EthnicityConfig {
    /// Structural checks on the correlation bundle: symmetric matrix with a
    /// unit diagonal, positive standard deviations, and category rows in
    /// the exclusion-chain order the engine assumes.
    pub(crate) fn validate(&self) -> Result<()> {
        for i in 0..5 {
            if (self.correlation_matrix[i][i] - 1.0).abs() > 1e-12 {
                return Err(SynthEhrError::Configuration(format!(
                    "correlation matrix must have a unit diagonal, got {} at row {i}",
                    self.correlation_matrix[i][i]
                )));
            }
            for j in 0..i {
                if (self.correlation_matrix[i][j] - self.correlation_matrix[j][i]).abs() > 1e-12 {
                    return Err(SynthEhrError::Configuration(format!(
                        "correlation matrix must be symmetric, rows {i} and {j} disagree"
                    )));
                }
            }
            if self.standard_deviations[i] <= 0.0 {
                return Err(SynthEhrError::Configuration(format!(
                    "ethnicity standard deviations must be positive, got {} for {}",
                    self.standard_deviations[i], self.ethnicity_names[i]
                )));
            }
        }
        if self
            .ethnicity_names
            .iter()
            .map(String::as_str)
            .ne(CORRELATED_ETHNICITIES)
        {
            return Err(SynthEhrError::Configuration(format!(
                "ethnicity categories must be ordered {CORRELATED_ETHNICITIES:?}, \
                 got {:?}",
                self.ethnicity_names
            )));
        }
        Ok(())
    }
}

/// Sex ratio and birth-year anchor parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct DemographicConfig {
    pub male_proportion_mean: f64,
    pub male_proportion_sd: f64,
    pub min_yob_mean: f64,
    pub min_yob_sd: f64,
    pub med_yob_mean: f64,
    pub med_yob_sd: f64,
    pub max_yob_mean: f64,
    pub max_yob_sd: f64,
}

/// Registration-period and transfer-out parameters. Offsets and gaps are in
/// days since the 1960-01-01 reference date.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    /// Study end: the latest date any registration data may extend to.
    pub last_registration_date: f64,
    pub min_registration_offset: f64,
    pub min_registration_sd: f64,
    pub med_registration_offset: f64,
    pub med_registration_sd: f64,
    pub transfer_probability_mean: f64,
    pub transfer_probability_sd: f64,
    pub min_transfer_gap: f64,
    pub min_transfer_gap_sd: f64,
    pub med_transfer_gap_mean: f64,
    pub med_transfer_gap_sd: f64,
    pub max_transfer_gap_mean: f64,
    pub max_transfer_gap_sd: f64,
}

/// Complete parameter bundle for practice generation.
#[derive(Debug, Clone, Deserialize)]
pub struct PracticeConfig {
    pub ethnicity: EthnicityConfig,
    pub demographics: DemographicConfig,
    pub registration: RegistrationConfig,
    /// Degrees of freedom for the two chi-square draws behind the
    /// practice-size ratio.
    pub practice_size_df1: u32,
    pub practice_size_df2: u32,
    pub practice_size_multiplier: f64,
}

impl PracticeConfig {
    /// The default bundle, reproducing the legacy simulation parameters.
    pub fn default_config() -> Self {
        Self {
            ethnicity: EthnicityConfig {
                correlation_matrix: [
                    [1.0, 0.78, 0.70, 0.73, 0.09],
                    [0.78, 1.0, 0.71, 0.74, 0.04],
                    [0.70, 0.71, 1.0, 0.60, 0.04],
                    [0.73, 0.74, 0.60, 1.0, 0.009],
                    [0.09, 0.04, 0.04, 0.009, 1.0],
                ],
                means: [-5.3, -5.6, -5.7, -6.3, -5.2],
                standard_deviations: [1.7, 1.7, 1.3, 1.1, 1.7],
                ethnicity_names: CORRELATED_ETHNICITIES.map(String::from),
            },
            demographics: DemographicConfig {
                male_proportion_mean: 0.4,
                male_proportion_sd: 0.05,
                min_yob_mean: 1910.0,
                min_yob_sd: 5.0,
                med_yob_mean: 1943.0,
                med_yob_sd: 5.0,
                max_yob_mean: 1980.0,
                max_yob_sd: 5.0,
            },
            registration: RegistrationConfig {
                // 20926 days after 1960-01-01, i.e. 2017-04-17.
                last_registration_date: 20926.0,
                min_registration_offset: -4890.0,
                min_registration_sd: 5000.0,
                med_registration_offset: 11000.0,
                med_registration_sd: 2400.0,
                transfer_probability_mean: 0.2,
                transfer_probability_sd: 0.075,
                min_transfer_gap: 400.0,
                min_transfer_gap_sd: 20.0,
                med_transfer_gap_mean: 7000.0,
                med_transfer_gap_sd: 2000.0,
                max_transfer_gap_mean: 22400.0,
                max_transfer_gap_sd: 8000.0,
            },
            practice_size_df1: 30,
            practice_size_df2: 20,
            practice_size_multiplier: 1000.0,
        }
    }

    /// Deserialize a bundle from YAML.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        serde_yaml::from_reader(reader).map_err(|e| {
            SynthEhrError::Configuration(format!("failed to parse configuration: {e}"))
        })
    }
}

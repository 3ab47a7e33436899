//! The practice generation engine.
//!
//! Samples one statistically valid practice profile at a time from the
//! parameter bundle: a heavy-tailed practice size, registration period
//! bounds, correlated ethnicity proportions, the male proportion, transfer
//! behaviour and birth-year anchors. Every draw comes from the engine's own
//! ChaCha8 generator, seeded at construction, so a fixed seed reproduces
//! the same practice sequence exactly.

use log::{debug, info};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{ChiSquared, Distribution, Exp, Normal, StandardNormal};

use crate::config::PracticeConfig;
use crate::error::{Result, SynthEhrError};
use crate::practice::{
    BirthYearParameters, EthnicityProportions, Practice, RegistrationDates, TransferParameters,
};
use crate::seeded_rng;

/// Mean of the exponential offset (in days) between the study end date and
/// a practice's latest registration date.
const LATEST_REGISTRATION_OFFSET_MEAN: f64 = 1500.0;

/// Minimum spacing (in days) kept between the median registration date and
/// either end of the registration period.
const REGISTRATION_SPACING_DAYS: f64 = 100.0;

/// Minimum spacing (in days) kept between adjacent transfer-gap anchors.
const TRANSFER_GAP_SPACING_DAYS: f64 = 100.0;

/// Minimum spacing (in years) kept between adjacent birth-year anchors.
const BIRTH_YEAR_SPACING: f64 = 5.0;

/// Generates practices from a parameter bundle and a seeded generator.
pub struct PracticeFactory {
    config: PracticeConfig,
    rng: ChaCha8Rng,
}

impl PracticeFactory {
    /// Engine over the default parameter bundle.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, PracticeConfig::default_config())
    }

    /// Engine over a caller-supplied parameter bundle. This is the
    /// extension point for alternate configuration sources such as
    /// [`PracticeConfig::from_reader`].
    pub fn with_config(seed: u64, config: PracticeConfig) -> Self {
        Self {
            config,
            rng: seeded_rng::run_rng(seed),
        }
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    /// Generate one practice with the given id.
    ///
    /// Sampling happens in a fixed order (size, registration dates,
    /// ethnicity, male proportion, transfer parameters, birth years); the
    /// order is part of the reproducibility contract because every step
    /// advances the shared generator.
    pub fn create_practice(&mut self, practice_id: u32) -> Result<Practice> {
        let patient_count = self.generate_practice_size()?;
        let registration_dates = self.generate_registration_dates()?;
        let ethnicity_proportions = self.generate_ethnicity_proportions()?;
        let male_proportion = self.generate_male_proportion()?;
        let transfer_params = self.generate_transfer_parameters()?;
        let birth_years = self.generate_birth_years()?;

        debug!(
            "practice {practice_id}: {patient_count} patients, male proportion {male_proportion:.3}"
        );

        Practice::new(
            practice_id,
            patient_count,
            male_proportion,
            registration_dates,
            transfer_params,
            birth_years,
            ethnicity_proportions,
        )
    }

    /// Generate practices with sequential ids 1..=count.
    pub fn create_practices(&mut self, count: u32) -> Result<Vec<Practice>> {
        if count == 0 {
            return Err(SynthEhrError::InvalidArgument(
                "number of practices must be positive, got 0".to_string(),
            ));
        }
        info!("creating {count} practices");
        (1..=count).map(|id| self.create_practice(id)).collect()
    }

    /// Practice size as the ratio of two df-normalised chi-square draws,
    /// scaled by the size multiplier. The ratio gives a strictly positive,
    /// heavy-tailed size distribution.
    fn generate_practice_size(&mut self) -> Result<u32> {
        let df1 = self.config.practice_size_df1;
        let df2 = self.config.practice_size_df2;
        if df1 == 0 || df2 == 0 {
            return Err(SynthEhrError::Configuration(format!(
                "degrees of freedom must be positive, got df1={df1}, df2={df2}"
            )));
        }
        let multiplier = self.config.practice_size_multiplier;
        if multiplier <= 0.0 {
            return Err(SynthEhrError::Configuration(format!(
                "practice size multiplier must be positive, got {multiplier}"
            )));
        }

        let n1 = chi_squared(df1)?.sample(&mut self.rng);
        let n2 = chi_squared(df2)?.sample(&mut self.rng);

        let size = multiplier * (n1 / f64::from(df1)) / (n2 / f64::from(df2));
        Ok(size.round() as u32)
    }

    /// Registration period bounds for one practice.
    ///
    /// The latest date is the study end minus an exponential offset, so
    /// practices cluster near the study end and never pass it. The median
    /// is pinned at least 100 days inside both ends; the lower bound wins
    /// if the draw leaves a degenerate interval.
    fn generate_registration_dates(&mut self) -> Result<RegistrationDates> {
        let reg = &self.config.registration;
        if reg.min_registration_sd <= 0.0 || reg.med_registration_sd <= 0.0 {
            return Err(SynthEhrError::Configuration(
                "all registration date standard deviations must be positive".to_string(),
            ));
        }

        let offset = exponential(LATEST_REGISTRATION_OFFSET_MEAN)?.sample(&mut self.rng);
        let latest = reg.last_registration_date - offset;

        let earliest =
            normal(reg.min_registration_offset, reg.min_registration_sd)?.sample(&mut self.rng);

        let median = normal(reg.med_registration_offset, reg.med_registration_sd)?
            .sample(&mut self.rng)
            .max(earliest + REGISTRATION_SPACING_DAYS)
            .min(latest - REGISTRATION_SPACING_DAYS);

        RegistrationDates::new(earliest, median, latest)
    }

    /// Correlated ethnicity proportions for one practice.
    ///
    /// A five-dimensional correlated normal vector (covariance = outer
    /// product of the standard deviations scaled by the correlation matrix)
    /// is pushed through a logistic transform, giving a raw probability per
    /// category. The raw values are then turned into proportions by a
    /// nested exclusion chain: unknown stands alone; south_asian is
    /// conditioned on not-unknown; black on neither of those; and so on,
    /// with white as the remainder. The chain order is a behavioural
    /// contract inherited from the legacy simulation and must not be
    /// reordered.
    fn generate_ethnicity_proportions(&mut self) -> Result<EthnicityProportions> {
        let ethnicity = &self.config.ethnicity;
        ethnicity.validate()?;

        let mut covariance = [[0.0; 5]; 5];
        for (i, row) in covariance.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = ethnicity.standard_deviations[i]
                    * ethnicity.standard_deviations[j]
                    * ethnicity.correlation_matrix[i][j];
            }
        }
        let lower = cholesky(&covariance)?;

        let mut draws = [0.0; 5];
        for draw in draws.iter_mut() {
            *draw = self.rng.sample(StandardNormal);
        }

        let mut raw = [0.0; 5];
        for i in 0..5 {
            let mut variate = ethnicity.means[i];
            for j in 0..=i {
                variate += lower[i][j] * draws[j];
            }
            raw[i] = logistic(variate);
        }

        // Raw order follows the configured categories:
        // south_asian, black, other, mixed, unknown.
        let [south_asian, black, other, mixed, unknown] = raw;
        let effective_total = 1.0 - unknown;

        let p_south_asian = south_asian / effective_total;
        let p_black = black / ((1.0 - south_asian) * effective_total);
        let p_mixed = mixed / ((1.0 - black) * (1.0 - south_asian) * effective_total);
        let p_other =
            other / ((1.0 - mixed) * (1.0 - black) * (1.0 - south_asian) * effective_total);
        let p_white = (1.0 - p_south_asian - p_black - p_mixed - p_other) * effective_total;

        EthnicityProportions::new(p_white, p_south_asian, p_black, p_mixed, p_other, unknown)
    }

    /// Proportion of male patients, clipped into [0, 1].
    fn generate_male_proportion(&mut self) -> Result<f64> {
        let demo = &self.config.demographics;
        if !(0.0..=1.0).contains(&demo.male_proportion_mean) {
            return Err(SynthEhrError::Configuration(format!(
                "male proportion mean must be between 0 and 1, got {}",
                demo.male_proportion_mean
            )));
        }
        if demo.male_proportion_sd <= 0.0 {
            return Err(SynthEhrError::Configuration(format!(
                "male proportion standard deviation must be positive, got {}",
                demo.male_proportion_sd
            )));
        }

        let proportion = normal(demo.male_proportion_mean, demo.male_proportion_sd)?
            .sample(&mut self.rng)
            .clamp(0.0, 1.0);
        Ok(proportion)
    }

    /// Transfer probability and the minimum/median/maximum gaps (in days)
    /// between registration and transfer-out.
    fn generate_transfer_parameters(&mut self) -> Result<TransferParameters> {
        let reg = &self.config.registration;
        if !(0.0..=1.0).contains(&reg.transfer_probability_mean) {
            return Err(SynthEhrError::Configuration(format!(
                "transfer probability mean must be between 0 and 1, got {}",
                reg.transfer_probability_mean
            )));
        }
        if reg.transfer_probability_sd <= 0.0 {
            return Err(SynthEhrError::Configuration(format!(
                "transfer probability standard deviation must be positive, got {}",
                reg.transfer_probability_sd
            )));
        }
        if reg.min_transfer_gap_sd <= 0.0
            || reg.med_transfer_gap_sd <= 0.0
            || reg.max_transfer_gap_sd <= 0.0
        {
            return Err(SynthEhrError::Configuration(
                "all transfer gap standard deviations must be positive".to_string(),
            ));
        }
        if !(reg.min_transfer_gap < reg.med_transfer_gap_mean
            && reg.med_transfer_gap_mean < reg.max_transfer_gap_mean)
        {
            return Err(SynthEhrError::Configuration(
                "transfer gap means must be properly ordered".to_string(),
            ));
        }

        let probability = normal(reg.transfer_probability_mean, reg.transfer_probability_sd)?
            .sample(&mut self.rng)
            .clamp(0.0, 1.0);

        let minimum_gap = (reg.min_transfer_gap
            + round_one_decimal(normal(0.0, reg.min_transfer_gap_sd)?.sample(&mut self.rng)))
        .max(0.0);

        let median_gap = normal(reg.med_transfer_gap_mean, reg.med_transfer_gap_sd)?
            .sample(&mut self.rng)
            .max(minimum_gap + TRANSFER_GAP_SPACING_DAYS);

        let maximum_gap = normal(reg.max_transfer_gap_mean, reg.max_transfer_gap_sd)?
            .sample(&mut self.rng)
            .max(median_gap + TRANSFER_GAP_SPACING_DAYS);

        TransferParameters::new(probability, minimum_gap, median_gap, maximum_gap)
    }

    /// Earliest/median/latest birth-year anchors, kept at least five years
    /// apart and rounded to one decimal.
    fn generate_birth_years(&mut self) -> Result<BirthYearParameters> {
        let demo = &self.config.demographics;
        if demo.min_yob_sd <= 0.0 || demo.med_yob_sd <= 0.0 || demo.max_yob_sd <= 0.0 {
            return Err(SynthEhrError::Configuration(
                "all birth year standard deviations must be positive".to_string(),
            ));
        }
        if !(demo.min_yob_mean < demo.med_yob_mean && demo.med_yob_mean < demo.max_yob_mean) {
            return Err(SynthEhrError::Configuration(format!(
                "birth year means must be in chronological order, got min={}, med={}, max={}",
                demo.min_yob_mean, demo.med_yob_mean, demo.max_yob_mean
            )));
        }
        if !(1800.0..=2024.0).contains(&demo.min_yob_mean) {
            return Err(SynthEhrError::Configuration(format!(
                "earliest birth year mean must be realistic (1800-2024), got {}",
                demo.min_yob_mean
            )));
        }

        let earliest = normal(demo.min_yob_mean, demo.min_yob_sd)?.sample(&mut self.rng);

        let median = normal(demo.med_yob_mean, demo.med_yob_sd)?
            .sample(&mut self.rng)
            .max(earliest + BIRTH_YEAR_SPACING);

        let latest = normal(demo.max_yob_mean, demo.max_yob_sd)?
            .sample(&mut self.rng)
            .max(median + BIRTH_YEAR_SPACING);

        BirthYearParameters::new(
            round_one_decimal(earliest),
            round_one_decimal(median),
            round_one_decimal(latest),
        )
    }
}

fn normal(mean: f64, sd: f64) -> Result<Normal<f64>> {
    Normal::new(mean, sd).map_err(|e| {
        SynthEhrError::Configuration(format!(
            "invalid normal parameters (mean={mean}, sd={sd}): {e}"
        ))
    })
}

fn exponential(mean: f64) -> Result<Exp<f64>> {
    Exp::new(1.0 / mean).map_err(|e| {
        SynthEhrError::Configuration(format!("invalid exponential mean {mean}: {e}"))
    })
}

fn chi_squared(df: u32) -> Result<ChiSquared<f64>> {
    ChiSquared::new(f64::from(df)).map_err(|e| {
        SynthEhrError::Configuration(format!("invalid chi-square degrees of freedom {df}: {e}"))
    })
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite
/// matrix. Fails if the matrix is not positive definite, which for the
/// ethnicity bundle means the correlation structure is inconsistent.
fn cholesky(matrix: &[[f64; 5]; 5]) -> Result<[[f64; 5]; 5]> {
    let mut lower = [[0.0; 5]; 5];
    for i in 0..5 {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= lower[i][k] * lower[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(SynthEhrError::Configuration(
                        "ethnicity covariance matrix is not positive definite".to_string(),
                    ));
                }
                lower[i][j] = sum.sqrt();
            } else {
                lower[i][j] = sum / lower[j][j];
            }
        }
    }
    Ok(lower)
}

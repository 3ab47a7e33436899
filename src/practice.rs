//! The practice entity and its component parameter groups.
//!
//! A practice is a simulated clinical site whose demographic and
//! registration profile drives the generation of its patient roster. All
//! dates are stored as days since the reference date (1960-01-01) and all
//! parameter groups validate their invariants at construction.

use crate::error::{Result, SynthEhrError};
use crate::patient::Ethnicity;

/// Registration period bounds for a practice, in day offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationDates {
    earliest: f64,
    median: f64,
    latest: f64,
}

impl RegistrationDates {
    pub fn new(earliest: f64, median: f64, latest: f64) -> Result<Self> {
        if !(earliest <= median && median <= latest) {
            return Err(SynthEhrError::EntityValidation(format!(
                "registration dates must be ordered earliest <= median <= latest, \
                 got {earliest}, {median}, {latest}"
            )));
        }
        Ok(Self {
            earliest,
            median,
            latest,
        })
    }

    pub fn earliest(&self) -> f64 {
        self.earliest
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn latest(&self) -> f64 {
        self.latest
    }
}

/// Parameters controlling patient transfer-out behaviour. Gaps are the
/// number of days between registration and transfer-out.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferParameters {
    probability: f64,
    minimum_gap: f64,
    median_gap: f64,
    maximum_gap: f64,
}

impl TransferParameters {
    pub fn new(probability: f64, minimum_gap: f64, median_gap: f64, maximum_gap: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SynthEhrError::EntityValidation(format!(
                "transfer probability must be between 0 and 1, got {probability}"
            )));
        }
        if minimum_gap < 0.0 {
            return Err(SynthEhrError::EntityValidation(format!(
                "transfer gaps cannot be negative, got minimum {minimum_gap}"
            )));
        }
        if !(minimum_gap <= median_gap && median_gap <= maximum_gap) {
            return Err(SynthEhrError::EntityValidation(format!(
                "transfer gaps must be ordered minimum <= median <= maximum, \
                 got {minimum_gap}, {median_gap}, {maximum_gap}"
            )));
        }
        Ok(Self {
            probability,
            minimum_gap,
            median_gap,
            maximum_gap,
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn minimum_gap(&self) -> f64 {
        self.minimum_gap
    }

    pub fn median_gap(&self) -> f64 {
        self.median_gap
    }

    pub fn maximum_gap(&self) -> f64 {
        self.maximum_gap
    }
}

/// Birth-year boundaries for the practice population.
#[derive(Debug, Clone, PartialEq)]
pub struct BirthYearParameters {
    earliest: f64,
    median: f64,
    latest: f64,
}

impl BirthYearParameters {
    pub fn new(earliest: f64, median: f64, latest: f64) -> Result<Self> {
        if !(earliest <= median && median <= latest) {
            return Err(SynthEhrError::EntityValidation(format!(
                "birth years must be ordered earliest <= median <= latest, \
                 got {earliest}, {median}, {latest}"
            )));
        }
        if !(1800.0..=2024.0).contains(&earliest) {
            return Err(SynthEhrError::EntityValidation(format!(
                "birth years must be realistic (between 1800 and 2024), got {earliest}"
            )));
        }
        Ok(Self {
            earliest,
            median,
            latest,
        })
    }

    pub fn earliest(&self) -> f64 {
        self.earliest
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn latest(&self) -> f64 {
        self.latest
    }
}

/// Proportion of patients in each of the six ethnicity categories.
///
/// The conditional chain that produces these leaves the sum slightly above
/// 1 rather than exactly 1, so the sum check truncates: any total in
/// [1, 2) passes.
#[derive(Debug, Clone, PartialEq)]
pub struct EthnicityProportions {
    white: f64,
    south_asian: f64,
    black: f64,
    mixed: f64,
    other: f64,
    unknown: f64,
}

impl EthnicityProportions {
    pub fn new(
        white: f64,
        south_asian: f64,
        black: f64,
        mixed: f64,
        other: f64,
        unknown: f64,
    ) -> Result<Self> {
        let named = [
            ("white", white),
            ("south_asian", south_asian),
            ("black", black),
            ("mixed", mixed),
            ("other", other),
            ("unknown", unknown),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(SynthEhrError::EntityValidation(format!(
                    "ethnicity proportion {name} must be between 0 and 1, got {value}"
                )));
            }
        }
        let total = white + south_asian + black + mixed + other + unknown;
        if !(1.0..2.0).contains(&total) {
            return Err(SynthEhrError::EntityValidation(format!(
                "ethnicity proportions must sum to 1, got {total}"
            )));
        }
        Ok(Self {
            white,
            south_asian,
            black,
            mixed,
            other,
            unknown,
        })
    }

    pub fn proportion(&self, ethnicity: Ethnicity) -> f64 {
        match ethnicity {
            Ethnicity::White => self.white,
            Ethnicity::SouthAsian => self.south_asian,
            Ethnicity::Black => self.black,
            Ethnicity::Mixed => self.mixed,
            Ethnicity::Other => self.other,
            Ethnicity::Unknown => self.unknown,
        }
    }

    pub fn unknown(&self) -> f64 {
        self.unknown
    }

    /// Sum over all six categories (close to 1.0).
    pub fn total(&self) -> f64 {
        self.white + self.south_asian + self.black + self.mixed + self.other + self.unknown
    }
}

/// A simulated clinical practice.
///
/// Created once by the practice generation engine, immutable thereafter,
/// and consumed by exactly one patient generation engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Practice {
    practice_id: u32,
    patient_count: u32,
    male_proportion: f64,
    registration_dates: RegistrationDates,
    transfer_params: TransferParameters,
    birth_years: BirthYearParameters,
    ethnicity_proportions: EthnicityProportions,
}

impl Practice {
    pub fn new(
        practice_id: u32,
        patient_count: u32,
        male_proportion: f64,
        registration_dates: RegistrationDates,
        transfer_params: TransferParameters,
        birth_years: BirthYearParameters,
        ethnicity_proportions: EthnicityProportions,
    ) -> Result<Self> {
        if practice_id == 0 {
            return Err(SynthEhrError::EntityValidation(
                "practice id must be a positive integer".to_string(),
            ));
        }
        if patient_count == 0 {
            return Err(SynthEhrError::EntityValidation(
                "patient count must be a positive integer".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&male_proportion) {
            return Err(SynthEhrError::EntityValidation(format!(
                "male proportion must be between 0 and 1, got {male_proportion}"
            )));
        }
        Ok(Self {
            practice_id,
            patient_count,
            male_proportion,
            registration_dates,
            transfer_params,
            birth_years,
            ethnicity_proportions,
        })
    }

    pub fn practice_id(&self) -> u32 {
        self.practice_id
    }

    pub fn patient_count(&self) -> u32 {
        self.patient_count
    }

    pub fn male_proportion(&self) -> f64 {
        self.male_proportion
    }

    pub fn registration_dates(&self) -> &RegistrationDates {
        &self.registration_dates
    }

    pub fn transfer_params(&self) -> &TransferParameters {
        &self.transfer_params
    }

    pub fn birth_years(&self) -> &BirthYearParameters {
        &self.birth_years
    }

    pub fn ethnicity_proportions(&self) -> &EthnicityProportions {
        &self.ethnicity_proportions
    }

    /// Length of the registration period in days.
    pub fn registration_period_days(&self) -> f64 {
        self.registration_dates.latest - self.registration_dates.earliest
    }

    /// Spread of the birth-year range in years.
    pub fn birth_year_range(&self) -> f64 {
        self.birth_years.latest - self.birth_years.earliest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_proportions() -> EthnicityProportions {
        EthnicityProportions::new(0.9, 0.03, 0.03, 0.01, 0.01, 0.02).unwrap()
    }

    fn valid_practice() -> Practice {
        Practice::new(
            1,
            100,
            0.4,
            RegistrationDates::new(-4890.0, 11000.0, 20000.0).unwrap(),
            TransferParameters::new(0.2, 400.0, 7000.0, 22400.0).unwrap(),
            BirthYearParameters::new(1910.0, 1943.0, 1980.0).unwrap(),
            valid_proportions(),
        )
        .unwrap()
    }

    #[test]
    fn registration_dates_ordering_enforced() {
        assert!(RegistrationDates::new(10.0, 5.0, 20.0).is_err());
        assert!(RegistrationDates::new(10.0, 15.0, 12.0).is_err());
        assert!(RegistrationDates::new(10.0, 15.0, 20.0).is_ok());
    }

    #[test]
    fn transfer_parameters_validated() {
        assert!(TransferParameters::new(1.5, 400.0, 7000.0, 22400.0).is_err());
        assert!(TransferParameters::new(0.2, -1.0, 7000.0, 22400.0).is_err());
        assert!(TransferParameters::new(0.2, 8000.0, 7000.0, 22400.0).is_err());
    }

    #[test]
    fn birth_years_validated() {
        assert!(BirthYearParameters::new(1950.0, 1940.0, 1980.0).is_err());
        assert!(BirthYearParameters::new(1700.0, 1940.0, 1980.0).is_err());
        assert!(BirthYearParameters::new(1910.0, 1943.0, 1980.0).is_ok());
    }

    #[test]
    fn ethnicity_proportions_validated() {
        assert!(EthnicityProportions::new(1.2, 0.0, 0.0, 0.0, 0.0, 0.0).is_err());
        assert!(EthnicityProportions::new(0.1, 0.1, 0.1, 0.1, 0.1, 0.1).is_err());
        let proportions = valid_proportions();
        assert!((proportions.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ethnicity_sum_check_truncates() {
        // Totals below 1 are rejected even when they round up to 1.
        assert!(EthnicityProportions::new(0.2, 0.1, 0.1, 0.1, 0.05, 0.05).is_err());
        // The generation chain overshoots 1 by a small positive amount;
        // any total in [1, 2) is accepted.
        assert!(EthnicityProportions::new(0.9, 0.2, 0.1, 0.1, 0.05, 0.05).is_ok());
        assert!(EthnicityProportions::new(0.9, 0.9, 0.9, 0.1, 0.05, 0.05).is_err());
    }

    #[test]
    fn proportion_lookup_matches_category() {
        let proportions = valid_proportions();
        assert_eq!(proportions.proportion(Ethnicity::White), 0.9);
        assert_eq!(proportions.proportion(Ethnicity::Unknown), 0.02);
        assert_eq!(proportions.unknown(), 0.02);
    }

    #[test]
    fn practice_field_validation() {
        let practice = valid_practice();
        assert_eq!(practice.practice_id(), 1);
        assert_eq!(practice.patient_count(), 100);
        assert_eq!(practice.registration_period_days(), 24890.0);
        assert_eq!(practice.birth_year_range(), 70.0);

        let bad_male = Practice::new(
            1,
            100,
            1.4,
            RegistrationDates::new(-4890.0, 11000.0, 20000.0).unwrap(),
            TransferParameters::new(0.2, 400.0, 7000.0, 22400.0).unwrap(),
            BirthYearParameters::new(1910.0, 1943.0, 1980.0).unwrap(),
            valid_proportions(),
        );
        assert!(matches!(bad_male, Err(SynthEhrError::EntityValidation(_))));
    }
}

//! The patient entity and its categorical attributes.
//!
//! All dates are stored as days since the reference date (1960-01-01).

use std::fmt;

use crate::error::{Result, SynthEhrError};

/// Patient sex categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Single-character code used in the output records.
    pub fn code(self) -> char {
        match self {
            Sex::Male => 'M',
            Sex::Female => 'F',
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Patient ethnicity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ethnicity {
    White,
    SouthAsian,
    Black,
    Mixed,
    Other,
    Unknown,
}

impl Ethnicity {
    /// Lower-case category name used in the output records.
    pub fn as_str(self) -> &'static str {
        match self {
            Ethnicity::White => "white",
            Ethnicity::SouthAsian => "south_asian",
            Ethnicity::Black => "black",
            Ethnicity::Mixed => "mixed",
            Ethnicity::Other => "other",
            Ethnicity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Ethnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An individual simulated patient record.
///
/// Constructed once by the patient generation engine and immutable
/// thereafter. Construction validates the chronological invariants between
/// the life-event dates and fails rather than produce a partial record.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    patient_id: u64,
    practice_id: u32,
    birth_date: i64,
    registration_date: i64,
    sex: Sex,
    ethnicity: Ethnicity,
    transfer_date: Option<i64>,
    death_date: Option<i64>,
}

impl Patient {
    /// Validate and construct a patient record.
    ///
    /// Invariants: birth before registration; transfer-out (if any) after
    /// registration; death (if any) after birth and no later than a
    /// recorded transfer-out.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        patient_id: u64,
        practice_id: u32,
        birth_date: i64,
        registration_date: i64,
        sex: Sex,
        ethnicity: Ethnicity,
        transfer_date: Option<i64>,
        death_date: Option<i64>,
    ) -> Result<Self> {
        if birth_date >= registration_date {
            return Err(SynthEhrError::EntityValidation(format!(
                "birth date must be before registration date \
                 (birth={birth_date}, registration={registration_date})"
            )));
        }

        if let Some(transfer) = transfer_date {
            if transfer <= registration_date {
                return Err(SynthEhrError::EntityValidation(format!(
                    "transfer date must be after registration date \
                     (transfer={transfer}, registration={registration_date})"
                )));
            }
        }

        if let Some(death) = death_date {
            if death <= birth_date {
                return Err(SynthEhrError::EntityValidation(format!(
                    "death date must be after birth date \
                     (death={death}, birth={birth_date})"
                )));
            }
            if let Some(transfer) = transfer_date {
                if death > transfer {
                    return Err(SynthEhrError::EntityValidation(format!(
                        "death date cannot be after transfer-out date \
                         (death={death}, transfer={transfer})"
                    )));
                }
            }
        }

        Ok(Self {
            patient_id,
            practice_id,
            birth_date,
            registration_date,
            sex,
            ethnicity,
            transfer_date,
            death_date,
        })
    }

    pub fn patient_id(&self) -> u64 {
        self.patient_id
    }

    pub fn practice_id(&self) -> u32 {
        self.practice_id
    }

    pub fn birth_date(&self) -> i64 {
        self.birth_date
    }

    pub fn registration_date(&self) -> i64 {
        self.registration_date
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn ethnicity(&self) -> Ethnicity {
        self.ethnicity
    }

    pub fn transfer_date(&self) -> Option<i64> {
        self.transfer_date
    }

    pub fn death_date(&self) -> Option<i64> {
        self.death_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_patient(transfer: Option<i64>, death: Option<i64>) -> Result<Patient> {
        Patient::new(
            1001,
            1,
            -1000,
            5000,
            Sex::Female,
            Ethnicity::White,
            transfer,
            death,
        )
    }

    #[test]
    fn valid_patient_constructs() {
        let patient = base_patient(Some(9000), Some(8000)).unwrap();
        assert_eq!(patient.patient_id(), 1001);
        assert_eq!(patient.sex().code(), 'F');
        assert_eq!(patient.ethnicity().as_str(), "white");
    }

    #[test]
    fn birth_after_registration_rejected() {
        let result = Patient::new(
            1001,
            1,
            5000,
            5000,
            Sex::Male,
            Ethnicity::Unknown,
            None,
            None,
        );
        assert!(matches!(result, Err(SynthEhrError::EntityValidation(_))));
    }

    #[test]
    fn transfer_before_registration_rejected() {
        let result = base_patient(Some(4000), None);
        assert!(matches!(result, Err(SynthEhrError::EntityValidation(_))));
    }

    #[test]
    fn death_before_birth_rejected() {
        let result = base_patient(None, Some(-2000));
        assert!(matches!(result, Err(SynthEhrError::EntityValidation(_))));
    }

    #[test]
    fn death_after_transfer_rejected() {
        let result = base_patient(Some(9000), Some(9500));
        assert!(matches!(result, Err(SynthEhrError::EntityValidation(_))));
    }

    #[test]
    fn death_on_transfer_day_allowed() {
        assert!(base_patient(Some(9000), Some(9000)).is_ok());
    }
}

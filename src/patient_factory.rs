//! The patient generation engine.
//!
//! Bound to exactly one practice: every draw is conditioned on that
//! practice's profile, and the engine owns the practice for the duration of
//! roster generation before handing it back. Dates are produced in
//! dependency order (birth, registration, transfer-out, death) so the
//! chronological invariants hold by construction.

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Beta, Distribution};

use crate::error::{Result, SynthEhrError};
use crate::patient::{Ethnicity, Patient, Sex};
use crate::practice::Practice;

/// Average days per year, accounting for leap years.
const DAYS_PER_YEAR: f64 = 365.25;

/// 1991-01-01 as a day offset from 1960-01-01; no transfer-out may be
/// recorded before this date.
const TRANSFER_CUTOFF_DAYS: f64 = 11323.0;

/// Every recorded death occurs at this age.
const DEATH_AGE_YEARS: f64 = 105.0;

/// Latest allowed gap (in years) between birth and a corrected
/// registration date when the sampled one would precede the birth.
const MAX_REGISTRATION_DELAY_YEARS: f64 = 5.0;

/// Generates the patient roster for one practice.
pub struct PatientFactory {
    practice: Practice,
    rng: ChaCha8Rng,
}

impl PatientFactory {
    /// Bind an engine to one practice and its roster generator (see
    /// [`crate::seeded_rng::roster_rng`]).
    pub fn new(practice: Practice, rng: ChaCha8Rng) -> Self {
        Self { practice, rng }
    }

    pub fn practice(&self) -> &Practice {
        &self.practice
    }

    /// Hand the practice back after roster generation.
    pub fn into_practice(self) -> Practice {
        self.practice
    }

    /// Generate the patient at the given 0-based roster index.
    pub fn create_patient(&mut self, index: u32) -> Result<Patient> {
        let patient_id = self.generate_patient_id(index)?;
        let sex = self.generate_sex();
        let ethnicity = self.generate_ethnicity();
        let birth_date = self.generate_birth_date();
        let registration_date = self.generate_registration_date(birth_date);
        let transfer_date = self.generate_transfer_date(birth_date, registration_date);
        let death_date = self.generate_death_date(birth_date, transfer_date);

        Patient::new(
            patient_id,
            self.practice.practice_id(),
            birth_date,
            registration_date,
            sex,
            ethnicity,
            transfer_date,
            death_date,
        )
    }

    /// Generate the full roster, sorted ascending by patient id.
    ///
    /// The id scheme is deterministic, so the roster-wide uniqueness check
    /// is defensive: a collision signals a logic defect, not bad luck.
    pub fn create_patients(&mut self) -> Result<Vec<Patient>> {
        let count = self.practice.patient_count();
        debug!(
            "practice {}: generating {count} patients",
            self.practice.practice_id()
        );

        let mut patients = Vec::with_capacity(count as usize);
        for index in 0..count {
            patients.push(self.create_patient(index)?);
        }

        let mut ids: Vec<u64> = patients.iter().map(Patient::patient_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != patients.len() {
            return Err(SynthEhrError::DuplicateIdentifier(format!(
                "roster for practice {} contains duplicate patient ids",
                self.practice.practice_id()
            )));
        }

        patients.sort_by_key(Patient::patient_id);
        Ok(patients)
    }

    /// Patient ids concatenate the 1-based sequence number with the
    /// practice id zero-padded to three digits (index 0 in practice 12
    /// gives 1012). The scheme stops being unambiguous once practice ids
    /// exceed three digits; downstream consumers depend on this exact
    /// numeric form, so the limitation is documented rather than patched.
    fn generate_patient_id(&self, index: u32) -> Result<u64> {
        let sequence = u64::from(index) + 1;
        let composed = format!("{sequence}{:03}", self.practice.practice_id());
        composed.parse().map_err(|_| {
            SynthEhrError::EntityValidation(format!(
                "patient id {composed} does not fit in 64 bits"
            ))
        })
    }

    fn generate_sex(&mut self) -> Sex {
        if self.rng.gen::<f64>() < self.practice.male_proportion() {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    /// Two-stage ethnicity draw: first decide "unknown" outright, then walk
    /// the cumulative proportions of the remaining categories, normalised
    /// by the non-unknown total.
    fn generate_ethnicity(&mut self) -> Ethnicity {
        let proportions = self.practice.ethnicity_proportions();
        let unknown = proportions.unknown();
        if self.rng.gen::<f64>() < unknown {
            return Ethnicity::Unknown;
        }

        let effective_total = 1.0 - unknown;
        let draw: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for ethnicity in [
            Ethnicity::SouthAsian,
            Ethnicity::Black,
            Ethnicity::Mixed,
            Ethnicity::Other,
            Ethnicity::White,
        ] {
            cumulative += proportions.proportion(ethnicity) / effective_total;
            if draw < cumulative {
                return ethnicity;
            }
        }

        // Rounding can leave the cumulative sum fractionally short of the
        // draw; default to the majority category.
        Ethnicity::White
    }

    /// Birth date as a day offset from 1960-01-01.
    ///
    /// The birth year follows a Beta(2, 0.5) distribution scaled into the
    /// practice's birth-year range; the right skew concentrates mass near
    /// the latest year, so younger patients are more common. The day
    /// within the year is uniform.
    fn generate_birth_date(&mut self) -> i64 {
        let years = self.practice.birth_years();
        let beta = Beta::new(2.0, 0.5).expect("Beta(2, 0.5) parameters are valid");
        let year = years.earliest() + beta.sample(&mut self.rng) * (years.latest() - years.earliest());
        let day_of_year = self.rng.gen::<f64>() * DAYS_PER_YEAR;
        ((year - 1960.0) * DAYS_PER_YEAR + day_of_year) as i64
    }

    /// Registration date, uniform over the practice's registration period
    /// (floored at the reference date). A draw that lands on or before the
    /// birth date is replaced with birth plus up to five years, keeping
    /// registration strictly after birth.
    fn generate_registration_date(&mut self, birth_date: i64) -> i64 {
        let dates = self.practice.registration_dates();
        let lower = dates.earliest().max(0.0);
        let mut registration = lower + self.rng.gen::<f64>() * (dates.latest() - lower);

        if birth_date as f64 >= registration {
            let delay = self.rng.gen::<f64>() * (MAX_REGISTRATION_DELAY_YEARS * DAYS_PER_YEAR);
            registration = birth_date as f64 + delay;
        }

        // Rounding a small delay can collapse the date back onto the birth
        // date itself; registration must stay strictly after birth.
        (registration.round() as i64).max(birth_date + 1)
    }

    /// Optional transfer-out date. The transfer draw may still be
    /// discarded by the eligibility filter (after 1991, after the patient
    /// turns 18, no later than the practice's latest registration date);
    /// a discarded draw is a valid outcome, not an error.
    fn generate_transfer_date(&mut self, birth_date: i64, registration_date: i64) -> Option<i64> {
        let params = self.practice.transfer_params();
        if self.rng.gen::<f64>() >= params.probability() {
            return None;
        }

        let gap = params.minimum_gap()
            + self.rng.gen::<f64>() * (params.maximum_gap() - params.minimum_gap());
        let candidate = registration_date as f64 + gap;

        let study_end = self.practice.registration_dates().latest();
        let adult_threshold = birth_date as f64
            + 18.0 * DAYS_PER_YEAR
            + 7.0
            + self.rng.gen::<f64>() * 60.0;
        let earliest_allowed = TRANSFER_CUTOFF_DAYS.max(adult_threshold);

        if candidate <= study_end && candidate > earliest_allowed {
            Some(candidate.round() as i64)
        } else {
            None
        }
    }

    /// Optional death date: always 105 years after birth, recorded only
    /// when it falls within the study period and no later than a recorded
    /// transfer-out.
    fn generate_death_date(&mut self, birth_date: i64, transfer_date: Option<i64>) -> Option<i64> {
        let candidate = birth_date + (DEATH_AGE_YEARS * DAYS_PER_YEAR) as i64;
        let study_end = self.practice.registration_dates().latest();

        if candidate as f64 <= study_end && transfer_date.map_or(true, |t| candidate <= t) {
            Some(candidate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practice::{
        BirthYearParameters, EthnicityProportions, RegistrationDates, TransferParameters,
    };
    use crate::practice_factory::PracticeFactory;
    use crate::seeded_rng;

    const SEED: u64 = 9147856;

    fn practice_with_count(practice_id: u32, patient_count: u32) -> Practice {
        Practice::new(
            practice_id,
            patient_count,
            0.4,
            RegistrationDates::new(-4890.0, 11000.0, 20000.0).unwrap(),
            TransferParameters::new(0.2, 400.0, 7000.0, 22400.0).unwrap(),
            BirthYearParameters::new(1910.0, 1943.0, 1980.0).unwrap(),
            EthnicityProportions::new(0.9, 0.03, 0.03, 0.01, 0.01, 0.02).unwrap(),
        )
        .unwrap()
    }

    fn factory_for(practice: Practice) -> PatientFactory {
        let rng = seeded_rng::roster_rng(SEED, practice.practice_id());
        PatientFactory::new(practice, rng)
    }

    #[test]
    fn roster_of_five_follows_id_pattern() {
        let mut factory = factory_for(practice_with_count(1, 5));
        let patients = factory.create_patients().unwrap();
        assert_eq!(patients.len(), 5);

        let ids: Vec<u64> = patients.iter().map(Patient::patient_id).collect();
        assert_eq!(ids, vec![1001, 2001, 3001, 4001, 5001]);
    }

    #[test]
    fn patient_id_pads_practice_id_to_three_digits() {
        let factory = factory_for(practice_with_count(12, 5));
        assert_eq!(factory.generate_patient_id(0).unwrap(), 1012);
        assert_eq!(factory.generate_patient_id(1).unwrap(), 2012);
    }

    #[test]
    fn roster_is_sorted_with_unique_ids() {
        let mut factory = factory_for(practice_with_count(7, 200));
        let patients = factory.create_patients().unwrap();

        let ids: Vec<u64> = patients.iter().map(Patient::patient_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn date_invariants_hold_across_a_generated_practice() {
        let mut practice_factory = PracticeFactory::new(SEED);
        let practice = practice_factory.create_practice(1).unwrap();
        let study_end = practice.registration_dates().latest();

        let mut factory = factory_for(practice);
        let patients = factory.create_patients().unwrap();
        assert!(!patients.is_empty());

        for patient in &patients {
            assert!(patient.birth_date() < patient.registration_date());
            if let Some(transfer) = patient.transfer_date() {
                assert!(transfer > patient.registration_date());
                // Transfer candidates are filtered before rounding, so the
                // recorded date can sit within half a day of either bound.
                assert!(transfer as f64 <= study_end + 0.5);
                assert!(transfer as f64 >= TRANSFER_CUTOFF_DAYS - 0.5);
            }
            if let Some(death) = patient.death_date() {
                assert!(death > patient.birth_date());
                assert!(death as f64 <= study_end);
                if let Some(transfer) = patient.transfer_date() {
                    assert!(death <= transfer);
                }
            }
        }
    }

    #[test]
    fn birth_years_stay_within_practice_range() {
        let practice = practice_with_count(1, 500);
        let earliest = practice.birth_years().earliest();
        let latest = practice.birth_years().latest();
        let mut factory = factory_for(practice);

        for _ in 0..500 {
            let birth = factory.generate_birth_date() as f64;
            let year = 1960.0 + birth / DAYS_PER_YEAR;
            assert!(year >= earliest - 1.0 && year <= latest + 1.0, "year {year}");
        }
    }

    #[test]
    fn ethnicity_draws_cover_only_practice_categories() {
        let mut factory = factory_for(practice_with_count(1, 5));
        for _ in 0..200 {
            let ethnicity = factory.generate_ethnicity();
            assert!(matches!(
                ethnicity,
                Ethnicity::White
                    | Ethnicity::SouthAsian
                    | Ethnicity::Black
                    | Ethnicity::Mixed
                    | Ethnicity::Other
                    | Ethnicity::Unknown
            ));
        }
    }

    #[test]
    fn fixed_seed_reproduces_roster() {
        let practice = practice_with_count(3, 50);
        let mut a = factory_for(practice.clone());
        let mut b = factory_for(practice);
        assert_eq!(a.create_patients().unwrap(), b.create_patients().unwrap());
    }

    #[test]
    fn practice_is_handed_back_after_generation() {
        let practice = practice_with_count(9, 10);
        let mut factory = factory_for(practice.clone());
        factory.create_patients().unwrap();
        assert_eq!(factory.into_practice(), practice);
    }
}

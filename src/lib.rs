//! Synthetic EHR practice and patient generator.
//!
//! Reproduces the statistical behaviour of a legacy EHR simulation in two
//! stages: a practice generation engine samples a demographic profile for
//! each fictitious clinical practice (sex ratio, correlated ethnicity mix,
//! birth-year spread, registration period, transfer behaviour), and a
//! patient generation engine then samples each patient from its practice's
//! profile with internally consistent life-event dates. All dates are
//! integer day offsets from the reference date 1960-01-01, and all
//! randomness comes from explicitly seeded ChaCha8 generators, so a fixed
//! seed reproduces a run exactly.

pub use config::PracticeConfig;
pub use error::{Result, SynthEhrError};
pub use patient::{Ethnicity, Patient, Sex};
pub use patient_factory::PatientFactory;
pub use practice::Practice;
pub use practice_factory::PracticeFactory;
pub use sink::{load_record_batch, patients_to_record_batch, save_record_batch};

pub mod config;
pub mod error;
pub mod patient;
pub mod patient_factory;
pub mod practice;
pub mod practice_factory;
pub mod seeded_rng;
pub mod sink;

/// Generate `count` practices with sequential ids using the default
/// parameter bundle.
pub fn generate_practices(count: u32, seed: u64) -> Result<Vec<Practice>> {
    PracticeFactory::new(seed).create_practices(count)
}

/// Generate `count` practices from a caller-supplied parameter bundle.
pub fn generate_practices_with_config(
    count: u32,
    seed: u64,
    config: PracticeConfig,
) -> Result<Vec<Practice>> {
    PracticeFactory::with_config(seed, config).create_practices(count)
}

/// Generate the full patient roster for one practice.
///
/// The roster generator is derived from the global seed and the practice
/// id, so a roster is reproducible regardless of the order practices are
/// processed in. The practice is handed back alongside its roster.
pub fn generate_patients(practice: Practice, seed: u64) -> Result<(Practice, Vec<Patient>)> {
    let rng = seeded_rng::roster_rng(seed, practice.practice_id());
    let mut factory = PatientFactory::new(practice, rng);
    let patients = factory.create_patients()?;
    Ok((factory.into_practice(), patients))
}

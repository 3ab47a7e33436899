use datafusion::prelude::*;
use log::info;

use synth_ehr::{
    generate_patients, generate_practices, load_record_batch, patients_to_record_batch,
    save_record_batch,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let seed = 9147856;
    let practices = generate_practices(5, seed)?;

    let mut patients = Vec::new();
    for practice in practices {
        info!(
            "practice {}: {} patients, registration period {:.0} days",
            practice.practice_id(),
            practice.patient_count(),
            practice.registration_period_days()
        );
        let (_practice, roster) = generate_patients(practice, seed)?;
        patients.extend(roster);
    }
    info!("generated {} patients in total", patients.len());

    let batch = patients_to_record_batch(&patients)?;
    save_record_batch("patients.parquet", batch)?;

    let batch = load_record_batch("patients.parquet")?;
    let ctx = SessionContext::new();
    let df = ctx
        .read_batch(batch)
        .expect("Failed to convert batch to dataframe");

    df.show_limit(20).await?;

    Ok(())
}

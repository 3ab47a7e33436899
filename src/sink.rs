//! Handoff of generated patients to the record sink.
//!
//! The engine's output contract is a table with the exact column names
//! below, each date being a day offset from 1960-01-01. Serialization
//! beyond the parquet helpers here is the sink's own business.

use std::fs;
use std::sync::Arc;

use datafusion::arrow::array::{Int64Array, StringArray, UInt32Array, UInt64Array};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use datafusion::parquet::arrow::arrow_writer::ArrowWriter;
use datafusion::parquet::errors::ParquetError;

use crate::error::{Result, SynthEhrError};
use crate::patient::Patient;

/// Convert a patient roster into an Arrow record batch with the fixed
/// output column names.
pub fn patients_to_record_batch(patients: &[Patient]) -> Result<RecordBatch> {
    let mut patid = Vec::new();
    let mut pracid = Vec::new();
    let mut dob_hidden = Vec::new();
    let mut sex = Vec::new();
    let mut eth5 = Vec::new();
    let mut crd = Vec::new();
    let mut tod = Vec::new();
    let mut deathdate = Vec::new();

    for patient in patients {
        patid.push(patient.patient_id());
        pracid.push(patient.practice_id());
        dob_hidden.push(patient.birth_date());
        sex.push(patient.sex().to_string());
        eth5.push(patient.ethnicity().to_string());
        crd.push(patient.registration_date());
        tod.push(patient.transfer_date());
        deathdate.push(patient.death_date());
    }

    let batch = RecordBatch::try_from_iter([
        ("patid", Arc::new(UInt64Array::from(patid)) as _),
        ("pracid", Arc::new(UInt32Array::from(pracid)) as _),
        ("dob_hidden", Arc::new(Int64Array::from(dob_hidden)) as _),
        ("sex", Arc::new(StringArray::from(sex)) as _),
        ("eth5", Arc::new(StringArray::from(eth5)) as _),
        ("crd", Arc::new(Int64Array::from(crd)) as _),
        ("tod", Arc::new(Int64Array::from(tod)) as _),
        ("deathdate", Arc::new(Int64Array::from(deathdate)) as _),
    ])?;
    Ok(batch)
}

/// Write a record batch to a parquet file.
pub fn save_record_batch(filename: &str, batch: RecordBatch) -> Result<()> {
    let file = fs::File::create(filename)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Read the first record batch back from a parquet file.
pub fn load_record_batch(filename: &str) -> Result<RecordBatch> {
    let file = fs::File::open(filename)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let mut reader = builder.build()?;
    let batch = match reader.next() {
        Some(batch) => batch?,
        None => {
            return Err(SynthEhrError::Parquet(ParquetError::General(format!(
                "no record batches in {filename}"
            ))))
        }
    };
    Ok(batch)
}

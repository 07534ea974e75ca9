//! Single-row Parquet artifact for one probe result

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::probe::errors::ProbeError;
use crate::probe::result::ProbeResult;

const TIMEZONE: &str = "UTC";

fn millis_column(value: i64) -> ArrayRef {
    Arc::new(TimestampMillisecondArray::from(vec![value]).with_timezone(TIMEZONE))
}

/// File name for an artifact created at `now`, e.g. `20220101_032921.parquet`
pub fn artifact_name(now: DateTime<Utc>) -> String {
    format!("{}.parquet", now.format("%Y%m%d_%H%M%S"))
}

/// Hands out artifact names that are unique within the process.
///
/// The first artifact of a given second gets the plain [`artifact_name`];
/// later ones in the same second get `_1`, `_2`, ... appended to the stem.
#[derive(Debug, Default)]
pub struct ArtifactNamer {
    last: Mutex<Option<(String, u32)>>,
}

impl ArtifactNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self, now: DateTime<Utc>) -> String {
        let stem = now.format("%Y%m%d_%H%M%S").to_string();
        let mut last = self.last.lock();
        let sequence = match last.as_ref() {
            Some((prev, n)) if *prev == stem => n + 1,
            _ => 0,
        };
        let name = if sequence == 0 {
            artifact_name(now)
        } else {
            format!("{}_{}.parquet", stem, sequence)
        };
        *last = Some((stem, sequence));
        name
    }
}

/// Column layout shared by every artifact
pub fn result_schema() -> SchemaRef {
    let millis = DataType::Timestamp(TimeUnit::Millisecond, Some(TIMEZONE.into()));
    Arc::new(Schema::new(vec![
        Field::new("executedAt", millis.clone(), false),
        Field::new("txhash", DataType::Utf8, false),
        Field::new("startTime", millis.clone(), false),
        Field::new("endTime", millis, false),
        Field::new("chainId", DataType::Int64, false),
        Field::new("latency", DataType::Int64, false),
        Field::new("error", DataType::Utf8, false),
    ]))
}

pub fn record_batch(result: &ProbeResult) -> Result<RecordBatch, ProbeError> {
    let chain_id = i64::try_from(result.chain_id)
        .map_err(|_| ProbeError::Persistence(format!("chain id {} exceeds int64", result.chain_id)))?;

    let columns: Vec<ArrayRef> = vec![
        millis_column(result.executed_at),
        Arc::new(StringArray::from(vec![result.tx_hash.as_str()])),
        millis_column(result.start_time),
        millis_column(result.end_time),
        Arc::new(Int64Array::from(vec![chain_id])),
        Arc::new(Int64Array::from(vec![result.latency_ms])),
        Arc::new(StringArray::from(vec![result.error_message.as_str()])),
    ];

    Ok(RecordBatch::try_new(result_schema(), columns)?)
}

/// Write `result` as the only row of a new Parquet file at `path`
pub fn write_artifact(path: &Path, result: &ProbeResult) -> Result<(), ProbeError> {
    let batch = record_batch(result)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

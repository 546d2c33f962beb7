use crate::record::Record;
use arrow_array::{
    Array, ArrayRef, Float64Array, Int64Array, RecordBatch, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema};
use chrono::DateTime;
use std::sync::Arc;
use tonic::Status;

/// Gets the schema for telemetry records in Arrow format.
pub fn get_record_schema() -> Schema {
    Schema::new(vec![
        Field::new("source_id", DataType::UInt32, false),
        Field::new("timestamp_ns", DataType::Int64, false),
        Field::new("speed", DataType::UInt32, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
    ])
}

/// Creates a RecordBatch from a slice of records.
pub fn create_record_batch(records: &[Record]) -> Result<RecordBatch, Status> {
    let schema = get_record_schema();

    let timestamps = records
        .iter()
        .map(|r| {
            r.timestamp_nanos().ok_or_else(|| {
                Status::internal(format!("Timestamp {} is not representable", r.timestamp))
            })
        })
        .collect::<Result<Vec<i64>, Status>>()?;

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from_iter_values(records.iter().map(|r| r.source_id))),
        Arc::new(Int64Array::from(timestamps)),
        Arc::new(UInt32Array::from_iter_values(records.iter().map(|r| r.speed))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.latitude))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.longitude))),
    ];

    RecordBatch::try_new(Arc::new(schema), arrays)
        .map_err(|e| Status::internal(format!("Failed to create record batch: {}", e)))
}

/// Decodes a RecordBatch back into records.
pub fn decode_record_batch(batch: &RecordBatch) -> Result<Vec<Record>, Status> {
    let source_ids = column::<UInt32Array>(batch, "source_id")?;
    let timestamps = column::<Int64Array>(batch, "timestamp_ns")?;
    let speeds = column::<UInt32Array>(batch, "speed")?;
    let latitudes = column::<Float64Array>(batch, "latitude")?;
    let longitudes = column::<Float64Array>(batch, "longitude")?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        records.push(Record::at(
            source_ids.value(i),
            DateTime::from_timestamp_nanos(timestamps.value(i)),
            speeds.value(i),
            latitudes.value(i),
            longitudes.value(i),
        ));
    }

    Ok(records)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, Status> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<T>())
        .ok_or_else(|| Status::internal(format!("Invalid {} column", name)))
}

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;

use crate::error::{Result, SpikeDensityError};
use crate::pyramid::{CountMatrix, ResolutionLevel};

/// Fixed GZIP level; same input always gives the same bytes.
pub const GZIP_LEVEL: u32 = 6;
/// Written in place of the library version so output does not change across
/// builds.
pub const CREATED_BY: &str = "spike-density";

pub const ATTR_NAME: &str = "name";
pub const ATTR_BIN_SIZE_SEC: &str = "bin_size_sec";
pub const ATTR_START_TIME_SEC: &str = "start_time_sec";
pub const ATTR_DOWNSAMPLE_FACTOR: &str = "downsample_factor";

/// Column name of a unit.
pub fn unit_column_name(unit: usize) -> String {
    format!("unit_{unit}")
}

fn level_schema(level: &ResolutionLevel) -> Schema {
    let fields: Vec<Field> = (0..level.num_units())
        .map(|u| Field::new(unit_column_name(u), DataType::Int32, false))
        .collect();
    Schema::new(fields)
}

/// Level attributes as file key-value metadata, in a fixed order.
fn level_attributes(level: &ResolutionLevel) -> Vec<KeyValue> {
    vec![
        KeyValue::new(ATTR_NAME.to_string(), level.name()),
        KeyValue::new(ATTR_BIN_SIZE_SEC.to_string(), level.bin_size_sec().to_string()),
        KeyValue::new(
            ATTR_START_TIME_SEC.to_string(),
            level.start_time_sec().to_string(),
        ),
        KeyValue::new(
            ATTR_DOWNSAMPLE_FACTOR.to_string(),
            level.downsample_factor().to_string(),
        ),
    ]
}

/// Write one level as a Parquet file: one Int32 column per unit, one row per
/// bin, row groups of `level.chunk_rows()` bins.
pub fn write_level(level: &ResolutionLevel, path: &Path) -> Result<()> {
    let schema = Arc::new(level_schema(level));
    let columns: Vec<ArrayRef> = (0..level.num_units())
        .map(|u| Arc::new(Int32Array::from(level.matrix().column(u))) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::GZIP(GzipLevel::try_new(GZIP_LEVEL)?))
        .set_max_row_group_size(level.chunk_rows())
        .set_created_by(CREATED_BY.to_string())
        .set_key_value_metadata(Some(level_attributes(level)))
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn attr<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    metadata
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| SpikeDensityError::Artifact(format!("level is missing attribute '{key}'")))
}

fn parse_attr<T: std::str::FromStr>(metadata: &HashMap<String, String>, key: &str) -> Result<T> {
    let raw = attr(metadata, key)?;
    raw.parse().map_err(|_| {
        SpikeDensityError::Artifact(format!("attribute '{key}' has invalid value '{raw}'"))
    })
}

/// Read a level written by [`write_level`].
pub fn read_level(file: File) -> Result<ResolutionLevel> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let metadata: HashMap<String, String> = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .map(|kvs| {
            kvs.iter()
                .filter_map(|kv| Some((kv.key.clone(), kv.value.clone()?)))
                .collect()
        })
        .unwrap_or_default();
    let metadata = &metadata;

    let bin_size_sec: f64 = parse_attr(metadata, ATTR_BIN_SIZE_SEC)?;
    let start_time_sec: f64 = parse_attr(metadata, ATTR_START_TIME_SEC)?;
    let downsample_factor: usize = parse_attr(metadata, ATTR_DOWNSAMPLE_FACTOR)?;

    for (u, field) in schema.fields().iter().enumerate() {
        if field.name() != &unit_column_name(u) || field.data_type() != &DataType::Int32 {
            return Err(SpikeDensityError::Artifact(format!(
                "unexpected column {} ({:?}) at position {u}",
                field.name(),
                field.data_type()
            )));
        }
    }

    let mut columns: Vec<Vec<i32>> = vec![Vec::new(); schema.fields().len()];
    for batch in builder.build()? {
        let batch = batch?;
        for (u, col) in columns.iter_mut().enumerate() {
            let values = batch
                .column(u)
                .as_any()
                .downcast_ref::<Int32Array>()
                .ok_or_else(|| {
                    SpikeDensityError::Artifact(format!("column {u} is not Int32"))
                })?;
            if values.null_count() > 0 {
                return Err(SpikeDensityError::Artifact(format!(
                    "column {u} contains nulls"
                )));
            }
            col.extend(values.values().iter().copied());
        }
    }

    let num_bins = columns.first().map_or(0, Vec::len);
    let matrix = CountMatrix::from_columns(num_bins, &columns)?;
    Ok(ResolutionLevel::from_parts(
        bin_size_sec,
        start_time_sec,
        downsample_factor,
        matrix,
    ))
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int64Array, LargeListArray, ListArray,
};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::filter::clean_spike_trains;
use super::model::SpikeTrain;

/// Name of the column / key holding per-unit spike times in every format.
pub const SPIKE_TIMES_COLUMN: &str = "spike_times";
/// Exclusive end offsets into a flattened `spike_times` array (units-table layout).
pub const SPIKE_TIMES_INDEX_COLUMN: &str = "spike_times_index";

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Anything that can hand over one cleaned spike train per unit.
pub trait SpikeTrainSource {
    fn load(&self) -> Result<Vec<SpikeTrain>>;
}

/// In-memory raw timestamps, one vector per unit.
impl SpikeTrainSource for Vec<Vec<f64>> {
    fn load(&self) -> Result<Vec<SpikeTrain>> {
        Ok(clean_spike_trains(self.clone())?)
    }
}

/// A units table on disk; the format is picked from the file extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SpikeTrainSource for FileSource {
    fn load(&self) -> Result<Vec<SpikeTrain>> {
        let raw = load_file(&self.path)
            .with_context(|| format!("loading spike times from {}", self.path.display()))?;
        Ok(clean_spike_trains(raw)?)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load raw per-unit spike times from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per unit with a `spike_times` list column, or flat
///   `spike_times` + `spike_times_index` columns
/// * `.json`    – `[{ "spike_times": [...] }, ...]` or the flattened
///   `{ "spike_times": [...], "spike_times_index": [...] }` form
/// * `.csv`     – a `spike_times` column containing semicolon-separated floats
///
/// Invalid entries come back as NaN; they are removed by [`clean_spike_trains`].
pub fn load_file(path: &Path) -> Result<Vec<Vec<f64>>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Two JSON layouts are accepted.
///
/// Records, one object per unit:
/// ```json
/// [ { "spike_times": [0.01, 0.02] }, { "spike_times": [] } ]
/// ```
///
/// Ragged arrays, as stored in a units table:
/// ```json
/// { "spike_times": [0.01, 0.02, 0.1], "spike_times_index": [2, 2, 3] }
/// ```
fn load_json(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    match &root {
        JsonValue::Array(records) => records
            .iter()
            .enumerate()
            .map(|(i, rec)| {
                let obj = rec
                    .as_object()
                    .with_context(|| format!("Unit {i} is not a JSON object"))?;
                json_array_to_f64(obj.get(SPIKE_TIMES_COLUMN), i)
            })
            .collect(),
        JsonValue::Object(obj) => {
            let flat = json_array_to_f64(obj.get(SPIKE_TIMES_COLUMN), 0)?;
            let index = obj
                .get(SPIKE_TIMES_INDEX_COLUMN)
                .and_then(|v| v.as_array())
                .with_context(|| format!("missing or invalid '{SPIKE_TIMES_INDEX_COLUMN}' array"))?
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    v.as_u64()
                        .map(|x| x as usize)
                        .with_context(|| format!("{SPIKE_TIMES_INDEX_COLUMN}[{i}]: not an offset"))
                })
                .collect::<Result<Vec<usize>>>()?;
            split_ragged(&flat, &index)
        }
        _ => bail!("Expected a JSON array of units or a ragged spike_times object"),
    }
}

fn json_array_to_f64(val: Option<&JsonValue>, unit: usize) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Unit {unit}: missing or invalid '{SPIKE_TIMES_COLUMN}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| match v {
            JsonValue::Null => Ok(f64::NAN),
            _ => v
                .as_f64()
                .with_context(|| format!("Unit {unit}, {SPIKE_TIMES_COLUMN}[{j}]: not a number")),
        })
        .collect()
}

/// Split a flattened timestamp array at the exclusive end offsets in `index`.
pub fn split_ragged(flat: &[f64], index: &[usize]) -> Result<Vec<Vec<f64>>> {
    let mut units = Vec::with_capacity(index.len());
    let mut offset = 0;
    for (i, &end) in index.iter().enumerate() {
        if end < offset || end > flat.len() {
            bail!(
                "{SPIKE_TIMES_INDEX_COLUMN}[{i}] = {end} is out of order or exceeds {} spike times",
                flat.len()
            );
        }
        units.push(flat[offset..end].to_vec());
        offset = end;
    }
    Ok(units)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one row per unit.
/// The `spike_times` column contains semicolon-separated floats:
///   `"0.01;0.02;0.05"`; an empty cell is a unit without spikes.
/// All other columns are ignored.
fn load_csv(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let times_idx = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .position(|h| h == SPIKE_TIMES_COLUMN)
        .with_context(|| format!("CSV missing '{SPIKE_TIMES_COLUMN}' column"))?;

    let mut units = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        units.push(parse_semicolon_floats(
            record.get(times_idx).unwrap_or(""),
            row_no,
        )?);
    }
    Ok(units)
}

fn parse_semicolon_floats(s: &str, row: usize) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            let tok = tok.trim();
            if tok.eq_ignore_ascii_case("nan") || tok.is_empty() {
                return Ok(f64::NAN);
            }
            tok.parse::<f64>()
                .with_context(|| format!("Row {row}, {SPIKE_TIMES_COLUMN}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet units table.
///
/// Expected schema, either:
/// - `spike_times`: List<Float64|Float32> or LargeList<..>, one row per unit, or
/// - flat `spike_times`: Float64|Float32 (one row per spike) together with an
///   integer `spike_times_index` holding each unit's exclusive end offset;
///   the index is shorter than the table, so its trailing rows are null.
///
/// Any other columns (unit ids, quality labels, ...) are ignored.
fn load_parquet(path: &Path) -> Result<Vec<Vec<f64>>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let times_field = schema
        .field_with_name(SPIKE_TIMES_COLUMN)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{SPIKE_TIMES_COLUMN}' column"))?;
    let flat_layout = !matches!(
        times_field.data_type(),
        DataType::List(_) | DataType::LargeList(_)
    );
    if flat_layout && schema.index_of(SPIKE_TIMES_INDEX_COLUMN).is_err() {
        bail!(
            "Flat '{SPIKE_TIMES_COLUMN}' column of type {:?} needs a '{SPIKE_TIMES_INDEX_COLUMN}' column",
            times_field.data_type()
        );
    }
    let reader = builder.build().context("building parquet reader")?;

    let mut units = Vec::new();
    let mut flat = Vec::new();
    let mut index = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let col = batch
            .column_by_name(SPIKE_TIMES_COLUMN)
            .with_context(|| format!("record batch missing '{SPIKE_TIMES_COLUMN}'"))?;

        if flat_layout {
            flat.extend(extract_f64_values(col)?);
            let index_col = batch
                .column_by_name(SPIKE_TIMES_INDEX_COLUMN)
                .with_context(|| format!("record batch missing '{SPIKE_TIMES_INDEX_COLUMN}'"))?;
            index.extend(extract_offsets(index_col)?);
            continue;
        }

        for row in 0..batch.num_rows() {
            let unit = units.len();
            let times = extract_f64_list(col, row)
                .with_context(|| format!("Unit {unit}: failed to read '{SPIKE_TIMES_COLUMN}'"))?;
            units.push(times);
        }
    }

    if flat_layout {
        return split_ragged(&flat, &index);
    }
    Ok(units)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
/// A null row is a unit without spikes; null items become NaN.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        return Ok(Vec::new());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Every value of a flat numeric column as f64; nulls become NaN.
fn extract_f64_values(col: &ArrayRef) -> Result<Vec<f64>> {
    let values = cast(col, &DataType::Float64)
        .with_context(|| format!("'{SPIKE_TIMES_COLUMN}' of type {:?} is not numeric", col.data_type()))?;
    let values = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .context("expected Float64Array")?;
    Ok(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Non-null offsets of the index column, in row order.
fn extract_offsets(col: &ArrayRef) -> Result<Vec<usize>> {
    let offsets = cast(col, &DataType::Int64).with_context(|| {
        format!("'{SPIKE_TIMES_INDEX_COLUMN}' of type {:?} is not an integer column", col.data_type())
    })?;
    let offsets = offsets
        .as_any()
        .downcast_ref::<Int64Array>()
        .context("expected Int64Array")?;
    offsets
        .iter()
        .flatten()
        .map(|v| {
            usize::try_from(v)
                .with_context(|| format!("{SPIKE_TIMES_INDEX_COLUMN}: negative offset {v}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ragged() {
        let flat = [0.1, 0.2, 0.3, 0.4];
        let units = split_ragged(&flat, &[2, 2, 4]).unwrap();
        assert_eq!(units, vec![vec![0.1, 0.2], vec![], vec![0.3, 0.4]]);

        assert!(split_ragged(&flat, &[3, 2]).is_err());
        assert!(split_ragged(&flat, &[5]).is_err());
    }

    #[test]
    fn test_parse_semicolon_floats() {
        assert_eq!(parse_semicolon_floats("", 0).unwrap(), Vec::<f64>::new());
        assert_eq!(parse_semicolon_floats("0.5; 1.5", 0).unwrap(), vec![0.5, 1.5]);
        assert!(parse_semicolon_floats("0.5;NaN", 0).unwrap()[1].is_nan());
        assert!(parse_semicolon_floats("0.5;abc", 0).is_err());
    }

    #[test]
    fn test_in_memory_source_cleans_nan() {
        let source = vec![vec![0.1, f64::NAN], vec![]];
        let trains = source.load().unwrap();
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[0].times(), &[0.1]);
        assert!(trains[1].is_empty());
    }
}

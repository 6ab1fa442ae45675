use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use arrow::array::{Float64Array, Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use spike_density::data::loader::{FileSource, SpikeTrainSource};

#[test]
fn test_load_json_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("units.json");
    let mut file = File::create(&path).unwrap();
    write!(
        file,
        r#"[{{"spike_times": [0.01, 0.02, 0.05], "id": 7}}, {{"spike_times": []}}, {{"spike_times": [0.1, null]}}]"#
    )
    .unwrap();

    let trains = FileSource::new(&path).load().unwrap();
    assert_eq!(trains.len(), 3);
    assert_eq!(trains[0].times(), &[0.01, 0.02, 0.05]);
    assert!(trains[1].is_empty());
    // null is an invalid entry and is removed
    assert_eq!(trains[2].times(), &[0.1]);
    assert_eq!(trains[2].unit(), 2);
}

#[test]
fn test_load_json_ragged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("units.json");
    std::fs::write(
        &path,
        r#"{"spike_times": [0.01, 0.02, 0.05, 0.1], "spike_times_index": [3, 3, 4]}"#,
    )
    .unwrap();

    let trains = FileSource::new(&path).load().unwrap();
    assert_eq!(trains.len(), 3);
    assert_eq!(trains[0].len(), 3);
    assert!(trains[1].is_empty());
    assert_eq!(trains[2].times(), &[0.1]);
}

#[test]
fn test_load_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("units.csv");
    std::fs::write(&path, "unit_id,spike_times\n0,0.01;0.02;0.05\n1,\n2,0.1;nan\n").unwrap();

    let trains = FileSource::new(&path).load().unwrap();
    assert_eq!(trains.len(), 3);
    assert_eq!(trains[0].times(), &[0.01, 0.02, 0.05]);
    assert!(trains[1].is_empty());
    assert_eq!(trains[2].times(), &[0.1]);
}

#[test]
fn test_load_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("units.parquet");

    let mut builder = ListBuilder::new(Float64Builder::new());
    builder.values().append_value(0.01);
    builder.values().append_value(0.02);
    builder.values().append_value(0.05);
    builder.append(true);
    builder.append(true);
    builder.values().append_value(0.1);
    builder.values().append_null();
    builder.values().append_value(f64::NAN);
    builder.append(true);
    let times = builder.finish();

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "spike_times",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("unit_id", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(times), Arc::new(Int64Array::from(vec![10, 11, 12]))],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let trains = FileSource::new(&path).load().unwrap();
    assert_eq!(trains.len(), 3);
    assert_eq!(trains[0].times(), &[0.01, 0.02, 0.05]);
    assert!(trains[1].is_empty());
    assert_eq!(trains[2].times(), &[0.1]);
}

fn write_flat_parquet(path: &std::path::Path, times: Vec<Option<f64>>, index: Vec<Option<i64>>) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("spike_times", DataType::Float64, true),
        Field::new("spike_times_index", DataType::Int64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(times)),
            Arc::new(Int64Array::from(index)),
        ],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_load_parquet_flat_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("units_table.parquet");
    write_flat_parquet(
        &path,
        vec![Some(0.01), Some(0.02), Some(0.05), Some(0.1), None],
        vec![Some(3), Some(3), Some(5), None, None],
    );

    let trains = FileSource::new(&path).load().unwrap();
    assert_eq!(trains.len(), 3);
    assert_eq!(trains[0].times(), &[0.01, 0.02, 0.05]);
    assert!(trains[1].is_empty());
    // the null timestamp is dropped
    assert_eq!(trains[2].times(), &[0.1]);
}

#[test]
fn test_load_parquet_flat_bad_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("units_table.parquet");
    write_flat_parquet(&path, vec![Some(0.1), Some(0.2)], vec![Some(2), Some(1)]);
    assert!(FileSource::new(&path).load().is_err());
}

#[test]
fn test_unsupported_and_malformed_inputs() {
    let dir = tempfile::tempdir().unwrap();

    let txt = dir.path().join("units.txt");
    std::fs::write(&txt, "0.1 0.2").unwrap();
    assert!(FileSource::new(&txt).load().is_err());

    let no_column = dir.path().join("units.csv");
    std::fs::write(&no_column, "unit_id,times\n0,0.1\n").unwrap();
    assert!(FileSource::new(&no_column).load().is_err());

    let bad_index = dir.path().join("units.json");
    std::fs::write(&bad_index, r#"{"spike_times": [0.1], "spike_times_index": [2]}"#).unwrap();
    assert!(FileSource::new(&bad_index).load().is_err());

    assert!(FileSource::new(dir.path().join("missing.parquet")).load().is_err());
}

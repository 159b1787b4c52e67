#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use imbalance_loader::{ClassMetadata, ImageShape, Label, RawBatchRecord};
use serde_pickle::{HashableValue, SerOptions, Value};

pub const SHAPE: ImageShape = ImageShape::new(3, 4, 4);

pub fn write_meta(dir: &Path, filename: &str, key: &str, classes: usize) {
    let names = (0..classes).map(|c| format!("class_{}", c)).collect();
    ClassMetadata::new(names).write(&dir.join(filename), key).unwrap();
}

/// Batch file whose rows are filled with `fill` and whose filenames start with `tag`.
pub fn write_batch(dir: &Path, name: &str, labels: &[Label], tag: &str, fill: u8) -> RawBatchRecord {
    let record = RawBatchRecord::synthetic(labels, SHAPE.bytes_per_image(), tag, |_| fill);
    record.write(&dir.join(name)).unwrap();
    record
}

/// Batch file storing its labels under `fine_labels` only.
pub fn write_fine_batch(dir: &Path, name: &str, labels: &[Label]) {
    let mut dict = BTreeMap::new();
    dict.insert(
        HashableValue::String("data".to_string()),
        Value::List(
            labels
                .iter()
                .map(|&l| Value::Bytes(vec![l as u8; SHAPE.bytes_per_image()]))
                .collect(),
        ),
    );
    dict.insert(
        HashableValue::String("fine_labels".to_string()),
        Value::List(labels.iter().map(|&l| Value::I64(l as i64)).collect()),
    );
    dict.insert(
        HashableValue::String("filenames".to_string()),
        Value::List(
            (0..labels.len())
                .map(|i| Value::String(format!("fine_{}.png", i)))
                .collect(),
        ),
    );

    let mut file = File::create(dir.join(name)).unwrap();
    serde_pickle::value_to_writer(&mut file, &Value::Dict(dict), SerOptions::new()).unwrap();
}

/// Five coarse batches of ten samples, labels cycling through `classes`,
/// every row a distinct byte ramp.
pub fn write_coarse_source(dir: &Path, classes: usize) -> Vec<RawBatchRecord> {
    write_meta(dir, "batches.meta", "label_names", classes);
    (1..=5)
        .map(|b| {
            let mut record = RawBatchRecord::with_capacity(10);
            for i in 0..10 {
                // no two rows alike, and no row uniform, so a transpose shows up
                let row = (0..SHAPE.bytes_per_image())
                    .map(|k| (b * 53 + i * 17 + k) as u8)
                    .collect();
                record.push(row, ((i + b) % classes) as Label, format!("b{}_{:05}.png", b, i));
            }
            record.write(&dir.join(format!("data_batch_{}", b))).unwrap();
            record
        })
        .collect()
}

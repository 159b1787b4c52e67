use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_pickle::{DeOptions, HashableValue, SerOptions, Value};

use crate::dataloader::error::DatasetError;

pub type Label = u32;

pub const DATA_KEY: &str = "data";
pub const LABELS_KEY: &str = "labels";
pub const FILENAMES_KEY: &str = "filenames";

/// Which mapping keys hold the labels of a record. `fallback` is only read
/// when `primary` is missing.
#[derive(Clone, Copy, Debug)]
pub struct LabelKeys<'a> {
    pub primary: &'a str,
    pub fallback: &'a str,
}

impl Default for LabelKeys<'static> {
    fn default() -> Self {
        Self {
            primary: LABELS_KEY,
            fallback: "fine_labels",
        }
    }
}

/// One deserialized batch file: three parallel columns, entry `i` of each
/// describing the same sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawBatchRecord {
    pub data: Vec<Vec<u8>>,
    pub labels: Vec<Label>,
    pub filenames: Vec<String>,
}

impl RawBatchRecord {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
            filenames: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn push(&mut self, data: Vec<u8>, label: Label, filename: String) {
        self.data.push(data);
        self.labels.push(label);
        self.filenames.push(filename);
    }

    /// Copy sample `index` of `other` onto the end of this record.
    pub fn push_from(&mut self, other: &RawBatchRecord, index: usize) {
        self.push(
            other.data[index].clone(),
            other.labels[index],
            other.filenames[index].clone(),
        );
    }

    pub fn check_lengths(&self) -> Result<(), String> {
        let n = self.data.len();
        if self.labels.len() != n || self.filenames.len() != n {
            return Err(format!(
                "column lengths differ: data has {}, labels has {}, filenames has {}",
                n,
                self.labels.len(),
                self.filenames.len()
            ));
        }
        Ok(())
    }

    pub fn read(path: &Path, keys: LabelKeys<'_>) -> Result<Self, DatasetError> {
        if !path.is_file() {
            return Err(DatasetError::FileNotFound(path.to_owned()));
        }

        let reader = BufReader::new(File::open(path)?);
        let value = serde_pickle::value_from_reader(reader, DeOptions::new()).map_err(|source| {
            DatasetError::Pickle {
                path: path.to_owned(),
                source,
            }
        })?;

        Self::from_value(value, keys).map_err(|message| DatasetError::format(path, message))
    }

    pub fn write(&self, path: &Path) -> Result<(), DatasetError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_pickle::value_to_writer(&mut writer, &self.to_value(), SerOptions::new()).map_err(
            |source| DatasetError::Pickle {
                path: path.to_owned(),
                source,
            },
        )?;
        writer.flush()?;
        Ok(())
    }

    pub fn from_value(value: Value, keys: LabelKeys<'_>) -> Result<Self, String> {
        let mut dict = into_dict(value)?;

        let data = take_key(&mut dict, DATA_KEY)
            .ok_or_else(|| format!("missing key `{}`", DATA_KEY))
            .and_then(into_rows)?;

        let (label_key, labels) = match take_key(&mut dict, keys.primary) {
            Some(v) => (keys.primary, v),
            None => (
                keys.fallback,
                take_key(&mut dict, keys.fallback).ok_or_else(|| {
                    format!("missing key `{}` (and fallback `{}`)", keys.primary, keys.fallback)
                })?,
            ),
        };
        let labels = into_sequence(labels, label_key)?
            .into_iter()
            .enumerate()
            .map(|(i, v)| into_label(v).map_err(|e| format!("{}[{}]: {}", label_key, i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let filenames = take_key(&mut dict, FILENAMES_KEY)
            .ok_or_else(|| format!("missing key `{}`", FILENAMES_KEY))
            .and_then(|v| into_sequence(v, FILENAMES_KEY))?
            .into_iter()
            .enumerate()
            .map(|(i, v)| into_string(v).map_err(|e| format!("filenames[{}]: {}", i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let record = Self {
            data,
            labels,
            filenames,
        };
        record.check_lengths()?;
        Ok(record)
    }

    /// Shards are always written under the primary `labels` key.
    pub fn to_value(&self) -> Value {
        let mut dict = BTreeMap::new();
        dict.insert(
            HashableValue::String(DATA_KEY.to_string()),
            Value::List(self.data.iter().cloned().map(Value::Bytes).collect()),
        );
        dict.insert(
            HashableValue::String(LABELS_KEY.to_string()),
            Value::List(self.labels.iter().map(|&l| Value::I64(l as i64)).collect()),
        );
        dict.insert(
            HashableValue::String(FILENAMES_KEY.to_string()),
            Value::List(self.filenames.iter().cloned().map(Value::String).collect()),
        );
        Value::Dict(dict)
    }

    /// Deterministic record for fixtures: sample `i` gets label `labels[i]`,
    /// a row filled with `fill(i)` and the filename `<tag>_<i>.png`.
    pub fn synthetic(
        labels: &[Label],
        bytes_per_sample: usize,
        tag: &str,
        fill: impl Fn(usize) -> u8,
    ) -> Self {
        let mut record = Self::with_capacity(labels.len());
        for (i, &label) in labels.iter().enumerate() {
            record.push(
                vec![fill(i); bytes_per_sample],
                label,
                format!("{}_{:05}.png", tag, i),
            );
        }
        record
    }
}

// Python 2 era pickles store keys and strings as bytes, so both spellings are accepted
pub(crate) fn take_key(dict: &mut BTreeMap<HashableValue, Value>, key: &str) -> Option<Value> {
    dict.remove(&HashableValue::String(key.to_string()))
        .or_else(|| dict.remove(&HashableValue::Bytes(key.as_bytes().to_vec())))
}

pub(crate) fn into_dict(value: Value) -> Result<BTreeMap<HashableValue, Value>, String> {
    match value {
        Value::Dict(dict) => Ok(dict),
        other => Err(format!("expected a mapping, found {}", kind_name(&other))),
    }
}

pub(crate) fn into_sequence(value: Value, key: &str) -> Result<Vec<Value>, String> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items),
        other => Err(format!(
            "key `{}` should be a sequence, found {}",
            key,
            kind_name(&other)
        )),
    }
}

pub(crate) fn into_string(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Bytes(b) => Ok(String::from_utf8_lossy(&b).into_owned()),
        other => Err(format!("expected a string, found {}", kind_name(&other))),
    }
}

/// The `data` column: a sequence of rows, or one (rows, cols) numpy array.
fn into_rows(value: Value) -> Result<Vec<Vec<u8>>, String> {
    match value {
        Value::Tuple(items) if ndarray_shape(&items).is_some() => {
            let (shape, raw) = into_ndarray(items)?;
            let [rows, cols] = shape[..] else {
                return Err(format!(
                    "key `{}` should be a 2-d array, found shape {:?}",
                    DATA_KEY, shape
                ));
            };
            if raw.len() != rows * cols {
                return Err(format!(
                    "array of shape ({}, {}) holds {} bytes, expected {}",
                    rows,
                    cols,
                    raw.len(),
                    rows * cols
                ));
            }
            if cols == 0 {
                return Ok(vec![Vec::new(); rows]);
            }
            Ok(raw.chunks(cols).map(<[u8]>::to_vec).collect())
        }
        other => into_sequence(other, DATA_KEY)?
            .into_iter()
            .enumerate()
            .map(|(i, row)| into_pixels(row).map_err(|e| format!("data[{}]: {}", i, e)))
            .collect(),
    }
}

// numpy arrays unpickle to their rebuild state:
// (version, shape, dtype, is_fortran, raw_bytes)
fn ndarray_shape(items: &[Value]) -> Option<Vec<usize>> {
    match items {
        [
            Value::I64(_),
            Value::Tuple(shape) | Value::List(shape),
            _,
            Value::Bool(_),
            Value::Bytes(_),
        ] => shape
            .iter()
            .map(|dim| match dim {
                Value::I64(n) => usize::try_from(*n).ok(),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn into_ndarray(items: Vec<Value>) -> Result<(Vec<usize>, Vec<u8>), String> {
    let shape = ndarray_shape(&items).ok_or("not a numpy array")?;
    if shape.len() > 1 && matches!(items[3], Value::Bool(true)) {
        return Err("Fortran-ordered arrays are not supported".to_string());
    }
    match items.into_iter().last() {
        Some(Value::Bytes(raw)) => Ok((shape, raw)),
        _ => Err("numpy array without a byte buffer".to_string()),
    }
}

fn into_pixels(value: Value) -> Result<Vec<u8>, String> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        Value::Tuple(items) if ndarray_shape(&items).is_some() => {
            let (shape, raw) = into_ndarray(items)?;
            let expected: usize = shape.iter().product();
            if raw.len() != expected {
                return Err(format!(
                    "array of shape {:?} holds {} bytes, expected {}",
                    shape,
                    raw.len(),
                    expected
                ));
            }
            Ok(raw)
        }
        Value::List(items) | Value::Tuple(items) => items
            .into_iter()
            .map(|v| match v {
                Value::I64(px) => u8::try_from(px).map_err(|_| format!("pixel {} out of range", px)),
                other => Err(format!("expected a pixel value, found {}", kind_name(&other))),
            })
            .collect(),
        other => Err(format!("expected a pixel buffer, found {}", kind_name(&other))),
    }
}

fn into_label(value: Value) -> Result<Label, String> {
    match value {
        Value::I64(v) => Label::try_from(v).map_err(|_| format!("label {} out of range", v)),
        Value::Bool(b) => Ok(b as Label),
        other => Err(format!("expected an integer, found {}", kind_name(&other))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Dict(_) => "dict",
        _ => "unsupported value",
    }
}

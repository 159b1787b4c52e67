use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_pickle::{DeOptions, HashableValue, SerOptions, Value};

use crate::dataloader::error::DatasetError;

use super::batch_record::{into_dict, into_sequence, into_string, take_key};

/// Ordered class names and the reverse lookup built from them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassMetadata {
    classes: Vec<String>,
    class_to_idx: HashMap<String, usize>,
}

impl ClassMetadata {
    pub fn new(classes: Vec<String>) -> Self {
        let class_to_idx = classes
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            classes,
            class_to_idx,
        }
    }

    /// Load `dir/filename` and read the name list stored under `key`.
    pub fn load(dir: &Path, filename: &str, key: &str) -> Result<Self, DatasetError> {
        let path = dir.join(filename);
        if !path.is_file() {
            return Err(DatasetError::FileNotFound(path));
        }

        let reader = BufReader::new(File::open(&path)?);
        let value = serde_pickle::value_from_reader(reader, DeOptions::new()).map_err(|source| {
            DatasetError::Pickle {
                path: path.clone(),
                source,
            }
        })?;

        let classes = into_dict(value)
            .and_then(|mut dict| {
                take_key(&mut dict, key).ok_or_else(|| format!("missing key `{}`", key))
            })
            .and_then(|names| into_sequence(names, key))
            .and_then(|names| {
                names
                    .into_iter()
                    .map(into_string)
                    .collect::<Result<Vec<String>, String>>()
            })
            .map_err(|message| DatasetError::format(&path, message))?;

        Ok(Self::new(classes))
    }

    pub fn write(&self, path: &Path, key: &str) -> Result<(), DatasetError> {
        let mut dict = BTreeMap::new();
        dict.insert(
            HashableValue::String(key.to_string()),
            Value::List(self.classes.iter().cloned().map(Value::String).collect()),
        );

        let mut writer = BufWriter::new(File::create(path)?);
        serde_pickle::value_to_writer(&mut writer, &Value::Dict(dict), SerOptions::new())
            .map_err(|source| DatasetError::Pickle {
                path: path.to_owned(),
                source,
            })?;
        writer.flush()?;
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_to_idx(&self) -> &HashMap<String, usize> {
        &self.class_to_idx
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.class_to_idx.get(name).copied()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

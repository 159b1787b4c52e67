use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dataloader::error::DatasetError;
use crate::dataloader::taxonomy::LabelTaxonomy;
use crate::record::batch_record::{Label, LabelKeys, RawBatchRecord};
use crate::record::discovery::{file_name, list_batch_files};

use super::class_bucket::ClassBucket;

pub struct PartitionConfig {
    pub num_classes: usize,
    /// Source files are those whose name contains this substring
    pub batch_marker: String,
    /// Shards are written as `<shard_prefix>_<class_index>`
    pub shard_prefix: String,
    pub label_key: String,
    pub label_fallback_key: String,
    /// Name of a metadata file to copy from source to target, if any
    pub copy_metadata: Option<String>,
}

impl PartitionConfig {
    pub fn from_taxonomy(taxonomy: &LabelTaxonomy) -> Self {
        Self {
            num_classes: taxonomy.num_classes,
            batch_marker: taxonomy.batch_marker.clone(),
            shard_prefix: "data_class".to_string(),
            label_key: taxonomy.label_key.clone(),
            label_fallback_key: taxonomy.label_fallback_key.clone(),
            copy_metadata: None,
        }
    }

    pub fn build(self) -> Result<Self, DatasetError> {
        if self.num_classes == 0 {
            return Err(DatasetError::InvalidConfig(
                "num_classes must be greater than zero".to_string(),
            ));
        }
        if self.shard_prefix.is_empty() || self.batch_marker.is_empty() {
            return Err(DatasetError::InvalidConfig(
                "shard_prefix and batch_marker cannot be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self::from_taxonomy(&LabelTaxonomy::coarse())
    }
}

/// Outcome of one partition run.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionSummary {
    pub source_files: Vec<String>,
    /// Samples written per class index
    pub class_counts: Vec<usize>,
    pub shard_files: Vec<PathBuf>,
}

impl PartitionSummary {
    pub fn total(&self) -> usize {
        self.class_counts.iter().sum()
    }
}

/// Splits a directory of raw batch files into one shard file per class.
pub struct ShardPartitioner {
    config: PartitionConfig,
}

impl ShardPartitioner {
    pub fn new(config: PartitionConfig) -> Result<Self, DatasetError> {
        Ok(Self {
            config: config.build()?,
        })
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Route every sample of every batch file in `source_dir` to the bucket of
    /// its label, then create `target_dir` and write one shard per class.
    ///
    /// `target_dir` must not exist. Nothing is cleaned up if a later write
    /// fails.
    pub fn partition(
        &self,
        source_dir: &Path,
        target_dir: &Path,
    ) -> Result<PartitionSummary, DatasetError> {
        // fail before the expensive scan, create_dir below still catches races
        if target_dir.exists() {
            return Err(DatasetError::TargetExists(target_dir.to_owned()));
        }

        let metadata_source = match &self.config.copy_metadata {
            Some(name) => {
                let path = source_dir.join(name);
                if !path.is_file() {
                    return Err(DatasetError::FileNotFound(path));
                }
                Some(path)
            }
            None => None,
        };

        let files = list_batch_files(source_dir, &self.config.batch_marker)?;
        if files.is_empty() {
            warn!(path = %source_dir.display(), "no batch files found, shards will be empty");
        }

        let mut buckets: Vec<ClassBucket> = (0..self.config.num_classes)
            .map(|class| ClassBucket::new(class as Label))
            .collect();

        for path in &files {
            let routed = self.route_file(path, &mut buckets)?;
            debug!(file = file_name(path), samples = routed, "routed batch file");
        }

        create_target_dir(target_dir)?;

        let mut shard_files = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let path = target_dir.join(format!("{}_{}", self.config.shard_prefix, bucket.class()));
            bucket.record().write(&path)?;
            debug!(file = file_name(&path), samples = bucket.len(), "wrote shard");
            shard_files.push(path);
        }

        if let Some(source) = metadata_source {
            let target = target_dir.join(file_name(&source));
            fs::copy(&source, &target)?;
            debug!(file = file_name(&target), "copied metadata");
        }

        let summary = PartitionSummary {
            source_files: files.iter().map(|p| file_name(p).to_string()).collect(),
            class_counts: buckets.iter().map(ClassBucket::len).collect(),
            shard_files,
        };

        info!(
            source = %source_dir.display(),
            target = %target_dir.display(),
            files = summary.source_files.len(),
            samples = summary.total(),
            "partitioned batches by class"
        );

        Ok(summary)
    }

    fn route_file(&self, path: &Path, buckets: &mut [ClassBucket]) -> Result<usize, DatasetError> {
        let keys = LabelKeys {
            primary: &self.config.label_key,
            fallback: &self.config.label_fallback_key,
        };
        let record = RawBatchRecord::read(path, keys)?;

        // sample i goes with its own data[i] and filenames[i]
        for (i, &label) in record.labels.iter().enumerate() {
            let bucket = buckets.get_mut(label as usize).ok_or_else(|| {
                DatasetError::format(
                    path,
                    format!(
                        "label {} at position {} is outside the {} configured classes",
                        label, i, self.config.num_classes
                    ),
                )
            })?;
            bucket.push_from(&record, i);
        }

        Ok(record.len())
    }
}

/// Partition with the default coarse configuration.
pub fn partition(source_dir: &Path, target_dir: &Path) -> Result<PartitionSummary, DatasetError> {
    ShardPartitioner::new(PartitionConfig::default())?.partition(source_dir, target_dir)
}

fn create_target_dir(target_dir: &Path) -> Result<(), DatasetError> {
    match fs::create_dir(target_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(DatasetError::TargetExists(target_dir.to_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

//! imbalance_loader - class-imbalanced splits from batched image records
//!
//! Partitions pickled image batches into per-class shards, and assembles
//! in-memory splits where every class keeps an independently configured
//! fraction of its samples.

mod dataloader;

mod partition;

mod record;

mod split;

pub use dataloader::{
    config::{Split, SplitConfig},
    dataset::Dataset,
    error::{DatasetError, ErrorKind},
    info::{print_partition_info, print_split_info},
    taxonomy::LabelTaxonomy,
};
pub use partition::{
    class_bucket::ClassBucket,
    partitioner::{PartitionConfig, PartitionSummary, ShardPartitioner, partition},
};
pub use record::{
    batch_record::{Label, LabelKeys, RawBatchRecord},
    discovery::list_batch_files,
    metadata::ClassMetadata,
};
pub use split::{
    imbalanced_split::{FileDraw, ImageTransform, ImbalancedSplit, LabelTransform},
    layout::{ImageShape, chw_to_hwc},
};

pub mod class_bucket;
pub mod partitioner;

pub mod batch_record;
pub mod discovery;
pub mod metadata;

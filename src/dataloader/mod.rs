pub mod config;
pub mod dataset;
pub mod error;
pub mod info;
pub mod taxonomy;

use std::fmt;
use std::path::PathBuf;

use rand::Rng;

use crate::split::layout::ImageShape;

use super::error::DatasetError;
use super::taxonomy::LabelTaxonomy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn from_is_train(is_training_split: bool) -> Self {
        if is_training_split {
            Split::Train
        } else {
            Split::Test
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "Train"),
            Split::Test => write!(f, "Test"),
        }
    }
}

#[derive(Debug)]
pub struct SplitConfig {
    /// One sampling rate per class index, each in [0, 1]
    pub rates: Vec<f32>,
    pub dataset_path: PathBuf,
    pub split: Split,
    /// Draws are taken from [0, pool_size) regardless of how many records a file holds
    pub pool_size: usize,
    pub image_shape: ImageShape,
    pub taxonomy: LabelTaxonomy,
    /// Prefix of per-class shard files, `<prefix>_<class_index>`
    pub shard_prefix: String,
    pub seed: Option<u64>,
}

impl SplitConfig {
    pub fn new(rates: Vec<f32>, dataset_path: impl Into<PathBuf>, is_training_split: bool) -> Self {
        Self {
            rates,
            dataset_path: dataset_path.into(),
            split: Split::from_is_train(is_training_split),
            ..Default::default()
        }
    }

    pub fn build(mut self) -> Result<Self, DatasetError> {
        self.validate_rates()?;

        if self.pool_size == 0 {
            return Err(DatasetError::InvalidConfig(
                "pool_size must be greater than zero".to_string(),
            ));
        }

        let shape = self.image_shape;
        if !(1..=4).contains(&shape.channels) {
            return Err(DatasetError::InvalidConfig(format!(
                "images must have 1 to 4 channels, got {}",
                shape.channels
            )));
        }
        if shape.height == 0 || shape.width == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "image dimensions must be non-zero, got {}x{}",
                shape.height, shape.width
            )));
        }

        if self.seed.is_none() {
            self.seed = Some(rand::rng().random());
        }

        Ok(self)
    }

    fn validate_rates(&self) -> Result<(), DatasetError> {
        if self.rates.is_empty() {
            return Err(DatasetError::InvalidRates {
                message: "rate vector cannot be empty".to_string(),
            });
        }

        if self.rates.len() != self.taxonomy.num_classes {
            return Err(DatasetError::InvalidRates {
                message: format!(
                    "expected {} rates (one per class), got {}",
                    self.taxonomy.num_classes,
                    self.rates.len()
                ),
            });
        }

        if let Some((class, rate)) = self
            .rates
            .iter()
            .enumerate()
            .find(|(_, rate)| !(0.0..=1.0).contains(*rate))
        {
            return Err(DatasetError::InvalidRates {
                message: format!("rate for class {} must lie in [0, 1], got {}", class, rate),
            });
        }

        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.rates.len()
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            rates: vec![1.0; 10],
            dataset_path: PathBuf::from("cifar_after_divide"),
            split: Split::Train,
            pool_size: 5000,
            image_shape: ImageShape::default(),
            taxonomy: LabelTaxonomy::coarse(),
            shard_prefix: "data_class".to_string(),
            seed: None,
        }
    }
}

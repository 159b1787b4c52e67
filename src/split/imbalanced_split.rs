use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, ImageFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::dataloader::config::{Split, SplitConfig};
use crate::dataloader::dataset::Dataset;
use crate::dataloader::error::DatasetError;
use crate::record::batch_record::{Label, LabelKeys, RawBatchRecord};
use crate::record::discovery::{file_name, list_files_where, shard_index};
use crate::record::metadata::ClassMetadata;

use super::layout::{ImageShape, chw_to_hwc};
use super::sampling::{draw_count, draw_indices, reduce_record};

pub type ImageTransform = Box<dyn Fn(DynamicImage) -> DynamicImage + Send + Sync>;
pub type LabelTransform = Box<dyn Fn(Label) -> Label + Send + Sync>;

/// What one source file contributed to the split.
#[derive(Clone, Debug, PartialEq)]
pub struct FileDraw {
    pub file_name: String,
    /// Index into the rate vector this file was sampled with
    pub class_index: usize,
    pub rate: f32,
    /// Records present in the file
    pub available: usize,
    pub drawn: usize,
}

/// A class-imbalanced split assembled eagerly from batch or shard files.
///
/// Each discovered file is assigned a class index (the `<n>` of a
/// `<shard_prefix>_<n>` name, otherwise its position in natural name order)
/// and contributes `round(pool_size * rates[class_index])` samples drawn with
/// replacement from its first `pool_size` records. Images are kept as one
/// dense (N, H, W, C) byte array.
pub struct ImbalancedSplit {
    images: Vec<u8>,
    labels: Vec<Label>,
    filenames: Vec<String>,
    shape: ImageShape,
    metadata: ClassMetadata,
    split: Split,
    draws: Vec<FileDraw>,
    seed: Option<u64>,
    image_transform: Option<ImageTransform>,
    label_transform: Option<LabelTransform>,
}

impl ImbalancedSplit {
    /// Load using a `StdRng` seeded from `config.seed`. A missing seed is
    /// generated by `SplitConfig::build` and can be read back with `seed()`.
    pub fn new(config: SplitConfig) -> Result<Self, DatasetError> {
        let config = config.build()?;
        // always Some after build()
        let seed = config.seed.unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut split = Self::load(&config, &mut rng)?;
        split.seed = Some(seed);
        Ok(split)
    }

    /// Load drawing from a caller-owned random source. `config.seed` is ignored.
    pub fn with_rng<R: Rng + ?Sized>(config: SplitConfig, rng: &mut R) -> Result<Self, DatasetError> {
        let config = config.build()?;
        Self::load(&config, rng)
    }

    pub fn with_image_transform(
        mut self,
        transform: impl Fn(DynamicImage) -> DynamicImage + Send + Sync + 'static,
    ) -> Self {
        self.image_transform = Some(Box::new(transform));
        self
    }

    pub fn with_label_transform(
        mut self,
        transform: impl Fn(Label) -> Label + Send + Sync + 'static,
    ) -> Self {
        self.label_transform = Some(Box::new(transform));
        self
    }

    fn load<R: Rng + ?Sized>(config: &SplitConfig, rng: &mut R) -> Result<Self, DatasetError> {
        let taxonomy = &config.taxonomy;
        let files = discover(config)?;

        let metadata = ClassMetadata::load(
            &config.dataset_path,
            &taxonomy.metadata_filename,
            &taxonomy.metadata_key,
        )?;

        if files.is_empty() {
            warn!(
                path = %config.dataset_path.display(),
                marker = %taxonomy.batch_marker,
                "no batch files found, split will be empty"
            );
        }

        let keys = LabelKeys {
            primary: &taxonomy.label_key,
            fallback: &taxonomy.label_fallback_key,
        };
        let shape = config.image_shape;

        let mut images = Vec::new();
        let mut labels = Vec::new();
        let mut filenames = Vec::new();
        let mut draws = Vec::with_capacity(files.len());

        for (path, class_index) in files {
            let rate = *config.rates.get(class_index).ok_or_else(|| DatasetError::InvalidRates {
                message: format!(
                    "{} maps to class index {}, but only {} rates were given",
                    file_name(&path),
                    class_index,
                    config.rates.len()
                ),
            })?;

            let record = RawBatchRecord::read(&path, keys)?;
            let count = draw_count(config.pool_size, rate);

            if count > 0 && config.pool_size > record.len() {
                return Err(DatasetError::format(
                    &path,
                    format!(
                        "pool size {} exceeds the {} records in the file",
                        config.pool_size,
                        record.len()
                    ),
                ));
            }

            let indices = draw_indices(rng, config.pool_size, count);
            let reduced = reduce_record(&record, &indices);

            images.reserve(count * shape.bytes_per_image());
            for (row, &j) in reduced.data.iter().zip(&indices) {
                if row.len() != shape.bytes_per_image() {
                    return Err(DatasetError::format(
                        &path,
                        format!(
                            "data[{}] holds {} bytes, expected {} for a {}x{}x{} image",
                            j,
                            row.len(),
                            shape.bytes_per_image(),
                            shape.channels,
                            shape.height,
                            shape.width
                        ),
                    ));
                }
                chw_to_hwc(row, shape, &mut images);
            }

            debug!(
                file = file_name(&path),
                class_index,
                rate,
                available = record.len(),
                drawn = count,
                "sampled batch file"
            );

            draws.push(FileDraw {
                file_name: file_name(&path).to_string(),
                class_index,
                rate,
                available: record.len(),
                drawn: count,
            });
            labels.extend(reduced.labels);
            filenames.extend(reduced.filenames);
        }

        if let Some((i, label)) = labels
            .iter()
            .enumerate()
            .find(|(_, label)| **label as usize >= metadata.len())
        {
            return Err(DatasetError::format(
                config.dataset_path.join(&taxonomy.metadata_filename),
                format!(
                    "label {} of sample {} ({}) has no entry among {} class names",
                    label,
                    i,
                    filenames[i],
                    metadata.len()
                ),
            ));
        }

        info!(
            split = %config.split,
            samples = labels.len(),
            files = draws.len(),
            "assembled imbalanced split"
        );

        Ok(Self {
            images,
            labels,
            filenames,
            shape,
            metadata,
            split: config.split,
            draws,
            seed: None,
            image_transform: None,
            label_transform: None,
        })
    }

    /// Image `index` as a `DynamicImage` plus its label, with the image
    /// transform and then the label transform applied.
    pub fn sample(&self, index: usize) -> Result<(DynamicImage, Label), DatasetError> {
        self.check_index(index)?;

        let mut image = self.to_image(index)?;
        let mut label = self.labels[index];

        if let Some(transform) = &self.image_transform {
            image = transform(image);
        }
        if let Some(transform) = &self.label_transform {
            label = transform(label);
        }

        Ok((image, label))
    }

    /// Write sample `index`, after the image transform, to `path` as a PNG.
    pub fn save_sample(&self, index: usize, path: &Path) -> Result<(), DatasetError> {
        let (image, _) = self.sample(index)?;
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| DatasetError::Image {
                path: path.to_owned(),
                source,
            })
    }

    fn to_image(&self, index: usize) -> Result<DynamicImage, DatasetError> {
        let pixels = self
            .image_hwc(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.len(),
            })?
            .to_vec();
        let (width, height) = (self.shape.width as u32, self.shape.height as u32);

        let image = match self.shape.channels {
            1 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
            _ => None,
        };

        image.ok_or_else(|| {
            DatasetError::InvalidConfig(format!(
                "cannot build an image with {} channels",
                self.shape.channels
            ))
        })
    }

    /// Raw (H, W, C) bytes of image `index`, untransformed.
    pub fn image_hwc(&self, index: usize) -> Option<&[u8]> {
        let n = self.shape.bytes_per_image();
        self.images.get(index * n..(index + 1) * n)
    }

    pub fn images(&self) -> &[u8] {
        &self.images
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn filename(&self, index: usize) -> Option<&str> {
        self.filenames.get(index).map(String::as_str)
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    pub fn classes(&self) -> &[String] {
        self.metadata.classes()
    }

    pub fn class_to_idx(&self) -> &HashMap<String, usize> {
        self.metadata.class_to_idx()
    }

    pub fn draws(&self) -> &[FileDraw] {
        &self.draws
    }

    /// Seed used for sampling, `None` when a caller-supplied rng was used
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Samples per label, indexed by class
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.metadata.len()];
        for &label in &self.labels {
            counts[label as usize] += 1;
        }
        counts
    }
}

impl Dataset for ImbalancedSplit {
    type Item = (DynamicImage, Label);

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn get(&self, index: usize) -> Result<Self::Item, DatasetError> {
        self.sample(index)
    }

    fn item_shape(&self) -> [usize; 3] {
        self.shape.hwc()
    }
}

impl fmt::Display for ImbalancedSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Split: {}", self.split)
    }
}

impl fmt::Debug for ImbalancedSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImbalancedSplit")
            .field("split", &self.split)
            .field("len", &self.labels.len())
            .field("shape", &self.shape)
            .field("classes", &self.metadata.len())
            .field("draws", &self.draws)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// Files to sample from paired with the class index used to look up their rate.
fn discover(config: &SplitConfig) -> Result<Vec<(PathBuf, usize)>, DatasetError> {
    let dir = &config.dataset_path;

    match config.split {
        Split::Train => {
            // raw batches by marker, shards by name, whatever the taxonomy's marker is
            let files = list_files_where(dir, |name| {
                name.contains(&config.taxonomy.batch_marker)
                    || shard_index(name, &config.shard_prefix).is_some()
            })?;

            let mut owners: HashMap<usize, String> = HashMap::new();
            let mut indexed = Vec::with_capacity(files.len());
            for (position, path) in files.into_iter().enumerate() {
                let name = file_name(&path);
                let class_index = shard_index(name, &config.shard_prefix).unwrap_or(position);
                if let Some(owner) = owners.insert(class_index, name.to_string()) {
                    return Err(DatasetError::InvalidConfig(format!(
                        "{} and {} both map to class index {} in {}",
                        owner,
                        name,
                        class_index,
                        dir.display()
                    )));
                }
                indexed.push((path, class_index));
            }
            Ok(indexed)
        }
        Split::Test => {
            if !dir.is_dir() {
                return Err(DatasetError::DirectoryNotFound(dir.clone()));
            }
            let path = dir.join(&config.taxonomy.test_file_name);
            if !path.is_file() {
                return Err(DatasetError::FileNotFound(path));
            }
            Ok(vec![(path, 0)])
        }
    }
}

mod common;

use common::{SHAPE, write_batch, write_fine_batch, write_meta};
use imbalance_loader::{
    Dataset, ErrorKind, ImbalancedSplit, LabelTaxonomy, PartitionConfig, RawBatchRecord,
    ShardPartitioner, Split, SplitConfig,
};
use image::GenericImageView;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;

fn config(dir: &Path, rates: Vec<f32>, pool_size: usize) -> SplitConfig {
    let classes = rates.len();
    SplitConfig {
        pool_size,
        image_shape: SHAPE,
        taxonomy: LabelTaxonomy::coarse().with_num_classes(classes),
        seed: Some(42),
        ..SplitConfig::new(rates, dir, true)
    }
}

#[test]
fn zero_rate_file_contributes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);
    write_batch(dir.path(), "data_batch_1", &[0, 1, 0, 1], "first", 1);
    write_batch(dir.path(), "data_batch_2", &[0, 1, 0, 1], "second", 2);

    let split = ImbalancedSplit::new(config(dir.path(), vec![1.0, 0.0], 4)).unwrap();

    assert_eq!(split.len(), 4);
    for i in 0..split.len() {
        assert!(split.filename(i).unwrap().starts_with("first_"));
        assert!(split.image_hwc(i).unwrap().iter().all(|&b| b == 1));
    }
}

#[test]
fn length_is_the_sum_of_rounded_draws() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 3);
    for class in 0..3u32 {
        write_batch(dir.path(), &format!("data_class_{}", class), &[class; 20], "s", 0);
    }

    let rates = vec![0.33, 0.5, 0.96];
    let split = ImbalancedSplit::new(config(dir.path(), rates.clone(), 20)).unwrap();

    // 6.6 -> 7, 10, 19.2 -> 19
    let drawn: Vec<usize> = split.draws().iter().map(|d| d.drawn).collect();
    assert_eq!(drawn, vec![7, 10, 19]);
    assert_eq!(split.len(), 36);
    assert_eq!(split.class_counts(), vec![7, 10, 19]);
    for draw in split.draws() {
        assert_eq!(draw.rate, rates[draw.class_index]);
        assert_eq!(draw.available, 20);
    }
}

#[test]
fn samples_have_the_configured_shape_and_known_labels() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);
    write_batch(dir.path(), "data_class_0", &[0; 8], "a", 7);
    write_batch(dir.path(), "data_class_1", &[1; 8], "b", 9);

    let split = ImbalancedSplit::new(config(dir.path(), vec![0.5, 1.0], 8)).unwrap();
    assert_eq!(split.item_shape(), [4, 4, 3]);
    assert_eq!(split.bytes_per_item(), 48);
    assert_eq!(split.images().len(), split.len() * 48);

    for i in 0..split.len() {
        let (image, label) = split.get(i).unwrap();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.color(), image::ColorType::Rgb8);
        assert!((label as usize) < split.classes().len());
    }
    assert_eq!(split.get(split.len()).unwrap_err().kind(), ErrorKind::Range);
}

#[test]
fn image_transform_runs_before_label_transform() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 1);
    write_batch(dir.path(), "data_class_0", &[0; 2], "a", 100);

    let split = ImbalancedSplit::new(config(dir.path(), vec![1.0], 2))
        .unwrap()
        .with_image_transform(|image| image.grayscale())
        .with_label_transform(|label| label + 10);

    let (image, label) = split.sample(0).unwrap();
    assert_eq!(image.color(), image::ColorType::L8);
    assert_eq!(label, 10);
    // stored data is untouched
    assert_eq!(split.labels()[0], 0);
}

#[test]
fn same_seed_same_split() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);
    let labels: Vec<u32> = (0..50).map(|i| i % 2).collect();
    write_batch(dir.path(), "data_batch_1", &labels, "a", 0);
    write_batch(dir.path(), "data_batch_2", &labels, "b", 0);

    let first = ImbalancedSplit::new(config(dir.path(), vec![0.4, 0.8], 50)).unwrap();
    let second = ImbalancedSplit::new(config(dir.path(), vec![0.4, 0.8], 50)).unwrap();
    let names = |s: &ImbalancedSplit| -> Vec<String> {
        (0..s.len()).map(|i| s.filename(i).unwrap().to_string()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.seed(), Some(42));

    let mut rng_a = StdRng::seed_from_u64(9);
    let mut rng_b = StdRng::seed_from_u64(9);
    let a = ImbalancedSplit::with_rng(config(dir.path(), vec![0.4, 0.8], 50), &mut rng_a).unwrap();
    let b = ImbalancedSplit::with_rng(config(dir.path(), vec![0.4, 0.8], 50), &mut rng_b).unwrap();
    assert_eq!(names(&a), names(&b));
    assert_eq!(a.seed(), None);
}

#[test]
fn fine_taxonomy_reads_fine_labels() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "meta", "fine_label_names", 3);
    write_fine_batch(dir.path(), "train", &[2, 0, 1, 2]);
    write_fine_batch(dir.path(), "test", &[1]);

    let config = SplitConfig {
        pool_size: 4,
        image_shape: SHAPE,
        taxonomy: LabelTaxonomy::fine().with_num_classes(3),
        seed: Some(3),
        ..SplitConfig::new(vec![1.0, 0.0, 0.0], dir.path(), true)
    };
    let split = ImbalancedSplit::new(config).unwrap();

    assert_eq!(split.len(), 4);
    assert_eq!(split.classes().len(), 3);
    assert_eq!(split.class_to_idx()["class_1"], 1);
    for i in 0..split.len() {
        // rows were filled with their label
        let label = split.labels()[i];
        assert!(split.image_hwc(i).unwrap().iter().all(|&b| b as u32 == label));
    }
}

#[test]
fn test_split_reads_only_the_test_file() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);
    write_batch(dir.path(), "data_batch_1", &[0, 1], "train", 1);
    write_batch(dir.path(), "test_batch", &[1, 0, 1], "test", 2);

    let config = SplitConfig {
        split: Split::Test,
        ..config(dir.path(), vec![1.0, 1.0], 3)
    };
    let split = ImbalancedSplit::new(config).unwrap();

    assert_eq!(split.split(), Split::Test);
    assert_eq!(split.to_string(), "Split: Test");
    assert_eq!(split.len(), 3);
    assert!((0..3).all(|i| split.filename(i).unwrap().starts_with("test_")));
}

#[test]
fn missing_test_file_is_a_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 1);

    let config = SplitConfig {
        split: Split::Test,
        ..config(dir.path(), vec![1.0], 1)
    };
    let err = ImbalancedSplit::new(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Discovery);
}

#[test]
fn empty_directory_gives_an_empty_split() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);

    let split = ImbalancedSplit::new(config(dir.path(), vec![1.0, 1.0], 4)).unwrap();
    assert!(split.is_empty());
    assert!(split.draws().is_empty());
}

#[test]
fn bad_rates_are_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);

    let err = ImbalancedSplit::new(config(dir.path(), vec![1.5, 0.0], 4)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn fine_partition_shards_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("cifar-100-python");
    std::fs::create_dir(&source).unwrap();
    write_meta(&source, "meta", "fine_label_names", 3);
    write_fine_batch(&source, "train", &[2, 0, 1, 2, 2]);
    write_fine_batch(&source, "test", &[0, 0]);

    let taxonomy = LabelTaxonomy::fine().with_num_classes(3);
    let target = dir.path().join("divided");
    let summary = ShardPartitioner::new(PartitionConfig {
        copy_metadata: Some(taxonomy.metadata_filename.clone()),
        ..PartitionConfig::from_taxonomy(&taxonomy)
    })
    .unwrap()
    .partition(&source, &target)
    .unwrap();
    assert_eq!(summary.source_files, vec!["train"]);
    assert_eq!(summary.class_counts, vec![1, 1, 3]);

    let config = SplitConfig {
        pool_size: 1,
        image_shape: SHAPE,
        taxonomy,
        seed: Some(5),
        ..SplitConfig::new(vec![1.0, 1.0, 0.0], &target, true)
    };
    let split = ImbalancedSplit::new(config).unwrap();
    assert_eq!(split.draws().len(), 3);
    assert_eq!(split.class_counts(), vec![1, 1, 0]);
}

#[test]
fn clashing_class_indices_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 2);
    // sorts first, so its position index 0 collides with the shard
    write_batch(dir.path(), "data_batch_1", &[0, 1], "raw", 0);
    write_batch(dir.path(), "data_class_0", &[0, 0], "shard", 0);

    let err = ImbalancedSplit::new(config(dir.path(), vec![1.0, 1.0], 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("data_batch_1"));
    assert!(err.to_string().contains("data_class_0"));
}

#[test]
fn saved_samples_decode_to_the_same_pixels() {
    let dir = tempfile::tempdir().unwrap();
    write_meta(dir.path(), "batches.meta", "label_names", 1);
    let mut record = RawBatchRecord::default();
    let row: Vec<u8> = (0..SHAPE.bytes_per_image() as u8).map(|b| b * 5).collect();
    record.push(row, 0, "ramp.png".to_string());
    record.write(&dir.path().join("data_class_0")).unwrap();

    let split = ImbalancedSplit::new(config(dir.path(), vec![1.0], 1)).unwrap();
    let path = dir.path().join("sample_0.png");
    split.save_sample(0, &path).unwrap();

    let decoded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (4, 4));
    assert_eq!(decoded.as_raw().as_slice(), split.image_hwc(0).unwrap());

    let err = split.save_sample(1, &path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
}

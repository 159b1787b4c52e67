use crate::partition::partitioner::PartitionSummary;
use crate::split::imbalanced_split::ImbalancedSplit;

use super::dataset::Dataset;

pub fn print_split_info(split: &ImbalancedSplit) {
    let [height, width, channels] = split.item_shape();

    println!("Dataset Information:");
    println!("-------------------");
    println!("{}", split);
    println!("Total size: {}", split.len());
    println!("Image shape: {}x{}x{}", height, width, channels);
    println!();

    println!("Files:");
    for draw in split.draws() {
        println!(
            "  {} -> class {} (rate {:.2}): {} of {} drawn",
            draw.file_name, draw.class_index, draw.rate, draw.drawn, draw.available
        );
    }
    println!();

    println!("Classes:");
    let total = split.len().max(1);
    for (i, count) in split.class_counts().into_iter().enumerate() {
        let name = split.metadata().name_of(i).unwrap_or("?");
        println!(
            "  {:>3} {:<16} {:>6} ({:.2}%)",
            i,
            name,
            count,
            count as f64 / total as f64 * 100.0
        );
    }
    println!();

    println!("Seed: {:?}", split.seed());
}

pub fn print_partition_info(summary: &PartitionSummary) {
    println!("Partition Information:");
    println!("----------------------");
    println!("Source files: {}", summary.source_files.join(", "));
    println!("Total samples: {}", summary.total());
    println!();

    for (count, path) in summary.class_counts.iter().zip(&summary.shard_files) {
        println!("  {}: {}", path.display(), count);
    }
}

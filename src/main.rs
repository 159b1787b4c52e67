use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use imbalance_loader::{
    Dataset, DatasetError, ImbalancedSplit, LabelTaxonomy, PartitionConfig, ShardPartitioner,
    SplitConfig, print_partition_info, print_split_info,
};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum TaxonomyKind {
    /// 10 classes, `batches.meta` / `label_names`
    Coarse,
    /// 100 classes, `meta` / `fine_label_names`
    Fine,
}

impl TaxonomyKind {
    fn taxonomy(self) -> LabelTaxonomy {
        match self {
            TaxonomyKind::Coarse => LabelTaxonomy::coarse(),
            TaxonomyKind::Fine => LabelTaxonomy::fine(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "imbalance_loader",
    about = "Partition image batches by class and build class-imbalanced splits"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that assembles a split.
#[derive(Args, Debug)]
struct SplitArgs {
    /// Directory holding shard or batch files plus the metadata file.
    #[arg(long)]
    dataset_path: PathBuf,
    /// Per-class sampling rates, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    rates: Vec<f32>,
    /// Load the fixed test file instead of the training batches.
    #[arg(long)]
    test: bool,
    /// Seed for the sampling draws.
    #[arg(long)]
    seed: Option<u64>,
    /// Draws are taken from the first `pool_size` records of each file.
    #[arg(long, default_value_t = 5000)]
    pool_size: usize,
    /// Label set the files use.
    #[arg(long, value_enum, default_value_t = TaxonomyKind::Coarse)]
    taxonomy: TaxonomyKind,
}

impl SplitArgs {
    fn load(self) -> Result<ImbalancedSplit, DatasetError> {
        let taxonomy = self.taxonomy.taxonomy().with_num_classes(self.rates.len());
        let config = SplitConfig {
            seed: self.seed,
            pool_size: self.pool_size,
            taxonomy,
            ..SplitConfig::new(self.rates, self.dataset_path, !self.test)
        };

        info!("Loading split from {}", config.dataset_path.display());
        ImbalancedSplit::new(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split every batch file of a directory into one shard per class.
    Partition {
        /// Directory holding the raw batch files.
        #[arg(long)]
        source: PathBuf,
        /// Directory to create for the shards. Must not exist.
        #[arg(long)]
        target: PathBuf,
        /// Label set the batches use.
        #[arg(long, value_enum, default_value_t = TaxonomyKind::Coarse)]
        taxonomy: TaxonomyKind,
        /// Override the taxonomy's class count.
        #[arg(long)]
        num_classes: Option<usize>,
        /// Copy the label-name metadata file into the target directory.
        #[arg(long)]
        copy_metadata: bool,
    },
    /// Assemble an imbalanced split and print what it contains.
    Load {
        #[command(flatten)]
        split: SplitArgs,
    },
    /// Assemble an imbalanced split and write its samples as PNG files.
    Export {
        #[command(flatten)]
        split: SplitArgs,
        /// Directory the images are written to, created if missing.
        #[arg(long)]
        out: PathBuf,
        /// Write at most this many samples.
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Command::Partition {
            source,
            target,
            taxonomy,
            num_classes,
            copy_metadata,
        } => {
            let taxonomy = taxonomy.taxonomy();
            let mut config = PartitionConfig::from_taxonomy(&taxonomy);
            if let Some(n) = num_classes {
                config.num_classes = n;
            }
            if copy_metadata {
                config.copy_metadata = Some(taxonomy.metadata_filename.clone());
            }

            info!("Partitioning {} into {}", source.display(), target.display());
            let summary = ShardPartitioner::new(config)?.partition(&source, &target)?;
            print_partition_info(&summary);
        }
        Command::Load { split } => {
            let split = split.load()?;
            print_split_info(&split);
        }
        Command::Export { split, out, limit } => {
            let split = split.load()?;
            fs::create_dir_all(&out)?;

            let count = limit.map_or(split.len(), |n| n.min(split.len()));
            for i in 0..count {
                let (_, label) = split.sample(i)?;
                let class = split.metadata().name_of(label as usize).unwrap_or("unknown");
                split.save_sample(i, &out.join(format!("{:05}_{}.png", i, class)))?;
            }
            info!("Wrote {} images to {}", count, out.display());
        }
    }

    Ok(())
}

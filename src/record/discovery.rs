use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::dataloader::error::DatasetError;

/// Every regular file in `dir` whose name contains `marker`, in natural name
/// order (`data_class_2` before `data_class_10`).
pub fn list_batch_files(dir: &Path, marker: &str) -> Result<Vec<PathBuf>, DatasetError> {
    list_files_where(dir, |name| name.contains(marker))
}

/// Every regular file in `dir` whose name satisfies `keep`, in natural name order.
pub fn list_files_where(
    dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, DatasetError> {
    if !dir.is_dir() {
        return Err(DatasetError::DirectoryNotFound(dir.to_owned()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(&keep)
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();

    // read_dir order is filesystem dependent, never let it leak into sampling
    files.sort_by(|a, b| natural_cmp(file_name(a), file_name(b)));

    Ok(files)
}

pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Class index encoded in a shard name of the form `<prefix>_<index>`.
pub fn shard_index(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?
        .strip_prefix('_')?
        .parse()
        .ok()
}

fn split_trailing_number(name: &str) -> (&str, Option<u64>) {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (stem, number) = name.split_at(name.len() - digits);
    (stem, number.parse().ok())
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a_stem, a_num) = split_trailing_number(a);
    let (b_stem, b_num) = split_trailing_number(b);
    a_stem
        .cmp(b_stem)
        .then(a_num.cmp(&b_num))
        .then_with(|| a.cmp(b))
}

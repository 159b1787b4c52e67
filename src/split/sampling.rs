use rand::Rng;

use crate::record::batch_record::RawBatchRecord;

/// Number of draws taken from a file: `round(pool_size * rate)`.
pub fn draw_count(pool_size: usize, rate: f32) -> usize {
    (pool_size as f64 * rate as f64).round() as usize
}

/// `count` indices drawn uniformly from `[0, pool_size)` with replacement.
pub fn draw_indices<R: Rng + ?Sized>(rng: &mut R, pool_size: usize, count: usize) -> Vec<usize> {
    if pool_size == 0 {
        return Vec::new();
    }
    (0..count).map(|_| rng.random_range(0..pool_size)).collect()
}

/// New record holding the samples of `record` at `indices`, in draw order.
/// Every index must be below `record.len()`.
pub fn reduce_record(record: &RawBatchRecord, indices: &[usize]) -> RawBatchRecord {
    let mut reduced = RawBatchRecord::with_capacity(indices.len());
    for &j in indices {
        reduced.push_from(record, j);
    }
    reduced
}

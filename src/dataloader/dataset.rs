use super::error::DatasetError;

/// Indexable dataset contract consumed by a training loop: a length and
/// positional access. Batching and shuffling live with the consumer.
pub trait Dataset {
    type Item;

    /// Number of samples
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index`, or `DatasetError::IndexOutOfRange` when
    /// `index >= self.len()`
    fn get(&self, index: usize) -> Result<Self::Item, DatasetError>;

    /// Shape of one stored item as (height, width, channels)
    fn item_shape(&self) -> [usize; 3];

    /// Number of bytes required to store one item
    fn bytes_per_item(&self) -> usize {
        self.item_shape().iter().product()
    }

    fn check_index(&self, index: usize) -> Result<(), DatasetError> {
        let len = self.len();
        if index >= len {
            return Err(DatasetError::IndexOutOfRange { index, len });
        }
        Ok(())
    }
}

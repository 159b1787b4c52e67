/// Names the files and keys that differ between the coarse (10 class) and
/// fine (100 class) label sets. Everything downstream reads these fields
/// instead of branching on which dataset it is looking at.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelTaxonomy {
    pub metadata_filename: String,
    pub metadata_key: String,
    pub label_key: String,
    /// Read when `label_key` is absent from a record.
    pub label_fallback_key: String,
    /// Substring that marks a file as a raw training batch.
    pub batch_marker: String,
    pub test_file_name: String,
    pub num_classes: usize,
}

impl LabelTaxonomy {
    pub fn coarse() -> Self {
        Self {
            metadata_filename: "batches.meta".to_string(),
            metadata_key: "label_names".to_string(),
            label_key: "labels".to_string(),
            label_fallback_key: "fine_labels".to_string(),
            batch_marker: "data".to_string(),
            test_file_name: "test_batch".to_string(),
            num_classes: 10,
        }
    }

    /// CIFAR-100 keeps all training samples in a single `train` file.
    pub fn fine() -> Self {
        Self {
            metadata_filename: "meta".to_string(),
            metadata_key: "fine_label_names".to_string(),
            label_key: "labels".to_string(),
            label_fallback_key: "fine_labels".to_string(),
            batch_marker: "train".to_string(),
            test_file_name: "test".to_string(),
            num_classes: 100,
        }
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }
}

impl Default for LabelTaxonomy {
    fn default() -> Self {
        Self::coarse()
    }
}

use crate::record::batch_record::{Label, RawBatchRecord};

/// All samples of one class gathered across every source file.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassBucket {
    class: Label,
    record: RawBatchRecord,
}

impl ClassBucket {
    pub fn new(class: Label) -> Self {
        Self {
            class,
            record: RawBatchRecord::default(),
        }
    }

    pub fn class(&self) -> Label {
        self.class
    }

    /// Append sample `index` of `source`. The sample's label must equal this
    /// bucket's class.
    pub fn push_from(&mut self, source: &RawBatchRecord, index: usize) {
        debug_assert_eq!(source.labels[index], self.class);
        self.record.push_from(source, index);
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn record(&self) -> &RawBatchRecord {
        &self.record
    }

    pub fn into_record(self) -> RawBatchRecord {
        self.record
    }
}

use parking_lot::Mutex;

use crate::domain::order::FailedOrderRecord;

/// In-memory log of dead-lettered orders, kept for inspection through the
/// management API. Grows without bound until cleared; nothing survives a
/// restart.
#[derive(Debug, Default)]
pub struct DeadLetterArchive {
    records: Mutex<Vec<FailedOrderRecord>>,
}

impl DeadLetterArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: FailedOrderRecord) {
        self.records.lock().push(record);
    }

    /// Independent copy of the current contents, in insertion order.
    pub fn list(&self) -> Vec<FailedOrderRecord> {
        self.records.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn clear(&self) {
        let cleared = {
            let mut records = self.records.lock();
            let cleared = records.len();
            records.clear();
            cleared
        };
        tracing::info!(cleared, "DLQ records cleared successfully");
    }
}

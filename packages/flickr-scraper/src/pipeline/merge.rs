//! Cross-page deduplication.
//!
//! Workers finish pages in arbitrary order, so "first seen" is decided by
//! provenance rather than arrival: a record from a lower page number (or an
//! earlier position on the same page) always wins. This makes the merged
//! result independent of the number of workers and of scheduling.

use std::collections::HashMap;

use crate::types::record::ImageRecord;

/// Where a record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Provenance {
    pub page: u32,
    pub position: usize,
}

/// Accumulates records from every page, keeping one per identifier.
#[derive(Debug, Default)]
pub struct RecordMerger {
    records: HashMap<String, (Provenance, ImageRecord)>,
    duplicates: usize,
}

impl RecordMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the records of one page, in page order.
    pub fn merge_page(&mut self, page: u32, records: Vec<ImageRecord>) {
        for (position, record) in records.into_iter().enumerate() {
            self.insert(Provenance { page, position }, record);
        }
    }

    fn insert(&mut self, provenance: Provenance, record: ImageRecord) {
        match self.records.get_mut(&record.identifier) {
            Some(existing) => {
                self.duplicates += 1;
                if provenance < existing.0 {
                    *existing = (provenance, record);
                }
            }
            None => {
                self.records
                    .insert(record.identifier.clone(), (provenance, record));
            }
        }
    }

    /// Distinct identifiers seen so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records discarded in favour of an earlier occurrence.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Records ordered by (page, position).
    pub fn into_sorted(self) -> Vec<ImageRecord> {
        let mut entries: Vec<_> = self.records.into_values().collect();
        entries.sort_by_key(|(provenance, _)| *provenance);
        entries.into_iter().map(|(_, record)| record).collect()
    }
}

use crate::dds::qos::policy::{History, HistoryQosKind, ResourceLimits, LENGTH_UNLIMITED};
use crate::message::submessage::SequenceNumber;
use crate::structure::GUID;
use alloc::collections::{BTreeMap, VecDeque};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CacheChange {
    pub writer_guid: GUID,
    pub sequence_number: SequenceNumber,
    pub source_timestamp: DateTime<Utc>,
    pub data_value: Bytes,
}

impl CacheChange {
    pub fn new(
        writer_guid: GUID,
        sequence_number: SequenceNumber,
        source_timestamp: DateTime<Utc>,
        data_value: Bytes,
    ) -> Self {
        Self {
            writer_guid,
            sequence_number,
            source_timestamp,
            data_value,
        }
    }

    pub(crate) fn from_nanos(
        writer_guid: GUID,
        sequence_number: SequenceNumber,
        source_timestamp: i64,
        data_value: Bytes,
    ) -> Self {
        Self::new(
            writer_guid,
            sequence_number,
            Utc.timestamp_nanos(source_timestamp),
            data_value,
        )
    }

    pub(crate) fn timestamp_nanos(&self) -> i64 {
        self.source_timestamp.timestamp_nanos_opt().unwrap_or(0)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct HCKey {
    pub guid: GUID,
    pub seq_num: SequenceNumber,
}
impl HCKey {
    pub fn new(guid: GUID, seq_num: SequenceNumber) -> Self {
        Self { guid, seq_num }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AddChangeError {
    /// a change with the same writer and sequence number is already present
    Duplicate,
    /// KEEP_ALL history reached max_samples
    Full,
}

/// history of the changes of a writer, or of the samples received by a reader
///
/// KEEP_LAST evicts the oldest change once `depth` is reached,
/// KEEP_ALL refuses new changes once `max_samples` is reached.
pub struct HistoryCache {
    changes: BTreeMap<HCKey, CacheChange>,
    arrival: VecDeque<HCKey>,
    history: History,
    limits: ResourceLimits,
}

impl HistoryCache {
    pub fn new(history: History, limits: ResourceLimits) -> Self {
        Self {
            changes: BTreeMap::new(),
            arrival: VecDeque::new(),
            history,
            limits,
        }
    }

    fn capacity(&self) -> Option<usize> {
        match self.history.kind {
            HistoryQosKind::KeepLast => Some(self.history.depth.max(1) as usize),
            HistoryQosKind::KeepAll if self.limits.max_samples == LENGTH_UNLIMITED => None,
            HistoryQosKind::KeepAll => Some(self.limits.max_samples.max(1) as usize),
        }
    }

    /// returns the change evicted to make room, if any
    pub fn add_change(
        &mut self,
        change: CacheChange,
    ) -> Result<Option<CacheChange>, AddChangeError> {
        let key = HCKey::new(change.writer_guid, change.sequence_number);
        if self.changes.contains_key(&key) {
            return Err(AddChangeError::Duplicate);
        }
        let mut evicted = None;
        if let Some(cap) = self.capacity() {
            if self.changes.len() >= cap {
                match self.history.kind {
                    HistoryQosKind::KeepAll => return Err(AddChangeError::Full),
                    HistoryQosKind::KeepLast => {
                        if let Some(oldest) = self.arrival.pop_front() {
                            evicted = self.changes.remove(&oldest);
                        }
                    }
                }
            }
        }
        self.arrival.push_back(key);
        self.changes.insert(key, change);
        Ok(evicted)
    }

    pub fn get_change(&self, guid: GUID, seq_num: SequenceNumber) -> Option<&CacheChange> {
        self.changes.get(&HCKey::new(guid, seq_num))
    }

    /// remove the changes of `guid` with a sequence number up to `seq_num`
    pub fn remove_changes_upto(&mut self, guid: GUID, seq_num: SequenceNumber) -> usize {
        let before = self.changes.len();
        self.changes
            .retain(|k, _| !(k.guid == guid && k.seq_num <= seq_num));
        self.arrival
            .retain(|k| !(k.guid == guid && k.seq_num <= seq_num));
        before - self.changes.len()
    }

    /// remove every change in arrival order
    pub fn take_all(&mut self) -> Vec<CacheChange> {
        let mut taken = Vec::with_capacity(self.arrival.len());
        while let Some(k) = self.arrival.pop_front() {
            if let Some(c) = self.changes.remove(&k) {
                taken.push(c);
            }
        }
        taken
    }

    /// changes of `guid` with a sequence number greater than `after`
    pub fn changes_after(&self, guid: GUID, after: SequenceNumber) -> Vec<CacheChange> {
        self.changes
            .range(HCKey::new(guid, after + 1)..)
            .take_while(|(k, _)| k.guid == guid)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn min_seq_num(&self, guid: GUID) -> Option<SequenceNumber> {
        self.changes
            .range(HCKey::new(guid, SequenceNumber::ZERO)..)
            .next()
            .filter(|(k, _)| k.guid == guid)
            .map(|(k, _)| k.seq_num)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

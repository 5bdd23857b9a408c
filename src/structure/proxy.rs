use crate::message::submessage::SequenceNumber;
use crate::structure::GUID;
use alloc::collections::BTreeSet;
use core::cmp::max;

/// state a writer keeps about one matched reader
///
/// rtps 2.3 spec, 8.4.7.5 RTPS ReaderProxy
#[derive(Clone, Debug)]
pub struct ReaderProxy {
    pub remote_reader_guid: GUID,
    pub reliable: bool,
    // changes before this one were written before the match and are not
    // relevant to a volatile reader
    first_relevant: SequenceNumber,
    acked_upto: SequenceNumber,
    requested: BTreeSet<SequenceNumber>,
}

impl ReaderProxy {
    pub fn new(remote_reader_guid: GUID, reliable: bool, first_relevant: SequenceNumber) -> Self {
        Self {
            remote_reader_guid,
            reliable,
            first_relevant,
            acked_upto: first_relevant - 1,
            requested: BTreeSet::new(),
        }
    }

    pub fn first_relevant(&self) -> SequenceNumber {
        self.first_relevant
    }

    pub fn acked_upto(&self) -> SequenceNumber {
        self.acked_upto
    }

    /// every change up to `committed` is acknowledged by the reader
    pub fn acked_changes_set(&mut self, committed: SequenceNumber) {
        self.acked_upto = max(self.acked_upto, committed);
        let acked = self.acked_upto;
        self.requested.retain(|sn| *sn > acked);
    }

    pub fn requested_changes_set(&mut self, requested: &[SequenceNumber]) {
        for sn in requested {
            if *sn > self.acked_upto && *sn >= self.first_relevant {
                self.requested.insert(*sn);
            }
        }
    }

    pub fn take_requested(&mut self) -> Vec<SequenceNumber> {
        core::mem::take(&mut self.requested).into_iter().collect()
    }

    pub fn is_acked(&self, sn: SequenceNumber) -> bool {
        sn <= self.acked_upto
    }
}

/// state a reader keeps about one matched writer
///
/// rtps 2.3 spec, 8.4.10.4 RTPS WriterProxy
#[derive(Clone, Debug)]
pub struct WriterProxy {
    pub remote_writer_guid: GUID,
    pub reliable: bool,
    // every change up to this one is received or known to be unavailable
    highest_contiguous: SequenceNumber,
    received_beyond: BTreeSet<SequenceNumber>,
}

impl WriterProxy {
    pub fn new(remote_writer_guid: GUID, reliable: bool) -> Self {
        Self {
            remote_writer_guid,
            reliable,
            highest_contiguous: SequenceNumber::ZERO,
            received_beyond: BTreeSet::new(),
        }
    }

    /// whether a received change must be delivered to the reader
    ///
    /// duplicates are always dropped. A best effort reader also drops
    /// changes older than the newest one it has seen.
    pub fn accept(&mut self, sn: SequenceNumber) -> bool {
        if sn <= self.highest_contiguous || self.received_beyond.contains(&sn) {
            return false;
        }
        if !self.reliable {
            self.highest_contiguous = sn;
            return true;
        }
        if sn == self.highest_contiguous + 1 {
            self.highest_contiguous = sn;
            self.advance();
        } else {
            self.received_beyond.insert(sn);
        }
        true
    }

    /// apply a HEARTBEAT and return the changes to request
    pub fn heartbeat(&mut self, first: SequenceNumber, last: SequenceNumber) -> Vec<SequenceNumber> {
        if first > self.highest_contiguous + 1 {
            // changes before `first` are no longer available from the writer
            self.highest_contiguous = first - 1;
            let hc = self.highest_contiguous;
            self.received_beyond.retain(|sn| *sn > hc);
            self.advance();
        }
        let mut missing = Vec::new();
        let mut sn = self.highest_contiguous + 1;
        while sn <= last {
            if !self.received_beyond.contains(&sn) {
                missing.push(sn);
            }
            sn = sn + 1;
        }
        missing
    }

    pub fn highest_contiguous(&self) -> SequenceNumber {
        self.highest_contiguous
    }

    fn advance(&mut self) {
        while self.received_beyond.remove(&(self.highest_contiguous + 1)) {
            self.highest_contiguous = self.highest_contiguous + 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sn(n: i64) -> SequenceNumber {
        SequenceNumber(n)
    }

    #[test]
    fn test_reliable_writer_proxy_fills_gaps() {
        let mut proxy = WriterProxy::new(GUID::UNKNOW, true);
        assert!(proxy.accept(sn(1)));
        assert!(proxy.accept(sn(3)));
        assert!(!proxy.accept(sn(3)));
        assert_eq!(proxy.highest_contiguous(), sn(1));
        assert_eq!(proxy.heartbeat(sn(1), sn(4)), vec![sn(2), sn(4)]);
        assert!(proxy.accept(sn(2)));
        assert_eq!(proxy.highest_contiguous(), sn(3));
    }

    #[test]
    fn test_heartbeat_skips_unavailable_changes() {
        let mut proxy = WriterProxy::new(GUID::UNKNOW, true);
        assert!(proxy.accept(sn(7)));
        assert_eq!(proxy.heartbeat(sn(6), sn(8)), vec![sn(6), sn(8)]);
        let mut proxy = WriterProxy::new(GUID::UNKNOW, true);
        assert!(proxy.accept(sn(6)));
        assert_eq!(proxy.heartbeat(sn(6), sn(6)), Vec::<SequenceNumber>::new());
        assert_eq!(proxy.highest_contiguous(), sn(6));
    }

    #[test]
    fn test_best_effort_drops_out_of_order() {
        let mut proxy = WriterProxy::new(GUID::UNKNOW, false);
        assert!(proxy.accept(sn(2)));
        assert!(!proxy.accept(sn(1)));
        assert!(proxy.accept(sn(5)));
    }

    #[test]
    fn test_reader_proxy_acks() {
        let mut proxy = ReaderProxy::new(GUID::UNKNOW, true, sn(3));
        assert!(proxy.is_acked(sn(2)));
        assert!(!proxy.is_acked(sn(3)));
        proxy.requested_changes_set(&[sn(1), sn(3), sn(4)]);
        proxy.acked_changes_set(sn(3));
        assert_eq!(proxy.take_requested(), vec![sn(4)]);
        assert!(proxy.take_requested().is_empty());
        proxy.acked_changes_set(sn(1));
        assert_eq!(proxy.acked_upto(), sn(3));
    }
}

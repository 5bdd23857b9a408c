//! communication statuses of DDS entities
//!
//! DDS v1.4 spec, 2.2.4.1 Communication Status

use crate::dds::qos::QosPolicyId;
use crate::structure::GUID;
use enumflags2::{bitflags, BitFlags};

/// DDS v1.4 spec, 2.3.3 DCPS PSM : IDL, StatusKind
#[bitflags]
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    InconsistentTopic = 0x01 << 0,
    OfferedIncompatibleQos = 0x01 << 5,
    RequestedIncompatibleQos = 0x01 << 6,
    DataAvailable = 0x01 << 10,
    PublicationMatched = 0x01 << 13,
    SubscriptionMatched = 0x01 << 14,
    /// participant discovered or lost, not part of the DDS standard mask
    ParticipantDiscovery = 0x01 << 16,
}

/// set of statuses a listener is interested in
pub type StatusMask = BitFlags<StatusKind>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicationMatchedStatus {
    pub total_count: i32,
    pub total_count_change: i32,
    pub current_count: i32,
    pub current_count_change: i32,
    pub last_subscription_handle: GUID,
}

impl Default for PublicationMatchedStatus {
    fn default() -> Self {
        Self {
            total_count: 0,
            total_count_change: 0,
            current_count: 0,
            current_count_change: 0,
            last_subscription_handle: GUID::UNKNOW,
        }
    }
}

impl PublicationMatchedStatus {
    /// record a new match and return the status as the listener sees it
    pub(crate) fn matched(&mut self, remote: GUID) -> Self {
        self.total_count += 1;
        self.total_count_change += 1;
        self.current_count += 1;
        self.current_count_change += 1;
        self.last_subscription_handle = remote;
        Self {
            total_count_change: 1,
            current_count_change: 1,
            ..*self
        }
    }

    pub(crate) fn unmatched(&mut self, remote: GUID) -> Self {
        self.current_count -= 1;
        self.current_count_change -= 1;
        self.last_subscription_handle = remote;
        Self {
            total_count_change: 0,
            current_count_change: -1,
            ..*self
        }
    }

    /// read the status and reset its change counters
    pub(crate) fn take(&mut self) -> Self {
        let status = *self;
        self.total_count_change = 0;
        self.current_count_change = 0;
        status
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionMatchedStatus {
    pub total_count: i32,
    pub total_count_change: i32,
    pub current_count: i32,
    pub current_count_change: i32,
    pub last_publication_handle: GUID,
}

impl Default for SubscriptionMatchedStatus {
    fn default() -> Self {
        Self {
            total_count: 0,
            total_count_change: 0,
            current_count: 0,
            current_count_change: 0,
            last_publication_handle: GUID::UNKNOW,
        }
    }
}

impl SubscriptionMatchedStatus {
    pub(crate) fn matched(&mut self, remote: GUID) -> Self {
        self.total_count += 1;
        self.total_count_change += 1;
        self.current_count += 1;
        self.current_count_change += 1;
        self.last_publication_handle = remote;
        Self {
            total_count_change: 1,
            current_count_change: 1,
            ..*self
        }
    }

    pub(crate) fn unmatched(&mut self, remote: GUID) -> Self {
        self.current_count -= 1;
        self.current_count_change -= 1;
        self.last_publication_handle = remote;
        Self {
            total_count_change: 0,
            current_count_change: -1,
            ..*self
        }
    }

    pub(crate) fn take(&mut self) -> Self {
        let status = *self;
        self.total_count_change = 0;
        self.current_count_change = 0;
        status
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QosPolicyCount {
    pub policy_id: QosPolicyId,
    pub count: i32,
}

/// OFFERED_INCOMPATIBLE_QOS on writers, REQUESTED_INCOMPATIBLE_QOS on readers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncompatibleQosStatus {
    pub total_count: i32,
    pub total_count_change: i32,
    pub last_policy_id: Option<QosPolicyId>,
    pub policies: Vec<QosPolicyCount>,
}

pub type OfferedIncompatibleQosStatus = IncompatibleQosStatus;
pub type RequestedIncompatibleQosStatus = IncompatibleQosStatus;

impl IncompatibleQosStatus {
    pub(crate) fn record(&mut self, failed: &[QosPolicyId]) -> Self {
        self.total_count += 1;
        self.total_count_change += 1;
        for id in failed {
            match self.policies.iter_mut().find(|c| c.policy_id == *id) {
                Some(c) => c.count += 1,
                None => self.policies.push(QosPolicyCount {
                    policy_id: *id,
                    count: 1,
                }),
            }
        }
        self.last_policy_id = failed.first().copied().or(self.last_policy_id);
        Self {
            total_count_change: 1,
            ..self.clone()
        }
    }

    pub(crate) fn take(&mut self) -> Self {
        let status = self.clone();
        self.total_count_change = 0;
        status
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InconsistentTopicStatus {
    pub total_count: i32,
    pub total_count_change: i32,
}

impl InconsistentTopicStatus {
    pub(crate) fn record(&mut self) -> Self {
        self.total_count += 1;
        self.total_count_change += 1;
        Self {
            total_count: self.total_count,
            total_count_change: 1,
        }
    }

    pub(crate) fn take(&mut self) -> Self {
        let status = *self;
        self.total_count_change = 0;
        status
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_matched_counters() {
        let remote = GUID::UNKNOW;
        let mut status = PublicationMatchedStatus::default();
        let first = status.matched(remote);
        assert_eq!((first.total_count, first.current_count), (1, 1));
        let second = status.matched(remote);
        assert_eq!(second.current_count_change, 1);
        let gone = status.unmatched(remote);
        assert_eq!((gone.total_count, gone.current_count), (2, 1));
        assert_eq!(gone.current_count_change, -1);

        let read = status.take();
        assert_eq!(read.total_count_change, 2);
        assert_eq!(read.current_count_change, 1);
        let again = status.take();
        assert_eq!((again.total_count_change, again.current_count_change), (0, 0));
    }

    #[test]
    fn test_incompatible_counters() {
        let mut status = IncompatibleQosStatus::default();
        status.record(&[QosPolicyId::Reliability]);
        let s = status.record(&[QosPolicyId::Durability, QosPolicyId::Reliability]);
        assert_eq!(s.total_count, 2);
        assert_eq!(s.last_policy_id, Some(QosPolicyId::Durability));
        assert_eq!(
            s.policies,
            vec![
                QosPolicyCount {
                    policy_id: QosPolicyId::Reliability,
                    count: 2
                },
                QosPolicyCount {
                    policy_id: QosPolicyId::Durability,
                    count: 1
                },
            ]
        );
    }
}

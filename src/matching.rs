//! QoS-mediated matching between writers and readers
//!
//! [`evaluate`] decides what a (writer, reader) pair is to each other, and
//! [`MatchTable`] keeps the resulting Match Records of one participant and turns
//! verdict changes into the events its local endpoints are notified of.

use crate::dds::qos::QosPolicyId;
use crate::discovery::structure::data::{DiscoveredReaderData, DiscoveredWriterData};
use crate::structure::{GuidPrefix, GUID};
use alloc::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};
use log::debug;

/// discovery data of a writer or a reader, local or remote
#[derive(Clone, Debug, PartialEq)]
pub enum EndpointData {
    Writer(DiscoveredWriterData),
    Reader(DiscoveredReaderData),
}

impl EndpointData {
    pub fn guid(&self) -> GUID {
        match self {
            Self::Writer(w) => w.guid,
            Self::Reader(r) => r.guid,
        }
    }

    pub fn topic_name(&self) -> &str {
        match self {
            Self::Writer(w) => &w.topic_name,
            Self::Reader(r) => &r.topic_name,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Writer(w) => &w.type_name,
            Self::Reader(r) => &r.type_name,
        }
    }

    pub fn is_writer(&self) -> bool {
        matches!(self, Self::Writer(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// every shared policy is compatible
    Compatible,
    /// ids of the incompatible policies, endpoint policies first then group policies
    Incompatible(Vec<QosPolicyId>),
    /// same topic name, different type name
    InconsistentTopic,
    /// not a writer/reader pair on the same topic
    Unrelated,
}

/// decide the relation of a local endpoint to another endpoint
pub fn evaluate(local: &EndpointData, remote: &EndpointData) -> Verdict {
    let (writer, reader) = match (local, remote) {
        (EndpointData::Writer(w), EndpointData::Reader(r))
        | (EndpointData::Reader(r), EndpointData::Writer(w)) => (w, r),
        _ => return Verdict::Unrelated,
    };
    if writer.topic_name != reader.topic_name {
        return Verdict::Unrelated;
    }
    if writer.type_name != reader.type_name {
        return Verdict::InconsistentTopic;
    }
    let mut failed = match writer.qos.is_compatible(&reader.qos) {
        Ok(()) => Vec::new(),
        Err(ids) => ids,
    };
    if let Err(ids) = writer.publisher_qos.is_compatible(&reader.subscriber_qos) {
        failed.extend(ids);
    }
    if failed.is_empty() {
        Verdict::Compatible
    } else {
        Verdict::Incompatible(failed)
    }
}

/// a compatible (local, remote) endpoint pair
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    pub local: GUID,
    pub remote: GUID,
    pub matched_at: DateTime<Utc>,
    /// remote QoS the match was last checked against
    pub remote_data: EndpointData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    Matched {
        local: GUID,
        remote: GUID,
    },
    Unmatched {
        local: GUID,
        remote: GUID,
    },
    Incompatible {
        local: GUID,
        remote: GUID,
        policies: Vec<QosPolicyId>,
    },
    InconsistentTopic {
        local: GUID,
        remote: GUID,
    },
}

#[derive(Default)]
pub struct MatchTable {
    records: BTreeMap<(GUID, GUID), MatchRecord>,
    // last reported incompatible policy set of a pair
    incompatible: BTreeMap<(GUID, GUID), Vec<QosPolicyId>>,
    inconsistent: BTreeSet<(GUID, GUID)>,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// record the verdict on (local, remote) and return what changed
    ///
    /// an already reported verdict produces no event.
    pub fn apply(
        &mut self,
        local: GUID,
        remote: &EndpointData,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) -> Vec<MatchEvent> {
        let key = (local, remote.guid());
        let mut events = Vec::new();
        match verdict {
            Verdict::Compatible => {
                self.incompatible.remove(&key);
                self.inconsistent.remove(&key);
                match self.records.get_mut(&key) {
                    Some(record) => record.remote_data = remote.clone(),
                    None => {
                        debug!("new match\n\tlocal: {}\n\tremote: {}", key.0, key.1);
                        self.records.insert(
                            key,
                            MatchRecord {
                                local,
                                remote: key.1,
                                matched_at: now,
                                remote_data: remote.clone(),
                            },
                        );
                        events.push(MatchEvent::Matched {
                            local,
                            remote: key.1,
                        });
                    }
                }
            }
            Verdict::Incompatible(policies) => {
                self.inconsistent.remove(&key);
                if self.records.remove(&key).is_some() {
                    events.push(MatchEvent::Unmatched {
                        local,
                        remote: key.1,
                    });
                }
                if self.incompatible.get(&key) != Some(&policies) {
                    debug!(
                        "incompatible QoS\n\tlocal: {}\n\tremote: {}\n\tpolicies: {:?}",
                        key.0, key.1, policies
                    );
                    self.incompatible.insert(key, policies.clone());
                    events.push(MatchEvent::Incompatible {
                        local,
                        remote: key.1,
                        policies,
                    });
                }
            }
            Verdict::InconsistentTopic => {
                self.incompatible.remove(&key);
                if self.records.remove(&key).is_some() {
                    events.push(MatchEvent::Unmatched {
                        local,
                        remote: key.1,
                    });
                }
                if self.inconsistent.insert(key) {
                    events.push(MatchEvent::InconsistentTopic {
                        local,
                        remote: key.1,
                    });
                }
            }
            Verdict::Unrelated => {
                if self.records.remove(&key).is_some() {
                    events.push(MatchEvent::Unmatched {
                        local,
                        remote: key.1,
                    });
                }
            }
        }
        events
    }

    /// forget a deleted local endpoint
    pub fn remove_local(&mut self, local: GUID) -> Vec<MatchRecord> {
        self.incompatible.retain(|(l, _), _| *l != local);
        self.inconsistent.retain(|(l, _)| *l != local);
        let keys: Vec<(GUID, GUID)> = self
            .records
            .range((local, GUID::UNKNOW)..)
            .take_while(|((l, _), _)| *l == local)
            .map(|(k, _)| *k)
            .collect();
        keys.iter()
            .filter_map(|k| self.records.remove(k))
            .collect()
    }

    /// forget every pair with `remote` that matches `filter`
    fn remove_remotes<F: Fn(&GUID) -> bool>(&mut self, filter: F) -> Vec<MatchEvent> {
        self.incompatible.retain(|(_, r), _| !filter(r));
        self.inconsistent.retain(|(_, r)| !filter(r));
        let keys: Vec<(GUID, GUID)> = self
            .records
            .keys()
            .filter(|(_, r)| filter(r))
            .copied()
            .collect();
        keys.into_iter()
            .filter_map(|k| self.records.remove(&k))
            .map(|r| MatchEvent::Unmatched {
                local: r.local,
                remote: r.remote,
            })
            .collect()
    }

    /// the remote endpoint is disposed or deleted
    pub fn remove_remote(&mut self, remote: GUID) -> Vec<MatchEvent> {
        self.remove_remotes(|r| *r == remote)
    }

    /// every endpoint of the remote participant is gone
    pub fn remove_remote_participant(&mut self, guid_prefix: GuidPrefix) -> Vec<MatchEvent> {
        self.remove_remotes(|r| r.guid_prefix == guid_prefix)
    }

    pub fn records_of(&self, local: GUID) -> Vec<&MatchRecord> {
        self.records
            .range((local, GUID::UNKNOW)..)
            .take_while(|((l, _), _)| *l == local)
            .map(|(_, r)| r)
            .collect()
    }

    pub fn get(&self, local: GUID, remote: GUID) -> Option<&MatchRecord> {
        self.records.get(&(local, remote))
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dds::qos::{
        policy::{Durability, Partition, Reliability},
        DataReaderQosBuilder, DataWriterQosBuilder, PublisherQosBuilder, SubscriberQosBuilder,
    };
    use crate::structure::{EntityId, EntityKind, TopicKind};

    fn guid(p: u8, key: u8, kind: EntityKind) -> GUID {
        GUID::new(
            GuidPrefix {
                guid_prefix: [p; 12],
            },
            EntityId::new([0, 3, key], kind),
        )
    }

    fn writer(reliability: Reliability) -> EndpointData {
        EndpointData::Writer(DiscoveredWriterData {
            guid: guid(1, 0, EntityKind::writer(TopicKind::NoKey)),
            topic_name: "T".to_string(),
            type_name: "X".to_string(),
            qos: DataWriterQosBuilder::new().reliability(reliability).build(),
            publisher_qos: PublisherQosBuilder::new().build(),
        })
    }

    fn reader(reliability: Reliability, type_name: &str) -> EndpointData {
        EndpointData::Reader(DiscoveredReaderData {
            guid: guid(2, 1, EntityKind::reader(TopicKind::NoKey)),
            topic_name: "T".to_string(),
            type_name: type_name.to_string(),
            qos: DataReaderQosBuilder::new().reliability(reliability).build(),
            subscriber_qos: SubscriberQosBuilder::new().build(),
        })
    }

    #[test]
    fn test_evaluate() {
        let reliable = Reliability::default_reliable();
        let best_effort = Reliability::default_besteffort();
        assert_eq!(
            evaluate(&writer(reliable), &reader(best_effort, "X")),
            Verdict::Compatible
        );
        assert_eq!(
            evaluate(&reader(best_effort, "X"), &writer(reliable)),
            Verdict::Compatible
        );
        assert_eq!(
            evaluate(&writer(best_effort), &reader(reliable, "X")),
            Verdict::Incompatible(vec![QosPolicyId::Reliability])
        );
        assert_eq!(
            evaluate(&writer(reliable), &reader(reliable, "Y")),
            Verdict::InconsistentTopic
        );
        assert_eq!(
            evaluate(&writer(reliable), &writer(reliable)),
            Verdict::Unrelated
        );
    }

    #[test]
    fn test_group_policies_are_checked() {
        let w = match writer(Reliability::default_reliable()) {
            EndpointData::Writer(mut w) => {
                w.qos.set_durability(Durability::Volatile);
                w.publisher_qos = PublisherQosBuilder::new()
                    .partition(Partition {
                        name: vec!["a".to_string()],
                    })
                    .build();
                EndpointData::Writer(w)
            }
            _ => unreachable!(),
        };
        let r = match reader(Reliability::default_besteffort(), "X") {
            EndpointData::Reader(mut r) => {
                r.qos.set_durability(Durability::TransientLocal);
                EndpointData::Reader(r)
            }
            _ => unreachable!(),
        };
        assert_eq!(
            evaluate(&w, &r),
            Verdict::Incompatible(vec![QosPolicyId::Durability, QosPolicyId::Partition])
        );
    }

    #[test]
    fn test_incompatible_is_reported_once() {
        let mut table = MatchTable::new();
        let w = writer(Reliability::default_besteffort());
        let r = reader(Reliability::default_reliable(), "X");
        let verdict = evaluate(&w, &r);
        let first = table.apply(w.guid(), &r, verdict.clone(), Utc::now());
        assert_eq!(first.len(), 1);
        assert!(table.apply(w.guid(), &r, verdict, Utc::now()).is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_match_then_break() {
        let mut table = MatchTable::new();
        let w = writer(Reliability::default_reliable());
        let r = reader(Reliability::default_besteffort(), "X");
        let events = table.apply(w.guid(), &r, Verdict::Compatible, Utc::now());
        assert_eq!(
            events,
            vec![MatchEvent::Matched {
                local: w.guid(),
                remote: r.guid()
            }]
        );
        assert!(table
            .apply(w.guid(), &r, Verdict::Compatible, Utc::now())
            .is_empty());
        assert_eq!(table.records_of(w.guid()).len(), 1);

        let events = table.apply(
            w.guid(),
            &r,
            Verdict::Incompatible(vec![QosPolicyId::Reliability]),
            Utc::now(),
        );
        assert_eq!(
            events,
            vec![
                MatchEvent::Unmatched {
                    local: w.guid(),
                    remote: r.guid()
                },
                MatchEvent::Incompatible {
                    local: w.guid(),
                    remote: r.guid(),
                    policies: vec![QosPolicyId::Reliability]
                }
            ]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_remote_participant() {
        let mut table = MatchTable::new();
        let w = writer(Reliability::default_reliable());
        let r = reader(Reliability::default_besteffort(), "X");
        table.apply(w.guid(), &r, Verdict::Compatible, Utc::now());
        table.apply(r.guid(), &w, Verdict::Compatible, Utc::now());
        let events = table.remove_remote_participant(r.guid().guid_prefix);
        assert_eq!(
            events,
            vec![MatchEvent::Unmatched {
                local: w.guid(),
                remote: r.guid()
            }]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.remove_local(r.guid()).len(), 1);
        assert!(table.is_empty());
    }
}

use crate::discovery::structure::data::{
    DiscoveredReaderData, DiscoveredWriterData, SPDPdiscoveredParticipantData,
};
use crate::matching::EndpointData;
use crate::structure::{GuidPrefix, GUID};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use awkernel_sync::{mcs::MCSNode, mutex::Mutex};
use core::time::Duration as CoreDuration;
use std::time::Instant;

/// liveliness of a remote participant as seen from here
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteParticipantState {
    /// one SPDP announcement received
    Discovered,
    /// heard from again after the discovery
    Alive,
    /// silent for longer than its lease
    Lost,
}

#[derive(Clone, Debug)]
pub struct RemoteParticipant {
    pub data: SPDPdiscoveredParticipantData,
    pub state: RemoteParticipantState,
    pub last_seen: Instant,
    pub lost_at: Option<Instant>,
    pub writers: BTreeMap<GUID, DiscoveredWriterData>,
    pub readers: BTreeMap<GUID, DiscoveredReaderData>,
}

impl RemoteParticipant {
    fn lease(&self) -> CoreDuration {
        // an infinite lease never expires
        self.data
            .lease_duration
            .to_core_duration()
            .unwrap_or(CoreDuration::MAX)
    }

    fn endpoints(&self) -> Vec<EndpointData> {
        self.writers
            .values()
            .cloned()
            .map(EndpointData::Writer)
            .chain(self.readers.values().cloned().map(EndpointData::Reader))
            .collect()
    }
}

/// what changed when a message of a participant was received
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heard {
    Unknown,
    Known,
    /// the participant was lost and is alive again
    Revived,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LeaseCheck {
    pub lost: Vec<GuidPrefix>,
    pub removed: Vec<GuidPrefix>,
}

/// remote participants and endpoints known to one participant
#[derive(Clone)]
pub struct DiscoveryDB {
    inner: Arc<Mutex<DiscoveryDBInner>>,
}

impl DiscoveryDB {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DiscoveryDBInner {
                participants: BTreeMap::new(),
            })),
        }
    }

    /// store SPDP data, returns true if the participant was unknown
    pub fn write_participant(&self, data: SPDPdiscoveredParticipantData, now: Instant) -> bool {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        let guid_prefix = data.guid.guid_prefix;
        match inner.participants.get_mut(&guid_prefix) {
            Some(p) => {
                p.data = data;
                false
            }
            None => {
                inner.participants.insert(
                    guid_prefix,
                    RemoteParticipant {
                        data,
                        state: RemoteParticipantState::Discovered,
                        last_seen: now,
                        lost_at: None,
                        writers: BTreeMap::new(),
                        readers: BTreeMap::new(),
                    },
                );
                true
            }
        }
    }

    /// refresh the lease of a participant that sent a message
    pub fn heard_from(&self, guid_prefix: GuidPrefix, now: Instant) -> Heard {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        match inner.participants.get_mut(&guid_prefix) {
            None => Heard::Unknown,
            Some(p) => {
                p.last_seen = now;
                match p.state {
                    RemoteParticipantState::Discovered => {
                        p.state = RemoteParticipantState::Alive;
                        Heard::Known
                    }
                    RemoteParticipantState::Alive => Heard::Known,
                    RemoteParticipantState::Lost => {
                        p.state = RemoteParticipantState::Alive;
                        p.lost_at = None;
                        Heard::Revived
                    }
                }
            }
        }
    }

    /// store SEDP data of an endpoint of a known participant
    ///
    /// returns true if the endpoint is new or its data changed; a periodic
    /// re-announcement of the same data returns false.
    pub fn write_endpoint(&self, data: EndpointData) -> bool {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        match inner.participants.get_mut(&data.guid().guid_prefix) {
            None => false,
            Some(p) => match data {
                EndpointData::Writer(w) => p.writers.insert(w.guid, w.clone()) != Some(w),
                EndpointData::Reader(r) => p.readers.insert(r.guid, r.clone()) != Some(r),
            },
        }
    }

    pub fn remove_endpoint(&self, guid: GUID) -> bool {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        match inner.participants.get_mut(&guid.guid_prefix) {
            None => false,
            Some(p) => p.writers.remove(&guid).is_some() || p.readers.remove(&guid).is_some(),
        }
    }

    pub fn remove_participant(&self, guid_prefix: GuidPrefix) -> Option<RemoteParticipant> {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        inner.participants.remove(&guid_prefix)
    }

    /// move silent participants to Lost, and drop the ones lost for one more lease
    pub fn check_leases(&self, now: Instant) -> LeaseCheck {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        let mut result = LeaseCheck::default();
        for (prefix, p) in inner.participants.iter_mut() {
            let lease = p.lease();
            match p.lost_at {
                None => {
                    if now.saturating_duration_since(p.last_seen) > lease {
                        p.state = RemoteParticipantState::Lost;
                        p.lost_at = Some(now);
                        result.lost.push(*prefix);
                    }
                }
                Some(lost_at) => {
                    if now.saturating_duration_since(lost_at) > lease {
                        result.removed.push(*prefix);
                    }
                }
            }
        }
        for prefix in &result.removed {
            inner.participants.remove(prefix);
        }
        result
    }

    /// endpoints of participants that are not lost
    pub fn live_endpoints(&self) -> Vec<EndpointData> {
        let mut node = MCSNode::new();
        let inner = self.inner.lock(&mut node);
        inner
            .participants
            .values()
            .filter(|p| p.state != RemoteParticipantState::Lost)
            .flat_map(|p| p.endpoints())
            .collect()
    }

    pub fn endpoints_of(&self, guid_prefix: GuidPrefix) -> Vec<EndpointData> {
        let mut node = MCSNode::new();
        let inner = self.inner.lock(&mut node);
        inner
            .participants
            .get(&guid_prefix)
            .map(|p| p.endpoints())
            .unwrap_or_default()
    }

    pub fn is_live(&self, guid_prefix: GuidPrefix) -> bool {
        self.state_of(guid_prefix)
            .map(|s| s != RemoteParticipantState::Lost)
            .unwrap_or(false)
    }

    pub fn state_of(&self, guid_prefix: GuidPrefix) -> Option<RemoteParticipantState> {
        let mut node = MCSNode::new();
        let inner = self.inner.lock(&mut node);
        inner.participants.get(&guid_prefix).map(|p| p.state)
    }

    pub fn participants(&self) -> Vec<SPDPdiscoveredParticipantData> {
        let mut node = MCSNode::new();
        let inner = self.inner.lock(&mut node);
        inner
            .participants
            .values()
            .filter(|p| p.state != RemoteParticipantState::Lost)
            .map(|p| p.data.clone())
            .collect()
    }
}

struct DiscoveryDBInner {
    participants: BTreeMap<GuidPrefix, RemoteParticipant>,
}

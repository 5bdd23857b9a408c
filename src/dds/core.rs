//! state shared by the handles and the threads of one DomainParticipant
//!
//! Every handle (`DomainParticipant`, `Topic`, `DataWriter`, ...) is an
//! `Arc<ParticipantCore>` plus the GUID of its entity. The entity tree and the
//! Match Table are guarded together by one mutex, and the condvar next to it
//! is signalled whenever a section that may have changed them ends.
//!
//! Lock order: factory table, then participant state, then DiscoveryDB.
//! Submessages produced inside a locked section are collected as [`Outgoing`]
//! and sent after the lock is released.

use crate::dds::{
    dispatcher::{DispatchItem, DispatchMsg, StatusEvent},
    lifecycle::{ChildSpec, DeletionMode, EntityBody, EntityNode, EntityTree, WriterBody},
    qos::{
        policy::Durability, DataReaderQosPolicies, DataWriterQosPolicies,
        DomainParticipantQosPolicies, PublisherQosPolicies, QosPolicySet, SubscriberQosPolicies,
        TopicQosPolicies,
    },
    status::StatusMask,
};
use crate::discovery::{
    discovery_db::DiscoveryDB,
    structure::data::{DiscoveredReaderData, DiscoveredWriterData, SPDPdiscoveredParticipantData},
    DiscoveryEvent,
};
use crate::error::{DdsError, DdsResult, IoError};
use crate::matching::{evaluate, EndpointData, MatchEvent, MatchTable, Verdict};
use crate::message::{
    submessage::{AckNack, Data, Heartbeat, SequenceNumber, Submessage},
    Message,
};
use crate::network::{Destination, Transport};
use crate::rtps::cache::{AddChangeError, CacheChange, HistoryCache};
use crate::structure::{DomainId, GuidPrefix, ReaderProxy, WriterProxy, GUID};
use alloc::collections::BTreeSet;
use alloc::sync::Arc;
use bytes::Bytes;
use chrono::Utc;
use core::cmp::max;
use core::time::Duration as CoreDuration;
use log::{debug, error, info, trace, warn};
use mio_extras::channel as mio_channel;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

// upper bound of one condvar wait when waiting without a deadline
const LONG_WAIT: CoreDuration = CoreDuration::from_secs(3600);

pub(crate) enum EventLoopCmd {
    /// send SPDP now and restart the announcement period
    AnnounceParticipant,
    Stop,
}

/// a submessage to send once the state lock is released
pub(crate) struct Outgoing {
    pub destination: Destination,
    pub submessage: Submessage,
}

impl Outgoing {
    pub fn multicast(submessage: Submessage) -> Self {
        Self {
            destination: Destination::Multicast,
            submessage,
        }
    }

    pub fn to(guid_prefix: GuidPrefix, submessage: Submessage) -> Self {
        Self {
            destination: Destination::Participant(guid_prefix),
            submessage,
        }
    }
}

fn sedp(data: EndpointData) -> Submessage {
    match data {
        EndpointData::Writer(w) => Submessage::Publication(w),
        EndpointData::Reader(r) => Submessage::Subscription(r),
    }
}

fn data_submessage(change: &CacheChange) -> Submessage {
    Submessage::Data(Data {
        writer_guid: change.writer_guid,
        sequence_number: change.sequence_number,
        source_timestamp: change.timestamp_nanos(),
        payload: change.data_value.to_vec(),
    })
}

/// HEARTBEAT of `writer` to one reliable reader
///
/// `available` is the oldest change still in the writer history.
fn heartbeat_for(
    writer: GUID,
    available: SequenceNumber,
    last: SequenceNumber,
    proxy: &ReaderProxy,
) -> Outgoing {
    Outgoing::to(
        proxy.remote_reader_guid.guid_prefix,
        Submessage::Heartbeat(Heartbeat {
            reader_guid: proxy.remote_reader_guid,
            writer_guid: writer,
            first_sn: max(available, proxy.first_relevant()),
            last_sn: last,
        }),
    )
}

fn oldest_available(writer: GUID, w: &WriterBody) -> SequenceNumber {
    w.history.min_seq_num(writer).unwrap_or(w.last_seq + 1)
}

/// octets of `submessage` once framed in a message
fn encoded_len(guid_prefix: GuidPrefix, submessage: Submessage) -> DdsResult<usize> {
    Ok(Message::new(guid_prefix, submessage).serialize()?.len())
}

pub(crate) struct ParticipantState {
    domain_id: DomainId,
    max_message_size: usize,
    pub tree: EntityTree,
    pub matches: MatchTable,
    dispatch: mio_channel::Sender<DispatchMsg>,
    commands: mio_channel::Sender<EventLoopCmd>,
}

impl ParticipantState {
    pub fn new(
        domain_id: DomainId,
        max_message_size: usize,
        tree: EntityTree,
        dispatch: mio_channel::Sender<DispatchMsg>,
        commands: mio_channel::Sender<EventLoopCmd>,
    ) -> Self {
        Self {
            domain_id,
            max_message_size,
            tree,
            matches: MatchTable::new(),
            dispatch,
            commands,
        }
    }

    pub fn dispatch(&self, target: GUID, event: StatusEvent) {
        if self
            .dispatch
            .send(DispatchMsg::Event(DispatchItem { target, event }))
            .is_err()
        {
            debug!("dispatcher is stopped, drop status event of {}", target);
        }
    }

    pub fn command(&self, cmd: EventLoopCmd) -> DdsResult<()> {
        self.commands.send(cmd).map_err(|_| {
            DdsError::Error(format!(
                "event loop of participant {} is stopped",
                self.tree.guid()
            ))
        })
    }

    fn stop_dispatcher(&self) {
        if self.dispatch.send(DispatchMsg::Stop).is_err() {
            debug!("dispatcher of {} is already stopped", self.tree.guid());
        }
    }

    pub fn spdp_data(&self) -> SPDPdiscoveredParticipantData {
        SPDPdiscoveredParticipantData::new(
            self.domain_id,
            self.tree.guid(),
            self.tree.qos.discovery_config().lease_duration,
            self.tree.qos.user_data(),
        )
    }

    /// discovery data of a local endpoint
    pub fn endpoint_data(&self, guid: GUID) -> Option<EndpointData> {
        let node = self.tree.get(guid).ok()?;
        match &node.body {
            EntityBody::DataWriter(w) => {
                let topic = self.tree.topic(w.topic).ok()?;
                let publisher = self.tree.publisher(node.parent).ok()?;
                Some(EndpointData::Writer(DiscoveredWriterData {
                    guid,
                    topic_name: topic.name.clone(),
                    type_name: topic.type_name.clone(),
                    qos: w.qos.clone(),
                    publisher_qos: publisher.qos.clone(),
                }))
            }
            EntityBody::DataReader(r) => {
                let topic = self.tree.topic(r.topic).ok()?;
                let subscriber = self.tree.subscriber(node.parent).ok()?;
                Some(EndpointData::Reader(DiscoveredReaderData {
                    guid,
                    topic_name: topic.name.clone(),
                    type_name: topic.type_name.clone(),
                    qos: r.qos.clone(),
                    subscriber_qos: subscriber.qos.clone(),
                }))
            }
            _ => None,
        }
    }

    /// unicast SPDP and the SEDP data of every enabled endpoint to a participant
    fn greet(&self, guid_prefix: GuidPrefix, out: &mut Vec<Outgoing>) {
        out.push(Outgoing::to(
            guid_prefix,
            Submessage::Participant(self.spdp_data()),
        ));
        for guid in self.tree.enabled_endpoints() {
            if let Some(data) = self.endpoint_data(guid) {
                out.push(Outgoing::to(guid_prefix, sedp(data)));
            }
        }
    }

    /// periodic multicast of SPDP and of the SEDP data of every enabled endpoint
    ///
    /// a peer that dropped this participant from its DiscoveryDB while this
    /// one kept it alive learns the endpoints again from the next announcement.
    pub fn announce(&self, out: &mut Vec<Outgoing>) {
        out.push(Outgoing::multicast(Submessage::Participant(
            self.spdp_data(),
        )));
        for guid in self.tree.enabled_endpoints() {
            if let Some(data) = self.endpoint_data(guid) {
                out.push(Outgoing::multicast(sedp(data)));
            }
        }
    }

    /// fail with `Unsupported` if the announcement of an endpoint doesn't fit in a message
    fn check_announcement(&self, data: &EndpointData) -> DdsResult<()> {
        let len = encoded_len(self.tree.guid().guid_prefix, sedp(data.clone()))?;
        if len > self.max_message_size {
            return Err(DdsError::Unsupported(format!(
                "announcement of {} takes {} octets, the message size limit is {}",
                data.guid(),
                len,
                self.max_message_size
            )));
        }
        Ok(())
    }

    /// checks a changed endpoint must pass before its new QoS is written
    fn check_candidate(&self, candidate: EndpointData) -> DdsResult<()> {
        self.check_matches(&candidate)?;
        self.check_announcement(&candidate)
    }

    // ---------------------------------------------------------------------
    // matching

    /// match an enabled local endpoint against every known endpoint
    pub fn match_local_endpoint(
        &mut self,
        guid: GUID,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) {
        let local = match self.endpoint_data(guid) {
            Some(d) => d,
            None => return,
        };
        for remote in discovery_db.live_endpoints() {
            let verdict = evaluate(&local, &remote);
            self.apply_verdict(guid, &remote, verdict, out);
        }
        for other in self.tree.enabled_endpoints() {
            if other == guid {
                continue;
            }
            if let Some(other_data) = self.endpoint_data(other) {
                let verdict = evaluate(&local, &other_data);
                self.apply_verdict(guid, &other_data, verdict, out);
                let verdict = evaluate(&other_data, &local);
                self.apply_verdict(other, &local, verdict, out);
            }
        }
    }

    /// match a remote endpoint against every enabled local endpoint
    pub fn match_remote_endpoint(&mut self, remote: &EndpointData, out: &mut Vec<Outgoing>) {
        for local in self.tree.enabled_endpoints() {
            if let Some(local_data) = self.endpoint_data(local) {
                let verdict = evaluate(&local_data, remote);
                self.apply_verdict(local, remote, verdict, out);
            }
        }
    }

    fn apply_verdict(
        &mut self,
        local: GUID,
        remote: &EndpointData,
        verdict: Verdict,
        out: &mut Vec<Outgoing>,
    ) {
        let events = self.matches.apply(local, remote, verdict, Utc::now());
        self.on_match_events(events, out);
    }

    fn on_match_events(&mut self, events: Vec<MatchEvent>, out: &mut Vec<Outgoing>) {
        for event in events {
            self.on_match_event(event, out);
        }
    }

    fn on_match_event(&mut self, event: MatchEvent, out: &mut Vec<Outgoing>) {
        match event {
            MatchEvent::Matched { local, remote } => {
                let remote_data = match self.matches.get(local, remote) {
                    Some(record) => record.remote_data.clone(),
                    None => return,
                };
                match remote_data {
                    EndpointData::Reader(reader) => self.add_reader_proxy(local, &reader, out),
                    EndpointData::Writer(writer) => self.add_writer_proxy(local, &writer),
                }
            }
            MatchEvent::Unmatched { local, remote } => {
                if local.entity_id.is_writer() {
                    if let Ok(w) = self.tree.writer_mut(local) {
                        w.reader_proxies.remove(&remote);
                        let status = w.publication_matched.unmatched(remote);
                        info!("Writer unmatched\n\tWriter: {}\n\tReader: {}", local, remote);
                        self.dispatch(local, StatusEvent::PublicationMatched(status));
                    }
                } else if let Ok(r) = self.tree.reader_mut(local) {
                    r.writer_proxies.remove(&remote);
                    let status = r.subscription_matched.unmatched(remote);
                    info!("Reader unmatched\n\tReader: {}\n\tWriter: {}", local, remote);
                    self.dispatch(local, StatusEvent::SubscriptionMatched(status));
                }
            }
            MatchEvent::Incompatible {
                local,
                remote,
                policies,
            } => {
                warn!(
                    "incompatible QoS\n\tlocal: {}\n\tremote: {}\n\tpolicies: {:?}",
                    local, remote, policies
                );
                if local.entity_id.is_writer() {
                    if let Ok(w) = self.tree.writer_mut(local) {
                        let status = w.offered_incompatible_qos.record(&policies);
                        self.dispatch(local, StatusEvent::OfferedIncompatibleQos(status));
                    }
                } else if let Ok(r) = self.tree.reader_mut(local) {
                    let status = r.requested_incompatible_qos.record(&policies);
                    self.dispatch(local, StatusEvent::RequestedIncompatibleQos(status));
                }
            }
            MatchEvent::InconsistentTopic { local, remote } => {
                let topic = if local.entity_id.is_writer() {
                    self.tree.writer(local).map(|w| w.topic)
                } else {
                    self.tree.reader(local).map(|r| r.topic)
                };
                if let Ok(topic) = topic {
                    if let Ok(t) = self.tree.topic_mut(topic) {
                        warn!(
                            "inconsistent topic '{}'\n\tlocal: {}\n\tremote: {}",
                            t.name, local, remote
                        );
                        let status = t.inconsistent_topic.record();
                        self.dispatch(topic, StatusEvent::InconsistentTopic(status));
                    }
                }
            }
        }
    }

    fn add_reader_proxy(
        &mut self,
        writer: GUID,
        reader: &DiscoveredReaderData,
        out: &mut Vec<Outgoing>,
    ) {
        let w = match self.tree.writer_mut(writer) {
            Ok(w) => w,
            Err(_) => return,
        };
        let reliable = w.qos.reliability().is_reliable() && reader.qos.reliability().is_reliable();
        // a durable reader also gets the changes written before the match
        let durable = w.qos.durability() != Durability::Volatile
            && reader.qos.durability() != Durability::Volatile;
        let first_relevant = if durable {
            oldest_available(writer, w)
        } else {
            w.last_seq + 1
        };
        let mut proxy = ReaderProxy::new(reader.guid, reliable, first_relevant);
        for change in w.history.changes_after(writer, first_relevant - 1) {
            out.push(Outgoing::to(
                reader.guid.guid_prefix,
                data_submessage(&change),
            ));
        }
        if !reliable {
            proxy.acked_changes_set(w.last_seq);
        } else if !proxy.is_acked(w.last_seq) {
            out.push(heartbeat_for(
                writer,
                oldest_available(writer, w),
                w.last_seq,
                &proxy,
            ));
        }
        w.reader_proxies.insert(reader.guid, proxy);
        let status = w.publication_matched.matched(reader.guid);
        info!(
            "Writer matched\n\tWriter: {}\n\tReader: {}\n\treliable: {}",
            writer, reader.guid, reliable
        );
        self.dispatch(writer, StatusEvent::PublicationMatched(status));
    }

    fn add_writer_proxy(&mut self, reader: GUID, writer: &DiscoveredWriterData) {
        let r = match self.tree.reader_mut(reader) {
            Ok(r) => r,
            Err(_) => return,
        };
        let reliable = r.qos.reliability().is_reliable();
        r.writer_proxies
            .insert(writer.guid, WriterProxy::new(writer.guid, reliable));
        let status = r.subscription_matched.matched(writer.guid);
        info!(
            "Reader matched\n\tReader: {}\n\tWriter: {}\n\treliable: {}",
            reader, writer.guid, reliable
        );
        self.dispatch(reader, StatusEvent::SubscriptionMatched(status));
    }

    // ---------------------------------------------------------------------
    // discovery

    pub fn on_discovery_event(
        &mut self,
        event: DiscoveryEvent,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) {
        let participant = self.tree.guid();
        match event {
            DiscoveryEvent::ParticipantDiscovered(data) => {
                self.greet(data.guid.guid_prefix, out);
                self.dispatch(participant, StatusEvent::ParticipantDiscovered(data));
            }
            DiscoveryEvent::ParticipantRevived(guid_prefix) => {
                for remote in discovery_db.endpoints_of(guid_prefix) {
                    self.match_remote_endpoint(&remote, out);
                }
                self.greet(guid_prefix, out);
            }
            DiscoveryEvent::ParticipantLost(guid_prefix) => {
                let events = self.matches.remove_remote_participant(guid_prefix);
                self.on_match_events(events, out);
                self.dispatch(participant, StatusEvent::ParticipantLost(guid_prefix));
            }
            DiscoveryEvent::ParticipantRemoved {
                guid_prefix,
                was_lost,
            } => {
                let events = self.matches.remove_remote_participant(guid_prefix);
                self.on_match_events(events, out);
                if !was_lost {
                    self.dispatch(participant, StatusEvent::ParticipantLost(guid_prefix));
                }
            }
            DiscoveryEvent::EndpointChanged(data) => self.match_remote_endpoint(&data, out),
            DiscoveryEvent::EndpointRemoved(guid) => {
                let events = self.matches.remove_remote(guid);
                self.on_match_events(events, out);
            }
        }
    }

    // ---------------------------------------------------------------------
    // lifecycle

    pub fn create_child(
        &mut self,
        parent: GUID,
        spec: ChildSpec,
        mask: StatusMask,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<GUID> {
        let guid = self.tree.create_child(parent, spec, mask)?;
        if let Some(data) = self.endpoint_data(guid) {
            if let Err(e) = self.check_announcement(&data) {
                // never announced nor matched yet
                let mut removed = Vec::new();
                if let Err(undo) = self.tree.delete_child(guid, DeletionMode::Single, &mut removed) {
                    error!("failed to drop the rejected endpoint {}: {}", guid, undo);
                }
                return Err(e);
            }
        }
        if self.tree.is_enabled(guid) {
            self.on_enabled(guid, discovery_db, out);
        }
        Ok(guid)
    }

    /// announce a newly enabled (or changed) endpoint and match it
    fn on_enabled(&mut self, guid: GUID, discovery_db: &DiscoveryDB, out: &mut Vec<Outgoing>) {
        if let Some(data) = self.endpoint_data(guid) {
            debug!(
                "announce endpoint\n\tEndpoint: {}\n\ttopic: {}",
                guid,
                data.topic_name()
            );
            out.push(Outgoing::multicast(sedp(data)));
            self.match_local_endpoint(guid, discovery_db, out);
        }
    }

    /// enable an entity; an enabled group with autoenable also enables its children
    pub fn enable(
        &mut self,
        guid: GUID,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<()> {
        let autoenable = match self.tree.get(guid).map(|n| &n.body) {
            Ok(EntityBody::Publisher(p)) => p.qos.entity_factory().autoenable_created_entities,
            Ok(EntityBody::Subscriber(s)) => s.qos.entity_factory().autoenable_created_entities,
            _ => false,
        };
        if !self.tree.is_enabled(guid) {
            let mut to_announce = vec![guid];
            if autoenable {
                to_announce.extend(self.tree.children_of(guid));
            }
            for endpoint in to_announce {
                if let Some(data) = self.endpoint_data(endpoint) {
                    self.check_announcement(&data)?;
                }
            }
        }
        if !self.tree.enable(guid)? {
            return Ok(());
        }
        self.on_enabled(guid, discovery_db, out);
        if autoenable {
            for child in self.tree.children_of(guid) {
                self.enable(child, discovery_db, out)?;
            }
        }
        Ok(())
    }

    pub fn delete(
        &mut self,
        guid: GUID,
        mode: DeletionMode,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<()> {
        let mut removed = Vec::new();
        let result = self.tree.delete_child(guid, mode, &mut removed);
        self.forget(removed, out);
        result
    }

    pub fn delete_contained(&mut self, parent: GUID, out: &mut Vec<Outgoing>) -> DdsResult<()> {
        let mut removed = Vec::new();
        let result = self.tree.delete_contained(parent, &mut removed);
        self.forget(removed, out);
        result
    }

    /// drop the Match Records of deleted endpoints and dispose them
    fn forget(&mut self, removed: Vec<EntityNode>, out: &mut Vec<Outgoing>) {
        for node in removed {
            if !matches!(
                node.body,
                EntityBody::DataWriter(_) | EntityBody::DataReader(_)
            ) {
                continue;
            }
            let records = self.matches.remove_local(node.guid);
            debug!(
                "forget deleted endpoint\n\tEndpoint: {}\n\tmatches: {}",
                node.guid,
                records.len()
            );
            // local endpoints matched with it do not receive the dispose
            let events = self.matches.remove_remote(node.guid);
            self.on_match_events(events, out);
            if node.enabled {
                out.push(Outgoing::multicast(Submessage::EndpointDispose(node.guid)));
            }
        }
    }

    // ---------------------------------------------------------------------
    // QoS

    /// reject a QoS change that would break an established match of `candidate`
    fn check_matches(&self, candidate: &EndpointData) -> DdsResult<()> {
        for record in self.matches.records_of(candidate.guid()) {
            match evaluate(candidate, &record.remote_data) {
                Verdict::Compatible => (),
                verdict => {
                    return Err(DdsError::InconsistentPolicy(format!(
                        "the new QoS of {} breaks its match with {}: {:?}",
                        candidate.guid(),
                        record.remote,
                        verdict
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn set_participant_qos(&mut self, qos: DomainParticipantQosPolicies) -> DdsResult<()> {
        self.tree.check_alive()?;
        qos.validate()?;
        qos.check_immutable(&self.tree.qos)?;
        if qos.user_data().value.len() > self.max_message_size {
            return Err(DdsError::Unsupported(format!(
                "user_data of {} octets doesn't fit in a message",
                qos.user_data().value.len()
            )));
        }
        self.tree.qos = qos;
        self.command(EventLoopCmd::AnnounceParticipant)
    }

    pub fn set_topic_qos(&mut self, guid: GUID, qos: TopicQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        if self.tree.is_enabled(guid) {
            qos.check_immutable(&self.tree.topic(guid)?.qos)?;
        }
        self.tree.topic_mut(guid)?.qos = qos;
        Ok(())
    }

    pub fn set_publisher_qos(
        &mut self,
        guid: GUID,
        qos: PublisherQosPolicies,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<()> {
        qos.validate()?;
        if self.tree.is_enabled(guid) {
            qos.check_immutable(&self.tree.publisher(guid)?.qos)?;
        } else {
            self.tree.publisher(guid)?;
        }
        let writers = self.tree.children_of(guid);
        for writer in &writers {
            if let Some(EndpointData::Writer(mut data)) = self.endpoint_data(*writer) {
                data.publisher_qos = qos.clone();
                self.check_candidate(EndpointData::Writer(data))?;
            }
        }
        self.tree.publisher_mut(guid)?.qos = qos;
        for writer in writers {
            if self.tree.is_enabled(writer) {
                self.on_enabled(writer, discovery_db, out);
            }
        }
        Ok(())
    }

    pub fn set_subscriber_qos(
        &mut self,
        guid: GUID,
        qos: SubscriberQosPolicies,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<()> {
        qos.validate()?;
        if self.tree.is_enabled(guid) {
            qos.check_immutable(&self.tree.subscriber(guid)?.qos)?;
        } else {
            self.tree.subscriber(guid)?;
        }
        let readers = self.tree.children_of(guid);
        for reader in &readers {
            if let Some(EndpointData::Reader(mut data)) = self.endpoint_data(*reader) {
                data.subscriber_qos = qos.clone();
                self.check_candidate(EndpointData::Reader(data))?;
            }
        }
        self.tree.subscriber_mut(guid)?.qos = qos;
        for reader in readers {
            if self.tree.is_enabled(reader) {
                self.on_enabled(reader, discovery_db, out);
            }
        }
        Ok(())
    }

    pub fn set_writer_qos(
        &mut self,
        guid: GUID,
        qos: DataWriterQosPolicies,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<()> {
        qos.validate()?;
        let enabled = self.tree.is_enabled(guid);
        if enabled {
            qos.check_immutable(&self.tree.writer(guid)?.qos)?;
        } else {
            self.tree.writer(guid)?;
        }
        if let Some(EndpointData::Writer(mut data)) = self.endpoint_data(guid) {
            data.qos = qos.clone();
            self.check_candidate(EndpointData::Writer(data))?;
        }
        let w = self.tree.writer_mut(guid)?;
        if !enabled {
            w.history = HistoryCache::new(qos.history(), qos.resource_limits());
        }
        w.qos = qos;
        if enabled {
            self.on_enabled(guid, discovery_db, out);
        }
        Ok(())
    }

    pub fn set_reader_qos(
        &mut self,
        guid: GUID,
        qos: DataReaderQosPolicies,
        discovery_db: &DiscoveryDB,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<()> {
        qos.validate()?;
        let enabled = self.tree.is_enabled(guid);
        if enabled {
            qos.check_immutable(&self.tree.reader(guid)?.qos)?;
        } else {
            self.tree.reader(guid)?;
        }
        if let Some(EndpointData::Reader(mut data)) = self.endpoint_data(guid) {
            data.qos = qos.clone();
            self.check_candidate(EndpointData::Reader(data))?;
        }
        let r = self.tree.reader_mut(guid)?;
        if !enabled {
            r.cache = HistoryCache::new(qos.history(), qos.resource_limits());
        }
        r.qos = qos;
        if enabled {
            self.on_enabled(guid, discovery_db, out);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // user traffic

    /// store a new change and send it to the matched readers
    ///
    /// returns None if a KeepAll history is full of unacknowledged changes.
    fn try_write(
        &mut self,
        writer: GUID,
        payload: &Bytes,
        out: &mut Vec<Outgoing>,
    ) -> DdsResult<Option<SequenceNumber>> {
        if !self.tree.is_enabled(writer) {
            self.tree.writer(writer)?;
            return Err(DdsError::PreconditionNotMet(format!(
                "DataWriter {} is not enabled",
                writer
            )));
        }
        let w = self.tree.writer_mut(writer)?;
        let sn = w.last_seq + 1;
        let change = CacheChange::new(writer, sn, Utc::now(), payload.clone());
        let added = match w.history.add_change(change.clone()) {
            Err(AddChangeError::Full) => {
                let acked = w.acked_by_all_upto();
                w.history.remove_changes_upto(writer, acked);
                w.history.add_change(change.clone())
            }
            added => added,
        };
        match added {
            Ok(_) => (),
            Err(AddChangeError::Full) => return Ok(None),
            Err(AddChangeError::Duplicate) => {
                return Err(DdsError::Error(format!(
                    "history of {} already holds {}",
                    writer, sn
                )))
            }
        }
        w.last_seq = sn;
        trace!("write\n\tWriter: {}\n\tseq_num: {}", writer, sn);

        let data = data_submessage(&change);
        let destinations: BTreeSet<GuidPrefix> = w
            .reader_proxies
            .keys()
            .map(|g| g.guid_prefix)
            .collect();
        for guid_prefix in destinations {
            out.push(Outgoing::to(guid_prefix, data.clone()));
        }
        let available = oldest_available(writer, w);
        for proxy in w.reader_proxies.values_mut() {
            if proxy.reliable {
                out.push(heartbeat_for(writer, available, sn, proxy));
            } else {
                proxy.acked_changes_set(sn);
            }
        }
        Ok(Some(sn))
    }

    pub fn on_data(&mut self, data: Data) {
        let mut available = Vec::new();
        for (guid, r) in self.tree.readers_mut() {
            let proxy = match r.writer_proxies.get_mut(&data.writer_guid) {
                Some(p) => p,
                None => continue,
            };
            if !proxy.accept(data.sequence_number) {
                trace!(
                    "drop change\n\tReader: {}\n\tWriter: {}\n\tseq_num: {}",
                    guid,
                    data.writer_guid,
                    data.sequence_number
                );
                continue;
            }
            let change = CacheChange::from_nanos(
                data.writer_guid,
                data.sequence_number,
                data.source_timestamp,
                Bytes::from(data.payload.clone()),
            );
            match r.cache.add_change(change) {
                Ok(_) => available.push(*guid),
                Err(e) => warn!(
                    "reader history rejected a change\n\tReader: {}\n\tWriter: {}\n\tseq_num: {}\n\treason: {:?}",
                    guid, data.writer_guid, data.sequence_number, e
                ),
            }
        }
        for guid in available {
            self.dispatch(guid, StatusEvent::DataAvailable);
        }
    }

    pub fn on_heartbeat(&mut self, heartbeat: Heartbeat, out: &mut Vec<Outgoing>) {
        let r = match self.tree.reader_mut(heartbeat.reader_guid) {
            Ok(r) => r,
            Err(_) => return,
        };
        let proxy = match r.writer_proxies.get_mut(&heartbeat.writer_guid) {
            Some(p) if p.reliable => p,
            _ => return,
        };
        let missing = proxy.heartbeat(heartbeat.first_sn, heartbeat.last_sn);
        out.push(Outgoing::to(
            heartbeat.writer_guid.guid_prefix,
            Submessage::AckNack(AckNack {
                reader_guid: heartbeat.reader_guid,
                writer_guid: heartbeat.writer_guid,
                base: proxy.highest_contiguous(),
                missing,
            }),
        ));
    }

    pub fn on_acknack(&mut self, acknack: AckNack, out: &mut Vec<Outgoing>) {
        let w = match self.tree.writer_mut(acknack.writer_guid) {
            Ok(w) => w,
            Err(_) => return,
        };
        let proxy = match w.reader_proxies.get_mut(&acknack.reader_guid) {
            Some(p) => p,
            None => return,
        };
        proxy.acked_changes_set(acknack.base);
        proxy.requested_changes_set(&acknack.missing);
        for sn in proxy.take_requested() {
            if let Some(change) = w.history.get_change(acknack.writer_guid, sn) {
                trace!(
                    "resend change\n\tWriter: {}\n\tReader: {}\n\tseq_num: {}",
                    acknack.writer_guid,
                    acknack.reader_guid,
                    sn
                );
                out.push(Outgoing::to(
                    acknack.reader_guid.guid_prefix,
                    data_submessage(change),
                ));
            }
        }
    }

    /// periodic HEARTBEAT to every reliable reader with unacknowledged changes
    pub fn heartbeat_tick(&self, out: &mut Vec<Outgoing>) {
        for (guid, w) in self.tree.writers() {
            let available = oldest_available(*guid, w);
            for proxy in w
                .reader_proxies
                .values()
                .filter(|p| p.reliable && !p.is_acked(w.last_seq))
            {
                out.push(heartbeat_for(*guid, available, w.last_seq, proxy));
            }
        }
    }
}

struct Threads {
    event_loop: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

pub(crate) struct ParticipantCore {
    pub domain_id: DomainId,
    pub guid: GUID,
    pub transport: Arc<dyn Transport>,
    pub discovery_db: DiscoveryDB,
    state: Mutex<ParticipantState>,
    changed: Condvar,
    threads: Mutex<Threads>,
}

impl ParticipantCore {
    pub fn new(
        domain_id: DomainId,
        guid: GUID,
        transport: Arc<dyn Transport>,
        state: ParticipantState,
    ) -> Self {
        Self {
            domain_id,
            guid,
            transport,
            discovery_db: DiscoveryDB::new(),
            state: Mutex::new(state),
            changed: Condvar::new(),
            threads: Mutex::new(Threads {
                event_loop: None,
                dispatcher: None,
            }),
        }
    }

    fn poisoned(&self) -> DdsError {
        DdsError::Error(format!("state of participant {} is poisoned", self.guid))
    }

    pub fn lock(&self) -> DdsResult<MutexGuard<'_, ParticipantState>> {
        self.state.lock().map_err(|_| self.poisoned())
    }

    /// run `f` under the state lock, then wake the waiters and send what `f` produced
    pub fn with_state<R, F>(&self, f: F) -> DdsResult<R>
    where
        F: FnOnce(&mut ParticipantState, &mut Vec<Outgoing>) -> DdsResult<R>,
    {
        let mut out = Vec::new();
        let result = {
            let mut state = self.lock()?;
            f(&mut state, &mut out)
        };
        self.changed.notify_all();
        // the change is committed, a lost submessage is recovered by the
        // periodic announcements and heartbeats
        self.send(out);
        result
    }

    /// send every submessage, logging the ones that could not be sent
    pub fn send(&self, outgoing: Vec<Outgoing>) {
        for o in outgoing {
            let kind = o.submessage.kind_str();
            let result = Message::new(self.guid.guid_prefix, o.submessage)
                .serialize()
                .and_then(|bytes| {
                    if bytes.len() > self.transport.max_message_size() {
                        return Err(IoError::Transport(format!(
                            "{} of {} octets exceeds the message size limit",
                            kind,
                            bytes.len()
                        )));
                    }
                    self.transport
                        .send(self.domain_id, self.guid.guid_prefix, o.destination, bytes)
                });
            if let Err(e) = result {
                warn!("failed to send {} to {:?}: {}", kind, o.destination, e);
            }
        }
    }

    /// block until `done` holds, `max_wait` elapses, or `done` fails
    pub fn wait_until<F>(&self, max_wait: CoreDuration, what: &str, mut done: F) -> DdsResult<()>
    where
        F: FnMut(&ParticipantState) -> DdsResult<bool>,
    {
        let deadline = Instant::now().checked_add(max_wait);
        let mut state = self.lock()?;
        loop {
            if done(&state)? {
                return Ok(());
            }
            let now = Instant::now();
            let remaining = match deadline {
                Some(d) if d <= now => {
                    return Err(DdsError::Timeout(format!(
                        "{} within {:?}",
                        what, max_wait
                    )))
                }
                Some(d) => d - now,
                None => LONG_WAIT,
            };
            state = self
                .changed
                .wait_timeout(state, remaining)
                .map_err(|_| self.poisoned())?
                .0;
        }
    }

    /// write a change, blocking up to max_blocking_time while the history is full
    pub fn write(&self, writer: GUID, payload: Bytes) -> DdsResult<SequenceNumber> {
        let data = Submessage::Data(Data {
            writer_guid: writer,
            sequence_number: SequenceNumber::ZERO,
            source_timestamp: 0,
            payload: payload.to_vec(),
        });
        let len = encoded_len(self.guid.guid_prefix, data)?;
        if len > self.transport.max_message_size() {
            return Err(DdsError::BadParameter(format!(
                "a change of {} octets doesn't fit in a message of at most {} octets",
                payload.len(),
                self.transport.max_message_size()
            )));
        }
        let mut out = Vec::new();
        let mut state = self.lock()?;
        let max_blocking = state.tree.writer(writer)?.qos.reliability().max_blocking_time;
        let deadline = if max_blocking.is_infinite() {
            None
        } else {
            Instant::now().checked_add(max_blocking.to_core_duration().unwrap_or_default())
        };
        let sn = loop {
            if let Some(sn) = state.try_write(writer, &payload, &mut out)? {
                break sn;
            }
            let now = Instant::now();
            let remaining = match deadline {
                Some(d) if d <= now => {
                    return Err(DdsError::Timeout(format!(
                        "history of {} is full of unacknowledged changes",
                        writer
                    )))
                }
                Some(d) => d - now,
                None => LONG_WAIT,
            };
            debug!("history is full, wait for acknowledgments\n\tWriter: {}", writer);
            state = self
                .changed
                .wait_timeout(state, remaining)
                .map_err(|_| self.poisoned())?
                .0;
        };
        drop(state);
        self.changed.notify_all();
        self.send(out);
        Ok(sn)
    }

    pub fn set_threads(&self, event_loop: JoinHandle<()>, dispatcher: JoinHandle<()>) {
        match self.threads.lock() {
            Ok(mut threads) => {
                threads.event_loop = Some(event_loop);
                threads.dispatcher = Some(dispatcher);
            }
            Err(_) => error!("thread table of participant {} is poisoned", self.guid),
        }
    }

    /// announce the disposal of the participant and stop its threads
    ///
    /// the entity tree must already be marked deleted.
    pub fn shutdown(&self) {
        let dispose = Outgoing::multicast(Submessage::ParticipantDispose(self.guid.guid_prefix));
        self.send(vec![dispose]);
        self.transport.close(self.domain_id, self.guid.guid_prefix);
        match self.lock() {
            Ok(state) => {
                if let Err(e) = state.command(EventLoopCmd::Stop) {
                    debug!("{}", e);
                }
                state.stop_dispatcher();
            }
            Err(e) => error!("{}", e),
        }
        self.changed.notify_all();

        let (event_loop, dispatcher) = match self.threads.lock() {
            Ok(mut threads) => (threads.event_loop.take(), threads.dispatcher.take()),
            Err(_) => (None, None),
        };
        let current = thread::current().id();
        for handle in [event_loop, dispatcher].into_iter().flatten() {
            // a listener may delete its own participant from the dispatcher thread
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("participant").to_string();
            if handle.join().is_err() {
                error!("{} thread of {} panicked", name, self.guid);
            }
        }
        info!("participant shut down\n\tParticipant: {}", self.guid);
    }
}

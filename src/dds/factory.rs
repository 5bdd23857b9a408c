use crate::dds::{
    listener::DomainParticipantListener,
    participant::DomainParticipant,
    qos::{DomainParticipantQos, DomainParticipantQosPolicies, QosPolicySet},
    status::StatusMask,
};
use crate::error::{DdsError, DdsResult};
use crate::network::Transport;
use crate::structure::{DdsEntity, DomainId, GUID};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use awkernel_sync::rwlock::RwLock;
use core::sync::atomic::{AtomicU64, Ordering};
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::{SystemTime, UNIX_EPOCH};

/// largest domain id the RTPS port mapping can express
pub const MAX_DOMAIN_ID: DomainId = 232;
/// participant ids of one domain that fit in the RTPS port mapping
pub const MAX_PARTICIPANTS_PER_DOMAIN: usize = 120;

static FACTORY_SEQ: AtomicU64 = AtomicU64::new(0);

fn new_small_rng() -> SmallRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let seq = FACTORY_SEQ.fetch_add(1, Ordering::Relaxed);
    SmallRng::seed_from_u64(nanos ^ seq.rotate_left(32))
}

struct FactoryInner {
    participants: BTreeMap<GUID, DomainParticipant>,
    default_participant_qos: DomainParticipantQosPolicies,
    small_rng: SmallRng,
}

/// DDS DomainParticipantFactory
///
/// creates and deletes the DomainParticipants of one transport.
#[derive(Clone)]
pub struct DomainParticipantFactory {
    transport: Arc<dyn Transport>,
    inner: Arc<RwLock<FactoryInner>>,
}

impl DomainParticipantFactory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            inner: Arc::new(RwLock::new(FactoryInner {
                participants: BTreeMap::new(),
                default_participant_qos: DomainParticipantQosPolicies::default(),
                small_rng: new_small_rng(),
            })),
        }
    }

    fn check_participant_qos(&self, qos: &DomainParticipantQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        let user_data = qos.user_data().value.len();
        if user_data > self.transport.max_message_size() {
            return Err(DdsError::Unsupported(format!(
                "user_data of {} octets doesn't fit in a message of {} octets",
                user_data,
                self.transport.max_message_size()
            )));
        }
        Ok(())
    }

    pub fn create_participant(
        &self,
        domain_id: DomainId,
        qos: DomainParticipantQos,
        listener: Option<Arc<dyn DomainParticipantListener>>,
        mask: StatusMask,
    ) -> DdsResult<DomainParticipant> {
        if domain_id > MAX_DOMAIN_ID {
            return Err(DdsError::BadParameter(format!(
                "domain_id {} is larger than {}",
                domain_id, MAX_DOMAIN_ID
            )));
        }
        let mut inner = self.inner.write();
        let qos = match qos {
            DomainParticipantQos::Default => inner.default_participant_qos.clone(),
            DomainParticipantQos::Policies(q) => *q,
        };
        self.check_participant_qos(&qos)?;
        let in_domain = inner
            .participants
            .values()
            .filter(|dp| dp.domain_id() == domain_id)
            .count();
        if in_domain >= MAX_PARTICIPANTS_PER_DOMAIN {
            return Err(DdsError::Error(format!(
                "domain {} already has {} participants",
                domain_id, in_domain
            )));
        }
        let guid = loop {
            let guid = GUID::new_participant_guid(&mut inner.small_rng);
            if !inner.participants.contains_key(&guid) {
                break guid;
            }
        };
        let dp = DomainParticipant::new(
            domain_id,
            guid,
            qos,
            listener,
            mask,
            self.transport.clone(),
        )?;
        inner.participants.insert(guid, dp.clone());
        Ok(dp)
    }

    /// delete a participant which contains no entity
    pub fn delete_participant(&self, participant: &DomainParticipant) -> DdsResult<()> {
        let guid = participant.guid();
        {
            let mut inner = self.inner.write();
            if !inner.participants.contains_key(&guid) {
                return Err(DdsError::AlreadyDeleted(format!(
                    "participant {} is not registered",
                    guid
                )));
            }
            participant.core().with_state(|state, _| {
                state.tree.check_alive()?;
                if state.tree.has_children() {
                    return Err(DdsError::PreconditionNotMet(format!(
                        "participant {} still contains entities",
                        guid
                    )));
                }
                state.tree.mark_deleted();
                Ok(())
            })?;
            inner.participants.remove(&guid);
        }
        participant.core().shutdown();
        info!("deleted DomainParticipant\n\tParticipant: {}", guid);
        Ok(())
    }

    /// delete everything the participant contains, then the participant
    pub fn delete_participant_recursive(&self, participant: &DomainParticipant) -> DdsResult<()> {
        let contained = participant.delete_contained_entities();
        if let Err(e) = &contained {
            debug!(
                "recursive deletion of {} left entities behind: {}",
                participant.guid(),
                e
            );
        }
        let deleted = self.delete_participant(participant);
        contained.and(deleted)
    }

    /// a participant of `domain_id`, if there is any
    pub fn lookup_participant(&self, domain_id: DomainId) -> Option<DomainParticipant> {
        let inner = self.inner.read();
        inner
            .participants
            .values()
            .find(|dp| dp.domain_id() == domain_id)
            .cloned()
    }

    pub fn participants(&self) -> Vec<DomainParticipant> {
        self.inner.read().participants.values().cloned().collect()
    }

    pub fn get_default_participant_qos(&self) -> DomainParticipantQosPolicies {
        self.inner.read().default_participant_qos.clone()
    }

    pub fn set_default_participant_qos(&self, qos: DomainParticipantQosPolicies) -> DdsResult<()> {
        self.check_participant_qos(&qos)?;
        self.inner.write().default_participant_qos = qos;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dds::{
        listener::{
            DataReaderListener, DataWriterListener, PublisherListener, SubscriberListener,
            TopicListener,
        },
        qos::{
            policy::{Deadline, EntityFactory, Partition, Reliability, UserData},
            DataReaderQos, DataReaderQosBuilder, DataWriterQos, DataWriterQosBuilder,
            PublisherQos, PublisherQosBuilder, SubscriberQos, SubscriberQosBuilder, TopicQos,
            QosPolicyId,
        },
        status::{
            OfferedIncompatibleQosStatus, PublicationMatchedStatus,
            RequestedIncompatibleQosStatus, StatusKind,
        },
        DataReader, DataWriter,
    };
    use crate::message::submessage::SequenceNumber;
    use crate::network::MAX_MESSAGE_SIZE;
    use crate::discovery::structure::data::SPDPdiscoveredParticipantData;
    use crate::error::ReturnCode;
    use crate::network::LoopbackTransport;
    use crate::structure::{Duration, GuidPrefix, TopicKind};
    use std::sync::{mpsc, Mutex};
    use std::thread;
    use std::time::Duration as StdDuration;

    const RECV_TIMEOUT: StdDuration = StdDuration::from_secs(5);

    fn no_listener() -> StatusMask {
        StatusMask::empty()
    }

    struct WriterEvents {
        matched: Mutex<mpsc::Sender<PublicationMatchedStatus>>,
        incompatible: Mutex<mpsc::Sender<OfferedIncompatibleQosStatus>>,
    }

    impl DataWriterListener for WriterEvents {
        fn on_publication_matched(&self, _writer: &DataWriter, status: PublicationMatchedStatus) {
            let _ = self.matched.lock().unwrap().send(status);
        }
        fn on_offered_incompatible_qos(
            &self,
            _writer: &DataWriter,
            status: OfferedIncompatibleQosStatus,
        ) {
            let _ = self.incompatible.lock().unwrap().send(status);
        }
    }

    #[allow(clippy::type_complexity)]
    fn writer_events() -> (
        Arc<WriterEvents>,
        mpsc::Receiver<PublicationMatchedStatus>,
        mpsc::Receiver<OfferedIncompatibleQosStatus>,
    ) {
        let (matched, matched_rx) = mpsc::channel();
        let (incompatible, incompatible_rx) = mpsc::channel();
        (
            Arc::new(WriterEvents {
                matched: Mutex::new(matched),
                incompatible: Mutex::new(incompatible),
            }),
            matched_rx,
            incompatible_rx,
        )
    }

    struct ReaderEvents {
        incompatible: Mutex<mpsc::Sender<RequestedIncompatibleQosStatus>>,
    }

    impl DataReaderListener for ReaderEvents {
        fn on_requested_incompatible_qos(
            &self,
            _reader: &DataReader,
            status: RequestedIncompatibleQosStatus,
        ) {
            let _ = self.incompatible.lock().unwrap().send(status);
        }
    }

    enum Seen {
        Discovered(GuidPrefix),
        Lost(GuidPrefix),
    }

    struct ParticipantEvents {
        sender: Mutex<mpsc::Sender<Seen>>,
    }
    impl DataWriterListener for ParticipantEvents {}
    impl DataReaderListener for ParticipantEvents {}
    impl PublisherListener for ParticipantEvents {}
    impl SubscriberListener for ParticipantEvents {}
    impl TopicListener for ParticipantEvents {}
    impl DomainParticipantListener for ParticipantEvents {
        fn on_participant_discovered(
            &self,
            _participant: &DomainParticipant,
            data: &SPDPdiscoveredParticipantData,
        ) {
            let _ = self
                .sender
                .lock()
                .unwrap()
                .send(Seen::Discovered(data.guid.guid_prefix));
        }
        fn on_participant_lost(&self, _participant: &DomainParticipant, guid_prefix: GuidPrefix) {
            let _ = self.sender.lock().unwrap().send(Seen::Lost(guid_prefix));
        }
    }

    fn short_lease_qos() -> DomainParticipantQos {
        let mut qos = DomainParticipantQosPolicies::default();
        let mut discovery_config = qos.discovery_config();
        discovery_config.lease_duration = Duration::from_millis(300);
        discovery_config.announcement_period = Duration::from_millis(100);
        qos.set_discovery_config(discovery_config);
        DomainParticipantQos::Policies(Box::new(qos))
    }

    fn reliable_writer_qos() -> DataWriterQos {
        DataWriterQos::Policies(Box::new(
            DataWriterQosBuilder::new()
                .reliability(Reliability::default_reliable())
                .build(),
        ))
    }

    fn reader_qos(reliability: Reliability) -> DataReaderQos {
        DataReaderQos::Policies(Box::new(
            DataReaderQosBuilder::new().reliability(reliability).build(),
        ))
    }

    fn partition(names: &[&str]) -> Partition {
        Partition {
            name: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn test_domain_id_out_of_range() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let result = factory.create_participant(
            MAX_DOMAIN_ID + 1,
            DomainParticipantQos::Default,
            None,
            no_listener(),
        );
        assert_eq!(ReturnCode::from(&result), ReturnCode::BadParameter);
        assert!(factory.participants().is_empty());
    }

    #[test]
    fn test_oversized_user_data() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let mut qos = DomainParticipantQosPolicies::default();
        qos.set_user_data(UserData {
            value: vec![0; crate::network::MAX_MESSAGE_SIZE + 1],
        });
        assert!(matches!(
            factory.set_default_participant_qos(qos.clone()),
            Err(DdsError::Unsupported(_))
        ));
        let result = factory.create_participant(
            0,
            DomainParticipantQos::Policies(Box::new(qos)),
            None,
            no_listener(),
        );
        assert_eq!(ReturnCode::from(&result), ReturnCode::Unsupported);
    }

    #[test]
    fn test_delete_non_empty_participant() {
        let transport = Arc::new(LoopbackTransport::new());
        let factory = DomainParticipantFactory::new(transport.clone());
        let dp = factory
            .create_participant(3, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        assert_eq!(transport.open_count(3), 1);
        dp.create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        assert!(matches!(
            factory.delete_participant(&dp),
            Err(DdsError::PreconditionNotMet(_))
        ));
        assert!(dp.find_topic("T").is_some());

        factory.delete_participant_recursive(&dp).unwrap();
        assert_eq!(transport.open_count(3), 0);
        assert!(factory.lookup_participant(3).is_none());
        assert!(matches!(
            factory.delete_participant(&dp),
            Err(DdsError::AlreadyDeleted(_))
        ));
        assert!(matches!(
            dp.create_publisher(PublisherQos::Default, None, no_listener()),
            Err(DdsError::AlreadyDeleted(_))
        ));
    }

    #[test]
    fn test_reliable_writer_matches_remote_best_effort_reader() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp1 = factory
            .create_participant(0, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let dp2 = factory
            .create_participant(0, DomainParticipantQos::Default, None, no_listener())
            .unwrap();

        let topic1 = dp1
            .create_topic("Square", "ShapeType", TopicKind::WithKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let publisher = dp1
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap();
        let (listener, matched, _incompatible) = writer_events();
        let writer = publisher
            .create_datawriter(
                reliable_writer_qos(),
                &topic1,
                Some(listener),
                StatusKind::PublicationMatched.into(),
            )
            .unwrap();

        let topic2 = dp2
            .create_topic("Square", "ShapeType", TopicKind::WithKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let subscriber = dp2
            .create_subscriber(SubscriberQos::Default, None, no_listener())
            .unwrap();
        let reader = subscriber
            .create_datareader(
                reader_qos(Reliability::default_besteffort()),
                &topic2,
                None,
                no_listener(),
            )
            .unwrap();

        let status = matched.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(status.current_count, 1);
        assert_eq!(status.current_count_change, 1);
        assert_eq!(status.last_subscription_handle, reader.guid());

        let records = dp1.match_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].local, writer.guid());
        assert_eq!(records[0].remote, reader.guid());
        assert_eq!(writer.matched_subscriptions().unwrap(), vec![reader.guid()]);

        factory.delete_participant_recursive(&dp2).unwrap();
        let status = matched.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(status.current_count, 0);
        assert_eq!(status.current_count_change, -1);
        assert!(dp1.match_records().unwrap().is_empty());
        factory.delete_participant_recursive(&dp1).unwrap();
    }

    #[test]
    fn test_reliable_write_is_acknowledged() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp1 = factory
            .create_participant(1, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let dp2 = factory
            .create_participant(1, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic1 = dp1
            .create_topic("Chat", "Text", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let topic2 = dp2
            .create_topic("Chat", "Text", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let writer = dp1
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap()
            .create_datawriter(reliable_writer_qos(), &topic1, None, no_listener())
            .unwrap();
        let reader = dp2
            .create_subscriber(SubscriberQos::Default, None, no_listener())
            .unwrap()
            .create_datareader(
                reader_qos(Reliability::default_reliable()),
                &topic2,
                None,
                no_listener(),
            )
            .unwrap();
        let timeout = Duration::from_secs(5);
        writer.wait_for_matched_subscriptions(1, timeout).unwrap();
        reader.wait_for_matched_publications(1, timeout).unwrap();

        let sn = writer.write(b"hello").unwrap();
        writer.wait_for_acknowledgments(timeout).unwrap();
        let samples = reader.take().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].sequence_number, sn);
        assert_eq!(&samples[0].data_value[..], b"hello");
        assert!(reader.take().unwrap().is_empty());

        factory.delete_participant_recursive(&dp1).unwrap();
        factory.delete_participant_recursive(&dp2).unwrap();
    }

    #[test]
    fn test_incompatible_qos_is_notified_once() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp1 = factory
            .create_participant(2, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let dp2 = factory
            .create_participant(2, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic1 = dp1
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let topic2 = dp2
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let (listener, matched, incompatible) = writer_events();
        // best effort offered, reliable requested
        let writer = dp1
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap()
            .create_datawriter(
                DataWriterQos::Default,
                &topic1,
                Some(listener),
                StatusKind::PublicationMatched | StatusKind::OfferedIncompatibleQos,
            )
            .unwrap();
        dp2.create_subscriber(SubscriberQos::Default, None, no_listener())
            .unwrap()
            .create_datareader(
                reader_qos(Reliability::default_reliable()),
                &topic2,
                None,
                no_listener(),
            )
            .unwrap();

        let status = incompatible.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(status.total_count, 1);
        assert_eq!(
            status.last_policy_id,
            Some(crate::dds::qos::QosPolicyId::Reliability)
        );
        // a few SPDP periods later nothing more was reported
        thread::sleep(StdDuration::from_millis(500));
        assert!(incompatible.try_recv().is_err());
        assert!(matched.try_recv().is_err());
        assert_eq!(
            writer.get_offered_incompatible_qos_status().unwrap().total_count,
            1
        );
        assert!(dp1.match_records().unwrap().is_empty());

        factory.delete_participant_recursive(&dp1).unwrap();
        factory.delete_participant_recursive(&dp2).unwrap();
    }

    #[test]
    fn test_lost_participant() {
        let transport = Arc::new(LoopbackTransport::new());
        let factory = DomainParticipantFactory::new(transport.clone());
        let (sender, seen) = mpsc::channel();
        let listener = Arc::new(ParticipantEvents {
            sender: Mutex::new(sender),
        });
        let dp1 = factory
            .create_participant(
                4,
                DomainParticipantQos::Default,
                Some(listener),
                StatusKind::ParticipantDiscovery.into(),
            )
            .unwrap();
        let dp2 = factory
            .create_participant(4, short_lease_qos(), None, no_listener())
            .unwrap();
        let prefix2 = dp2.guid().guid_prefix;

        match seen.recv_timeout(RECV_TIMEOUT).unwrap() {
            Seen::Discovered(p) => assert_eq!(p, prefix2),
            Seen::Lost(p) => panic!("lost {} before discovering it", p),
        }
        assert_eq!(dp1.discovered_participants().len(), 1);

        transport.set_muted(prefix2, true);
        match seen.recv_timeout(RECV_TIMEOUT).unwrap() {
            Seen::Lost(p) => assert_eq!(p, prefix2),
            Seen::Discovered(p) => panic!("discovered {} again", p),
        }
        assert!(dp1.discovered_participants().is_empty());

        factory.delete_participant(&dp2).unwrap();
        factory.delete_participant(&dp1).unwrap();
    }

    #[test]
    fn test_wait_is_cancelled_by_delete() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp = factory
            .create_participant(5, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let publisher = dp
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap();
        let writer = publisher
            .create_datawriter(DataWriterQos::Default, &topic, None, no_listener())
            .unwrap();
        let waiting = writer.clone();
        let waiter = thread::spawn(move || {
            waiting.wait_for_matched_subscriptions(1, Duration::INFINITE)
        });
        thread::sleep(StdDuration::from_millis(100));
        publisher.delete_datawriter(&writer).unwrap();
        let result = waiter.join().unwrap();
        assert_eq!(ReturnCode::from(&result), ReturnCode::AlreadyDeleted);
        assert!(matches!(
            writer.write(b"late"),
            Err(DdsError::AlreadyDeleted(_))
        ));
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_immutable_policy_while_disabled() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp = factory
            .create_participant(6, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let publisher_qos = PublisherQosBuilder::new()
            .entity_factory(EntityFactory {
                autoenable_created_entities: false,
            })
            .build();
        let publisher = dp
            .create_publisher(
                PublisherQos::Policies(Box::new(publisher_qos)),
                None,
                no_listener(),
            )
            .unwrap();
        let writer = publisher
            .create_datawriter(DataWriterQos::Default, &topic, None, no_listener())
            .unwrap();
        assert!(matches!(
            writer.write(b"x"),
            Err(DdsError::PreconditionNotMet(_))
        ));

        let reliable = DataWriterQosBuilder::new()
            .reliability(Reliability::default_reliable())
            .build();
        writer.set_qos(reliable.clone()).unwrap();
        writer.enable().unwrap();
        assert_eq!(writer.get_qos().unwrap(), reliable);

        let best_effort = DataWriterQosBuilder::new()
            .reliability(Reliability::default_besteffort())
            .build();
        assert!(matches!(
            writer.set_qos(best_effort),
            Err(DdsError::ImmutablePolicy(_))
        ));
        assert_eq!(writer.get_qos().unwrap(), reliable);
        writer.write(b"x").unwrap();
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_removed_participant_is_matched_again() {
        let transport = Arc::new(LoopbackTransport::new());
        let factory = DomainParticipantFactory::new(transport.clone());
        let (sender, seen) = mpsc::channel();
        let listener = Arc::new(ParticipantEvents {
            sender: Mutex::new(sender),
        });
        let dp1 = factory
            .create_participant(
                7,
                DomainParticipantQos::Default,
                Some(listener),
                StatusKind::ParticipantDiscovery.into(),
            )
            .unwrap();
        let dp2 = factory
            .create_participant(7, short_lease_qos(), None, no_listener())
            .unwrap();
        let prefix2 = dp2.guid().guid_prefix;
        let topic1 = dp1
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let topic2 = dp2
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let writer = dp1
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap()
            .create_datawriter(DataWriterQos::Default, &topic1, None, no_listener())
            .unwrap();
        let reader = dp2
            .create_subscriber(SubscriberQos::Default, None, no_listener())
            .unwrap()
            .create_datareader(DataReaderQos::Default, &topic2, None, no_listener())
            .unwrap();
        let timeout = Duration::from_secs(5);
        writer.wait_for_matched_subscriptions(1, timeout).unwrap();
        assert!(matches!(
            seen.recv_timeout(RECV_TIMEOUT).unwrap(),
            Seen::Discovered(p) if p == prefix2
        ));

        // dp2 keeps hearing dp1, dp1 loses dp2 and forgets it one lease later
        transport.set_muted(prefix2, true);
        assert!(matches!(
            seen.recv_timeout(RECV_TIMEOUT).unwrap(),
            Seen::Lost(p) if p == prefix2
        ));
        assert!(dp1.match_records().unwrap().is_empty());
        thread::sleep(StdDuration::from_millis(700));
        transport.set_muted(prefix2, false);

        // discovered from scratch, so dp1 needs dp2's endpoints again
        assert!(matches!(
            seen.recv_timeout(RECV_TIMEOUT).unwrap(),
            Seen::Discovered(p) if p == prefix2
        ));
        writer.wait_for_matched_subscriptions(1, timeout).unwrap();
        assert_eq!(writer.matched_subscriptions().unwrap(), vec![reader.guid()]);
        assert_eq!(dp1.match_records().unwrap().len(), 1);
        assert_eq!(reader.matched_publications().unwrap(), vec![writer.guid()]);
        assert_eq!(dp2.match_records().unwrap().len(), 1);

        factory.delete_participant_recursive(&dp2).unwrap();
        factory.delete_participant_recursive(&dp1).unwrap();
    }

    #[test]
    fn test_oversized_endpoint_is_not_created() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp = factory
            .create_participant(8, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let publisher = dp
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap();
        let big = DataWriterQosBuilder::new()
            .user_data(UserData {
                value: vec![0; MAX_MESSAGE_SIZE + 1],
            })
            .build();
        let result = publisher.create_datawriter(
            DataWriterQos::Policies(Box::new(big.clone())),
            &topic,
            None,
            no_listener(),
        );
        assert_eq!(ReturnCode::from(&result), ReturnCode::Unsupported);
        assert!(publisher.lookup_datawriter("T").is_none());

        let writer = publisher
            .create_datawriter(DataWriterQos::Default, &topic, None, no_listener())
            .unwrap();
        let before = writer.get_qos().unwrap();
        assert!(matches!(
            writer.set_qos(big),
            Err(DdsError::Unsupported(_))
        ));
        assert_eq!(writer.get_qos().unwrap(), before);

        // nothing else uses the topic once the writer is gone
        publisher.delete_datawriter(&writer).unwrap();
        dp.delete_topic(&topic).unwrap();
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_oversized_write_keeps_sequence() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp = factory
            .create_participant(9, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let writer = dp
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap()
            .create_datawriter(reliable_writer_qos(), &topic, None, no_listener())
            .unwrap();
        let payload = vec![0u8; MAX_MESSAGE_SIZE];
        assert!(matches!(
            writer.write(&payload),
            Err(DdsError::BadParameter(_))
        ));
        assert_eq!(writer.write(b"small").unwrap(), SequenceNumber(1));
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_qos_change_breaking_a_match_is_rejected() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp = factory
            .create_participant(10, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let publisher = dp
            .create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap();
        let offered = DataWriterQosBuilder::new()
            .deadline(Deadline {
                period: Duration::from_millis(500),
            })
            .build();
        let writer = publisher
            .create_datawriter(
                DataWriterQos::Policies(Box::new(offered.clone())),
                &topic,
                None,
                no_listener(),
            )
            .unwrap();
        let requested = DataReaderQosBuilder::new()
            .deadline(Deadline {
                period: Duration::from_secs(1),
            })
            .build();
        let reader = dp
            .create_subscriber(SubscriberQos::Default, None, no_listener())
            .unwrap()
            .create_datareader(
                DataReaderQos::Policies(Box::new(requested)),
                &topic,
                None,
                no_listener(),
            )
            .unwrap();
        // endpoints of one participant are matched on creation
        assert_eq!(writer.matched_subscriptions().unwrap(), vec![reader.guid()]);

        let mut slower = offered.clone();
        slower.set_deadline(Deadline {
            period: Duration::from_secs(2),
        });
        assert!(matches!(
            writer.set_qos(slower),
            Err(DdsError::InconsistentPolicy(_))
        ));
        assert_eq!(writer.get_qos().unwrap(), offered);

        let publisher_qos = publisher.get_qos().unwrap();
        let other_partition = PublisherQosBuilder::new()
            .partition(partition(&["elsewhere"]))
            .build();
        assert!(matches!(
            publisher.set_qos(other_partition),
            Err(DdsError::InconsistentPolicy(_))
        ));
        assert_eq!(publisher.get_qos().unwrap(), publisher_qos);
        assert_eq!(writer.matched_subscriptions().unwrap(), vec![reader.guid()]);
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_mutable_qos_change_is_matched_again() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        let dp = factory
            .create_participant(11, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let writer = dp
            .create_publisher(
                PublisherQos::Policies(Box::new(
                    PublisherQosBuilder::new().partition(partition(&["a"])).build(),
                )),
                None,
                no_listener(),
            )
            .unwrap()
            .create_datawriter(DataWriterQos::Default, &topic, None, no_listener())
            .unwrap();
        let subscriber = dp
            .create_subscriber(
                SubscriberQos::Policies(Box::new(
                    SubscriberQosBuilder::new().partition(partition(&["b"])).build(),
                )),
                None,
                no_listener(),
            )
            .unwrap();
        let reader = subscriber
            .create_datareader(DataReaderQos::Default, &topic, None, no_listener())
            .unwrap();
        assert!(reader.matched_publications().unwrap().is_empty());
        assert_eq!(
            reader
                .get_requested_incompatible_qos_status()
                .unwrap()
                .last_policy_id,
            Some(QosPolicyId::Partition)
        );

        subscriber
            .set_qos(SubscriberQosBuilder::new().partition(partition(&["a"])).build())
            .unwrap();
        assert_eq!(reader.matched_publications().unwrap(), vec![writer.guid()]);
        assert_eq!(writer.matched_subscriptions().unwrap(), vec![reader.guid()]);
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_requested_incompatible_qos_is_notified_once() {
        let factory = DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()));
        // the writer side re-announces its endpoints every 100 ms
        let dp1 = factory
            .create_participant(12, short_lease_qos(), None, no_listener())
            .unwrap();
        let dp2 = factory
            .create_participant(12, DomainParticipantQos::Default, None, no_listener())
            .unwrap();
        let topic1 = dp1
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        let topic2 = dp2
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, no_listener())
            .unwrap();
        dp1.create_publisher(PublisherQos::Default, None, no_listener())
            .unwrap()
            .create_datawriter(DataWriterQos::Default, &topic1, None, no_listener())
            .unwrap();
        let (sender, incompatible) = mpsc::channel();
        let listener = Arc::new(ReaderEvents {
            incompatible: Mutex::new(sender),
        });
        let reader = dp2
            .create_subscriber(SubscriberQos::Default, None, no_listener())
            .unwrap()
            .create_datareader(
                reader_qos(Reliability::default_reliable()),
                &topic2,
                Some(listener),
                StatusKind::RequestedIncompatibleQos.into(),
            )
            .unwrap();

        let status = incompatible.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(status.total_count, 1);
        assert_eq!(status.last_policy_id, Some(QosPolicyId::Reliability));
        thread::sleep(StdDuration::from_millis(500));
        assert!(incompatible.try_recv().is_err());
        assert_eq!(
            reader
                .get_requested_incompatible_qos_status()
                .unwrap()
                .total_count,
            1
        );
        assert!(reader.matched_publications().unwrap().is_empty());

        factory.delete_participant_recursive(&dp1).unwrap();
        factory.delete_participant_recursive(&dp2).unwrap();
    }
}

use crate::dds::{
    core::{EventLoopCmd, ParticipantCore, ParticipantState},
    dispatcher::Dispatcher,
    event_loop::EventLoop,
    lifecycle::{ChildSpec, DeletionMode, EntityTree},
    listener::{DomainParticipantListener, PublisherListener, SubscriberListener, TopicListener},
    publisher::Publisher,
    qos::{
        DomainParticipantQosPolicies, PublisherQos, PublisherQosPolicies, QosPolicySet,
        SubscriberQos, SubscriberQosPolicies, TopicQos, TopicQosPolicies,
    },
    status::StatusMask,
    subscriber::Subscriber,
    topic::Topic,
};
use crate::discovery::structure::data::SPDPdiscoveredParticipantData;
use crate::error::{DdsError, DdsResult};
use crate::matching::MatchRecord;
use crate::network::Transport;
use crate::structure::{DdsEntity, DomainId, TopicKind, GUID};
use alloc::sync::Arc;
use chrono::{DateTime, Utc};
use log::info;
use mio_extras::channel as mio_channel;
use std::thread::Builder;

/// DDS DomainParticipant
///
/// factory for the Publisher, Subscriber and Topic.
/// Created and deleted through `DomainParticipantFactory`.
#[derive(Clone)]
pub struct DomainParticipant {
    core: Arc<ParticipantCore>,
}

impl DdsEntity for DomainParticipant {
    fn guid(&self) -> GUID {
        self.core.guid
    }
}

impl DomainParticipant {
    /// start the event loop and the dispatcher of a new participant
    pub(crate) fn new(
        domain_id: DomainId,
        guid: GUID,
        qos: DomainParticipantQosPolicies,
        listener: Option<Arc<dyn DomainParticipantListener>>,
        mask: StatusMask,
        transport: Arc<dyn Transport>,
    ) -> DdsResult<Self> {
        let (dispatch_sender, dispatch_receiver) = mio_channel::channel();
        let (command_sender, command_receiver) = mio_channel::channel::<EventLoopCmd>();
        let (inbox_sender, inbox_receiver) = mio_channel::channel();
        let announcement_period = qos.discovery_config().announcement_period;
        let tree = EntityTree::new(guid, qos, listener, mask);
        let state = ParticipantState::new(
            domain_id,
            transport.max_message_size(),
            tree,
            dispatch_sender,
            command_sender,
        );
        let core = Arc::new(ParticipantCore::new(
            domain_id,
            guid,
            transport.clone(),
            state,
        ));

        transport.open(domain_id, guid.guid_prefix, inbox_sender)?;
        let threads = EventLoop::new(
            core.clone(),
            inbox_receiver,
            command_receiver,
            announcement_period,
        )
        .and_then(|ev_loop| {
            let dispatcher = Dispatcher::new(Arc::downgrade(&core), dispatch_receiver)?;
            Ok((ev_loop, dispatcher))
        })
        .map_err(DdsError::from)
        .and_then(|(ev_loop, dispatcher)| {
            let ev_loop_handler = Builder::new()
                .name(String::from("EventLoop"))
                .spawn(move || ev_loop.event_loop())
                .map_err(|e| DdsError::Error(format!("couldn't spawn EventLoop thread: {}", e)))?;
            let dispatcher_handler = Builder::new()
                .name(String::from("Dispatcher"))
                .spawn(move || dispatcher.dispatch_loop())
                .map_err(|e| {
                    DdsError::Error(format!("couldn't spawn Dispatcher thread: {}", e))
                })?;
            Ok((ev_loop_handler, dispatcher_handler))
        });
        match threads {
            Ok((ev_loop_handler, dispatcher_handler)) => {
                core.set_threads(ev_loop_handler, dispatcher_handler);
            }
            Err(e) => {
                if let Ok(mut state) = core.lock() {
                    state.tree.mark_deleted();
                }
                core.shutdown();
                return Err(e);
            }
        }
        info!(
            "created new DomainParticipant\n\tParticipant: {}\n\tdomain_id: {}",
            guid, domain_id
        );
        Ok(Self { core })
    }

    pub(crate) fn from_core(core: Arc<ParticipantCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<ParticipantCore> {
        &self.core
    }

    pub fn domain_id(&self) -> DomainId {
        self.core.domain_id
    }

    pub fn create_topic(
        &self,
        name: &str,
        type_name: &str,
        kind: TopicKind,
        qos: TopicQos,
        listener: Option<Arc<dyn TopicListener>>,
        mask: StatusMask,
    ) -> DdsResult<Topic> {
        let spec = ChildSpec::Topic {
            name: name.to_string(),
            type_name: type_name.to_string(),
            kind,
            qos,
            listener,
        };
        let guid = self.create_child(spec, mask)?;
        Ok(Topic::new(self.core.clone(), guid))
    }

    /// the topic of this participant named `name`
    pub fn find_topic(&self, name: &str) -> Option<Topic> {
        let state = self.core.lock().ok()?;
        state.tree.check_alive().ok()?;
        state
            .tree
            .find_topic(name)
            .map(|guid| Topic::new(self.core.clone(), guid))
    }

    pub fn delete_topic(&self, topic: &Topic) -> DdsResult<()> {
        self.delete_child(topic.guid())
    }

    pub fn create_publisher(
        &self,
        qos: PublisherQos,
        listener: Option<Arc<dyn PublisherListener>>,
        mask: StatusMask,
    ) -> DdsResult<Publisher> {
        let guid = self.create_child(ChildSpec::Publisher { qos, listener }, mask)?;
        Ok(Publisher::new(self.core.clone(), guid))
    }

    pub fn delete_publisher(&self, publisher: &Publisher) -> DdsResult<()> {
        self.delete_child(publisher.guid())
    }

    pub fn create_subscriber(
        &self,
        qos: SubscriberQos,
        listener: Option<Arc<dyn SubscriberListener>>,
        mask: StatusMask,
    ) -> DdsResult<Subscriber> {
        let guid = self.create_child(ChildSpec::Subscriber { qos, listener }, mask)?;
        Ok(Subscriber::new(self.core.clone(), guid))
    }

    pub fn delete_subscriber(&self, subscriber: &Subscriber) -> DdsResult<()> {
        self.delete_child(subscriber.guid())
    }

    fn create_child(&self, spec: ChildSpec, mask: StatusMask) -> DdsResult<GUID> {
        let discovery_db = &self.core.discovery_db;
        let parent = self.core.guid;
        self.core.with_state(|state, out| {
            state.create_child(parent, spec, mask, discovery_db, out)
        })
    }

    fn delete_child(&self, guid: GUID) -> DdsResult<()> {
        if guid.guid_prefix != self.core.guid.guid_prefix {
            return Err(DdsError::PreconditionNotMet(format!(
                "{} was not created by {}",
                guid, self.core.guid
            )));
        }
        self.core
            .with_state(|state, out| state.delete(guid, DeletionMode::Single, out))
    }

    /// delete every Topic, Publisher and Subscriber and what they contain
    pub fn delete_contained_entities(&self) -> DdsResult<()> {
        let guid = self.core.guid;
        self.core
            .with_state(|state, out| state.delete_contained(guid, out))
    }

    /// whether `guid` is an entity of this participant, at any depth
    pub fn contains_entity(&self, guid: GUID) -> bool {
        match self.core.lock() {
            Ok(state) => !state.tree.is_deleted() && guid != self.core.guid && state.tree.contains(guid),
            Err(_) => false,
        }
    }

    /// participants are enabled on creation
    pub fn enable(&self) -> DdsResult<()> {
        self.core.lock()?.tree.check_alive()
    }

    pub fn get_qos(&self) -> DdsResult<DomainParticipantQosPolicies> {
        let state = self.core.lock()?;
        state.tree.check_alive()?;
        Ok(state.tree.qos.clone())
    }

    pub fn set_qos(&self, qos: DomainParticipantQosPolicies) -> DdsResult<()> {
        self.core
            .with_state(|state, _| state.set_participant_qos(qos))
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn DomainParticipantListener>>,
        mask: StatusMask,
    ) -> DdsResult<()> {
        let mut state = self.core.lock()?;
        state.tree.check_alive()?;
        state.tree.listener = listener;
        state.tree.mask = mask;
        Ok(())
    }

    pub fn get_default_publisher_qos(&self) -> DdsResult<PublisherQosPolicies> {
        let state = self.core.lock()?;
        state.tree.check_alive()?;
        Ok(state.tree.default_publisher_qos.clone())
    }
    pub fn set_default_publisher_qos(&self, qos: PublisherQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        let mut state = self.core.lock()?;
        state.tree.check_alive()?;
        state.tree.default_publisher_qos = qos;
        Ok(())
    }
    pub fn get_default_subscriber_qos(&self) -> DdsResult<SubscriberQosPolicies> {
        let state = self.core.lock()?;
        state.tree.check_alive()?;
        Ok(state.tree.default_subscriber_qos.clone())
    }
    pub fn set_default_subscriber_qos(&self, qos: SubscriberQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        let mut state = self.core.lock()?;
        state.tree.check_alive()?;
        state.tree.default_subscriber_qos = qos;
        Ok(())
    }
    pub fn get_default_topic_qos(&self) -> DdsResult<TopicQosPolicies> {
        let state = self.core.lock()?;
        state.tree.check_alive()?;
        Ok(state.tree.default_topic_qos.clone())
    }
    pub fn set_default_topic_qos(&self, qos: TopicQosPolicies) -> DdsResult<()> {
        qos.validate()?;
        let mut state = self.core.lock()?;
        state.tree.check_alive()?;
        state.tree.default_topic_qos = qos;
        Ok(())
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// announce the participant now, which refreshes its lease everywhere
    pub fn assert_liveliness(&self) -> DdsResult<()> {
        let state = self.core.lock()?;
        state.tree.check_alive()?;
        state.command(EventLoopCmd::AnnounceParticipant)
    }

    /// remote participants of the domain that are not lost
    pub fn discovered_participants(&self) -> Vec<SPDPdiscoveredParticipantData> {
        self.core.discovery_db.participants()
    }

    /// every Match Record of the endpoints of this participant
    pub fn match_records(&self) -> DdsResult<Vec<MatchRecord>> {
        let state = self.core.lock()?;
        state.tree.check_alive()?;
        Ok(state.matches.records())
    }

    pub fn is_deleted(&self) -> bool {
        self.core
            .lock()
            .map(|state| state.tree.is_deleted())
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod test {
    use crate::dds::{
        factory::DomainParticipantFactory,
        qos::{
            policy::{History, HistoryQosKind, Reliability, ReliabilityQosKind},
            DataReaderQos, DataReaderQosBuilder, DataWriterQos, DataWriterQosBuilder,
            DomainParticipantQos, PublisherQos, SubscriberQos, TopicQos, TopicQosBuilder,
        },
        status::StatusMask,
    };
    use crate::error::{DdsError, ReturnCode};
    use crate::network::LoopbackTransport;
    use crate::structure::{DdsEntity, Duration, TopicKind};
    use alloc::sync::Arc;

    fn factory() -> DomainParticipantFactory {
        DomainParticipantFactory::new(Arc::new(LoopbackTransport::new()))
    }

    #[test]
    fn test_topic_names_are_unique() {
        let factory = factory();
        let dp = factory
            .create_participant(0, DomainParticipantQos::Default, None, StatusMask::empty())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, StatusMask::empty())
            .unwrap();
        let again = dp.create_topic(
            "T",
            "Y",
            TopicKind::NoKey,
            TopicQos::Default,
            None,
            StatusMask::empty(),
        );
        assert_eq!(
            ReturnCode::from(&again),
            ReturnCode::PreconditionNotMet
        );
        assert_eq!(dp.find_topic("T").map(|t| t.guid()), Some(topic.guid()));
        assert!(dp.find_topic("U").is_none());
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_topic_in_use_is_not_deleted() {
        let factory = factory();
        let dp = factory
            .create_participant(0, DomainParticipantQos::Default, None, StatusMask::empty())
            .unwrap();
        let topic = dp
            .create_topic("T", "X", TopicKind::NoKey, TopicQos::Default, None, StatusMask::empty())
            .unwrap();
        let publisher = dp
            .create_publisher(PublisherQos::Default, None, StatusMask::empty())
            .unwrap();
        let writer = publisher
            .create_datawriter(DataWriterQos::Default, &topic, None, StatusMask::empty())
            .unwrap();
        assert!(matches!(
            dp.delete_topic(&topic),
            Err(DdsError::PreconditionNotMet(_))
        ));
        assert!(matches!(
            dp.delete_publisher(&publisher),
            Err(DdsError::PreconditionNotMet(_))
        ));
        publisher.delete_datawriter(&writer).unwrap();
        dp.delete_publisher(&publisher).unwrap();
        dp.delete_topic(&topic).unwrap();
        assert!(!dp.contains_entity(topic.guid()));
        factory.delete_participant(&dp).unwrap();
    }

    #[test]
    fn test_endpoint_qos_resolution() {
        let factory = factory();
        let dp = factory
            .create_participant(0, DomainParticipantQos::Default, None, StatusMask::empty())
            .unwrap();
        let topic_qos = TopicQosBuilder::new()
            .history(History {
                kind: HistoryQosKind::KeepLast,
                depth: 5,
            })
            .build();
        let topic = dp
            .create_topic(
                "T",
                "X",
                TopicKind::NoKey,
                TopicQos::Policies(Box::new(topic_qos)),
                None,
                StatusMask::empty(),
            )
            .unwrap();
        let subscriber = dp
            .create_subscriber(SubscriberQos::Default, None, StatusMask::empty())
            .unwrap();
        // explicit reliability wins, history comes from the topic
        let reliable = DataReaderQosBuilder::new()
            .reliability(Reliability::default_reliable())
            .build();
        let reader = subscriber
            .create_datareader(
                DataReaderQos::Policies(Box::new(reliable)),
                &topic,
                None,
                StatusMask::empty(),
            )
            .unwrap();
        let qos = reader.get_qos().unwrap();
        assert_eq!(qos.reliability().kind, ReliabilityQosKind::Reliable);
        assert_eq!(qos.history().depth, 5);

        let publisher = dp
            .create_publisher(PublisherQos::Default, None, StatusMask::empty())
            .unwrap();
        let writer = publisher
            .create_datawriter(DataWriterQos::Default, &topic, None, StatusMask::empty())
            .unwrap();
        assert_eq!(
            writer.get_qos().unwrap(),
            DataWriterQosBuilder::new().build()
        );
        factory.delete_participant_recursive(&dp).unwrap();
    }

    #[test]
    fn test_rejected_qos_keeps_previous() {
        let factory = factory();
        let dp = factory
            .create_participant(0, DomainParticipantQos::Default, None, StatusMask::empty())
            .unwrap();
        let before = dp.get_qos().unwrap();
        let mut qos = before.clone();
        let mut discovery_config = qos.discovery_config();
        discovery_config.announcement_period = Duration::from_secs(60);
        qos.set_discovery_config(discovery_config);
        assert!(matches!(
            dp.set_qos(qos),
            Err(DdsError::InconsistentPolicy(_))
        ));
        assert_eq!(dp.get_qos().unwrap(), before);
        factory.delete_participant(&dp).unwrap();
    }
}

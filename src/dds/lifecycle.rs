//! containment tree of the entities of one DomainParticipant
//!
//! The participant is the root. Topics, Publishers and Subscribers are its
//! children; DataWriters belong to a Publisher and DataReaders to a Subscriber.
//! Creation and deletion go through [`EntityTree::create_child`] and
//! [`EntityTree::delete_child`]; the typed handles only wrap them.

use crate::dds::{
    listener::{
        DataReaderListener, DataWriterListener, DomainParticipantListener, PublisherListener,
        SubscriberListener, TopicListener,
    },
    qos::{
        DataReaderQos, DataReaderQosPolicies, DataWriterQos, DataWriterQosPolicies,
        DomainParticipantQosPolicies, PublisherQos, PublisherQosPolicies, QosPolicySet,
        SubscriberQos, SubscriberQosPolicies, TopicQos, TopicQosPolicies,
    },
    status::{
        InconsistentTopicStatus, OfferedIncompatibleQosStatus, PublicationMatchedStatus,
        RequestedIncompatibleQosStatus, StatusMask, SubscriptionMatchedStatus,
    },
};
use crate::error::{DdsError, DdsResult};
use crate::message::submessage::SequenceNumber;
use crate::rtps::cache::HistoryCache;
use crate::structure::{EntityId, EntityKind, ReaderProxy, TopicKind, WriterProxy, GUID};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use log::debug;

/// entity keys below this are reserved for builtin entities
const FIRST_USER_ENTITY_KEY: u32 = 0x0300;
const LAST_ENTITY_KEY: u32 = 0x00FF_FFFF;

/// what to create under a parent
pub(crate) enum ChildSpec {
    Topic {
        name: String,
        type_name: String,
        kind: TopicKind,
        qos: TopicQos,
        listener: Option<Arc<dyn TopicListener>>,
    },
    Publisher {
        qos: PublisherQos,
        listener: Option<Arc<dyn PublisherListener>>,
    },
    Subscriber {
        qos: SubscriberQos,
        listener: Option<Arc<dyn SubscriberListener>>,
    },
    DataWriter {
        topic: GUID,
        qos: DataWriterQos,
        listener: Option<Arc<dyn DataWriterListener>>,
    },
    DataReader {
        topic: GUID,
        qos: DataReaderQos,
        listener: Option<Arc<dyn DataReaderListener>>,
    },
}

impl ChildSpec {
    fn kind_str(&self) -> &'static str {
        match self {
            Self::Topic { .. } => "Topic",
            Self::Publisher { .. } => "Publisher",
            Self::Subscriber { .. } => "Subscriber",
            Self::DataWriter { .. } => "DataWriter",
            Self::DataReader { .. } => "DataReader",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionMode {
    /// fail with PreconditionNotMet if the entity still contains entities
    Single,
    /// delete contained entities first, leaf-first, best effort
    Recursive,
}

pub(crate) struct TopicBody {
    pub name: String,
    pub type_name: String,
    pub kind: TopicKind,
    pub qos: TopicQosPolicies,
    pub listener: Option<Arc<dyn TopicListener>>,
    pub inconsistent_topic: InconsistentTopicStatus,
    /// number of DataWriters and DataReaders bound to the topic
    pub users: usize,
}

pub(crate) struct PublisherBody {
    pub qos: PublisherQosPolicies,
    pub listener: Option<Arc<dyn PublisherListener>>,
    pub default_datawriter_qos: DataWriterQosPolicies,
}

pub(crate) struct SubscriberBody {
    pub qos: SubscriberQosPolicies,
    pub listener: Option<Arc<dyn SubscriberListener>>,
    pub default_datareader_qos: DataReaderQosPolicies,
}

pub(crate) struct WriterBody {
    pub topic: GUID,
    pub qos: DataWriterQosPolicies,
    pub listener: Option<Arc<dyn DataWriterListener>>,
    pub publication_matched: PublicationMatchedStatus,
    pub offered_incompatible_qos: OfferedIncompatibleQosStatus,
    pub history: HistoryCache,
    pub last_seq: SequenceNumber,
    pub reader_proxies: BTreeMap<GUID, ReaderProxy>,
}

impl WriterBody {
    /// every reliable reader has acknowledged every written change
    pub fn is_acked_by_all(&self) -> bool {
        self.reader_proxies
            .values()
            .filter(|p| p.reliable)
            .all(|p| p.is_acked(self.last_seq))
    }

    /// changes up to this one may be dropped from the history
    pub fn acked_by_all_upto(&self) -> SequenceNumber {
        self.reader_proxies
            .values()
            .filter(|p| p.reliable)
            .map(|p| p.acked_upto())
            .min()
            .unwrap_or(self.last_seq)
    }
}

pub(crate) struct ReaderBody {
    pub topic: GUID,
    pub qos: DataReaderQosPolicies,
    pub listener: Option<Arc<dyn DataReaderListener>>,
    pub subscription_matched: SubscriptionMatchedStatus,
    pub requested_incompatible_qos: RequestedIncompatibleQosStatus,
    pub cache: HistoryCache,
    pub writer_proxies: BTreeMap<GUID, WriterProxy>,
}

pub(crate) enum EntityBody {
    Topic(TopicBody),
    Publisher(PublisherBody),
    Subscriber(SubscriberBody),
    DataWriter(WriterBody),
    DataReader(ReaderBody),
}

pub(crate) struct EntityNode {
    pub guid: GUID,
    pub parent: GUID,
    pub children: BTreeSet<GUID>,
    pub enabled: bool,
    pub mask: StatusMask,
    pub body: EntityBody,
}

macro_rules! body_accessor {
    ($name:ident, $name_mut:ident, $variant:ident, $body:ident) => {
        pub fn $name(&self, guid: GUID) -> DdsResult<&$body> {
            match &self.get(guid)?.body {
                EntityBody::$variant(b) => Ok(b),
                _ => Err(DdsError::BadParameter(format!(
                    "{} is not a {}",
                    guid,
                    stringify!($variant)
                ))),
            }
        }

        pub fn $name_mut(&mut self, guid: GUID) -> DdsResult<&mut $body> {
            match &mut self.get_mut(guid)?.body {
                EntityBody::$variant(b) => Ok(b),
                _ => Err(DdsError::BadParameter(format!(
                    "{} is not a {}",
                    guid,
                    stringify!($variant)
                ))),
            }
        }
    };
}

pub(crate) struct EntityTree {
    guid: GUID,
    pub qos: DomainParticipantQosPolicies,
    pub listener: Option<Arc<dyn DomainParticipantListener>>,
    pub mask: StatusMask,
    pub default_publisher_qos: PublisherQosPolicies,
    pub default_subscriber_qos: SubscriberQosPolicies,
    pub default_topic_qos: TopicQosPolicies,
    children: BTreeSet<GUID>,
    nodes: BTreeMap<GUID, EntityNode>,
    topics_by_name: BTreeMap<String, GUID>,
    next_entity_key: u32,
    deleted: bool,
}

impl EntityTree {
    pub fn new(
        guid: GUID,
        qos: DomainParticipantQosPolicies,
        listener: Option<Arc<dyn DomainParticipantListener>>,
        mask: StatusMask,
    ) -> Self {
        Self {
            guid,
            qos,
            listener,
            mask,
            default_publisher_qos: PublisherQosPolicies::default(),
            default_subscriber_qos: SubscriberQosPolicies::default(),
            default_topic_qos: TopicQosPolicies::default(),
            children: BTreeSet::new(),
            nodes: BTreeMap::new(),
            topics_by_name: BTreeMap::new(),
            next_entity_key: FIRST_USER_ENTITY_KEY,
            deleted: false,
        }
    }

    pub fn guid(&self) -> GUID {
        self.guid
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn check_alive(&self) -> DdsResult<()> {
        if self.deleted {
            Err(DdsError::AlreadyDeleted(format!(
                "DomainParticipant {} is deleted",
                self.guid
            )))
        } else {
            Ok(())
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn contains(&self, guid: GUID) -> bool {
        guid == self.guid || self.nodes.contains_key(&guid)
    }

    pub fn get(&self, guid: GUID) -> DdsResult<&EntityNode> {
        self.check_alive()?;
        self.nodes
            .get(&guid)
            .ok_or_else(|| DdsError::AlreadyDeleted(format!("{} is deleted", guid)))
    }

    pub fn get_mut(&mut self, guid: GUID) -> DdsResult<&mut EntityNode> {
        self.check_alive()?;
        self.nodes
            .get_mut(&guid)
            .ok_or_else(|| DdsError::AlreadyDeleted(format!("{} is deleted", guid)))
    }

    body_accessor!(topic, topic_mut, Topic, TopicBody);
    body_accessor!(publisher, publisher_mut, Publisher, PublisherBody);
    body_accessor!(subscriber, subscriber_mut, Subscriber, SubscriberBody);
    body_accessor!(writer, writer_mut, DataWriter, WriterBody);
    body_accessor!(reader, reader_mut, DataReader, ReaderBody);

    pub fn is_enabled(&self, guid: GUID) -> bool {
        guid == self.guid || self.nodes.get(&guid).map(|n| n.enabled).unwrap_or(false)
    }

    /// enable an entity whose parent is enabled, returns false if it already was
    pub fn enable(&mut self, guid: GUID) -> DdsResult<bool> {
        self.check_alive()?;
        if guid == self.guid {
            return Ok(false);
        }
        let parent = self.get(guid)?.parent;
        if !self.is_enabled(parent) {
            return Err(DdsError::PreconditionNotMet(format!(
                "the factory of {} is not enabled",
                guid
            )));
        }
        let node = self.get_mut(guid)?;
        let changed = !node.enabled;
        node.enabled = true;
        Ok(changed)
    }

    pub fn children_of(&self, guid: GUID) -> Vec<GUID> {
        if guid == self.guid {
            self.children.iter().copied().collect()
        } else {
            self.nodes
                .get(&guid)
                .map(|n| n.children.iter().copied().collect())
                .unwrap_or_default()
        }
    }

    pub fn find_topic(&self, name: &str) -> Option<GUID> {
        self.topics_by_name.get(name).copied()
    }

    /// enabled DataWriters and DataReaders
    pub fn enabled_endpoints(&self) -> Vec<GUID> {
        self.nodes
            .values()
            .filter(|n| {
                n.enabled && matches!(n.body, EntityBody::DataWriter(_) | EntityBody::DataReader(_))
            })
            .map(|n| n.guid)
            .collect()
    }

    pub fn writers(&self) -> impl Iterator<Item = (&GUID, &WriterBody)> {
        self.nodes.iter().filter_map(|(g, n)| match &n.body {
            EntityBody::DataWriter(w) => Some((g, w)),
            _ => None,
        })
    }

    pub fn readers_mut(&mut self) -> impl Iterator<Item = (&GUID, &mut ReaderBody)> {
        self.nodes.iter_mut().filter_map(|(g, n)| match &mut n.body {
            EntityBody::DataReader(r) => Some((g, r)),
            _ => None,
        })
    }

    fn gen_entity_key(&mut self) -> DdsResult<[u8; 3]> {
        if self.next_entity_key > LAST_ENTITY_KEY {
            return Err(DdsError::Error(
                "entity keys of the participant are exhausted".to_string(),
            ));
        }
        let k = self.next_entity_key;
        self.next_entity_key += 1;
        Ok([(k >> 16) as u8, (k >> 8) as u8, k as u8])
    }

    /// autoenable_created_entities of the factory of a new child
    fn autoenable(&self, parent: GUID) -> DdsResult<bool> {
        if parent == self.guid {
            return Ok(self.qos.entity_factory().autoenable_created_entities);
        }
        let node = self.get(parent)?;
        let factory = match &node.body {
            EntityBody::Publisher(p) => p.qos.entity_factory(),
            EntityBody::Subscriber(s) => s.qos.entity_factory(),
            _ => return Ok(false),
        };
        Ok(node.enabled && factory.autoenable_created_entities)
    }

    /// bound topic of a new endpoint: must be a live topic of this participant
    fn bound_topic(&self, topic: GUID) -> DdsResult<&TopicBody> {
        if topic.guid_prefix != self.guid.guid_prefix {
            return Err(DdsError::BadParameter(format!(
                "topic {} belongs to another participant",
                topic
            )));
        }
        self.topic(topic)
    }

    pub fn create_child(
        &mut self,
        parent: GUID,
        spec: ChildSpec,
        mask: StatusMask,
    ) -> DdsResult<GUID> {
        self.check_alive()?;
        if parent != self.guid && !self.nodes.contains_key(&parent) {
            return Err(DdsError::AlreadyDeleted(format!(
                "parent {} is deleted",
                parent
            )));
        }
        let parent_ok = match &spec {
            ChildSpec::Topic { .. } | ChildSpec::Publisher { .. } | ChildSpec::Subscriber { .. } => {
                parent == self.guid
            }
            ChildSpec::DataWriter { .. } => parent.entity_id.is_publisher(),
            ChildSpec::DataReader { .. } => parent.entity_id.is_subscriber(),
        };
        if !parent_ok {
            return Err(DdsError::BadParameter(format!(
                "{} can't contain a {}",
                parent,
                spec.kind_str()
            )));
        }

        let (entity_kind, body, topic) = match spec {
            ChildSpec::Topic {
                name,
                type_name,
                kind,
                qos,
                listener,
            } => {
                let qos = match qos {
                    TopicQos::Default => self.default_topic_qos.clone(),
                    TopicQos::Policies(q) => *q,
                };
                qos.validate()?;
                if self.topics_by_name.contains_key(&name) {
                    return Err(DdsError::PreconditionNotMet(format!(
                        "topic '{}' already exists",
                        name
                    )));
                }
                (
                    EntityKind::TOPIC,
                    EntityBody::Topic(TopicBody {
                        name,
                        type_name,
                        kind,
                        qos,
                        listener,
                        inconsistent_topic: InconsistentTopicStatus::default(),
                        users: 0,
                    }),
                    None,
                )
            }
            ChildSpec::Publisher { qos, listener } => {
                let qos = match qos {
                    PublisherQos::Default => self.default_publisher_qos.clone(),
                    PublisherQos::Policies(q) => *q,
                };
                qos.validate()?;
                (
                    EntityKind::PUBLISHER,
                    EntityBody::Publisher(PublisherBody {
                        qos,
                        listener,
                        default_datawriter_qos: DataWriterQosPolicies::default(),
                    }),
                    None,
                )
            }
            ChildSpec::Subscriber { qos, listener } => {
                let qos = match qos {
                    SubscriberQos::Default => self.default_subscriber_qos.clone(),
                    SubscriberQos::Policies(q) => *q,
                };
                qos.validate()?;
                (
                    EntityKind::SUBSCRIBER,
                    EntityBody::Subscriber(SubscriberBody {
                        qos,
                        listener,
                        default_datareader_qos: DataReaderQosPolicies::default(),
                    }),
                    None,
                )
            }
            ChildSpec::DataWriter {
                topic,
                qos,
                listener,
            } => {
                let topic_body = self.bound_topic(topic)?;
                let group_default = self.publisher(parent)?.default_datawriter_qos.clone();
                let qos = match qos {
                    DataWriterQos::Default => group_default,
                    DataWriterQos::Policies(q) => {
                        let mut combined = topic_body.qos.to_datawriter_qos();
                        combined.combine(group_default);
                        combined.combine(*q);
                        combined
                    }
                };
                qos.validate()?;
                let kind = topic_body.kind;
                (
                    EntityKind::writer(kind),
                    EntityBody::DataWriter(WriterBody {
                        topic,
                        history: HistoryCache::new(qos.history(), qos.resource_limits()),
                        qos,
                        listener,
                        publication_matched: PublicationMatchedStatus::default(),
                        offered_incompatible_qos: OfferedIncompatibleQosStatus::default(),
                        last_seq: SequenceNumber::ZERO,
                        reader_proxies: BTreeMap::new(),
                    }),
                    Some(topic),
                )
            }
            ChildSpec::DataReader {
                topic,
                qos,
                listener,
            } => {
                let topic_body = self.bound_topic(topic)?;
                let group_default = self.subscriber(parent)?.default_datareader_qos.clone();
                let qos = match qos {
                    DataReaderQos::Default => group_default,
                    DataReaderQos::Policies(q) => {
                        let mut combined = topic_body.qos.to_datareader_qos();
                        combined.combine(group_default);
                        combined.combine(*q);
                        combined
                    }
                };
                qos.validate()?;
                let kind = topic_body.kind;
                (
                    EntityKind::reader(kind),
                    EntityBody::DataReader(ReaderBody {
                        topic,
                        cache: HistoryCache::new(qos.history(), qos.resource_limits()),
                        qos,
                        listener,
                        subscription_matched: SubscriptionMatchedStatus::default(),
                        requested_incompatible_qos: RequestedIncompatibleQosStatus::default(),
                        writer_proxies: BTreeMap::new(),
                    }),
                    Some(topic),
                )
            }
        };

        let enabled = self.autoenable(parent)?;
        let key = self.gen_entity_key()?;
        let guid = GUID::new(self.guid.guid_prefix, EntityId::new(key, entity_kind));
        if let EntityBody::Topic(t) = &body {
            self.topics_by_name.insert(t.name.clone(), guid);
        }
        if let Some(topic) = topic {
            self.topic_mut(topic)?.users += 1;
        }
        if parent == self.guid {
            self.children.insert(guid);
        } else {
            self.get_mut(parent)?.children.insert(guid);
        }
        self.nodes.insert(
            guid,
            EntityNode {
                guid,
                parent,
                children: BTreeSet::new(),
                enabled,
                mask,
                body,
            },
        );
        debug!("created entity\n\tguid: {}\n\tenabled: {}", guid, enabled);
        Ok(guid)
    }

    /// remove one entity that contains nothing
    fn remove_leaf(&mut self, guid: GUID) -> DdsResult<EntityNode> {
        let node = self.get(guid)?;
        if !node.children.is_empty() {
            return Err(DdsError::PreconditionNotMet(format!(
                "{} still contains {} entities",
                guid,
                node.children.len()
            )));
        }
        if let EntityBody::Topic(t) = &node.body {
            if t.users > 0 {
                return Err(DdsError::PreconditionNotMet(format!(
                    "topic '{}' is used by {} DataWriters/DataReaders",
                    t.name, t.users
                )));
            }
        }
        let node = self
            .nodes
            .remove(&guid)
            .ok_or_else(|| DdsError::AlreadyDeleted(format!("{} is deleted", guid)))?;
        match &node.body {
            EntityBody::Topic(t) => {
                self.topics_by_name.remove(&t.name);
            }
            EntityBody::DataWriter(WriterBody { topic, .. })
            | EntityBody::DataReader(ReaderBody { topic, .. }) => {
                if let Some(EntityNode {
                    body: EntityBody::Topic(t),
                    ..
                }) = self.nodes.get_mut(topic)
                {
                    t.users -= 1;
                }
            }
            _ => (),
        }
        if node.parent == self.guid {
            self.children.remove(&guid);
        } else if let Some(parent) = self.nodes.get_mut(&node.parent) {
            parent.children.remove(&guid);
        }
        debug!("deleted entity\n\tguid: {}", guid);
        Ok(node)
    }

    /// delete an entity; the removed entities are appended to `removed`
    /// even when a recursive deletion fails part way
    pub fn delete_child(
        &mut self,
        guid: GUID,
        mode: DeletionMode,
        removed: &mut Vec<EntityNode>,
    ) -> DdsResult<()> {
        self.check_alive()?;
        if guid == self.guid {
            return Err(DdsError::BadParameter(
                "the participant is deleted through its factory".to_string(),
            ));
        }
        match mode {
            DeletionMode::Single => {
                removed.push(self.remove_leaf(guid)?);
                Ok(())
            }
            DeletionMode::Recursive => {
                self.get(guid)?;
                let mut failures = Failures::default();
                self.delete_descendants(guid, removed, &mut failures);
                failures.attempt(self.remove_leaf(guid).map(|n| removed.push(n)));
                failures.finish()
            }
        }
    }

    /// recursive deletion of everything `parent` contains, `parent` stays
    pub fn delete_contained(
        &mut self,
        parent: GUID,
        removed: &mut Vec<EntityNode>,
    ) -> DdsResult<()> {
        self.check_alive()?;
        if !self.contains(parent) {
            return Err(DdsError::AlreadyDeleted(format!("{} is deleted", parent)));
        }
        let mut failures = Failures::default();
        self.delete_descendants(parent, removed, &mut failures);
        failures.finish()
    }

    fn delete_descendants(
        &mut self,
        parent: GUID,
        removed: &mut Vec<EntityNode>,
        failures: &mut Failures,
    ) {
        // endpoints and groups before topics, so that no topic is still in use
        let (topics, others): (Vec<GUID>, Vec<GUID>) = self
            .children_of(parent)
            .into_iter()
            .partition(|g| g.entity_id.is_topic());
        for child in others.into_iter().chain(topics) {
            self.delete_descendants(child, removed, failures);
            failures.attempt(self.remove_leaf(child).map(|n| removed.push(n)));
        }
    }
}

#[derive(Default)]
struct Failures {
    first: Option<DdsError>,
    failed: usize,
    attempted: usize,
}

impl Failures {
    fn attempt(&mut self, result: DdsResult<()>) {
        self.attempted += 1;
        if let Err(e) = result {
            self.failed += 1;
            if self.first.is_none() {
                self.first = Some(e);
            }
        }
    }

    fn finish(self) -> DdsResult<()> {
        match self.first {
            None => Ok(()),
            Some(first) => Err(DdsError::CleanupFailed {
                first: Box::new(first),
                failed: self.failed,
                attempted: self.attempted,
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dds::qos::{
        policy::{EntityFactory, History, HistoryQosKind, ResourceLimits},
        DataWriterQosBuilder, PublisherQosBuilder,
    };
    use crate::error::ReturnCode;
    use crate::structure::GuidPrefix;

    fn tree() -> EntityTree {
        EntityTree::new(
            GUID::new(
                GuidPrefix {
                    guid_prefix: [9; 12],
                },
                EntityId::PARTICIPANT,
            ),
            DomainParticipantQosPolicies::default(),
            None,
            StatusMask::empty(),
        )
    }

    fn topic_spec(name: &str) -> ChildSpec {
        ChildSpec::Topic {
            name: name.to_string(),
            type_name: "X".to_string(),
            kind: TopicKind::NoKey,
            qos: TopicQos::Default,
            listener: None,
        }
    }

    fn populated() -> (EntityTree, GUID, GUID, GUID) {
        let mut tree = tree();
        let root = tree.guid();
        let topic = tree.create_child(root, topic_spec("T"), StatusMask::empty()).unwrap();
        let publisher = tree
            .create_child(
                root,
                ChildSpec::Publisher {
                    qos: PublisherQos::Default,
                    listener: None,
                },
                StatusMask::empty(),
            )
            .unwrap();
        let writer = tree
            .create_child(
                publisher,
                ChildSpec::DataWriter {
                    topic,
                    qos: DataWriterQos::Default,
                    listener: None,
                },
                StatusMask::all(),
            )
            .unwrap();
        (tree, topic, publisher, writer)
    }

    #[test]
    fn test_create_child() {
        let (mut tree, topic, publisher, writer) = populated();
        assert!(writer.entity_id.is_writer());
        assert_eq!(writer.guid_prefix, tree.guid().guid_prefix);
        assert_eq!(tree.topic(topic).unwrap().users, 1);
        assert_eq!(tree.children_of(publisher), vec![writer]);
        assert!(tree.is_enabled(writer));
        assert_eq!(tree.find_topic("T"), Some(topic));
        assert_eq!(tree.enabled_endpoints(), vec![writer]);

        // duplicate topic name
        let root = tree.guid();
        let err = tree
            .create_child(root, topic_spec("T"), StatusMask::empty())
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::PreconditionNotMet);
        // DataWriter under the participant
        let err = tree
            .create_child(
                root,
                ChildSpec::DataWriter {
                    topic,
                    qos: DataWriterQos::Default,
                    listener: None,
                },
                StatusMask::empty(),
            )
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::BadParameter);
    }

    #[test]
    fn test_foreign_topic_is_rejected() {
        let (mut tree, _topic, publisher, _writer) = populated();
        let foreign = GUID::new(
            GuidPrefix {
                guid_prefix: [1; 12],
            },
            EntityId::new([0, 3, 0], EntityKind::TOPIC),
        );
        let err = tree
            .create_child(
                publisher,
                ChildSpec::DataWriter {
                    topic: foreign,
                    qos: DataWriterQos::Default,
                    listener: None,
                },
                StatusMask::empty(),
            )
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::BadParameter);
    }

    #[test]
    fn test_inconsistent_endpoint_qos_is_rejected() {
        let (mut tree, topic, publisher, _writer) = populated();
        let qos = DataWriterQosBuilder::new()
            .history(History {
                kind: HistoryQosKind::KeepLast,
                depth: 10,
            })
            .resource_limits(ResourceLimits {
                max_samples: 5,
                max_instances: 1,
                max_samples_per_instance: 5,
            })
            .build();
        let err = tree
            .create_child(
                publisher,
                ChildSpec::DataWriter {
                    topic,
                    qos: DataWriterQos::Policies(Box::new(qos)),
                    listener: None,
                },
                StatusMask::empty(),
            )
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::InconsistentPolicy);
        assert_eq!(tree.children_of(publisher).len(), 1);
    }

    #[test]
    fn test_delete_single_and_recursive() {
        let (mut tree, topic, publisher, writer) = populated();
        let mut removed = Vec::new();
        let err = tree
            .delete_child(publisher, DeletionMode::Single, &mut removed)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::PreconditionNotMet);
        let err = tree
            .delete_child(topic, DeletionMode::Single, &mut removed)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::PreconditionNotMet);
        assert!(removed.is_empty());
        assert!(tree.contains(writer));

        tree.delete_child(publisher, DeletionMode::Recursive, &mut removed)
            .unwrap();
        let order: Vec<GUID> = removed.iter().map(|n| n.guid).collect();
        assert_eq!(order, vec![writer, publisher]);
        assert_eq!(tree.topic(topic).unwrap().users, 0);
        tree.delete_child(topic, DeletionMode::Single, &mut removed)
            .unwrap();
        assert!(!tree.has_children());
        assert_eq!(tree.find_topic("T"), None);
    }

    #[test]
    fn test_recursive_delete_of_used_topic() {
        let (mut tree, topic, _publisher, writer) = populated();
        let mut removed = Vec::new();
        let err = tree
            .delete_child(topic, DeletionMode::Recursive, &mut removed)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::Error);
        match err {
            DdsError::CleanupFailed {
                first,
                failed,
                attempted,
            } => {
                assert_eq!(first.return_code(), ReturnCode::PreconditionNotMet);
                assert_eq!((failed, attempted), (1, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(removed.is_empty());
        assert_eq!(tree.topic(topic).unwrap().users, 1);
        assert!(tree.contains(writer));
    }

    #[test]
    fn test_delete_contained_is_leaf_first() {
        let (mut tree, topic, publisher, writer) = populated();
        let root = tree.guid();
        let mut removed = Vec::new();
        tree.delete_contained(root, &mut removed).unwrap();
        let order: Vec<GUID> = removed.iter().map(|n| n.guid).collect();
        assert_eq!(order, vec![writer, publisher, topic]);
        assert!(!tree.has_children());
        let err = tree.get(writer).err().unwrap();
        assert_eq!(err.return_code(), ReturnCode::AlreadyDeleted);
    }

    #[test]
    fn test_autoenable_off() {
        let mut tree = tree();
        let root = tree.guid();
        let topic = tree.create_child(root, topic_spec("T"), StatusMask::empty()).unwrap();
        let publisher = tree
            .create_child(
                root,
                ChildSpec::Publisher {
                    qos: PublisherQos::Policies(Box::new(
                        PublisherQosBuilder::new()
                            .entity_factory(EntityFactory {
                                autoenable_created_entities: false,
                            })
                            .build(),
                    )),
                    listener: None,
                },
                StatusMask::empty(),
            )
            .unwrap();
        let writer = tree
            .create_child(
                publisher,
                ChildSpec::DataWriter {
                    topic,
                    qos: DataWriterQos::Default,
                    listener: None,
                },
                StatusMask::empty(),
            )
            .unwrap();
        assert!(tree.is_enabled(publisher));
        assert!(!tree.is_enabled(writer));
        assert!(tree.enabled_endpoints().is_empty());
        assert_eq!(tree.enable(writer).unwrap(), true);
        assert_eq!(tree.enable(writer).unwrap(), false);
    }

    #[test]
    fn test_deleted_tree() {
        let (mut tree, topic, _publisher, _writer) = populated();
        tree.mark_deleted();
        let root = tree.guid();
        let err = tree
            .create_child(root, topic_spec("U"), StatusMask::empty())
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::AlreadyDeleted);
        assert!(tree.topic(topic).is_err());
    }
}

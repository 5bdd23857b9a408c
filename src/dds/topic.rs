use crate::dds::{
    core::ParticipantCore,
    listener::TopicListener,
    participant::DomainParticipant,
    qos::TopicQosPolicies,
    status::{InconsistentTopicStatus, StatusMask},
};
use crate::error::DdsResult;
use crate::structure::{DdsEntity, TopicKind, GUID};
use alloc::sync::Arc;

/// DDS Topic
///
/// name and type of the data exchanged by DataWriters and DataReaders
#[derive(Clone)]
pub struct Topic {
    core: Arc<ParticipantCore>,
    guid: GUID,
}

impl DdsEntity for Topic {
    fn guid(&self) -> GUID {
        self.guid
    }
}

impl Topic {
    pub(crate) fn new(core: Arc<ParticipantCore>, guid: GUID) -> Self {
        Self { core, guid }
    }

    pub fn name(&self) -> DdsResult<String> {
        Ok(self.core.lock()?.tree.topic(self.guid)?.name.clone())
    }

    pub fn type_name(&self) -> DdsResult<String> {
        Ok(self.core.lock()?.tree.topic(self.guid)?.type_name.clone())
    }

    pub fn kind(&self) -> DdsResult<TopicKind> {
        Ok(self.core.lock()?.tree.topic(self.guid)?.kind)
    }

    pub fn get_qos(&self) -> DdsResult<TopicQosPolicies> {
        Ok(self.core.lock()?.tree.topic(self.guid)?.qos.clone())
    }

    pub fn set_qos(&self, qos: TopicQosPolicies) -> DdsResult<()> {
        let guid = self.guid;
        self.core.with_state(|state, _| state.set_topic_qos(guid, qos))
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn TopicListener>>,
        mask: StatusMask,
    ) -> DdsResult<()> {
        let mut state = self.core.lock()?;
        let node = state.tree.get_mut(self.guid)?;
        node.mask = mask;
        state.tree.topic_mut(self.guid)?.listener = listener;
        Ok(())
    }

    pub fn enable(&self) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.enable(guid, discovery_db, out))
    }

    pub fn get_inconsistent_topic_status(&self) -> DdsResult<InconsistentTopicStatus> {
        Ok(self
            .core
            .lock()?
            .tree
            .topic_mut(self.guid)?
            .inconsistent_topic
            .take())
    }

    pub fn get_participant(&self) -> DomainParticipant {
        DomainParticipant::from_core(self.core.clone())
    }
}

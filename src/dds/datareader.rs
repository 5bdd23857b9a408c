use crate::dds::{
    core::ParticipantCore,
    listener::DataReaderListener,
    qos::DataReaderQosPolicies,
    status::{RequestedIncompatibleQosStatus, StatusMask, SubscriptionMatchedStatus},
    subscriber::Subscriber,
    topic::Topic,
};
use crate::error::DdsResult;
use crate::rtps::cache::CacheChange;
use crate::structure::{DdsEntity, Duration, GUID};
use alloc::sync::Arc;
use core::time::Duration as CoreDuration;

/// a change received by a DataReader
pub type Sample = CacheChange;

/// DDS DataReader
#[derive(Clone)]
pub struct DataReader {
    core: Arc<ParticipantCore>,
    guid: GUID,
}

impl DdsEntity for DataReader {
    fn guid(&self) -> GUID {
        self.guid
    }
}

impl DataReader {
    pub(crate) fn new(core: Arc<ParticipantCore>, guid: GUID) -> Self {
        Self { core, guid }
    }

    /// remove and return every received sample
    pub fn take(&self) -> DdsResult<Vec<Sample>> {
        Ok(self.core.lock()?.tree.reader_mut(self.guid)?.cache.take_all())
    }

    /// block until at least `count` writers are matched
    pub fn wait_for_matched_publications(&self, count: usize, max_wait: Duration) -> DdsResult<()> {
        let guid = self.guid;
        let max_wait = max_wait.to_core_duration().unwrap_or(CoreDuration::MAX);
        self.core
            .wait_until(max_wait, "matched publications", |state| {
                state.tree.reader(guid)?;
                Ok(state.matches.records_of(guid).len() >= count)
            })
    }

    pub fn matched_publications(&self) -> DdsResult<Vec<GUID>> {
        let state = self.core.lock()?;
        state.tree.reader(self.guid)?;
        let remotes = state
            .matches
            .records_of(self.guid)
            .iter()
            .map(|r| r.remote)
            .collect();
        Ok(remotes)
    }

    pub fn get_subscription_matched_status(&self) -> DdsResult<SubscriptionMatchedStatus> {
        Ok(self
            .core
            .lock()?
            .tree
            .reader_mut(self.guid)?
            .subscription_matched
            .take())
    }

    pub fn get_requested_incompatible_qos_status(
        &self,
    ) -> DdsResult<RequestedIncompatibleQosStatus> {
        Ok(self
            .core
            .lock()?
            .tree
            .reader_mut(self.guid)?
            .requested_incompatible_qos
            .take())
    }

    pub fn get_qos(&self) -> DdsResult<DataReaderQosPolicies> {
        Ok(self.core.lock()?.tree.reader(self.guid)?.qos.clone())
    }

    pub fn set_qos(&self, qos: DataReaderQosPolicies) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.set_reader_qos(guid, qos, discovery_db, out))
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn DataReaderListener>>,
        mask: StatusMask,
    ) -> DdsResult<()> {
        let mut state = self.core.lock()?;
        state.tree.get_mut(self.guid)?.mask = mask;
        state.tree.reader_mut(self.guid)?.listener = listener;
        Ok(())
    }

    pub fn enable(&self) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.enable(guid, discovery_db, out))
    }

    pub fn get_topic(&self) -> DdsResult<Topic> {
        let topic = self.core.lock()?.tree.reader(self.guid)?.topic;
        Ok(Topic::new(self.core.clone(), topic))
    }

    pub fn get_subscriber(&self) -> DdsResult<Subscriber> {
        let parent = self.core.lock()?.tree.get(self.guid)?.parent;
        Ok(Subscriber::new(self.core.clone(), parent))
    }
}

use crate::dds::{
    core::ParticipantCore,
    listener::DataWriterListener,
    publisher::Publisher,
    qos::DataWriterQosPolicies,
    status::{OfferedIncompatibleQosStatus, PublicationMatchedStatus, StatusMask},
    topic::Topic,
};
use crate::error::DdsResult;
use crate::message::submessage::SequenceNumber;
use crate::structure::{DdsEntity, Duration, GUID};
use alloc::sync::Arc;
use bytes::Bytes;
use core::time::Duration as CoreDuration;

/// INFINITE or negative waits forever
fn wait_limit(max_wait: Duration) -> CoreDuration {
    max_wait.to_core_duration().unwrap_or(CoreDuration::MAX)
}

/// DDS DataWriter
#[derive(Clone)]
pub struct DataWriter {
    core: Arc<ParticipantCore>,
    guid: GUID,
}

impl DdsEntity for DataWriter {
    fn guid(&self) -> GUID {
        self.guid
    }
}

impl DataWriter {
    pub(crate) fn new(core: Arc<ParticipantCore>, guid: GUID) -> Self {
        Self { core, guid }
    }

    /// publish `payload` to every matched reader
    ///
    /// With a KeepAll history full of unacknowledged changes this blocks up to
    /// the Reliability max_blocking_time and then fails with `Timeout`.
    pub fn write(&self, payload: &[u8]) -> DdsResult<SequenceNumber> {
        self.core.write(self.guid, Bytes::copy_from_slice(payload))
    }

    /// block until every matched reliable reader acknowledged every written change
    pub fn wait_for_acknowledgments(&self, max_wait: Duration) -> DdsResult<()> {
        let guid = self.guid;
        self.core
            .wait_until(wait_limit(max_wait), "acknowledgments", |state| {
                Ok(state.tree.writer(guid)?.is_acked_by_all())
            })
    }

    /// block until at least `count` readers are matched
    pub fn wait_for_matched_subscriptions(&self, count: usize, max_wait: Duration) -> DdsResult<()> {
        let guid = self.guid;
        self.core
            .wait_until(wait_limit(max_wait), "matched subscriptions", |state| {
                state.tree.writer(guid)?;
                Ok(state.matches.records_of(guid).len() >= count)
            })
    }

    pub fn matched_subscriptions(&self) -> DdsResult<Vec<GUID>> {
        let state = self.core.lock()?;
        state.tree.writer(self.guid)?;
        let remotes = state
            .matches
            .records_of(self.guid)
            .iter()
            .map(|r| r.remote)
            .collect();
        Ok(remotes)
    }

    pub fn get_publication_matched_status(&self) -> DdsResult<PublicationMatchedStatus> {
        Ok(self
            .core
            .lock()?
            .tree
            .writer_mut(self.guid)?
            .publication_matched
            .take())
    }

    pub fn get_offered_incompatible_qos_status(&self) -> DdsResult<OfferedIncompatibleQosStatus> {
        Ok(self
            .core
            .lock()?
            .tree
            .writer_mut(self.guid)?
            .offered_incompatible_qos
            .take())
    }

    pub fn get_qos(&self) -> DdsResult<DataWriterQosPolicies> {
        Ok(self.core.lock()?.tree.writer(self.guid)?.qos.clone())
    }

    pub fn set_qos(&self, qos: DataWriterQosPolicies) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.set_writer_qos(guid, qos, discovery_db, out))
    }

    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn DataWriterListener>>,
        mask: StatusMask,
    ) -> DdsResult<()> {
        let mut state = self.core.lock()?;
        state.tree.get_mut(self.guid)?.mask = mask;
        state.tree.writer_mut(self.guid)?.listener = listener;
        Ok(())
    }

    pub fn enable(&self) -> DdsResult<()> {
        let guid = self.guid;
        let discovery_db = &self.core.discovery_db;
        self.core
            .with_state(|state, out| state.enable(guid, discovery_db, out))
    }

    pub fn get_topic(&self) -> DdsResult<Topic> {
        let topic = self.core.lock()?.tree.writer(self.guid)?.topic;
        Ok(Topic::new(self.core.clone(), topic))
    }

    pub fn get_publisher(&self) -> DdsResult<Publisher> {
        let parent = self.core.lock()?.tree.get(self.guid)?.parent;
        Ok(Publisher::new(self.core.clone(), parent))
    }
}

use crate::error::{IoError, IoResult};
use crate::network::{Destination, Transport};
use crate::structure::{DomainId, GuidPrefix};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use awkernel_sync::{mcs::MCSNode, mutex::Mutex};
use bytes::Bytes;
use log::{debug, trace};
use mio_extras::channel as mio_channel;

/// in-process transport
///
/// Multicast reaches every other participant opened in the same domain.
/// A muted participant keeps receiving but everything it sends is dropped,
/// which looks like a crashed peer to everybody else.
#[derive(Clone)]
pub struct LoopbackTransport {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LoopbackInner::default())),
        }
    }
}

#[derive(Default)]
struct LoopbackInner {
    inboxes: BTreeMap<(DomainId, GuidPrefix), mio_channel::Sender<Bytes>>,
    muted: BTreeSet<GuidPrefix>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_muted(&self, participant: GuidPrefix, muted: bool) {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        if muted {
            debug!("loopback: mute participant {}", participant);
            inner.muted.insert(participant);
        } else {
            inner.muted.remove(&participant);
        }
    }

    pub fn open_count(&self, domain_id: DomainId) -> usize {
        let mut node = MCSNode::new();
        let inner = self.inner.lock(&mut node);
        inner
            .inboxes
            .keys()
            .filter(|(d, _)| *d == domain_id)
            .count()
    }
}

impl Transport for LoopbackTransport {
    fn open(
        &self,
        domain_id: DomainId,
        local: GuidPrefix,
        inbox: mio_channel::Sender<Bytes>,
    ) -> IoResult<()> {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        if inner.inboxes.contains_key(&(domain_id, local)) {
            return Err(IoError::Transport(format!(
                "{} is already open in domain {}",
                local, domain_id
            )));
        }
        inner.inboxes.insert((domain_id, local), inbox);
        Ok(())
    }

    fn close(&self, domain_id: DomainId, local: GuidPrefix) {
        let mut node = MCSNode::new();
        let mut inner = self.inner.lock(&mut node);
        inner.inboxes.remove(&(domain_id, local));
        inner.muted.remove(&local);
    }

    fn send(
        &self,
        domain_id: DomainId,
        source: GuidPrefix,
        destination: Destination,
        message: Bytes,
    ) -> IoResult<()> {
        let mut node = MCSNode::new();
        let inner = self.inner.lock(&mut node);
        if inner.muted.contains(&source) {
            trace!("loopback: drop message from muted {}", source);
            return Ok(());
        }
        let targets: Vec<&mio_channel::Sender<Bytes>> = match destination {
            Destination::Multicast => inner
                .inboxes
                .iter()
                .filter(|((d, p), _)| *d == domain_id && *p != source)
                .map(|(_, s)| s)
                .collect(),
            Destination::Participant(p) => inner.inboxes.get(&(domain_id, p)).into_iter().collect(),
        };
        for t in targets {
            if let Err(e) = t.send(message.clone()) {
                trace!("loopback: failed to deliver message: {:?}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn prefix(n: u8) -> GuidPrefix {
        GuidPrefix {
            guid_prefix: [n; 12],
        }
    }

    #[test]
    fn test_multicast_stays_in_domain() {
        let transport = LoopbackTransport::new();
        let (a_tx, a_rx) = mio_channel::channel();
        let (b_tx, b_rx) = mio_channel::channel();
        let (c_tx, c_rx) = mio_channel::channel();
        transport.open(0, prefix(1), a_tx).unwrap();
        transport.open(0, prefix(2), b_tx).unwrap();
        transport.open(1, prefix(3), c_tx).unwrap();
        assert_eq!(transport.open_count(0), 2);

        transport
            .send(0, prefix(1), Destination::Multicast, Bytes::from_static(b"hi"))
            .unwrap();
        assert_eq!(b_rx.try_recv().unwrap(), Bytes::from_static(b"hi"));
        assert!(a_rx.try_recv().is_err());
        assert!(c_rx.try_recv().is_err());
    }

    #[test]
    fn test_muted_participant_is_silent() {
        let transport = LoopbackTransport::new();
        let (a_tx, _a_rx) = mio_channel::channel();
        let (b_tx, b_rx) = mio_channel::channel();
        transport.open(0, prefix(1), a_tx).unwrap();
        transport.open(0, prefix(2), b_tx).unwrap();
        transport.set_muted(prefix(1), true);
        transport
            .send(
                0,
                prefix(1),
                Destination::Participant(prefix(2)),
                Bytes::from_static(b"x"),
            )
            .unwrap();
        assert!(b_rx.try_recv().is_err());

        transport.set_muted(prefix(1), false);
        transport
            .send(
                0,
                prefix(1),
                Destination::Participant(prefix(2)),
                Bytes::from_static(b"y"),
            )
            .unwrap();
        assert_eq!(b_rx.try_recv().unwrap(), Bytes::from_static(b"y"));
    }
}

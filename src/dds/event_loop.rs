use crate::dds::core::{EventLoopCmd, ParticipantCore};
use crate::dds::tokens::*;
use crate::discovery::Discovery;
use crate::error::IoResult;
use crate::message::{submessage::Submessage, Message};
use crate::structure::Duration;
use alloc::sync::Arc;
use bytes::Bytes;
use core::time::Duration as CoreDuration;
use log::{debug, error, info, trace, warn};
use mio_extras::{channel as mio_channel, timer::Timer};
use mio_v06::{Events, Poll, PollOpt, Ready, Token};
use std::sync::mpsc::TryRecvError;
use std::time::Instant;

const LEASE_CHECK_PERIOD: CoreDuration = CoreDuration::from_millis(100);
const HEARTBEAT_PERIOD: CoreDuration = CoreDuration::from_millis(200);

/// event thread of one participant
///
/// receives the messages of the transport, runs discovery and the periodic
/// SPDP/SEDP announcement, lease checks and writer heartbeats.
pub(crate) struct EventLoop {
    poll: Poll,
    core: Arc<ParticipantCore>,
    discovery: Discovery,
    inbox: mio_channel::Receiver<Bytes>,
    commands: mio_channel::Receiver<EventLoopCmd>,
    announcement_period: CoreDuration,
    spdp_send_timer: Timer<()>,
    lease_check_timer: Timer<()>,
    writer_hb_timer: Timer<()>,
}

impl EventLoop {
    pub fn new(
        core: Arc<ParticipantCore>,
        inbox: mio_channel::Receiver<Bytes>,
        commands: mio_channel::Receiver<EventLoopCmd>,
        announcement_period: Duration,
    ) -> IoResult<Self> {
        let poll = Poll::new()?;
        poll.register(&inbox, INBOX_TOKEN, Ready::readable(), PollOpt::edge())?;
        poll.register(&commands, COMMAND_TOKEN, Ready::readable(), PollOpt::edge())?;
        let announcement_period = announcement_period
            .to_core_duration()
            .unwrap_or(CoreDuration::from_secs(3));
        let mut spdp_send_timer = Timer::default();
        spdp_send_timer.set_timeout(announcement_period, ());
        poll.register(
            &spdp_send_timer,
            SPDP_SEND_TIMER,
            Ready::readable(),
            PollOpt::edge(),
        )?;
        let mut lease_check_timer = Timer::default();
        lease_check_timer.set_timeout(LEASE_CHECK_PERIOD, ());
        poll.register(
            &lease_check_timer,
            LEASE_CHECK_TIMER,
            Ready::readable(),
            PollOpt::edge(),
        )?;
        let mut writer_hb_timer = Timer::default();
        writer_hb_timer.set_timeout(HEARTBEAT_PERIOD, ());
        poll.register(
            &writer_hb_timer,
            WRITER_HEARTBEAT_TIMER,
            Ready::readable(),
            PollOpt::edge(),
        )?;
        let discovery = Discovery::new(
            core.domain_id,
            core.guid.guid_prefix,
            core.discovery_db.clone(),
        );
        Ok(Self {
            poll,
            core,
            discovery,
            inbox,
            commands,
            announcement_period,
            spdp_send_timer,
            lease_check_timer,
            writer_hb_timer,
        })
    }

    pub fn event_loop(mut self) {
        let mut events = Events::with_capacity(1024);
        self.announce_participant();
        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                error!("event loop poll failed: {}", e);
                return;
            }
            for event in events.iter() {
                match event.token() {
                    INBOX_TOKEN => self.handle_inbox(),
                    COMMAND_TOKEN => loop {
                        match self.commands.try_recv() {
                            Ok(EventLoopCmd::AnnounceParticipant) => {
                                self.announce_participant();
                                self.spdp_send_timer
                                    .set_timeout(self.announcement_period, ());
                            }
                            Ok(EventLoopCmd::Stop) | Err(TryRecvError::Disconnected) => {
                                info!("event loop stopped\n\tParticipant: {}", self.core.guid);
                                return;
                            }
                            Err(TryRecvError::Empty) => break,
                        }
                    },
                    SPDP_SEND_TIMER => {
                        while self.spdp_send_timer.poll().is_some() {}
                        self.announce_participant();
                        self.spdp_send_timer
                            .set_timeout(self.announcement_period, ());
                    }
                    LEASE_CHECK_TIMER => {
                        while self.lease_check_timer.poll().is_some() {}
                        self.check_leases();
                        self.lease_check_timer.set_timeout(LEASE_CHECK_PERIOD, ());
                    }
                    WRITER_HEARTBEAT_TIMER => {
                        while self.writer_hb_timer.poll().is_some() {}
                        self.send_heartbeats();
                        self.writer_hb_timer.set_timeout(HEARTBEAT_PERIOD, ());
                    }
                    Token(n) => warn!("event loop: unknown token {}", n),
                }
            }
        }
    }

    fn announce_participant(&self) {
        let result = self.core.with_state(|state, out| {
            state.announce(out);
            Ok(())
        });
        match result {
            Ok(()) => trace!("SPDP and SEDP announced\n\tParticipant: {}", self.core.guid),
            Err(e) => warn!("failed to announce participant {}: {}", self.core.guid, e),
        }
    }

    fn check_leases(&self) {
        let events = self.discovery.check_leases(Instant::now());
        if events.is_empty() {
            return;
        }
        let discovery_db = &self.core.discovery_db;
        if let Err(e) = self.core.with_state(|state, out| {
            for event in events {
                state.on_discovery_event(event, discovery_db, out);
            }
            Ok(())
        }) {
            warn!("lease check: {}", e);
        }
    }

    fn send_heartbeats(&self) {
        if let Err(e) = self.core.with_state(|state, out| {
            state.heartbeat_tick(out);
            Ok(())
        }) {
            debug!("periodic heartbeat: {}", e);
        }
    }

    fn handle_inbox(&self) {
        loop {
            let bytes = match self.inbox.try_recv() {
                Ok(b) => b,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    debug!("inbox of {} is closed", self.core.guid);
                    return;
                }
            };
            let message = match Message::deserialize(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    warn!("drop undecodable message: {}", e);
                    continue;
                }
            };
            let source = message.header.guid_prefix;
            trace!(
                "received {}\n\tfrom: {}\n\tto: {}",
                message.submessage.kind_str(),
                source,
                self.core.guid
            );
            let discovery_events =
                self.discovery
                    .handle_message(source, &message.submessage, Instant::now());
            let discovery_db = &self.core.discovery_db;
            let result = self.core.with_state(|state, out| {
                for event in discovery_events {
                    state.on_discovery_event(event, discovery_db, out);
                }
                match message.submessage {
                    Submessage::Data(data) => state.on_data(data),
                    Submessage::Heartbeat(heartbeat) => state.on_heartbeat(heartbeat, out),
                    Submessage::AckNack(acknack) => state.on_acknack(acknack, out),
                    _ => (),
                }
                Ok(())
            });
            if let Err(e) = result {
                warn!("failed to handle message from {}: {}", source, e);
            }
        }
    }
}

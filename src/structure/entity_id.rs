use crate::structure::TopicKind;
use alloc::fmt;
use serde::{Deserialize, Serialize};
use speedy::{Readable, Writable};

// rtps spec 9.2.2
#[derive(
    PartialEq, Readable, Writable, Clone, Copy, Eq, Serialize, Deserialize, PartialOrd, Ord, Hash,
)]
pub struct EntityId {
    entity_key: [u8; 3],
    entity_kind: EntityKind,
}

impl EntityId {
    pub fn new(entity_key: [u8; 3], entity_kind: EntityKind) -> Self {
        Self {
            entity_key,
            entity_kind,
        }
    }

    pub fn is_reader(&self) -> bool {
        matches!(
            self.entity_kind,
            EntityKind::READER_WITH_KEY_BUILT_IN
                | EntityKind::READER_NO_KEY_BUILT_IN
                | EntityKind::READER_NO_KEY_USER_DEFIND
                | EntityKind::READER_WITH_KEY_USER_DEFIND
        )
    }

    pub fn is_writer(&self) -> bool {
        matches!(
            self.entity_kind,
            EntityKind::WRITER_WITH_KEY_BUILT_IN
                | EntityKind::WRITER_NO_KEY_BUILT_IN
                | EntityKind::WRITER_NO_KEY_USER_DEFIND
                | EntityKind::WRITER_WITH_KEY_USER_DEFIND
        )
    }

    pub fn is_publisher(&self) -> bool {
        self.entity_kind == EntityKind::PUBLISHER
    }

    pub fn is_subscriber(&self) -> bool {
        self.entity_kind == EntityKind::SUBSCRIBER
    }

    pub fn is_topic(&self) -> bool {
        self.entity_kind == EntityKind::TOPIC
    }

    pub fn topic_kind(&self) -> Option<TopicKind> {
        self.entity_kind.topic_kind()
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    pub fn entity_key(&self) -> [u8; 3] {
        self.entity_key
    }

    pub const UNKNOW: Self = Self {
        entity_key: [0x00; 3],
        entity_kind: EntityKind::UNKNOW_USER_DEFIND,
    };

    // rtps spec: 9.3.1.3 Predefined EntityIds
    pub const PARTICIPANT: Self = Self {
        entity_key: [0x00, 0x00, 0x01],
        entity_kind: EntityKind::PARTICIPANT_BUILT_IN,
    };

    pub const SEDP_BUILTIN_PUBLICATIONS_ANNOUNCER: Self = Self {
        entity_key: [0x00, 0x00, 0x03],
        entity_kind: EntityKind::WRITER_WITH_KEY_BUILT_IN,
    };

    pub const SEDP_BUILTIN_SUBSCRIPTIONS_ANNOUNCER: Self = Self {
        entity_key: [0x00, 0x00, 0x04],
        entity_kind: EntityKind::WRITER_WITH_KEY_BUILT_IN,
    };

    pub const SPDP_BUILTIN_PARTICIPANT_ANNOUNCER: Self = Self {
        entity_key: [0x00, 0x01, 0x00],
        entity_kind: EntityKind::WRITER_WITH_KEY_BUILT_IN,
    };
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOW => write!(f, "EntityId {{ UNKNOW }}"),
            Self::PARTICIPANT => write!(f, "EntityId {{ PARTICIPANT }}"),
            Self::SEDP_BUILTIN_PUBLICATIONS_ANNOUNCER => {
                write!(f, "EntityId {{ SEDP_BUILTIN_PUBLICATIONS_ANNOUNCER }}")
            }
            Self::SEDP_BUILTIN_SUBSCRIPTIONS_ANNOUNCER => {
                write!(f, "EntityId {{ SEDP_BUILTIN_SUBSCRIPTIONS_ANNOUNCER }}")
            }
            Self::SPDP_BUILTIN_PARTICIPANT_ANNOUNCER => {
                write!(f, "EntityId {{ SPDP_BUILTIN_PARTICIPANT_ANNOUNCER }}")
            }
            _ => write!(
                f,
                "EntityId {{ entity_key: {:02X}{:02X}{:02X}, entity_kind: {:?} }}",
                self.entity_key[0], self.entity_key[1], self.entity_key[2], self.entity_kind
            ),
        }
    }
}

#[derive(
    PartialEq, Readable, Writable, Clone, Copy, Eq, Serialize, Deserialize, PartialOrd, Ord, Hash,
)]
pub struct EntityKind {
    value: u8,
}

impl EntityKind {
    // rtps spec 9.3.1.2
    pub const UNKNOW_USER_DEFIND: Self = Self { value: 0x00 };
    pub const WRITER_WITH_KEY_USER_DEFIND: Self = Self { value: 0x02 };
    pub const WRITER_NO_KEY_USER_DEFIND: Self = Self { value: 0x03 };
    pub const READER_NO_KEY_USER_DEFIND: Self = Self { value: 0x04 };
    pub const READER_WITH_KEY_USER_DEFIND: Self = Self { value: 0x07 };

    pub const PARTICIPANT_BUILT_IN: Self = Self { value: 0xc1 };
    pub const WRITER_WITH_KEY_BUILT_IN: Self = Self { value: 0xc2 };
    pub const WRITER_NO_KEY_BUILT_IN: Self = Self { value: 0xc3 };
    pub const READER_NO_KEY_BUILT_IN: Self = Self { value: 0xc4 };
    pub const READER_WITH_KEY_BUILT_IN: Self = Self { value: 0xc7 };

    // vendor specific kinds (0x40..0x7f)
    pub const PUBLISHER: Self = Self { value: 0x40 };
    pub const SUBSCRIBER: Self = Self { value: 0x41 };
    pub const TOPIC: Self = Self { value: 0x45 };

    pub fn writer(topic_kind: TopicKind) -> Self {
        match topic_kind {
            TopicKind::WithKey => Self::WRITER_WITH_KEY_USER_DEFIND,
            TopicKind::NoKey => Self::WRITER_NO_KEY_USER_DEFIND,
        }
    }

    pub fn reader(topic_kind: TopicKind) -> Self {
        match topic_kind {
            TopicKind::WithKey => Self::READER_WITH_KEY_USER_DEFIND,
            TopicKind::NoKey => Self::READER_NO_KEY_USER_DEFIND,
        }
    }

    fn topic_kind(&self) -> Option<TopicKind> {
        match *self {
            Self::WRITER_WITH_KEY_USER_DEFIND
            | Self::WRITER_WITH_KEY_BUILT_IN
            | Self::READER_WITH_KEY_USER_DEFIND
            | Self::READER_WITH_KEY_BUILT_IN => Some(TopicKind::WithKey),
            Self::WRITER_NO_KEY_USER_DEFIND
            | Self::WRITER_NO_KEY_BUILT_IN
            | Self::READER_NO_KEY_USER_DEFIND
            | Self::READER_NO_KEY_BUILT_IN => Some(TopicKind::NoKey),
            _ => None,
        }
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOW_USER_DEFIND => write!(f, "UNKNOW_USER_DEFIND(0x00)"),
            Self::WRITER_WITH_KEY_USER_DEFIND => write!(f, "WRITER_WITH_KEY_USER_DEFIND(0x02)"),
            Self::WRITER_NO_KEY_USER_DEFIND => write!(f, "WRITER_NO_KEY_USER_DEFIND(0x03)"),
            Self::READER_NO_KEY_USER_DEFIND => write!(f, "READER_NO_KEY_USER_DEFIND(0x04)"),
            Self::READER_WITH_KEY_USER_DEFIND => write!(f, "READER_WITH_KEY_USER_DEFIND(0x07)"),
            Self::PARTICIPANT_BUILT_IN => write!(f, "PARTICIPANT_BUILT_IN(0xC1)"),
            Self::WRITER_WITH_KEY_BUILT_IN => write!(f, "WRITER_WITH_KEY_BUILT_IN(0xC2)"),
            Self::WRITER_NO_KEY_BUILT_IN => write!(f, "WRITER_NO_KEY_BUILT_IN(0xC3)"),
            Self::READER_NO_KEY_BUILT_IN => write!(f, "READER_NO_KEY_BUILT_IN(0xC4)"),
            Self::READER_WITH_KEY_BUILT_IN => write!(f, "READER_WITH_KEY_BUILT_IN(0xC7)"),
            Self::PUBLISHER => write!(f, "PUBLISHER(0x40)"),
            Self::SUBSCRIBER => write!(f, "SUBSCRIBER(0x41)"),
            Self::TOPIC => write!(f, "TOPIC(0x45)"),
            _ => write!(f, "OTHER(0x{:02X})", self.value),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_entity_kind_classification() {
        let w = EntityId::new([0, 3, 0], EntityKind::writer(TopicKind::NoKey));
        let r = EntityId::new([0, 3, 1], EntityKind::reader(TopicKind::WithKey));
        assert!(w.is_writer() && !w.is_reader());
        assert!(r.is_reader() && !r.is_writer());
        assert_eq!(r.topic_kind(), Some(TopicKind::WithKey));
        assert!(EntityId::new([0, 3, 2], EntityKind::TOPIC).is_topic());
        assert_eq!(EntityId::PARTICIPANT.topic_kind(), None);
    }
}

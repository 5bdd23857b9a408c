//! wire framing of the messages exchanged between participants
//!
//! A message is the speedy encoded [`Header`] followed by one CDR (little
//! endian) encoded [`Submessage`].

pub(crate) mod message_header;
pub(crate) mod submessage;

use crate::error::{IoError, IoResult};
use crate::structure::GuidPrefix;
use bytes::Bytes;
use cdr::{CdrLe, Infinite};
use message_header::{Header, ProtocolId};
use speedy::{Endianness, Readable, Writable};
use submessage::Submessage;

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub header: Header,
    pub submessage: Submessage,
}

impl Message {
    pub fn new(guid_prefix: GuidPrefix, submessage: Submessage) -> Self {
        Self {
            header: Header::new(guid_prefix),
            submessage,
        }
    }

    pub fn serialize(&self) -> IoResult<Bytes> {
        let mut buf = self
            .header
            .write_to_vec_with_ctx(Endianness::LittleEndian)?;
        buf.extend(cdr::serialize::<_, _, CdrLe>(&self.submessage, Infinite)?);
        Ok(Bytes::from(buf))
    }

    pub fn deserialize(buf: &[u8]) -> IoResult<Self> {
        if buf.len() < Header::LENGTH {
            return Err(IoError::Transport(format!(
                "message too short: {} octets",
                buf.len()
            )));
        }
        let header =
            Header::read_from_buffer_with_ctx(Endianness::LittleEndian, &buf[..Header::LENGTH])?;
        if header.protocol != ProtocolId::PROTOCOLVID {
            return Err(IoError::Transport("not an RTPS message".to_string()));
        }
        let submessage = cdr::deserialize::<Submessage>(&buf[Header::LENGTH..])?;
        Ok(Self { header, submessage })
    }
}

use mio_v06::Token;

// tokens of the participant event loop
pub const PTB: usize = 0x40;
pub const INBOX_TOKEN: Token = Token(PTB);
pub const COMMAND_TOKEN: Token = Token(PTB + 0x1);
pub const SPDP_SEND_TIMER: Token = Token(PTB + 0x2);
pub const LEASE_CHECK_TIMER: Token = Token(PTB + 0x3);
pub const WRITER_HEARTBEAT_TIMER: Token = Token(PTB + 0x4);

// tokens of the listener dispatcher
pub const DISPATCH_TOKEN: Token = Token(PTB + 0x10);

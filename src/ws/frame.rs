//! RFC 6455 framing: opcode enum, masked client->server TX framer, and
//! the server->client RX parser. Adapted from the teacher's
//! `frame.rs`/`read.rs`/`write.rs`, narrowed to the subset spec.md
//! allows: no fragmentation, no compression, `BINARY`/`PING`/`CLOSE`
//! inbound only.

use rand::RngCore;

use crate::error::WsError;
use crate::ringbuf::RingBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Other(u8),
}

impl OpCode {
    pub fn from_nibble(byte: u8) -> Self {
        match byte {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            other => OpCode::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
            OpCode::Other(b) => *b,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

/// Builds one complete `FIN=1, MASK=1` client-to-server frame with a
/// fresh random 32-bit mask. Header is 2, 4, or 10 bytes depending on
/// payload length per RFC 6455 §5.2, plus the 4-byte mask.
pub fn encode_client_frame(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mut mask = [0u8; 4];
    loop {
        rand::rng().fill_bytes(&mut mask);
        if mask != [0, 0, 0, 0] {
            break;
        }
    }
    encode_client_frame_with_mask(opcode, payload, mask)
}

pub fn encode_client_frame_with_mask(opcode: OpCode, payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
    let len = payload.len();
    let mut out = Vec::with_capacity(header_len(len) + 4 + len);
    out.push(0x80 | opcode.as_u8());
    if len <= 125 {
        out.push(0x80 | len as u8);
    } else if len <= 65535 {
        out.push(0x80 | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0x80 | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
    out.extend_from_slice(&mask);
    out.extend(payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));
    out
}

fn header_len(payload_len: usize) -> usize {
    if payload_len <= 125 {
        2
    } else if payload_len <= 65535 {
        4
    } else {
        10
    }
}

/// Queues one client-to-server frame into `tx_buf`, whole or not at
/// all. A frame's header declares the payload length up front, so
/// writing only part of the masked payload would corrupt the stream's
/// framing for every frame after it — there is no such thing as a
/// short write here. Returns `WsError::BufferFull` without touching
/// `tx_buf` when the complete header+mask+payload doesn't currently
/// fit; the caller retries the same, unmodified payload later.
pub fn queue_frame(tx_buf: &mut RingBuf, opcode: OpCode, payload: &[u8]) -> Result<usize, WsError> {
    let frame = encode_client_frame(opcode, payload);
    if tx_buf.bytes_free() < frame.len() {
        return Err(WsError::BufferFull);
    }
    let written = tx_buf.push_partial(&frame);
    debug_assert_eq!(written, frame.len(), "checked bytes_free above, push_partial must take it all");
    Ok(payload.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    First2Bytes,
    ExtLen16,
    ExtLen64,
    MaskKey,
    Payload,
}

#[derive(Debug)]
pub struct RxFrame {
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

/// Incremental RX frame parser over `WsClient::rx_buf`. One instance
/// survives across `process()` calls so a frame spanning multiple TLS
/// reads resumes correctly.
pub struct FrameParser {
    state: RxState,
    opcode: OpCode,
    fin: bool,
    rsv_seen: bool,
    base_len: u8,
    payload_len: usize,
    payload: Vec<u8>,
    header_scratch: Vec<u8>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: RxState::First2Bytes,
            opcode: OpCode::Binary,
            fin: true,
            rsv_seen: false,
            base_len: 0,
            payload_len: 0,
            payload: Vec::new(),
            header_scratch: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.state = RxState::First2Bytes;
        self.payload.clear();
        self.header_scratch.clear();
        self.payload_len = 0;
    }

    /// Drives the state machine as far as `rx_buf`'s readable bytes
    /// allow. Returns `Some(frame)` once a full frame has been parsed,
    /// leaving any further bytes in `rx_buf` for the next call.
    pub fn advance(&mut self, rx_buf: &mut RingBuf) -> Result<Option<RxFrame>, WsError> {
        loop {
            match self.state {
                RxState::First2Bytes => {
                    if rx_buf.bytes_available() < 2 {
                        return Ok(None);
                    }
                    let mut hdr = [0u8; 2];
                    rx_buf.pop(&mut hdr);
                    self.fin = hdr[0] & 0x80 != 0;
                    self.rsv_seen = hdr[0] & 0x70 != 0;
                    if self.rsv_seen {
                        return Err(WsError::RsvNotZero);
                    }
                    self.opcode = OpCode::from_nibble(hdr[0] & 0x0F);
                    if !self.fin {
                        return Err(WsError::Fragmented);
                    }
                    let masked = hdr[1] & 0x80 != 0;
                    if masked {
                        return Err(WsError::MaskedServerFrame);
                    }
                    self.base_len = hdr[1] & 0x7F;
                    self.state = match self.base_len {
                        126 => RxState::ExtLen16,
                        127 => RxState::ExtLen64,
                        n => {
                            self.payload_len = n as usize;
                            RxState::Payload
                        }
                    };
                }
                RxState::ExtLen16 => {
                    if rx_buf.bytes_available() < 2 {
                        return Ok(None);
                    }
                    let mut b = [0u8; 2];
                    rx_buf.pop(&mut b);
                    self.payload_len = u16::from_be_bytes(b) as usize;
                    self.state = RxState::Payload;
                }
                RxState::ExtLen64 => {
                    if rx_buf.bytes_available() < 8 {
                        return Ok(None);
                    }
                    let mut b = [0u8; 8];
                    rx_buf.pop(&mut b);
                    self.payload_len = u64::from_be_bytes(b) as usize;
                    self.state = RxState::Payload;
                }
                RxState::MaskKey => unreachable!("server frames are never masked"),
                RxState::Payload => {
                    if self.opcode == OpCode::Close && self.payload_len == 1 {
                        return Err(WsError::InvalidClosePayload);
                    }
                    let want = self.payload_len - self.payload.len();
                    if want == 0 && self.payload_len == 0 {
                        let frame = RxFrame {
                            opcode: self.opcode,
                            payload: Vec::new(),
                        };
                        self.reset();
                        return Ok(Some(frame));
                    }
                    let avail = rx_buf.bytes_available();
                    if avail == 0 {
                        return Ok(None);
                    }
                    let take = want.min(avail);
                    let mut chunk = vec![0u8; take];
                    rx_buf.pop(&mut chunk);
                    self.payload.extend_from_slice(&chunk);
                    if self.payload.len() == self.payload_len {
                        let frame = RxFrame {
                            opcode: self.opcode,
                            payload: std::mem::take(&mut self.payload),
                        };
                        self.reset();
                        return Ok(Some(frame));
                    }
                    return Ok(None);
                }
            }
        }
    }
}

/// Reference unmasking helper, used by tests to verify round-trips
/// without constructing a second `FrameParser`.
pub fn unmask(payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
    payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]).collect()
}

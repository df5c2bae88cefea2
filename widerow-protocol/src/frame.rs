//! Binary frame format for read streams.
//!
//! Frame layout (18 bytes header + optional header extension + payload):
//!
//! ```text
//! +--------+---------+--------+------------+-------------+--------+
//! | magic  | version | flags  | header_len | payload_len | crc32c |
//! | 4 bytes| 2 bytes |2 bytes |  2 bytes   |   4 bytes   | 4 bytes|
//! +--------+---------+--------+------------+-------------+--------+
//! | [header_ext] | payload                                        |
//! | header_len   | payload_len bytes                              |
//! +--------------+------------------------------------------------+
//! ```
//!
//! All integers are big-endian. The CRC covers the payload only.

use crate::error::WireError;
use crate::MAX_PAYLOAD_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Magic bytes identifying widerow frames.
pub const MAGIC: [u8; 4] = *b"WROW";

/// Size of the fixed frame header in bytes (4+2+2+2+4+4 = 18).
pub const FRAME_HEADER_SIZE: usize = 18;

/// Frame flags bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u16);

impl FrameFlags {
    /// CRC32C checksum is present and valid.
    pub const CRC_PRESENT: u16 = 1 << 0;
    /// Payload is compressed (reserved).
    pub const COMPRESSED: u16 = 1 << 1;
    /// Frame belongs to a server stream.
    pub const STREAM: u16 = 1 << 2;
    /// Last frame of a server stream.
    pub const END_STREAM: u16 = 1 << 3;

    const VALID_V1_MASK: u16 = 0x000F;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_crc(mut self) -> Self {
        self.0 |= Self::CRC_PRESENT;
        self
    }

    pub fn with_stream(mut self) -> Self {
        self.0 |= Self::STREAM;
        self
    }

    pub fn with_end_stream(mut self) -> Self {
        self.0 |= Self::STREAM | Self::END_STREAM;
        self
    }

    pub fn has_crc(&self) -> bool {
        self.0 & Self::CRC_PRESENT != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn is_stream(&self) -> bool {
        self.0 & Self::STREAM != 0
    }

    pub fn is_end_stream(&self) -> bool {
        self.0 & Self::END_STREAM != 0
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> Result<Self, WireError> {
        if bits & !Self::VALID_V1_MASK != 0 {
            return Err(WireError::InvalidFlags(bits));
        }
        Ok(Self(bits))
    }
}

/// Fixed-size header fields, parsed before the frame body is available.
struct Header {
    flags: FrameFlags,
    header_len: usize,
    payload_len: usize,
    crc: u32,
}

impl Header {
    fn parse(buf: &[u8]) -> Result<Self, WireError> {
        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != MAGIC {
            return Err(WireError::InvalidMagic(magic));
        }

        let version = u16::from_be_bytes([buf[4], buf[5]]);
        if version != crate::PROTOCOL_VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }

        let flags = FrameFlags::from_bits(u16::from_be_bytes([buf[6], buf[7]]))?;
        let header_len = u16::from_be_bytes([buf[8], buf[9]]) as usize;
        let payload_len = u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]);
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(WireError::FrameTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let crc = u32::from_be_bytes([buf[14], buf[15], buf[16], buf[17]]);

        Ok(Self {
            flags,
            header_len,
            payload_len: payload_len as usize,
            crc,
        })
    }

    fn frame_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.header_len + self.payload_len
    }
}

/// A parsed frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub flags: FrameFlags,
    /// Optional opaque header extension; clients put a request id here.
    pub header_extension: Bytes,
    /// JSON payload.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a CRC-protected frame with the given payload.
    pub fn new(payload: Bytes) -> Self {
        Self {
            flags: FrameFlags::new().with_crc(),
            header_extension: Bytes::new(),
            payload,
        }
    }

    /// Creates a frame from a JSON-serializable value.
    pub fn from_json<T: serde::Serialize>(value: &T) -> Result<Self, WireError> {
        let payload = serde_json::to_vec(value)?;
        Ok(Self::new(Bytes::from(payload)))
    }

    pub fn with_flags(mut self, flags: FrameFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_header_extension(mut self, extension: Bytes) -> Self {
        self.header_extension = extension;
        self
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, WireError> {
        let payload_len = u32::try_from(self.payload.len())
            .ok()
            .filter(|len| *len <= MAX_PAYLOAD_SIZE)
            .ok_or(WireError::FrameTooLarge {
                size: u32::try_from(self.payload.len()).unwrap_or(u32::MAX),
                max: MAX_PAYLOAD_SIZE,
            })?;
        let header_len = u16::try_from(self.header_extension.len())
            .map_err(|_| WireError::InvalidArgument("header extension too long".to_string()))?;

        let crc = if self.flags.has_crc() {
            crc32c::crc32c(&self.payload)
        } else {
            0
        };

        let mut buf = BytesMut::with_capacity(
            FRAME_HEADER_SIZE + self.header_extension.len() + self.payload.len(),
        );
        buf.put_slice(&MAGIC);
        buf.put_u16(crate::PROTOCOL_VERSION);
        buf.put_u16(self.flags.bits());
        buf.put_u16(header_len);
        buf.put_u32(payload_len);
        buf.put_u32(crc);
        buf.put_slice(&self.header_extension);
        buf.put_slice(&self.payload);

        Ok(buf)
    }

    /// Decodes a frame from the front of `buf`.
    ///
    /// Returns `Ok(Some(frame))` and consumes its bytes once a complete frame
    /// is buffered, `Ok(None)` if more data is needed, or `Err` if the bytes
    /// cannot be a valid frame.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, WireError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let header = Header::parse(&buf[..FRAME_HEADER_SIZE])?;
        if buf.len() < header.frame_len() {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let header_extension = buf.split_to(header.header_len).freeze();
        let payload = buf.split_to(header.payload_len).freeze();

        if header.flags.has_crc() {
            let actual = crc32c::crc32c(&payload);
            if actual != header.crc {
                return Err(WireError::CrcMismatch {
                    expected: header.crc,
                    actual,
                });
            }
        }

        Ok(Some(Self {
            flags: header.flags,
            header_extension,
            payload,
        }))
    }
}

//! Encoder and decoder for read-stream frames and messages.

use crate::error::WireError;
use crate::frame::{Frame, FrameFlags};
use crate::message::{ReadRowsRequest, StreamMessage};
use bytes::BytesMut;

/// Encodes requests and stream messages into frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a read request into a frame.
    pub fn encode_request(request: &ReadRowsRequest) -> Result<BytesMut, WireError> {
        Frame::from_json(request)?.encode()
    }

    /// Encodes a server stream message. Status messages carry `END_STREAM`.
    pub fn encode_message(message: &StreamMessage) -> Result<BytesMut, WireError> {
        let flags = if message.is_end_of_stream() {
            FrameFlags::new().with_crc().with_end_stream()
        } else {
            FrameFlags::new().with_crc().with_stream()
        };
        Frame::from_json(message)?.with_flags(flags).encode()
    }

    /// Encodes any JSON-serializable value into a frame.
    pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<BytesMut, WireError> {
        Frame::from_json(value)?.encode()
    }
}

fn payload_str(frame: &Frame) -> Result<&str, WireError> {
    std::str::from_utf8(&frame.payload).map_err(|_| WireError::InvalidUtf8)
}

/// Buffers incoming bytes and decodes complete frames from them.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, WireError> {
        Frame::decode(&mut self.buffer)
    }

    /// Attempts to decode the next read request from the buffer.
    pub fn decode_request(&mut self) -> Result<Option<ReadRowsRequest>, WireError> {
        match self.decode_frame()? {
            Some(frame) => Ok(Some(serde_json::from_str(payload_str(&frame)?)?)),
            None => Ok(None),
        }
    }

    /// Attempts to decode the next stream message from the buffer.
    ///
    /// Fails if the frame's end-of-stream flag disagrees with the message:
    /// only a status message may close a stream.
    pub fn decode_message(&mut self) -> Result<Option<StreamMessage>, WireError> {
        let Some(frame) = self.decode_frame()? else {
            return Ok(None);
        };
        let message: StreamMessage = serde_json::from_str(payload_str(&frame)?)?;
        if frame.flags.is_end_stream() != message.is_end_of_stream() {
            return Err(WireError::StreamFlagMismatch);
        }
        Ok(Some(message))
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Line-delimited JSON, used for captured chunk streams.
pub mod jsonl {
    use super::*;

    /// Encodes a value as a JSON line (no framing).
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
        let mut bytes = serde_json::to_vec(value)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Line-delimited JSON decoder. Blank lines are skipped.
    pub struct LineDecoder {
        buffer: Vec<u8>,
    }

    impl LineDecoder {
        pub fn new() -> Self {
            Self {
                buffer: Vec::with_capacity(4096),
            }
        }

        pub fn extend(&mut self, data: &[u8]) {
            self.buffer.extend_from_slice(data);
        }

        /// Attempts to decode the next complete JSON line.
        pub fn decode_line<T: serde::de::DeserializeOwned>(
            &mut self,
        ) -> Result<Option<T>, WireError> {
            while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                if let Some(value) = parse_line(&line[..line.len() - 1])? {
                    return Ok(Some(value));
                }
            }
            Ok(None)
        }

        /// Decodes a final line that was not terminated by a newline.
        pub fn finish<T: serde::de::DeserializeOwned>(&mut self) -> Result<Option<T>, WireError> {
            let line = std::mem::take(&mut self.buffer);
            parse_line(&line)
        }
    }

    impl Default for LineDecoder {
        fn default() -> Self {
            Self::new()
        }
    }

    fn parse_line<T: serde::de::DeserializeOwned>(line: &[u8]) -> Result<Option<T>, WireError> {
        let json = std::str::from_utf8(line).map_err(|_| WireError::InvalidUtf8)?;
        if json.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(json)?))
    }
}

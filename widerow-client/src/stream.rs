//! Server response streams.

use crate::error::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use widerow_protocol::{Decoder, ReadRowsResponse, StreamMessage};

/// A source of read-rows responses.
pub trait ResponseStream: Send {
    /// Returns the next response, or `Ok(None)` once the server closed the
    /// stream with an OK status.
    fn next_response(
        &mut self,
    ) -> impl Future<Output = Result<Option<ReadRowsResponse>, ClientError>> + Send;
}

/// Decodes framed stream messages from a byte stream.
pub struct FramedResponseStream<R> {
    reader: R,
    decoder: Decoder,
    buf: Vec<u8>,
    read_timeout: Duration,
    finished: bool,
}

impl<R> FramedResponseStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, read_timeout: Duration, read_buffer_size: usize) -> Self {
        Self {
            reader,
            decoder: Decoder::new(),
            buf: vec![0u8; read_buffer_size],
            read_timeout,
            finished: false,
        }
    }

    /// Returns true once the end-of-stream status was received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> ResponseStream for FramedResponseStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_response(&mut self) -> Result<Option<ReadRowsResponse>, ClientError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if let Some(message) = self.decoder.decode_message()? {
                match message {
                    StreamMessage::Rows(response) => {
                        tracing::trace!(chunks = response.chunks.len(), "response received");
                        return Ok(Some(response));
                    }
                    StreamMessage::Status(status) => {
                        self.finished = true;
                        tracing::debug!(code = %status.code, "stream closed by server");
                        if status.is_ok() {
                            return Ok(None);
                        }
                        return Err(ClientError::Status {
                            code: status.code,
                            message: status.message,
                        });
                    }
                }
            }

            let n = tokio::time::timeout(self.read_timeout, self.reader.read(&mut self.buf))
                .await
                .map_err(|_| {
                    tracing::debug!("Read timeout");
                    ClientError::Timeout
                })??;

            if n == 0 {
                tracing::debug!(
                    buffered = self.decoder.buffered(),
                    "connection closed before end of stream"
                );
                return Err(ClientError::ConnectionClosed);
            }
            self.decoder.extend(&self.buf[..n]);
        }
    }
}

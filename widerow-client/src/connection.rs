//! Connection management.

use crate::error::ClientError;
use crate::stream::FramedResponseStream;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;
use widerow_protocol::{Frame, ReadRowsRequest};

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Maximum wait for a single socket read or request write.
    pub read_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

/// Writes one request frame, tagged with a fresh request id in the header
/// extension. Returns the id.
pub async fn send_request<W>(writer: &mut W, request: &ReadRowsRequest) -> Result<Uuid, ClientError>
where
    W: AsyncWrite + Unpin,
{
    let request_id = Uuid::new_v4();
    let encoded = Frame::from_json(request)?
        .with_header_extension(Bytes::copy_from_slice(request_id.as_bytes()))
        .encode()?;

    writer.write_all(&encoded).await?;
    writer.flush().await?;
    tracing::debug!(
        %request_id,
        table = %request.table_name,
        bytes = encoded.len(),
        "read request sent"
    );
    Ok(request_id)
}

/// A connection to a widerow server. Each connection carries one read.
pub struct Connection {
    config: ConnectionConfig,
    stream: TcpStream,
}

impl Connection {
    /// Connects to the server.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        tracing::debug!("Connecting to {}...", config.addr);

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.addr))
            .await
            .map_err(|_| {
                tracing::debug!("Connection timeout");
                ClientError::Timeout
            })?
            .map_err(|e| {
                tracing::debug!("Connection failed: {}", e);
                ClientError::Io(e)
            })?;

        // Requests are small and latency bound.
        stream.set_nodelay(true).ok();
        tracing::debug!("TCP connected to {}", config.addr);

        Ok(Self { config, stream })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Sends `request` and returns the stream of responses to it.
    pub async fn read_rows(
        mut self,
        request: &ReadRowsRequest,
    ) -> Result<FramedResponseStream<TcpStream>, ClientError> {
        tokio::time::timeout(
            self.config.read_timeout,
            send_request(&mut self.stream, request),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        Ok(FramedResponseStream::new(
            self.stream,
            self.config.read_timeout,
            self.config.read_buffer_size,
        ))
    }
}

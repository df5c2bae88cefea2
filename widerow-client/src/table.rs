//! High-level read API for one table.

use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::reader::RowReader;
use crate::stream::FramedResponseStream;
use bytes::Bytes;
use tokio::net::TcpStream;
use widerow_core::Row;
use widerow_protocol::{Filter, ReadRowsRequest, RowSet};

/// Reader returned by [`Table::read_rows`].
pub type TableRowReader = RowReader<FramedResponseStream<TcpStream>>;

/// A handle for reading one table. Each read opens its own connection.
#[derive(Debug, Clone)]
pub struct Table {
    connection: ConnectionConfig,
    table_name: String,
    app_profile_id: Option<String>,
    default_rows_limit: u64,
}

impl Table {
    pub fn new(config: &ClientConfig, table_id: &str) -> Self {
        Self {
            connection: config.connection_config(),
            table_name: config.table_name(table_id),
            app_profile_id: config.table.app_profile.clone(),
            default_rows_limit: config.read.rows_limit,
        }
    }

    /// Fully qualified table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn app_profile_id(&self) -> Option<&str> {
        self.app_profile_id.as_deref()
    }

    /// Builds the request sent for a read.
    pub fn request(&self, rows: RowSet, rows_limit: u64, filter: Filter) -> ReadRowsRequest {
        let mut request = ReadRowsRequest::new(self.table_name.clone())
            .with_rows(rows)
            .with_rows_limit(rows_limit)
            .with_filter(filter);
        request.app_profile_id = self.app_profile_id.clone();
        request
    }

    /// Streams the rows in `rows` that pass `filter`, up to the configured
    /// default row limit.
    pub async fn read_rows(&self, rows: RowSet, filter: Filter) -> Result<TableRowReader, ClientError> {
        self.read_rows_with_limit(rows, self.default_rows_limit, filter)
            .await
    }

    /// Streams at most `rows_limit` rows; 0 means no limit.
    pub async fn read_rows_with_limit(
        &self,
        rows: RowSet,
        rows_limit: u64,
        filter: Filter,
    ) -> Result<TableRowReader, ClientError> {
        let request = self.request(rows, rows_limit, filter);
        let connection = Connection::connect(self.connection.clone()).await?;
        let stream = connection.read_rows(&request).await?;
        Ok(RowReader::new(stream).with_rows_limit(rows_limit))
    }

    /// Reads a single row. Returns `None` if no row with that key passes
    /// the filter.
    pub async fn read_row(
        &self,
        row_key: impl Into<Bytes>,
        filter: Filter,
    ) -> Result<Option<Row>, ClientError> {
        let request = self.request(RowSet::single(row_key), 1, filter);
        let connection = Connection::connect(self.connection.clone()).await?;
        let stream = connection.read_rows(&request).await?;

        // Drain the whole stream so a misbehaving server is noticed.
        let mut rows = RowReader::new(stream).collect_rows().await?;
        if rows.len() > 1 {
            return Err(ClientError::TooManyRows(rows.len()));
        }
        Ok(rows.pop())
    }
}

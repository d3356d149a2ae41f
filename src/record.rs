use crate::{error::TargetError, input::Target, tls::LeafCertificate};
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{future::Future, io, str::FromStr};
use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt},
};
use tracing::error;

/// One inventoried endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub origin_host: String,
    pub origin_ip: String,
    pub certificate: LeafCertificate,
}

impl InventoryRecord {
    #[must_use]
    pub const fn new(origin_host: String, origin_ip: String, certificate: LeafCertificate) -> Self {
        Self {
            origin_host,
            origin_ip,
            certificate,
        }
    }

    /// Record for a target, the input only carries one of host or IP so both
    /// origin fields hold it.
    #[must_use]
    pub fn for_target(target: &Target, certificate: LeafCertificate) -> Self {
        Self::new(
            target.host_or_ip.clone(),
            target.host_or_ip.clone(),
            certificate,
        )
    }
}

/// Layout of the output sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Tab-indented JSON records appended back to back, no delimiter
    #[default]
    Legacy,
    /// One compact JSON record per line
    Lines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "lines" => Ok(Self::Lines),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl OutputFormat {
    /// Serialize one record in this layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized
    pub fn encode(self, record: &InventoryRecord) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Legacy => {
                let mut buf = Vec::new();
                let mut ser =
                    Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
                record.serialize(&mut ser)?;
                Ok(buf)
            }
            Self::Lines => {
                let mut buf = serde_json::to_vec(record)?;
                buf.push(b'\n');
                Ok(buf)
            }
        }
    }
}

/// Append-only destination of inventory records that can drop a torn record
pub trait OutputSink: AsyncWrite + Unpin {
    /// Bytes currently committed to the sink
    fn end_offset(&mut self) -> impl Future<Output = io::Result<u64>>;

    /// Drop everything written after `offset`
    fn rollback(&mut self, offset: u64) -> impl Future<Output = io::Result<()>>;
}

impl OutputSink for File {
    async fn end_offset(&mut self) -> io::Result<u64> {
        Ok(self.metadata().await?.len())
    }

    async fn rollback(&mut self, offset: u64) -> io::Result<()> {
        self.set_len(offset).await
    }
}

impl OutputSink for Vec<u8> {
    async fn end_offset(&mut self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    async fn rollback(&mut self, offset: u64) -> io::Result<()> {
        let len = usize::try_from(offset).map_err(io::Error::other)?;
        self.truncate(len);
        Ok(())
    }
}

/// Appends inventory records to the output sink
#[derive(Debug)]
pub struct Recorder<W> {
    sink: W,
    format: OutputFormat,
}

impl<W: OutputSink> Recorder<W> {
    #[must_use]
    pub const fn new(sink: W, format: OutputFormat) -> Self {
        Self { sink, format }
    }

    /// Serialize and append one record, flushing the sink.
    ///
    /// A record that fails part way is removed again, the sink only ever holds
    /// whole records.
    ///
    /// # Errors
    ///
    /// Returns an `output-error` if the record cannot be serialized or written
    pub async fn record(&mut self, record: &InventoryRecord) -> Result<(), TargetError> {
        let bytes = self.format.encode(record)?;
        let offset = self
            .sink
            .end_offset()
            .await
            .map_err(TargetError::Output)?;

        if let Err(e) = self.append(&bytes).await {
            if let Err(rollback) = self.sink.rollback(offset).await {
                error!(offset, error = %rollback, "failed to remove partial record from output");
            }
            return Err(TargetError::Output(e));
        }

        Ok(())
    }

    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes).await?;
        self.sink.flush().await
    }

    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.sink
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.sink
    }
}

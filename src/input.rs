use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Separator between host and port used by inventory files
pub const DEFAULT_SEPARATOR: char = ',';

/// Reads targets one line at a time and turns each line into a dialable address
#[derive(Debug)]
pub struct InputReader<R> {
    reader: R,
    buf: Vec<u8>,
    separator: char,
}

impl<R: AsyncBufRead + Unpin> InputReader<R> {
    #[must_use]
    pub const fn new(reader: R, separator: char) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            separator,
        }
    }

    /// Next `host:port` address, `None` once the source is exhausted.
    ///
    /// Lines are never dropped or validated here, an empty, malformed or
    /// non UTF-8 line still yields an address that fails at connection time.
    /// Invalid UTF-8 is replaced with U+FFFD.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be read
    pub async fn next_address(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }

        let line = self.buf.as_slice();
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        Ok(Some(normalize(&String::from_utf8_lossy(line), self.separator)))
    }
}

/// Replace every separator in the line with `:`
#[must_use]
pub fn normalize(line: &str, separator: char) -> String {
    line.replace(separator, ":")
}

/// One inventory target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Dialable `host:port`
    pub address: String,
    pub host_or_ip: String,
    /// Empty when the line carried no separator
    pub port: String,
}

impl Target {
    /// Split an address at its last `:`; IPv6 brackets are removed from the host.
    #[must_use]
    pub fn from_address(address: String) -> Self {
        let (host, port) = address
            .rsplit_once(':')
            .unwrap_or((address.as_str(), ""));
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        Self {
            host_or_ip: host.to_string(),
            port: port.to_string(),
            address,
        }
    }
}

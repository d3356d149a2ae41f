use crate::{input::DEFAULT_SEPARATOR, record::OutputFormat, tls::TlsConfig};
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_INPUT: &str = "testfiles/inputFile";
pub const DEFAULT_OUTPUT: &str = "testfiles/outputFile";
pub const DEFAULT_LOG: &str = "testfiles/logFile";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Everything a batch run needs, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// `host<SEP>port` per line
    pub input: PathBuf,
    /// Inventory records, appended
    pub output: PathBuf,
    /// Per-target diagnostics, appended
    pub log: PathBuf,
    pub tls: TlsConfig,
    /// Bound on dial plus handshake per target, `None` waits forever
    pub timeout: Option<Duration>,
    pub separator: char,
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            log: PathBuf::from(DEFAULT_LOG),
            tls: TlsConfig::default(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            separator: DEFAULT_SEPARATOR,
            format: OutputFormat::default(),
        }
    }
}

use crate::{
    config::Config,
    error::TargetError,
    input::{InputReader, Target},
    record::{InventoryRecord, OutputSink, Recorder},
    report::ErrorReporter,
    tls::{Connector, extract_leaf},
};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufRead, AsyncWrite, BufReader},
};
use tracing::{debug, info, warn};

/// Outcome counts of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub targets: usize,
    pub recorded: usize,
    pub failed: usize,
}

/// Drives every target through connect, extract and record, one at a time.
///
/// Each input line ends in exactly one output record or one log entry.
#[derive(Debug)]
pub struct Inventory<R, O, L> {
    input: InputReader<R>,
    connector: Connector,
    recorder: Recorder<O>,
    reporter: ErrorReporter<L>,
}

impl<R, O, L> Inventory<R, O, L>
where
    R: AsyncBufRead + Unpin,
    O: OutputSink,
    L: AsyncWrite + Unpin,
{
    #[must_use]
    pub const fn new(
        input: InputReader<R>,
        connector: Connector,
        recorder: Recorder<O>,
        reporter: ErrorReporter<L>,
    ) -> Self {
        Self {
            input,
            connector,
            recorder,
            reporter,
        }
    }

    /// Process targets until the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error only if the input source cannot be read; per-target
    /// failures go to the log sink
    pub async fn run(&mut self) -> Result<Summary> {
        let mut summary = Summary::default();

        while let Some(address) = self
            .input
            .next_address()
            .await
            .context("failed to read input")?
        {
            summary.targets += 1;
            let target = Target::from_address(address);

            match self.process(&target).await {
                Ok(()) => {
                    summary.recorded += 1;
                    debug!(address = %target.address, "recorded");
                }
                Err(e) => {
                    summary.failed += 1;
                    debug!(
                        address = %target.address,
                        kind = e.kind(),
                        error = %e,
                        "target failed"
                    );
                    self.reporter
                        .report(format!("{}: {}: {e}", e.kind(), target.address))
                        .await;
                }
            }
        }

        Ok(summary)
    }

    async fn process(&mut self, target: &Target) -> Result<(), TargetError> {
        let session = self.connector.connect(target).await?;
        let version = session.protocol_version();
        let cipher = session.cipher_suite();
        debug!(
            address = session.address(),
            version = version.as_deref().unwrap_or("unknown"),
            cipher = cipher.as_deref().unwrap_or("unknown"),
            "handshake complete"
        );

        let leaf = extract_leaf(&session);
        session.close().await;

        let record = InventoryRecord::for_target(target, leaf?);
        self.recorder.record(&record).await
    }

    #[must_use]
    pub fn into_parts(self) -> (Recorder<O>, ErrorReporter<L>) {
        (self.recorder, self.reporter)
    }
}

/// Open the sinks named by the configuration and inventory every target.
///
/// # Errors
///
/// Returns an error if a sink cannot be opened, the TLS client cannot be
/// built, or the input cannot be read; nothing is processed in the first two
/// cases
pub async fn start(config: &Config) -> Result<Summary> {
    let log = open_append(&config.log)
        .await
        .with_context(|| format!("failed to open log file {}", config.log.display()))?;
    let output = open_append(&config.output)
        .await
        .with_context(|| format!("failed to open output file {}", config.output.display()))?;
    let input = File::open(&config.input)
        .await
        .with_context(|| format!("failed to open input file {}", config.input.display()))?;

    let connector = Connector::new(&config.tls, config.timeout)
        .await
        .context("failed to build TLS client")?;

    if !connector.mode().verifies() {
        warn!("certificate verification disabled (skip-verify)");
    }
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        log = %config.log.display(),
        verify = connector.mode().as_str(),
        timeout = ?config.timeout,
        "starting inventory"
    );

    let mut inventory = Inventory::new(
        InputReader::new(BufReader::new(input), config.separator),
        connector,
        Recorder::new(output, config.format),
        ErrorReporter::new(log),
    );
    let summary = inventory.run().await?;

    info!(
        targets = summary.targets,
        recorded = summary.recorded,
        failed = summary.failed,
        "inventory complete"
    );

    Ok(summary)
}

async fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
}

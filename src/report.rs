use chrono::Local;
use std::{fmt, future::Future, panic::Location, path::Path};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::error;

/// `2024/01/31 13:45:07.123456`
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";

/// Appends one timestamped diagnostic line per failed target to the log sink
#[derive(Debug)]
pub struct ErrorReporter<W> {
    sink: W,
}

impl<W: AsyncWrite + Unpin> ErrorReporter<W> {
    #[must_use]
    pub const fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Append `<date> <time>.<micros> <file>:<line>: <message>`.
    ///
    /// The location is the caller's. Never fails: a diagnostic that cannot be
    /// written goes to the tracing output instead.
    #[track_caller]
    pub fn report(&mut self, message: impl fmt::Display) -> impl Future<Output = ()> + '_ {
        let entry = format_entry(Location::caller(), &message);

        async move {
            let result = match self.sink.write_all(entry.as_bytes()).await {
                Ok(()) => self.sink.flush().await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!(error = %e, entry = entry.trim_end(), "failed to write to log sink");
            }
        }
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

fn format_entry(location: &Location<'_>, message: &dyn fmt::Display) -> String {
    let file = Path::new(location.file())
        .file_name()
        .map_or_else(|| location.file().into(), |name| name.to_string_lossy());

    format!(
        "{} {}:{}: {message}\n",
        Local::now().format(TIMESTAMP_FORMAT),
        file,
        location.line()
    )
}

use crate::{
    cli::actions::Action,
    config::Config,
    record::OutputFormat,
    tls::{TlsConfig, VerifyMode},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use std::{path::PathBuf, time::Duration};

/// Verbosity requested with `-v`
#[must_use]
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose")
}

fn path(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    matches
        .get_one::<String>(id)
        .map(PathBuf::from)
        .with_context(|| format!("--{id} is required"))
}

fn separator(raw: &str) -> Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != ':' => Ok(c),
        (Some(':'), None) => bail!("Invalid separator: ':' is already the address separator"),
        _ => Err(anyhow!("Invalid separator {raw:?}: expected a single character")),
    }
}

fn extract_tls_config(matches: &ArgMatches) -> Result<TlsConfig> {
    let mode = matches
        .get_one::<String>("verify")
        .map(|m| m.parse::<VerifyMode>())
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or_default();

    let ca = matches.get_one::<String>("ca-file").map(PathBuf::from);

    match (mode, &ca) {
        (VerifyMode::CustomTrust, None) => bail!("--verify custom-trust requires --ca-file"),
        (VerifyMode::DefaultTrust | VerifyMode::SkipVerify, Some(_)) => {
            bail!("--ca-file is only used with --verify custom-trust")
        }
        _ => Ok(TlsConfig { mode, ca }),
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if an argument is invalid or the verification policy is
/// missing its CA bundle
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let input = path(matches, "input")?;
    let output = path(matches, "output")?;
    let log = path(matches, "log")?;

    let tls = extract_tls_config(matches)?;

    // 0 disables the per-target timeout
    let timeout = matches
        .get_one::<u64>("timeout")
        .copied()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let separator = matches
        .get_one::<String>("separator")
        .map_or(Ok(crate::input::DEFAULT_SEPARATOR), |raw| separator(raw))?;

    let format = matches
        .get_one::<String>("format")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or_default();

    Ok(Action::Inventory {
        config: Config {
            input,
            output,
            log,
            tls,
            timeout,
            separator,
            format,
        },
    })
}

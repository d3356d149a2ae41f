use crate::config::{DEFAULT_INPUT, DEFAULT_LOG, DEFAULT_OUTPUT};
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("input")
                .default_value(DEFAULT_INPUT)
                .env("TLSINVENTORY_INPUT")
                .help("file with one host<SEP>port target per line")
                .long("input")
                .short('i')
                .value_name("PATH"),
        )
        .arg(
            Arg::new("output")
                .default_value(DEFAULT_OUTPUT)
                .env("TLSINVENTORY_OUTPUT")
                .help("file the inventory records are appended to")
                .long("output")
                .short('o')
                .value_name("PATH"),
        )
        .arg(
            Arg::new("log")
                .default_value(DEFAULT_LOG)
                .env("TLSINVENTORY_LOG")
                .help("file the per-target errors are appended to")
                .long("log")
                .short('l')
                .value_name("PATH"),
        )
        .arg(
            Arg::new("verify")
                .default_value("default-trust")
                .env("TLSINVENTORY_VERIFY")
                .help("certificate verification: default-trust, custom-trust, skip-verify")
                .long("verify")
                .long_help(
                    "Certificate verification policy:\n\n\
                    - default-trust: verify against the bundled web PKI roots (default)\n\
                    - custom-trust: verify against the CA bundle given with --ca-file\n\
                    - skip-verify: accept any certificate, nothing is verified\n\n\
                    A target whose certificate is rejected is logged as a handshake-error."
                )
                .value_name("POLICY")
                .value_parser(["default-trust", "custom-trust", "skip-verify"]),
        )
        .arg(
            Arg::new("ca-file")
                .env("TLSINVENTORY_CA_FILE")
                .help("PEM CA bundle used by --verify custom-trust")
                .long("ca-file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("timeout")
                .default_value("10")
                .env("TLSINVENTORY_TIMEOUT")
                .help("seconds allowed for dial plus handshake per target, 0 waits forever")
                .long("timeout")
                .short('t')
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("separator")
                .default_value(",")
                .env("TLSINVENTORY_SEPARATOR")
                .help("character between host and port in the input")
                .long("separator")
                .short('s')
                .value_name("CHAR"),
        )
        .arg(
            Arg::new("format")
                .default_value("legacy")
                .env("TLSINVENTORY_FORMAT")
                .help("record layout: legacy (indented, undelimited) or lines (one JSON per line)")
                .long("format")
                .short('f')
                .value_parser(["legacy", "lines"]),
        )
        .arg(
            Arg::new("verbose")
                .help("increase diagnostics on stderr (-v, -vv, -vvv)")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        )
}

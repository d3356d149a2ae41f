use std::{path::PathBuf, str::FromStr};

/// TLS configuration shared by every target of a batch
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub mode: VerifyMode,
    /// PEM bundle used as trust store by `VerifyMode::CustomTrust`
    pub ca: Option<PathBuf>,
}

/// How the server certificate chain is verified during the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Verify chain and server name against the bundled Mozilla roots
    #[default]
    DefaultTrust,
    /// Verify chain and server name against the roots in `TlsConfig::ca`
    CustomTrust,
    /// Accept any certificate chain, required for IP-only targets
    SkipVerify,
}

impl FromStr for VerifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default-trust" => Ok(Self::DefaultTrust),
            "custom-trust" => Ok(Self::CustomTrust),
            "skip-verify" => Ok(Self::SkipVerify),
            _ => Err(format!("Invalid verify mode: {s}")),
        }
    }
}

impl VerifyMode {
    /// Check if the peer chain is validated at all
    #[must_use]
    pub const fn verifies(&self) -> bool {
        !matches!(self, Self::SkipVerify)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultTrust => "default-trust",
            Self::CustomTrust => "custom-trust",
            Self::SkipVerify => "skip-verify",
        }
    }
}

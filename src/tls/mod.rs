//! TLS session establishment and leaf certificate capture
//!
//! # Module Organization
//!
//! - `config` - verification policy
//! - `probe` - dial + handshake under a policy, the live `Session`
//! - `verifier` - the skip-verify certificate verifier
//! - `certificate` - leaf certificate extraction and decoding
//!
//! # Example
//!
//! ```rust,ignore
//! use tlsinventory::{input::Target, tls::{Connector, TlsConfig, VerifyMode, extract_leaf}};
//!
//! let tls = TlsConfig { mode: VerifyMode::SkipVerify, ca: None };
//! let connector = Connector::new(&tls, Some(Duration::from_secs(10))).await?;
//! let session = connector.connect(&Target::from_address("192.0.2.1:8443".into())).await?;
//! let leaf = extract_leaf(&session)?;
//! session.close().await;
//! ```

pub mod certificate;
pub mod config;
pub mod probe;
pub mod verifier;

// Re-export commonly used types
pub use certificate::{Extension, LeafCertificate, extract_leaf};
pub use config::{TlsConfig, VerifyMode};
pub use probe::{Connector, Session};
pub use verifier::SkipVerification;

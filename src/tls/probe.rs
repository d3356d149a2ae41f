use super::{TlsConfig, VerifyMode, verifier::SkipVerification};
use crate::{error::TargetError, input::Target};
use anyhow::{Context, Result, anyhow};
use rustls::{
    ClientConfig, RootCertStore,
    crypto::CryptoProvider,
    pki_types::{CertificateDer, ServerName},
};
use rustls_pemfile::certs;
use std::{io::Cursor, net::IpAddr, path::Path, sync::Arc, time::Duration};
use tokio::{fs, io::AsyncWriteExt, net::TcpStream, time};
use tokio_rustls::{TlsConnector, client::TlsStream};
use tracing::debug;

/// Opens TLS sessions to inventory targets under one verification policy
#[derive(Clone)]
pub struct Connector {
    connector: TlsConnector,
    mode: VerifyMode,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// Build the TLS client for the configured policy.
    ///
    /// `timeout` bounds dial plus handshake of each target, `None` waits forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom trust store cannot be read or holds no
    /// usable certificate, or if the TLS client cannot be built
    pub async fn new(tls: &TlsConfig, timeout: Option<Duration>) -> Result<Self> {
        let config = build_client_config(tls).await?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            mode: tls.mode,
            timeout,
        })
    }

    #[must_use]
    pub const fn mode(&self) -> VerifyMode {
        self.mode
    }

    /// Dial the target and run the TLS handshake to completion.
    ///
    /// # Errors
    ///
    /// Returns a `dial-error` if the address is unusable or the TCP connect
    /// fails, a `handshake-error` if the handshake fails or the timeout expires
    pub async fn connect(&self, target: &Target) -> Result<Session, TargetError> {
        let Some(limit) = self.timeout else {
            return self.dial_and_handshake(target).await;
        };

        time::timeout(limit, self.dial_and_handshake(target))
            .await
            .map_err(|_| TargetError::Timeout { timeout: limit })?
    }

    async fn dial_and_handshake(&self, target: &Target) -> Result<Session, TargetError> {
        let server_name =
            server_name_from_host(&target.host_or_ip).ok_or_else(|| TargetError::ServerName {
                host: target.host_or_ip.clone(),
            })?;

        let stream = TcpStream::connect(target.address.as_str())
            .await
            .map_err(TargetError::Dial)?;

        let stream = self
            .connector
            .connect(server_name, stream)
            .await
            .map_err(TargetError::Handshake)?;

        Ok(Session {
            address: target.address.clone(),
            stream,
        })
    }
}

/// A TLS session that completed its handshake
///
/// Dropping it closes the socket; `close` also sends the TLS `close_notify`.
pub struct Session {
    address: String,
    stream: TlsStream<TcpStream>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Certificate chain presented by the peer, leaf first
    #[must_use]
    pub fn peer_certificates(&self) -> Option<&[CertificateDer<'static>]> {
        let (_, connection) = self.stream.get_ref();
        connection.peer_certificates()
    }

    /// Negotiated protocol version (e.g. `TLSv1_3`)
    #[must_use]
    pub fn protocol_version(&self) -> Option<String> {
        let (_, connection) = self.stream.get_ref();
        connection.protocol_version().map(|v| format!("{v:?}"))
    }

    /// Negotiated cipher suite
    #[must_use]
    pub fn cipher_suite(&self) -> Option<String> {
        let (_, connection) = self.stream.get_ref();
        connection
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
    }

    /// Send `close_notify` and shut the socket down.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(address = %self.address, error = %e, "TLS session shutdown failed");
        }
    }
}

async fn build_client_config(tls: &TlsConfig) -> Result<ClientConfig> {
    let provider: Arc<CryptoProvider> = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .context("failed to select TLS protocol versions")?;

    let config = match tls.mode {
        VerifyMode::DefaultTrust => {
            let roots: RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
            builder.with_root_certificates(roots).with_no_client_auth()
        }
        VerifyMode::CustomTrust => {
            let path = tls
                .ca
                .as_deref()
                .ok_or_else(|| anyhow!("custom-trust requires a CA bundle"))?;
            let roots = load_root_store(path).await?;
            builder.with_root_certificates(roots).with_no_client_auth()
        }
        VerifyMode::SkipVerify => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipVerification::with_provider(provider)))
            .with_no_client_auth(),
    };

    Ok(config)
}

async fn load_root_store(path: &Path) -> Result<RootCertStore> {
    let chain = load_cert_chain(path).await?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(chain);

    if added == 0 {
        anyhow::bail!("no usable CA certificates in {}", path.display());
    }
    if ignored > 0 {
        debug!(path = %path.display(), ignored, "ignored unparsable CA certificates");
    }

    Ok(roots)
}

async fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let data = fs::read(path)
        .await
        .with_context(|| format!("failed to read certificate {}", path.display()))?;
    let mut reader = Cursor::new(data);
    let parsed = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("invalid certificate PEM: {e}"))?;

    if parsed.is_empty() {
        anyhow::bail!("no certificates found in {}", path.display());
    }

    Ok(parsed)
}

fn server_name_from_host(host: &str) -> Option<ServerName<'static>> {
    host.parse::<IpAddr>().map_or_else(
        |_| ServerName::try_from(host.to_string()).ok(),
        |ip| Some(ServerName::from(ip).to_owned()),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::io::Write;

    #[test]
    fn test_server_name_from_hostname() {
        assert!(server_name_from_host("example.com").is_some());
        assert!(server_name_from_host("db.example.com").is_some());
        assert!(server_name_from_host("bad-line-no-port").is_some());
    }

    #[test]
    fn test_server_name_from_ip() {
        assert!(matches!(
            server_name_from_host("192.0.2.1"),
            Some(ServerName::IpAddress(_))
        ));
        assert!(matches!(
            server_name_from_host("2001:db8::1"),
            Some(ServerName::IpAddress(_))
        ));
    }

    #[test]
    fn test_server_name_invalid() {
        assert!(server_name_from_host("").is_none());
        assert!(server_name_from_host("invalid host name with spaces").is_none());
    }

    #[tokio::test]
    async fn test_connector_for_every_mode() {
        let default = Connector::new(&TlsConfig::default(), None).await.unwrap();
        assert_eq!(default.mode(), VerifyMode::DefaultTrust);

        let skip = TlsConfig {
            mode: VerifyMode::SkipVerify,
            ca: None,
        };
        let connector = Connector::new(&skip, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(connector.mode(), VerifyMode::SkipVerify);
        assert!(format!("{connector:?}").contains("SkipVerify"));
    }

    #[tokio::test]
    async fn test_custom_trust_requires_ca() {
        let tls = TlsConfig {
            mode: VerifyMode::CustomTrust,
            ca: None,
        };
        let err = Connector::new(&tls, None).await.unwrap_err();
        assert!(err.to_string().contains("CA bundle"));
    }

    #[tokio::test]
    async fn test_custom_trust_from_pem() {
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(cert.pem().as_bytes()).unwrap();

        let tls = TlsConfig {
            mode: VerifyMode::CustomTrust,
            ca: Some(file.path().to_path_buf()),
        };
        let connector = Connector::new(&tls, None).await.unwrap();
        assert_eq!(connector.mode(), VerifyMode::CustomTrust);
    }

    #[tokio::test]
    async fn test_custom_trust_empty_bundle() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let tls = TlsConfig {
            mode: VerifyMode::CustomTrust,
            ca: Some(file.path().to_path_buf()),
        };
        let err = Connector::new(&tls, None).await.unwrap_err();
        assert!(err.to_string().contains("no certificates found"));
    }

    #[tokio::test]
    async fn test_connect_unparseable_address_is_dial_error() {
        let tls = TlsConfig {
            mode: VerifyMode::SkipVerify,
            ca: None,
        };
        let connector = Connector::new(&tls, Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let target = Target::from_address("bad-line-no-port".to_string());
        let err = connector.connect(&target).await.err().unwrap();
        assert_eq!(err.kind(), "dial-error");
    }

    #[tokio::test]
    async fn test_connect_refused_is_dial_error() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let tls = TlsConfig {
            mode: VerifyMode::SkipVerify,
            ca: None,
        };
        let connector = Connector::new(&tls, Some(Duration::from_secs(5)))
            .await
            .unwrap();

        let target = Target::from_address(format!("127.0.0.1:{port}"));
        let err = connector.connect(&target).await.err().unwrap();
        assert_eq!(err.kind(), "dial-error");
    }

    #[tokio::test]
    async fn test_connect_silent_peer_times_out() {
        // accepts TCP but never answers the ClientHello
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let tls = TlsConfig {
            mode: VerifyMode::SkipVerify,
            ca: None,
        };
        let connector = Connector::new(&tls, Some(Duration::from_millis(200)))
            .await
            .unwrap();

        let target = Target::from_address(addr.to_string());
        let err = connector.connect(&target).await.err().unwrap();
        assert!(matches!(err, TargetError::Timeout { .. }));
        assert_eq!(err.kind(), "handshake-error");

        server.abort();
    }
}

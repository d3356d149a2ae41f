#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use rcgen::{CertificateParams, DnType, KeyPair};
use rustls::{
    ServerConfig,
    crypto::{CryptoProvider, ring},
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
    server::{ClientHello, ResolvesServerCert},
    sign::CertifiedKey,
};
use std::{fs, net::SocketAddr, path::PathBuf, sync::Arc};
use tempfile::TempDir;
use tlsinventory::{
    config::Config,
    record::InventoryRecord,
    tls::{TlsConfig, VerifyMode},
};
use tokio::{io::AsyncReadExt, net::TcpListener, task::JoinHandle};
use tokio_rustls::TlsAcceptor;

/// A local TLS listener serving a freshly generated self-signed certificate
pub struct TlsServer {
    pub addr: SocketAddr,
    /// PEM of the served certificate, usable as a custom trust bundle
    pub cert_pem: String,
    pub common_name: String,
    handle: JoinHandle<()>,
}

/// Serves a fixed certificate whose signing key may belong to another certificate
#[derive(Debug)]
struct FixedCert(Arc<CertifiedKey>);

impl ResolvesServerCert for FixedCert {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(self.0.clone())
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring::default_provider())
}

fn pkcs8(key: &KeyPair) -> PrivateKeyDer<'static> {
    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()))
}

impl TlsServer {
    /// Listen on 127.0.0.1 with a certificate valid for `localhost` and `127.0.0.1`
    pub async fn start(common_name: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let cert = certificate_params(common_name).self_signed(&key).unwrap();

        let chain: Vec<CertificateDer<'static>> = vec![cert.der().clone()];
        let config = ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(chain, pkcs8(&key))
            .unwrap();

        Self::listen(config, cert.pem(), common_name).await
    }

    /// Like `start`, but the handshake is signed with a key that does not match
    /// the served certificate, so every handshake signature check fails
    pub async fn start_with_foreign_key(common_name: &str) -> Self {
        let cert_key = KeyPair::generate().unwrap();
        let cert = certificate_params(common_name).self_signed(&cert_key).unwrap();

        let signing_key = KeyPair::generate().unwrap();
        let signer = provider()
            .key_provider
            .load_private_key(pkcs8(&signing_key))
            .unwrap();
        let certified = CertifiedKey::new(vec![cert.der().clone()], signer);

        let config = ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_cert_resolver(Arc::new(FixedCert(Arc::new(certified))));

        Self::listen(config, cert.pem(), common_name).await
    }

    async fn listen(config: ServerConfig, cert_pem: String, common_name: &str) -> Self {
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // a rejected client certificate check ends here
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    // hold the session until the client closes it
                    let mut buf = [0u8; 64];
                    while matches!(tls.read(&mut buf).await, Ok(n) if n > 0) {}
                });
            }
        });

        Self {
            addr,
            cert_pem,
            common_name: common_name.to_string(),
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Input line for this server with the default separator
    pub fn line(&self) -> String {
        format!("127.0.0.1,{}", self.port())
    }
}

impl Drop for TlsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn certificate_params(common_name: &str) -> CertificateParams {
    let mut params =
        CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()]).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
}

/// Temporary directory holding the three files of a run
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write the input file, one target per line
    pub fn write_input(&self, lines: &[String]) {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(self.path("input"), content).unwrap();
    }

    pub fn config(&self, mode: VerifyMode) -> Config {
        Config {
            input: self.path("input"),
            output: self.path("output"),
            log: self.path("log"),
            tls: TlsConfig { mode, ca: None },
            timeout: Some(std::time::Duration::from_secs(5)),
            ..Config::default()
        }
    }

    pub fn output(&self) -> String {
        fs::read_to_string(self.path("output")).unwrap_or_default()
    }

    pub fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(self.path("log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Every record in the output, delimited or not
    pub fn records(&self) -> Vec<InventoryRecord> {
        serde_json::Deserializer::from_str(&self.output())
            .into_iter::<InventoryRecord>()
            .collect::<Result<_, _>>()
            .unwrap()
    }
}

/// A port on 127.0.0.1 with nothing listening
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

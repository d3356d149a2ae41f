use rustls::{
    DigitallySignedStruct, Error as TlsError, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::CryptoProvider,
    pki_types::{CertificateDer, ServerName, UnixTime},
};
use std::{fmt, sync::Arc};

/// Certificate verifier that accepts any server certificate chain.
///
/// Selected only by `VerifyMode::SkipVerify`, which inventories endpoints that are
/// addressed by IP or present certificates no trust store would accept.
///
/// # Security
///
/// - Does NOT validate the chain, expiry or server name
/// - Does NOT check handshake signatures, so legacy keys the crypto provider
///   refuses (e.g. RSA under 2048 bits) still complete the handshake
/// - The provider only advertises the signature schemes offered to the peer
pub struct SkipVerification {
    provider: Arc<CryptoProvider>,
}

impl fmt::Debug for SkipVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipVerification")
            .field("provider", &"ring")
            .finish()
    }
}

impl SkipVerification {
    #[must_use]
    pub fn new() -> Self {
        Self::with_provider(Arc::new(rustls::crypto::ring::default_provider()))
    }

    #[must_use]
    pub const fn with_provider(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl Default for SkipVerification {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerCertVerifier for SkipVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

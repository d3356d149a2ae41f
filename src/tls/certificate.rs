use super::probe::Session;
use crate::error::TargetError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::{
    der_parser::oid::Oid,
    extensions::GeneralName,
    objects::{oid_registry, oid2sn},
    prelude::{FromDer, X509Certificate},
    public_key::PublicKey,
    time::ASN1Time,
};

/// Fields decoded from the leaf (end-entity) certificate of a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCertificate {
    /// X.509 version as written on the certificate (1, 2 or 3)
    pub version: u32,
    /// Serial number, colon separated hex
    pub serial_number: String,
    pub signature_algorithm: String,
    /// Subject DN (e.g. "CN=example.com, O=Example")
    pub subject: String,
    /// Issuer DN
    pub issuer: String,
    /// RFC 3339, UTC
    pub not_before: String,
    /// RFC 3339, UTC
    pub not_after: String,
    pub public_key_algorithm: String,
    /// Key size in bits when the key type is known (RSA, EC)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub public_key_bits: Option<usize>,
    /// DER `SubjectPublicKeyInfo`, hex
    pub public_key: String,
    pub is_ca: bool,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub email_addresses: Vec<String>,
    pub uris: Vec<String>,
    pub extensions: Vec<Extension>,
}

/// A raw X.509v3 extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Dotted OID
    pub oid: String,
    /// Short name when the OID is registered (e.g. "subjectAltName")
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub critical: bool,
    /// DER value, hex
    pub value: String,
}

impl LeafCertificate {
    /// Decode a DER certificate.
    ///
    /// No trust, expiry or hostname checks are made.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::Certificate` if the bytes are not a valid X.509 certificate
    pub fn from_der(cert_der: &[u8]) -> Result<Self, TargetError> {
        let (_, cert) = X509Certificate::from_der(cert_der).map_err(|e| {
            TargetError::Certificate {
                message: e.to_string(),
            }
        })?;

        let validity = cert.validity();
        let spki = cert.public_key();

        let public_key_bits = match spki.parsed() {
            Ok(PublicKey::RSA(rsa)) => Some(rsa.key_size()),
            Ok(PublicKey::EC(ec)) => Some(ec.key_size()),
            _ => None,
        };

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        let mut email_addresses = Vec::new();
        let mut uris = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push((*dns).to_string()),
                    GeneralName::RFC822Name(email) => email_addresses.push((*email).to_string()),
                    GeneralName::URI(uri) => uris.push((*uri).to_string()),
                    GeneralName::IPAddress(raw) => {
                        if let Some(ip) = ip_from_bytes(raw) {
                            ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| Extension {
                oid: ext.oid.to_id_string(),
                name: oid_name(&ext.oid),
                critical: ext.critical,
                value: hex::encode(ext.value),
            })
            .collect();

        Ok(Self {
            version: cert.version().0 + 1,
            serial_number: cert.raw_serial_as_string(),
            signature_algorithm: oid_label(&cert.signature_algorithm.algorithm),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before: rfc3339(&validity.not_before)?,
            not_after: rfc3339(&validity.not_after)?,
            public_key_algorithm: oid_label(&spki.algorithm.algorithm),
            public_key_bits,
            public_key: hex::encode(spki.raw),
            is_ca: cert.is_ca(),
            dns_names,
            ip_addresses,
            email_addresses,
            uris,
            extensions,
        })
    }
}

/// Decode the first certificate of the chain presented by the peer.
///
/// # Errors
///
/// Returns an error if the peer sent no certificate or the leaf cannot be decoded
pub fn extract_leaf(session: &Session) -> Result<LeafCertificate, TargetError> {
    let leaf = session
        .peer_certificates()
        .and_then(<[_]>::first)
        .ok_or(TargetError::NoCertificate)?;

    LeafCertificate::from_der(leaf.as_ref())
}

fn rfc3339(time: &ASN1Time) -> Result<String, TargetError> {
    let raw = time.to_datetime();
    DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| TargetError::Certificate {
            message: format!("invalid certificate timestamp: {time}"),
        })
}

fn oid_name(oid: &Oid) -> Option<String> {
    oid2sn(oid, oid_registry()).ok().map(str::to_string)
}

fn oid_label(oid: &Oid) -> String {
    oid_name(oid).unwrap_or_else(|| oid.to_id_string())
}

fn ip_from_bytes(raw: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(raw) {
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    <[u8; 16]>::try_from(raw)
        .ok()
        .map(|octets| IpAddr::V6(Ipv6Addr::from(octets)))
}

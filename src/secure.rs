// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Standalone TLS inspection for the `secure` command.
//!
//! Connects directly via a raw TCP socket and a TLS handshake,
//! independent of the `reqwest` client used by `fetch`/`probe`, so it can
//! report on certificates the HTTP client never exposes.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;
use x509_cert::der::Decode;
use x509_cert::Certificate as X509Certificate;

use crate::constants::CERT_EXPIRY_WARN_DAYS;
use crate::error::{FluxionError, Result};

/// Parsed TLS certificate details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub not_before: String,
    pub not_after: String,
    pub san: Vec<String>,
    pub fingerprint_sha256: String,
    pub tls_version: String,
    pub cipher: String,
    pub warning: Option<String>,
}

/// Connect to `url`, perform the TLS handshake, and return certificate
/// details. Non-HTTPS URLs return an empty, non-error record.
pub async fn inspect(url: &str, verify: bool, request_timeout: Duration) -> Result<CertificateInfo> {
    let parsed = Url::parse(url)?;
    if parsed.scheme() != "https" {
        return Ok(CertificateInfo::default());
    }

    let hostname = parsed
        .host_str()
        .ok_or_else(|| FluxionError::security("URL has no host"))?
        .to_string();
    let port = parsed.port().unwrap_or(443);

    let tcp = timeout(request_timeout, TcpStream::connect((hostname.as_str(), port)))
        .await
        .map_err(|_| FluxionError::security(format!("Connection timed out for {hostname}:{port}")))?
        .map_err(|e| {
            FluxionError::security(format!("Connection failed for {hostname}:{port}: {e}"))
                .with_suggestion("Verify the host is reachable and the port is correct.")
        })?;

    let config = build_client_config(verify);
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(hostname.clone())
        .map_err(|_| FluxionError::security(format!("Invalid DNS name: {hostname}")))?;

    let tls_stream = connector.connect(server_name, tcp).await.map_err(|e| {
        FluxionError::security(format!("TLS handshake failed for {hostname}: {e}"))
            .with_suggestion("Check the server certificate or use --no-verify to skip.")
    })?;

    let (_, session) = tls_stream.get_ref();
    let tls_version = session
        .protocol_version()
        .map(|v| format!("{v:?}"))
        .unwrap_or_default();
    let cipher = session
        .negotiated_cipher_suite()
        .map(|c| format!("{:?}", c.suite()))
        .unwrap_or_default();

    let der = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|c| c.as_ref().to_vec())
        .unwrap_or_default();

    let mut info = CertificateInfo {
        tls_version,
        cipher,
        ..Default::default()
    };

    if !der.is_empty() {
        info.fingerprint_sha256 = format!("{:x}", Sha256::digest(&der));
        if let Ok(cert) = X509Certificate::from_der(&der) {
            info.subject = cert.tbs_certificate.subject.to_string();
            info.issuer = cert.tbs_certificate.issuer.to_string();
            info.serial_number = cert.tbs_certificate.serial_number.to_string();
            info.not_before = cert.tbs_certificate.validity.not_before.to_string();
            info.not_after = cert.tbs_certificate.validity.not_after.to_string();
        }
    }

    info.warning = check_expiry(&info, CERT_EXPIRY_WARN_DAYS);
    Ok(info)
}

fn build_client_config(verify: bool) -> ClientConfig {
    if verify {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    } else {
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerify))
            .with_no_client_auth()
    }
}

/// Returns a warning string if the certificate is already expired or
/// expires within `warn_days`, parsing the ASN.1 `UTCTime`/`GeneralizedTime`
/// rendering produced by `x509-cert`'s `Display` impl.
fn check_expiry(cert: &CertificateInfo, warn_days: i64) -> Option<String> {
    if cert.not_after.is_empty() {
        return None;
    }
    let expiry = chrono::DateTime::parse_from_rfc3339(&cert.not_after)
        .or_else(|_| chrono::DateTime::parse_from_rfc2822(&cert.not_after))
        .ok()?;
    let remaining = (expiry.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_days();
    if remaining < 0 {
        Some(format!("Certificate EXPIRED {} days ago", remaining.abs()))
    } else if remaining < warn_days {
        Some(format!("Certificate expires in {remaining} days"))
    } else {
        None
    }
}

#[derive(Debug)]
struct NoVerify;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[tokio_rustls::rustls::pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: tokio_rustls::rustls::pki_types::UnixTime,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::ServerCertVerified,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        tokio_rustls::rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_https_url_returns_empty_record_not_an_error() {
        let info = inspect("http://example.com", true, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(info.tls_version, "");
        assert!(info.fingerprint_sha256.is_empty());
    }

    #[test]
    fn expiry_warns_within_window() {
        let future = (chrono::Utc::now() + chrono::Duration::days(10)).to_rfc3339();
        let cert = CertificateInfo {
            not_after: future,
            ..Default::default()
        };
        let warning = check_expiry(&cert, CERT_EXPIRY_WARN_DAYS).unwrap();
        assert!(warning.contains("expires in"));
    }

    #[test]
    fn expired_certificate_is_flagged() {
        let past = (chrono::Utc::now() - chrono::Duration::days(5)).to_rfc3339();
        let cert = CertificateInfo {
            not_after: past,
            ..Default::default()
        };
        let warning = check_expiry(&cert, CERT_EXPIRY_WARN_DAYS).unwrap();
        assert!(warning.contains("EXPIRED"));
    }

    #[test]
    fn no_warning_far_from_expiry() {
        let far = (chrono::Utc::now() + chrono::Duration::days(200)).to_rfc3339();
        let cert = CertificateInfo {
            not_after: far,
            ..Default::default()
        };
        assert!(check_expiry(&cert, CERT_EXPIRY_WARN_DAYS).is_none());
    }
}

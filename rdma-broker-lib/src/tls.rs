//! TLS channel construction for the control plane. The data plane itself is
//! never TLS-wrapped; only the parameter exchange is.

use std::sync::Arc;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::version::{TLS12, TLS13};
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig, SupportedProtocolVersion};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::config::{TlsConfig, TlsVersion};
use crate::error::{BrokerError, Result};

fn protocol_versions(min_version: TlsVersion) -> &'static [&'static SupportedProtocolVersion] {
    match min_version {
        TlsVersion::V1_2 => &[&TLS12, &TLS13],
        TlsVersion::V1_3 => &[&TLS13],
    }
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let bytes = std::fs::read(path)
        .map_err(|e| BrokerError::Tls(format!("failed to read certificate {path}: {e}")))?;
    CertificateDer::pem_slice_iter(&bytes)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BrokerError::Tls(format!("failed to parse certificate {path}: {e}")))
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let bytes = std::fs::read(path)
        .map_err(|e| BrokerError::Tls(format!("failed to read key {path}: {e}")))?;
    let mut keys: Vec<PrivateKeyDer<'static>> = PrivateKeyDer::pem_slice_iter(&bytes)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BrokerError::Tls(format!("failed to parse key {path}: {e}")))?;
    keys.pop().ok_or_else(|| BrokerError::Tls(format!("no private key found in {path}")))
}

/// Builds the control-plane server-side TLS acceptor from configuration.
pub fn build_acceptor(cfg: &TlsConfig) -> Result<TlsAcceptor> {
    let certs = load_certs(&cfg.cert_path)?;
    let key = load_key(&cfg.key_path)?;

    let server = ServerConfig::builder_with_protocol_versions(protocol_versions(cfg.min_version))
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| BrokerError::Tls(format!("failed to build TLS server config: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(server)))
}

/// Builds the control-plane client-side TLS connector. `dev_mode` disables
/// peer verification entirely and must never be the default in production.
pub fn build_connector(cfg: &TlsConfig) -> Result<TlsConnector> {
    let versions = protocol_versions(cfg.min_version);
    let client = if cfg.dev_mode {
        tracing::warn!("TLS peer verification disabled (dev_mode); never use this in production");
        ClientConfig::builder_with_protocol_versions(versions)
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoServerVerification))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        for cert in load_certs(&cfg.cert_path)? {
            roots
                .add(cert)
                .map_err(|e| BrokerError::Tls(format!("failed to add trust anchor: {e}")))?;
        }
        ClientConfig::builder_with_protocol_versions(versions)
            .with_root_certificates(roots)
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(client)))
}

#[derive(Debug)]
struct NoServerVerification;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls_pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls_pki_types::UnixTime,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::ServerCertVerified,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
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
        _cert: &CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        use tokio_rustls::rustls::SignatureScheme::*;
        vec![
            RSA_PKCS1_SHA256,
            RSA_PKCS1_SHA384,
            RSA_PKCS1_SHA512,
            ECDSA_NISTP256_SHA256,
            ECDSA_NISTP384_SHA384,
            ED25519,
        ]
    }
}

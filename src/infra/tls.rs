//! HTTPS listener: rustls termination in front of the axum router.

use std::{
    fs,
    future::Future,
    io::{self, BufReader, ErrorKind},
    path::Path,
    sync::Arc,
    time::Duration,
};

use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer},
};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::{config::TlsSettings, infra::error::InfraError};

const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Load the PEM chain and key named in settings and build an acceptor.
pub fn build_acceptor(settings: &TlsSettings) -> Result<TlsAcceptor, InfraError> {
    let certs = load_certs(&settings.cert_path)?;
    let key = load_key(&settings.key_path)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|err| InfraError::tls(format!("unsupported protocol versions: {err}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| InfraError::tls(format!("failed to build server config: {err}")))?;
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, InfraError> {
    let data = fs::read(path).map_err(|err| {
        InfraError::tls(format!("failed to read certificate {}: {err}", path.display()))
    })?;
    let mut reader = BufReader::new(&data[..]);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| InfraError::tls(format!("failed to parse certificates: {err}")))?;

    if certs.is_empty() {
        return Err(InfraError::tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, InfraError> {
    let data = fs::read(path).map_err(|err| {
        InfraError::tls(format!("failed to read private key {}: {err}", path.display()))
    })?;
    let mut reader = BufReader::new(&data[..]);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|err| InfraError::tls(format!("failed to parse private key: {err}")))?
        .ok_or_else(|| InfraError::tls(format!("no private key found in {}", path.display())))
}

/// Accept TLS connections until `shutdown` resolves.
///
/// Connections already accepted keep running on their own tasks.
pub async fn serve<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: F,
) -> Result<(), InfraError>
where
    F: Future<Output = ()> + Send,
{
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) if is_connection_error(&err) => continue,
                Err(err) => {
                    warn!(
                        target = "fontproxy::tls",
                        op = "accept",
                        result = "error",
                        error = %err,
                        retry_ms = ACCEPT_RETRY_DELAY.as_millis() as u64,
                        "Failed to accept TCP connection"
                    );
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            },
            () = &mut shutdown => {
                info!(target = "fontproxy::tls", "TLS listener shutting down");
                return Ok(());
            }
        };

        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(router.clone());
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!(
                        target = "fontproxy::tls",
                        op = "handshake",
                        result = "error",
                        peer = %peer,
                        error = %err,
                        "TLS handshake failed"
                    );
                    return;
                }
            };

            let builder = auto::Builder::new(TokioExecutor::new());
            if let Err(err) = builder
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(
                    target = "fontproxy::tls",
                    op = "serve_connection",
                    result = "error",
                    peer = %peer,
                    error = %err,
                    "Connection closed with error"
                );
            }
        });
    }
}

/// Per-connection failures that leave the listener healthy.
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    )
}

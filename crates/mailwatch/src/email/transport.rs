//! TLS transport shared by the IMAP and POP3 adapters.

use async_native_tls::TlsConnector;
use log::debug;

use super::error::{FetchError, Result};

/// Type alias for the underlying async stream (async-io compatible TcpStream).
pub type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream both adapters speak over.
pub type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// TLS settings applied to every outgoing mail connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsOptions {
    /// Skip certificate and hostname verification.
    pub accept_invalid_certs: bool,
}

/// Opens a TCP connection to `host:port` and completes a TLS handshake.
pub async fn connect_tls(host: &str, port: u16, options: TlsOptions) -> Result<TlsStream> {
    let addr = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| FetchError::ConnectionFailed(format!("{}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| {
            FetchError::ConnectionFailed(format!("{}:{} did not resolve", host, port))
        })?;

    debug!("Connecting to {} ({})", addr, host);
    let tcp_stream = AsyncTcpStream::connect(addr)
        .await
        .map_err(|e| FetchError::ConnectionFailed(format!("{}: {}", addr, e)))?;

    let tls = TlsConnector::new()
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .danger_accept_invalid_hostnames(options.accept_invalid_certs);

    let stream = tls.connect(host, tcp_stream).await?;
    Ok(stream)
}

//! TCP dial and TLS handshake helpers, returning boxed halves so the rest
//! of the session need not be generic over the transport type.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use crate::error::{IrcError, IrcResult};

/// Boxed readable half of an established connection.
pub type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
/// Boxed writable half of an established connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

fn tls_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Dial `server:port`, optionally negotiating TLS, within `timeout`.
///
/// # Errors
///
/// Returns [`IrcError::Connect`] if the TCP dial fails or exceeds the
/// deadline, or [`IrcError::Tls`] if the TLS handshake fails.
pub async fn dial(server: &str, port: u16, tls: bool, timeout: Duration) -> IrcResult<(BoxedReader, BoxedWriter)> {
    let tcp = tokio::time::timeout(timeout, TcpStream::connect((server, port)))
        .await
        .map_err(|_| IrcError::Connect {
            server: server.to_string(),
            port,
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
        })?
        .map_err(|source| IrcError::Connect {
            server: server.to_string(),
            port,
            source,
        })?;
    tcp.set_nodelay(true).map_err(|source| IrcError::Connect {
        server: server.to_string(),
        port,
        source,
    })?;

    if tls {
        let connector = TlsConnector::from(tls_config());
        let domain = ServerName::try_from(server.to_string()).map_err(|_| IrcError::Tls {
            server: server.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid server name"),
        })?;
        let stream = connector
            .connect(domain, tcp)
            .await
            .map_err(|source| IrcError::Tls {
                server: server.to_string(),
                source,
            })?;
        let (read_half, write_half) = tokio::io::split(stream);
        Ok((
            BufReader::new(Box::new(read_half) as Box<dyn AsyncRead + Send + Unpin>),
            Box::new(write_half) as BoxedWriter,
        ))
    } else {
        let (read_half, write_half) = tokio::io::split(tcp);
        Ok((
            BufReader::new(Box::new(read_half) as Box<dyn AsyncRead + Send + Unpin>),
            Box::new(write_half) as BoxedWriter,
        ))
    }
}

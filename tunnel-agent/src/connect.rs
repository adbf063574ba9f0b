//! Connect phase: dial the proxy server, tune keep-alive, send the
//! registration handshake, and wrap the socket as a multiplex session in
//! client role.

use std::time::Duration;

use anyhow::{Context, Result};
use socket2::{Socket, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::warn;
use tunnel_protocol::{iostream::BoxedIo, mux::ClientSession, wire};

use crate::config::ConnectArgs;

const KEEPALIVE_PERIOD: Duration = Duration::from_secs(30);

/// Applies a 30s keep-alive period to a freshly dialed socket. The
/// keep-alive setting itself is best-effort (a platform that
/// rejects it still has a perfectly usable socket), but the std/tokio
/// round-trip needed to reach the fd can fail, so that part is
/// propagated rather than swallowed.
fn enable_keepalive(stream: TcpStream) -> Result<TcpStream> {
    let std_stream = stream
        .into_std()
        .context("adopting socket for keep-alive tuning")?;
    let socket: Socket = std_stream.into();
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_PERIOD);
    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        warn!(error = %e, "failed to enable TCP keep-alive");
    }
    socket.set_nonblocking(true).context("restoring nonblocking mode after keep-alive tuning")?;
    let std_stream: std::net::TcpStream = socket.into();
    TcpStream::from_std(std_stream).context("handing socket back to the async runtime")
}

/// Builds the registration request bytes. No body; the server hijacks
/// immediately after headers.
fn registration_request(host: &str) -> Vec<u8> {
    format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\n{}: {}\r\n\r\n",
        wire::REGISTRATION_METHOD,
        wire::REGISTRATION_PATH,
        host,
        wire::CLIENT_VERSION_HEADER,
        wire::CLIENT_VERSION,
    )
    .into_bytes()
}

/// Dials the proxy server, registers `args.http_host`, and returns a
/// client-role multiplex session ready to accept streams.
pub async fn dial(args: &ConnectArgs) -> Result<ClientSession<BoxedIo>> {
    let tcp = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("dialing proxy server at {}", args.server))?;

    let io: BoxedIo = match &args.tls_ca {
        Some(ca_path) => {
            // Best-effort only: the TLS wrapper may own the socket in a
            // way that makes the underlying fd inaccessible.
            let tcp = enable_keepalive(tcp)?;
            let connector = crate::tls::load_connector(ca_path)?;
            let server_name = host_only(&args.server)
                .try_into()
                .with_context(|| format!("invalid TLS server name in {}", args.server))?;
            let tls_stream = connector
                .connect(server_name, tcp)
                .await
                .context("TLS handshake with proxy server failed")?;
            Box::new(tls_stream)
        }
        None => {
            let tcp = enable_keepalive(tcp)?;
            Box::new(tcp)
        }
    };

    let mut io = io;
    io.write_all(&registration_request(&args.http_host))
        .await
        .context("sending registration handshake")?;

    Ok(ClientSession::new(io))
}

fn host_only(server: &str) -> String {
    server
        .rsplit_once(':')
        .map(|(host, _port)| host)
        .unwrap_or(server)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_request_carries_host_and_version_header() {
        let bytes = registration_request("a.example");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("POST /_skyproxy/register HTTP/1.1\r\n"));
        assert!(text.contains("Host: a.example\r\n"));
        assert!(text.contains("X-Skyproxy-Client-Version: 0.1\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn host_only_strips_trailing_port() {
        assert_eq!(host_only("proxy.example.com:8443"), "proxy.example.com");
        assert_eq!(host_only("proxy.example.com"), "proxy.example.com");
    }
}

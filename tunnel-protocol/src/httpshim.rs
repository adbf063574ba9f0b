//! Minimal HTTP/1.1 request-head parsing for the registration and
//! dispatch paths.
//!
//! Neither endpoint wants a full HTTP serving stack: both need to read
//! exactly one request line and its headers, then surrender the raw
//! duplex stream for hijacking. This module is that minimal head parser,
//! built on `httparse` rather than pulling in a full server framework for
//! a hijack-shaped problem.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Result, TunnelError};
use crate::wire::{MAX_HEADERS, MAX_HEAD_BYTES};

/// A parsed request line plus headers. Owned (no lifetime tied to the
/// read buffer) so it can outlive the parse call.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Re-serializes the request line and headers in the order they were
    /// received, terminated by the blank line. Used to replay the
    /// original request onto a freshly opened multiplex stream; any body
    /// bytes the caller already buffered are carried separately via
    /// [`crate::pushback::Pushback`].
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(self.method.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.path.as_bytes());
        out.extend_from_slice(b" HTTP/1.1\r\n");
        for (k, v) in &self.headers {
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(v.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// Reads one HTTP/1.1 request head from `stream`, growing an internal
/// buffer until `httparse` reports the head complete (or [`MAX_HEAD_BYTES`]
/// is exceeded). Returns the parsed head plus any bytes read past the
/// blank line — those are already-buffered body/pipelined bytes that must
/// be replayed to whoever reads from the stream next.
pub async fn read_request_head<S>(stream: &mut S) -> Result<(RequestHead, Vec<u8>)>
where
    S: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        match req
            .parse(&buf)
            .map_err(|e| TunnelError::Protocol(format!("malformed request head: {e}")))?
        {
            httparse::Status::Complete(consumed) => {
                let method = req
                    .method
                    .ok_or_else(|| TunnelError::Protocol("missing method".into()))?
                    .to_string();
                let path = req
                    .path
                    .ok_or_else(|| TunnelError::Protocol("missing path".into()))?
                    .to_string();
                let headers = req
                    .headers
                    .iter()
                    .map(|h| {
                        (
                            h.name.to_string(),
                            String::from_utf8_lossy(h.value).into_owned(),
                        )
                    })
                    .collect();
                let leftover = buf[consumed..].to_vec();
                return Ok((
                    RequestHead {
                        method,
                        path,
                        headers,
                    },
                    leftover,
                ));
            }
            httparse::Status::Partial => {
                if buf.len() >= MAX_HEAD_BYTES {
                    return Err(TunnelError::Protocol(
                        "request head exceeded maximum size".into(),
                    ));
                }
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    return Err(TunnelError::Transport(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed while reading request head",
                    )));
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

/// Writes a minimal status-line-only response with a short plaintext
/// body. Used for setup-time error responses; once splicing begins, no
/// further responses are possible or attempted.
pub async fn write_status_response<S>(stream: &mut S, code: u16, reason: &str, body: &str) -> Result<()>
where
    S: tokio::io::AsyncWrite + Unpin,
{
    let resp = format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n{body}",
        code = code,
        reason = reason,
        len = body.len(),
        body = body,
    );
    stream.write_all(resp.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn parses_registration_request_and_preserves_leftover_body() {
        let (mut client, mut server) = duplex(1024);
        client
            .write_all(
                b"POST /_skyproxy/register HTTP/1.1\r\n\
                  Host: a.example\r\n\
                  X-Skyproxy-Client-Version: 0.1\r\n\
                  \r\n\
                  leftover",
            )
            .await
            .unwrap();
        drop(client);

        let (head, leftover) = read_request_head(&mut server).await.unwrap();
        assert_eq!(head.method, "POST");
        assert_eq!(head.path, "/_skyproxy/register");
        assert_eq!(head.header("Host"), Some("a.example"));
        assert_eq!(head.header("host"), Some("a.example"));
        assert_eq!(head.header("X-Skyproxy-Client-Version"), Some("0.1"));
        assert_eq!(leftover, b"leftover");
    }

    #[tokio::test]
    async fn rejects_oversized_head() {
        let (mut client, mut server) = duplex(1 << 20);
        let huge_header = "x".repeat(MAX_HEAD_BYTES + 10);
        client
            .write_all(format!("GET / HTTP/1.1\r\nX-Huge: {huge_header}\r\n\r\n").as_bytes())
            .await
            .unwrap();
        drop(client);

        let err = read_request_head(&mut server).await.unwrap_err();
        assert!(matches!(err, TunnelError::Protocol(_)));
    }

    #[test]
    fn serialize_round_trips_request_line_and_headers() {
        let head = RequestHead {
            method: "GET".into(),
            path: "/".into(),
            headers: vec![("Host".into(), "a.example".into())],
        };
        let bytes = head.serialize();
        assert_eq!(bytes, b"GET / HTTP/1.1\r\nHost: a.example\r\n\r\n");
    }
}

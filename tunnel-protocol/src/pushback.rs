//! A stream wrapper that replays a prefix of already-read bytes before
//! resuming reads from the underlying stream.
//!
//! The hand-rolled HTTP head parser in [`crate::httpshim`] reads past the
//! blank line that ends a request's headers whenever the peer has already
//! pipelined body bytes onto the wire. Those bytes must not be lost: they
//! get handed back to the caller wrapped in [`Pushback`], which is itself
//! `AsyncRead + AsyncWrite`, so the byte splicer and the multiplex session
//! never need to know a prefix was peeled off in front of them. Grounded
//! in the rewind-buffer technique `RawStreamWrapper` uses to un-read bytes
//! after a protocol sniff.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub struct Pushback<S> {
    inner: S,
    prefix: Vec<u8>,
    prefix_pos: usize,
}

impl<S> Pushback<S> {
    pub fn new(inner: S, prefix: Vec<u8>) -> Self {
        Self {
            inner,
            prefix,
            prefix_pos: 0,
        }
    }

    fn prefix_remaining(&self) -> &[u8] {
        &self.prefix[self.prefix_pos..]
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Pushback<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let remaining = self.prefix_remaining();
        if !remaining.is_empty() {
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            self.prefix_pos += n;
            if self.prefix_pos == self.prefix.len() {
                self.prefix.clear();
                self.prefix_pos = 0;
            }
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Pushback<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn replays_prefix_before_inner_bytes() {
        let (mut client, server) = duplex(64);
        client.write_all(b"rest-of-body").await.unwrap();
        let mut pb = Pushback::new(server, b"buffered-prefix-".to_vec());

        let mut out = vec![0u8; "buffered-prefix-rest-of-body".len()];
        pb.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"buffered-prefix-rest-of-body");
    }

    #[tokio::test]
    async fn empty_prefix_reads_straight_through() {
        let (mut client, server) = duplex(64);
        client.write_all(b"hello").await.unwrap();
        let mut pb = Pushback::new(server, Vec::new());
        let mut out = [0u8; 5];
        pb.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"hello");
    }
}

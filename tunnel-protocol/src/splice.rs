//! Bidirectional byte splicing between two duplex streams.
//!
//! Each direction runs as its own task so an error or EOF in one
//! direction can never stall the other, copying raw bytes between any
//! pair of `AsyncRead + AsyncWrite` endpoints.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

const COPY_BUF_SIZE: usize = 8 * 1024;

/// Per-direction byte counts, logged for operational visibility. Not an
/// API callers branch on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpliceReport {
    pub a_to_b: u64,
    pub b_to_a: u64,
}

/// Copies bytes from `a` to `b` and from `b` to `a` concurrently until
/// both directions have terminated (EOF or error).
///
/// When `close_on_exit` is true, both endpoints are explicitly shut down
/// before returning, on every exit path — including when one direction
/// errored without ever observing a clean EOF on its peer — and the
/// second return value is `None`: ownership of `a`/`b` ends here. When
/// `close_on_exit` is false, neither endpoint is shut down and the
/// original `a`/`b` are handed back to the caller (reassembled from their
/// split halves) so splicing can be resumed or the streams reused for
/// something else; a panic in either copy direction forces the same
/// closed-and-gone behavior as `close_on_exit = true`, since the halves
/// owned by a panicked task can't be recovered.
pub async fn splice<A, B>(a: A, b: B, close_on_exit: bool) -> (SpliceReport, Option<(A, B)>)
where
    A: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut a_read, mut a_write) = tokio::io::split(a);
    let (mut b_read, mut b_write) = tokio::io::split(b);

    let a_to_b = tokio::spawn(async move {
        let n = copy_direction(&mut a_read, &mut b_write, "a->b").await;
        if close_on_exit {
            let _ = b_write.shutdown().await;
        }
        (n, a_read, b_write)
    });
    let b_to_a = tokio::spawn(async move {
        let n = copy_direction(&mut b_read, &mut a_write, "b->a").await;
        if close_on_exit {
            let _ = a_write.shutdown().await;
        }
        (n, b_read, a_write)
    });

    let (a_side, b_side) = tokio::join!(a_to_b, b_to_a);

    let (a_to_b_n, a_read, b_write) = match a_side {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "splice a->b task panicked");
            return (SpliceReport::default(), None);
        }
    };
    let (b_to_a_n, b_read, a_write) = match b_side {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "splice b->a task panicked");
            return (
                SpliceReport {
                    a_to_b: a_to_b_n,
                    b_to_a: 0,
                },
                None,
            );
        }
    };

    let report = SpliceReport {
        a_to_b: a_to_b_n,
        b_to_a: b_to_a_n,
    };
    info!(
        a_to_b = report.a_to_b,
        b_to_a = report.b_to_a,
        "splice complete"
    );

    let remainder = if close_on_exit {
        None
    } else {
        Some((a_read.unsplit(a_write), b_read.unsplit(b_write)))
    };
    (report, remainder)
}

async fn copy_direction<R, W>(reader: &mut R, writer: &mut W, direction: &'static str) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(direction, error = %e, "splice read error");
                break;
            }
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            warn!(direction, error = %e, "splice write error");
            break;
        }
        total += n as u64;
    }
    info!(direction, bytes = total, "splice direction closed");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    #[tokio::test]
    async fn delivers_bytes_in_order_both_directions() {
        let (a_public, mut a_private) = duplex(64);
        let (b_public, mut b_private) = duplex(64);

        let splice_task = tokio::spawn(splice(a_public, b_public, true));

        a_private.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        b_private.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        b_private.write_all(b"pong!").await.unwrap();
        let mut buf2 = [0u8; 5];
        a_private.read_exact(&mut buf2).await.unwrap();
        assert_eq!(&buf2, b"pong!");

        drop(a_private);
        drop(b_private);
        let (report, remainder) = splice_task.await.unwrap();
        assert_eq!(report.a_to_b, 4);
        assert_eq!(report.b_to_a, 5);
        assert!(remainder.is_none());
    }

    #[tokio::test]
    async fn terminates_when_one_side_closes_immediately() {
        let (a_public, a_private) = duplex(64);
        let (b_public, b_private) = duplex(64);
        drop(a_private);
        drop(b_private);
        let (report, remainder) = splice(a_public, b_public, true).await;
        assert_eq!(report, SpliceReport::default());
        assert!(remainder.is_none());
    }

    #[tokio::test]
    async fn close_on_exit_false_hands_streams_back_instead_of_closing() {
        let (a_public, mut a_private) = duplex(64);
        let (b_public, mut b_private) = duplex(64);

        let splice_task = tokio::spawn(splice(a_public, b_public, false));

        a_private.write_all(b"hi").await.unwrap();
        let mut buf = [0u8; 2];
        b_private.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");

        // Half-close each private end's write side so both copy directions
        // observe a clean EOF and the splice returns, without dropping
        // either private end outright (their read sides stay alive so the
        // handed-back streams can be proven still usable below).
        drop(a_private);
        b_private.shutdown().await.unwrap();

        let (report, remainder) = splice_task.await.unwrap();
        assert_eq!(report.a_to_b, 2);
        assert_eq!(report.b_to_a, 0);
        let (_a, mut b) = remainder.expect("streams returned when close_on_exit is false");

        // `b`'s write half was never shut down, so it's still usable.
        b.write_all(b"still open").await.unwrap();
        let mut out = [0u8; 10];
        b_private.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"still open");
    }
}

//! A trait-object stream type so the registration/public listeners can
//! treat a plain `TcpStream` and a `tokio_rustls` TLS stream uniformly
//! once the head parser and byte splicer only need `AsyncRead +
//! AsyncWrite`.

use tokio::io::{AsyncRead, AsyncWrite};

pub trait IoStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IoStream for T {}

/// A boxed duplex byte stream. `Box<dyn IoStream>` already implements
/// `AsyncRead`/`AsyncWrite` via tokio's blanket impls for `Box<T>`.
pub type BoxedIo = Box<dyn IoStream>;

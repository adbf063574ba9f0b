//! Shared wire protocol, hijack parsing, multiplex session wrapper, and
//! byte splicer consumed by both `proxy-server` and `tunnel-agent`.

pub mod error;
pub mod httpshim;
pub mod iostream;
pub mod mux;
pub mod pushback;
pub mod splice;
pub mod wire;

pub use error::{Result, TunnelError};

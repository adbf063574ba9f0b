//! Constants for the HTTP-style registration handshake. An older
//! structured-header handshake (`format_version`/`protocol`/`http_host`
//! terminated by `\n\n`) is not implemented; see DESIGN.md.

/// Path the registration handler is mounted on.
pub const REGISTRATION_PATH: &str = "/_skyproxy/register";

/// Method the registration handshake is sent as.
pub const REGISTRATION_METHOD: &str = "POST";

/// Client version advertised by the agent; the server currently accepts
/// any value, including ones it does not recognize.
pub const CLIENT_VERSION: &str = "0.1";

/// Header carrying the client version.
pub const CLIENT_VERSION_HEADER: &str = "X-Skyproxy-Client-Version";

/// Maximum number of bytes the head parser will buffer while looking for
/// the end of the request head, before giving up. Guards against a peer
/// that never sends a terminating blank line.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Maximum number of headers the head parser will accept.
pub const MAX_HEADERS: usize = 64;

//! Client-side TLS setup: a `TlsConnector` built from a caller-supplied CA
//! bundle.
//!
//! There is no fallback to the system/public root store: this tunnel is
//! assumed to run against an operator-controlled proxy server, so the only
//! trust anchor that matters is the one the operator hands us.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_rustls::TlsConnector;

pub fn load_connector(ca_path: &Path) -> Result<TlsConnector> {
    let file = File::open(ca_path)
        .with_context(|| format!("opening CA bundle {}", ca_path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("parsing CA bundle {}", ca_path.display()))?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in certs {
        roots
            .add(cert)
            .context("adding certificate to CA root store")?;
    }
    anyhow::ensure!(
        !roots.is_empty(),
        "CA bundle {} contained no certificates",
        ca_path.display()
    );

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

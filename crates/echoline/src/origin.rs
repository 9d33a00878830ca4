//! Server address derivation from the page origin.

use url::Url;

use crate::error::{ClientError, Result};

/// Derive the WebSocket server address from a page origin.
///
/// The scheme is mapped `http` → `ws` and `https` → `wss` (a `ws`/`wss`
/// origin passes through unchanged); host and port are copied verbatim and
/// no path or query is appended.
///
/// # Example
///
/// ```
/// use echoline::derive_ws_url;
///
/// let url = derive_ws_url("http://localhost:8080").unwrap();
/// assert_eq!(url.as_str(), "ws://localhost:8080/");
/// ```
pub fn derive_ws_url(origin: &str) -> Result<Url> {
    let origin = Url::parse(origin)?;
    let scheme = match origin.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::InvalidOrigin(format!(
                "unsupported scheme: {other}"
            )));
        }
    };
    let host = origin
        .host_str()
        .ok_or_else(|| ClientError::InvalidOrigin("missing host".to_string()))?;

    let mut address = format!("{scheme}://{host}");
    if let Some(port) = origin.port() {
        address.push_str(&format!(":{port}"));
    }
    Ok(Url::parse(&address)?)
}

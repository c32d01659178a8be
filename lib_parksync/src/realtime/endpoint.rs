//! Realtime endpoint derivation: the socket always lives at `/ws` on the
//! host that served the page, over `wss` iff the page came over `https`.

use url::Url;

use super::error::{Result, SyncError};

/// Path of the live-update endpoint.
pub const WS_PATH: &str = "/ws";

/// Maps a page origin (`https://host[:port]`) to its `/ws` endpoint.
///
/// `http` becomes `ws` and `https` becomes `wss`. Origins that are already
/// `ws`/`wss` keep their scheme. Any path, query or fragment is replaced.
pub fn ws_url_for_origin(origin: &str) -> Result<Url> {
    let mut url = Url::parse(origin)?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(SyncError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in origin {}",
                other, origin
            )))
        }
    };
    if url.host_str().is_none() {
        return Err(SyncError::InvalidEndpoint(format!("origin {} has no host", origin)));
    }

    url.set_scheme(scheme)
        .map_err(|_| SyncError::InvalidEndpoint(format!("cannot switch {} to {}", origin, scheme)))?;
    url.set_path(WS_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Builds the `/ws` endpoint for a bare `host[:port]`.
pub fn ws_url_for_host(host: &str, secure: bool) -> Result<Url> {
    let scheme = if secure { "wss" } else { "ws" };
    let url = Url::parse(&format!("{}://{}{}", scheme, host, WS_PATH))?;
    if url.host_str().is_none() {
        return Err(SyncError::InvalidEndpoint(format!("'{}' is not a host", host)));
    }
    Ok(url)
}

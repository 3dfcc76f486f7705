use std::time::Duration;

/// Transport-level failures of the log stream.
///
/// `SessionInvalid` and `AccessDenied` are terminal: the manager stops
/// retrying and hands the condition to the caller. Everything else feeds
/// the reconnect path.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The request could not be sent at all
    #[error("request failed: {0}")]
    Connect(#[from] reqwest::Error),

    /// A non-2xx status outside the auth classification
    #[error("unexpected status {0}")]
    Http(u16),

    /// The body stream failed mid-read
    #[error("stream read failed: {0}")]
    Read(reqwest::Error),

    /// Watchdog saw no bytes for longer than the stall threshold
    #[error("no stream activity for {0:?}")]
    Stalled(Duration),

    /// 401: the session token is expired or invalid
    #[error("session invalid")]
    SessionInvalid,

    /// 403 or a server-side revocation payload
    #[error("access denied")]
    AccessDenied,
}

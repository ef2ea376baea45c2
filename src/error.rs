//! Unified error type.

/// The error type returned by plume's fallible operations.
///
/// Application-level outcomes (404, 302, etc.) are expressed through the
/// [`Response`](crate::Response) facade, not as `Error`s. This type surfaces
/// failures a handler cannot turn into a response on its own: unreadable
/// files, unserializable values, malformed headers, and socket I/O.
///
/// A handler that returns an `Error` gets a `500 Internal Server Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("query string: {0}")]
    Query(#[from] serde_urlencoded::de::Error),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
}

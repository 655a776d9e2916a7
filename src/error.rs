use std::fmt;

use crate::connection::ConnectionState;
use crate::registry::ConnectionId;

/// Error type for h1wire
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    Transport(String),
    HttpParseFail(String),
    HttpParseTooManyHeaders,
    BadHeader(String),
    BadContentLengthHeader,
    BodyIsChunked,
    IncompleteResponse,
    NotReady(ConnectionState),
    UnknownConnection(ConnectionId),
    BadBase64(String),
    BadMethod(String),
    BadRequestHeader(String),
    BadUrl(String),
}

/// The broad class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// DNS, connect, TLS or mid-stream failures reported by the transport.
    Transport,
    /// The server sent something we can't make sense of, or stopped too early.
    Protocol,
    /// The API was used out of order.
    State,
    /// The request could not be turned into wire bytes.
    Encoding,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::HttpParseFail(_)
            | Error::HttpParseTooManyHeaders
            | Error::BadHeader(_)
            | Error::BadContentLengthHeader
            | Error::BodyIsChunked
            | Error::IncompleteResponse => ErrorKind::Protocol,
            Error::NotReady(_) | Error::UnknownConnection(_) => ErrorKind::State,
            Error::BadBase64(_)
            | Error::BadMethod(_)
            | Error::BadRequestHeader(_)
            | Error::BadUrl(_) => ErrorKind::Encoding,
        }
    }
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        match value {
            httparse::Error::TooManyHeaders => Error::HttpParseTooManyHeaders,
            v => Error::HttpParseFail(v.to_string()),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(v) => write!(f, "transport error: {}", v),
            Error::HttpParseFail(v) => write!(f, "http parse fail: {}", v),
            Error::HttpParseTooManyHeaders => write!(f, "http parse resulted in too many headers"),
            Error::BadHeader(v) => write!(f, "bad header: {}", v),
            Error::BadContentLengthHeader => write!(f, "content-length header not a number"),
            Error::BodyIsChunked => write!(f, "chunked response body is not supported"),
            Error::IncompleteResponse => {
                write!(f, "connection closed before response was complete")
            }
            Error::NotReady(s) => write!(f, "connection is not ready for a request: {:?}", s),
            Error::UnknownConnection(id) => write!(f, "no connection with id {}", id),
            Error::BadBase64(v) => write!(f, "request body is not valid base64: {}", v),
            Error::BadMethod(v) => write!(f, "bad method: {}", v),
            Error::BadRequestHeader(v) => write!(f, "bad request header: {}", v),
            Error::BadUrl(v) => write!(f, "bad url: {}", v),
        }
    }
}

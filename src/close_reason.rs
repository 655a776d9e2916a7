use std::fmt;

/// Reasons a connection reached the closed state.
///
/// Every [`Connection`][crate::Connection] ends up closed exactly once. This records
/// which of the possible endings happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The response was received and handed to the success callback.
    Completed,

    /// The request could not be encoded, the transport was never opened.
    EncodingFailed,

    /// The response could not be parsed.
    ProtocolError,

    /// The transport reported an error.
    TransportError,

    /// The transport closed before the response was complete.
    PrematureClose,

    /// The caller closed the connection.
    ///
    /// Neither callback fires after this, even if the response was already
    /// (partially) received.
    Cancelled,
}

impl CloseReason {
    pub(crate) fn explain(&self) -> &'static str {
        match self {
            CloseReason::Completed => "response received",
            CloseReason::EncodingFailed => "request could not be encoded",
            CloseReason::ProtocolError => "response could not be parsed",
            CloseReason::TransportError => "transport reported an error",
            CloseReason::PrematureClose => "transport closed before response was complete",
            CloseReason::Cancelled => "closed by caller",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain())
    }
}

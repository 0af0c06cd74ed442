//! Error types for the RTSP/MJPEG streaming library.

use std::fmt;

use crate::protocol::request::Method;
use crate::session::SessionState;

/// Errors that can occur while serving an RTSP session.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Control path**: [`Parse`](Self::Parse) and
///   [`ConnectionClosed`](Self::ConnectionClosed) end only the offending
///   connection.
/// - **Media path**: [`FrameSource`](Self::FrameSource) fails SETUP, but is a
///   skipped tick while streaming. [`Transport`](Self::Transport) is never
///   fatal to a session.
/// - **State machine**: [`InvalidState`](Self::InvalidState) marks a request
///   that is not valid in the current state. It is dropped without a reply.
/// - **Server**: [`NotStarted`](Self::NotStarted),
///   [`AlreadyRunning`](Self::AlreadyRunning).
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RTSP request line or non-numeric field.
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// The peer closed the RTSP connection before a request was complete.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The frame source could not be opened or read.
    #[error("frame source error: {0}")]
    FrameSource(String),

    /// Sending an RTP datagram failed.
    #[error("RTP transport error: {0}")]
    Transport(std::io::Error),

    /// The request is not valid in the session's current state.
    #[error("{method} not allowed in state {state:?}")]
    InvalidState { method: Method, state: SessionState },

    /// [`Server::start`](crate::Server::start) has not been called yet.
    #[error("server not started")]
    NotStarted,

    /// [`Server::start`](crate::Server::start) was called while already running.
    #[error("server already running")]
    AlreadyRunning,
}

impl RtspError {
    pub(crate) fn parse(kind: ParseErrorKind) -> Self {
        RtspError::Parse { kind }
    }
}

/// Specific kind of RTSP parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Request line had no method token.
    EmptyRequest,
    /// SETUP request line had no resource token.
    MissingResource,
    /// Second line did not carry a `CSeq` field.
    MissingCSeq,
    /// `CSeq` value was not a non-negative integer.
    InvalidCSeq,
    /// SETUP request had no transport line.
    MissingTransport,
    /// No destination port could be read from the transport line.
    InvalidPort,
    /// A request line was not valid UTF-8.
    InvalidEncoding,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest => write!(f, "empty request"),
            Self::MissingResource => write!(f, "missing resource in SETUP request line"),
            Self::MissingCSeq => write!(f, "missing CSeq line"),
            Self::InvalidCSeq => write!(f, "invalid CSeq value"),
            Self::MissingTransport => write!(f, "missing transport line"),
            Self::InvalidPort => write!(f, "invalid client port in transport line"),
            Self::InvalidEncoding => write!(f, "request line is not valid UTF-8"),
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;

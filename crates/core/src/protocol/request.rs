use std::fmt;
use std::io::{self, BufRead};

use crate::error::{ParseErrorKind, Result, RtspError};
use crate::session::transport::TransportHeader;

/// RTSP request method.
///
/// Matching is case-sensitive: `play` is not `PLAY`. Anything outside the
/// four supported methods is carried as [`Method::Unknown`] and dropped by
/// the handler without a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Setup,
    Play,
    Pause,
    Teardown,
    Unknown(String),
}

impl Method {
    pub fn from_token(token: &str) -> Self {
        match token {
            "SETUP" => Method::Setup,
            "PLAY" => Method::Play,
            "PAUSE" => Method::Pause,
            "TEARDOWN" => Method::Teardown,
            other => Method::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Pause => "PAUSE",
            Method::Teardown => "TEARDOWN",
            Method::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed RTSP request.
///
/// Requests are exactly three lines:
///
/// ```text
/// SETUP clip.mjpeg\r\n
/// CSeq: 1\r\n
/// Transport: RTP/UDP; client_port= 25000\r\n
/// ```
///
/// The resource is only read for SETUP, and the transport line is only
/// validated for SETUP. On other methods the third line (usually a
/// `Session:` echo) is read and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspRequest {
    pub method: Method,
    /// Requested frame source (SETUP only).
    pub resource: Option<String>,
    /// Command sequence number, echoed in the response.
    pub cseq: u32,
    /// Client transport (SETUP only).
    pub transport: Option<TransportHeader>,
}

impl RtspRequest {
    /// Parse a request from its text form.
    ///
    /// Lines may be terminated by CRLF or LF. Missing trailing lines are
    /// reported as parse errors; use [`read_from`](Self::read_from) on a
    /// live connection, where running out of input means the peer is gone.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw.lines();
        let request_line = lines
            .next()
            .ok_or(RtspError::parse(ParseErrorKind::EmptyRequest))?;
        let cseq_line = lines
            .next()
            .ok_or(RtspError::parse(ParseErrorKind::MissingCSeq))?;
        Self::from_lines(request_line, cseq_line, lines.next())
    }

    /// Read one request from a buffered connection.
    ///
    /// Empty lines before the request line are skipped. Returns
    /// [`RtspError::ConnectionClosed`] if the stream ends, or a read fails,
    /// before all three lines have arrived.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let request_line = loop {
            let line = read_line(reader)?;
            if !line.trim().is_empty() {
                break line;
            }
        };
        let cseq_line = read_line(reader)?;
        let last_line = read_line(reader)?;

        Self::from_lines(&request_line, &cseq_line, Some(&last_line))
    }

    fn from_lines(request_line: &str, cseq_line: &str, last_line: Option<&str>) -> Result<Self> {
        let mut tokens = request_line.split_whitespace();
        let method = tokens
            .next()
            .map(Method::from_token)
            .ok_or(RtspError::parse(ParseErrorKind::EmptyRequest))?;

        let resource = if method == Method::Setup {
            let name = tokens
                .next()
                .ok_or(RtspError::parse(ParseErrorKind::MissingResource))?;
            Some(name.to_string())
        } else {
            None
        };

        let cseq = parse_cseq(cseq_line)?;

        let transport = if method == Method::Setup {
            let line = last_line.ok_or(RtspError::parse(ParseErrorKind::MissingTransport))?;
            let header = TransportHeader::parse(line)
                .ok_or(RtspError::parse(ParseErrorKind::InvalidPort))?;
            Some(header)
        } else {
            None
        };

        Ok(RtspRequest {
            method,
            resource,
            cseq,
            transport,
        })
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Err(RtspError::ConnectionClosed),
        Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            Err(RtspError::parse(ParseErrorKind::InvalidEncoding))
        }
        Err(e) => {
            tracing::debug!(error = %e, "read failed");
            Err(RtspError::ConnectionClosed)
        }
    }
}

/// Extract the numeric value from a `CSeq: <n>` line.
fn parse_cseq(line: &str) -> Result<u32> {
    let (name, value) = match line.split_once(':') {
        Some((name, value)) => (name.trim(), value),
        None => {
            let mut tokens = line.split_whitespace();
            (tokens.next().unwrap_or(""), tokens.next().unwrap_or(""))
        }
    };

    if !name.eq_ignore_ascii_case("CSeq") {
        return Err(RtspError::parse(ParseErrorKind::MissingCSeq));
    }

    value
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or(RtspError::parse(ParseErrorKind::InvalidCSeq))
}

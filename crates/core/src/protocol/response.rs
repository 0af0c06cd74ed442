use std::io::Write;

/// An RTSP response.
///
/// Serializes to exactly three CRLF-terminated lines:
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 1\r\n
/// Session: 123456\r\n
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    /// Sequence number of the request being answered.
    pub cseq: u32,
    /// Fixed identifier of the answering session.
    pub session_id: u64,
}

impl RtspResponse {
    pub fn new(status_code: u16, status_text: &str, cseq: u32, session_id: u64) -> Self {
        RtspResponse {
            status_code,
            status_text: status_text.to_string(),
            cseq,
            session_id,
        }
    }

    /// 200 OK, sent for every accepted transition.
    pub fn ok(cseq: u32, session_id: u64) -> Self {
        Self::new(200, "OK", cseq, session_id)
    }

    /// 400 Bad Request, sent before closing a connection that sent a
    /// malformed request.
    pub fn bad_request(cseq: u32, session_id: u64) -> Self {
        Self::new(400, "Bad Request", cseq, session_id)
    }

    /// 404 Not Found, the requested frame source could not be opened.
    pub fn not_found(cseq: u32, session_id: u64) -> Self {
        Self::new(404, "Not Found", cseq, session_id)
    }

    /// 500 Internal Server Error, a transition's side effect failed.
    pub fn internal_error(cseq: u32, session_id: u64) -> Self {
        Self::new(500, "Internal Server Error", cseq, session_id)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        format!(
            "RTSP/1.0 {} {}\r\nCSeq: {}\r\nSession: {}\r\n",
            self.status_code, self.status_text, self.cseq, self.session_id
        )
    }

    /// Write the response and flush, so it is on the wire before the next
    /// request is read.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.serialize().as_bytes())?;
        writer.flush()
    }
}

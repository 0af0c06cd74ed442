use crate::error::RtspError;
use crate::protocol::request::{Method, RtspRequest};
use crate::protocol::response::RtspResponse;
use crate::session::{Session, SessionState};

/// Routes the requests of one connection to its [`Session`].
///
/// Every accepted transition is answered with 200 OK. A transition whose
/// side effect fails is answered with an error status so the client is
/// never left waiting. Unknown methods and requests that are not valid in
/// the current state get no answer at all.
pub struct MethodHandler {
    session: Session,
}

impl MethodHandler {
    pub fn new(session: Session) -> Self {
        MethodHandler { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the session has been torn down and the connection should close.
    pub fn is_closed(&self) -> bool {
        self.session.state() == SessionState::Terminated
    }

    pub fn handle(&self, request: &RtspRequest) -> Option<RtspResponse> {
        let cseq = request.cseq;
        let session_id = self.session.id();

        let result = match &request.method {
            Method::Setup => {
                let (Some(resource), Some(transport)) = (&request.resource, &request.transport)
                else {
                    tracing::warn!(cseq, "SETUP without resource or transport");
                    return Some(RtspResponse::bad_request(cseq, session_id));
                };
                self.session.setup(resource, transport)
            }
            Method::Play => self.session.play(),
            Method::Pause => self.session.pause(),
            Method::Teardown => {
                if self.session.teardown() {
                    tracing::info!(session_id, "session terminated via TEARDOWN");
                    Ok(())
                } else {
                    Err(RtspError::InvalidState {
                        method: Method::Teardown,
                        state: SessionState::Terminated,
                    })
                }
            }
            Method::Unknown(name) => {
                tracing::debug!(method = %name, cseq, "ignoring unsupported RTSP method");
                return None;
            }
        };

        match result {
            Ok(()) => Some(RtspResponse::ok(cseq, session_id)),
            Err(RtspError::InvalidState { method, state }) => {
                tracing::debug!(%method, ?state, cseq, "ignoring out-of-state request");
                None
            }
            Err(RtspError::FrameSource(reason)) => {
                tracing::warn!(cseq, reason = %reason, "frame source unavailable");
                Some(RtspResponse::not_found(cseq, session_id))
            }
            Err(e) => {
                tracing::error!(method = %request.method, cseq, error = %e, "request failed");
                Some(RtspResponse::internal_error(cseq, session_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::media::FrameSource;
    use crate::session::SessionConfig;
    use crate::testutil::{ScriptedSource, rtp_receiver};
    use std::net::{SocketAddr, UdpSocket};
    use std::sync::Arc;

    fn handler() -> (MethodHandler, UdpSocket) {
        let receiver = rtp_receiver();
        let opener = |resource: &str| -> Result<Box<dyn FrameSource>> {
            match resource {
                "clip" => Ok(Box::new(ScriptedSource::numbered(5))),
                other => Err(RtspError::FrameSource(format!("no clip {other}"))),
            }
        };
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let session = Session::new(peer, SessionConfig::default(), Arc::new(opener));
        (MethodHandler::new(session), receiver)
    }

    fn request(raw: &str) -> RtspRequest {
        RtspRequest::parse(raw).unwrap()
    }

    fn setup(port: u16, cseq: u32) -> RtspRequest {
        request(&format!(
            "SETUP clip\r\nCSeq: {cseq}\r\nTransport: RTP/AVP;unicast;client_port={port}\r\n"
        ))
    }

    #[test]
    fn one_response_per_transition() {
        let (handler, receiver) = handler();
        let port = receiver.local_addr().unwrap().port();

        let steps = [
            (setup(port, 1), SessionState::Ready),
            (request("PLAY clip\r\nCSeq: 2\r\nSession: 123456\r\n"), SessionState::Playing),
            (request("PAUSE clip\r\nCSeq: 3\r\nSession: 123456\r\n"), SessionState::Ready),
            (request("PLAY clip\r\nCSeq: 4\r\nSession: 123456\r\n"), SessionState::Playing),
            (request("TEARDOWN clip\r\nCSeq: 5\r\nSession: 123456\r\n"), SessionState::Terminated),
        ];

        for (req, expected) in steps {
            let resp = handler.handle(&req).expect("transition answered");
            assert_eq!(resp, RtspResponse::ok(req.cseq, 123456));
            assert_eq!(handler.session().state(), expected);
        }
        assert!(handler.is_closed());
    }

    #[test]
    fn out_of_state_request_is_silent() {
        let (handler, _receiver) = handler();

        assert!(handler.handle(&request("PLAY clip\r\nCSeq: 1\r\n\r\n")).is_none());
        assert!(handler.handle(&request("PAUSE clip\r\nCSeq: 2\r\n\r\n")).is_none());
        assert_eq!(handler.session().state(), SessionState::Init);
    }

    #[test]
    fn unknown_method_is_silent() {
        let (handler, _receiver) = handler();
        assert!(handler.handle(&request("OPTIONS *\r\nCSeq: 1\r\n\r\n")).is_none());
        assert_eq!(handler.session().state(), SessionState::Init);
    }

    #[test]
    fn missing_clip_answers_not_found() {
        let (handler, receiver) = handler();
        let port = receiver.local_addr().unwrap().port();
        let req = request(&format!(
            "SETUP other\r\nCSeq: 1\r\nTransport: RTP/UDP; client_port= {port}\r\n"
        ));

        let resp = handler.handle(&req).unwrap();
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.cseq, 1);
        assert_eq!(handler.session().state(), SessionState::Init);
    }

    #[test]
    fn second_teardown_is_silent() {
        let (handler, _receiver) = handler();
        let teardown = request("TEARDOWN clip\r\nCSeq: 1\r\nSession: 123456\r\n");

        assert!(handler.handle(&teardown).is_some());
        assert!(handler.handle(&teardown).is_none());
    }
}

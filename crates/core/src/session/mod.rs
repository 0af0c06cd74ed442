//! Per-connection RTSP session state machine.
//!
//! One [`Session`] exists per accepted RTSP connection. It owns the RTP
//! socket, the frame source and the frame scheduler, and accepts these
//! transitions:
//!
//! ```text
//! Init     --SETUP-->    Ready     (open frame source, bind RTP socket)
//! Ready    --PLAY-->     Playing   (start frame scheduler)
//! Playing  --PAUSE-->    Ready     (stop frame scheduler)
//! any      --TEARDOWN--> Terminated (stop scheduler, close RTP socket)
//! ```
//!
//! Anything else fails with [`RtspError::InvalidState`] and changes nothing.
//!
//! The RTSP reader thread and the scheduler thread never share mutable
//! fields: the scheduler owns the [`FrameStream`] while PLAYING and returns
//! it on stop. State, parked stream and scheduler handle sit behind one
//! mutex, so transitions are serialized.

pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, RtspError};
use crate::media::FrameSourceOpener;
use crate::media::rtp::PAYLOAD_TYPE_JPEG;
use crate::protocol::request::Method;
use crate::stream::{FrameScheduler, FrameStream};
use crate::transport::UdpTransport;
pub use transport::{Transport, TransportHeader};

/// Session identifier returned in every `Session:` response line.
pub const DEFAULT_SESSION_ID: u64 = 123456;

/// Nominal frame spacing (20 fps).
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(50);

/// Frames streamed before the scheduler stops on its own.
pub const DEFAULT_FRAME_LIMIT: u32 = 500;

/// Size of the reusable frame buffer; larger frames are skipped.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 50_000;

/// Streaming parameters fixed for a session's lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_id: u64,
    pub payload_type: u8,
    pub frame_period: Duration,
    pub frame_limit: u32,
    pub max_frame_size: usize,
    /// Value of the RTP marker bit on every packet.
    pub marker: bool,
    /// RTP SSRC. `None` picks a random one per session.
    pub ssrc: Option<u32>,
}

impl SessionConfig {
    /// Frame period in milliseconds, the RTP timestamp step per frame.
    pub fn period_millis(&self) -> u32 {
        u32::try_from(self.frame_period.as_millis()).unwrap_or(u32::MAX)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: DEFAULT_SESSION_ID,
            payload_type: PAYLOAD_TYPE_JPEG,
            frame_period: DEFAULT_FRAME_PERIOD,
            frame_limit: DEFAULT_FRAME_LIMIT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            marker: false,
            ssrc: None,
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection accepted, waiting for SETUP.
    Init,
    /// Transport set up, not streaming.
    Ready,
    /// Frame scheduler running (or finished at the frame limit).
    Playing,
    /// TEARDOWN completed or the connection dropped. Terminal.
    Terminated,
}

struct Inner {
    state: SessionState,
    resource: Option<String>,
    transport: Option<Transport>,
    /// Parked stream while Ready.
    stream: Option<FrameStream>,
    /// Running scheduler while Playing.
    scheduler: Option<FrameScheduler>,
}

/// A single RTSP session.
pub struct Session {
    peer: SocketAddr,
    config: SessionConfig,
    opener: Arc<dyn FrameSourceOpener>,
    inner: Mutex<Inner>,
}

impl Session {
    /// Create a session for a connection from `peer`, in [`SessionState::Init`].
    pub fn new(peer: SocketAddr, config: SessionConfig, opener: Arc<dyn FrameSourceOpener>) -> Self {
        Session {
            peer,
            config,
            opener,
            inner: Mutex::new(Inner {
                state: SessionState::Init,
                resource: None,
                transport: None,
                stream: None,
                scheduler: None,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.config.session_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn resource(&self) -> Option<String> {
        self.inner.lock().resource.clone()
    }

    pub fn transport(&self) -> Option<Transport> {
        self.inner.lock().transport
    }

    /// Frames counted so far, or `None` while the scheduler holds the stream.
    pub fn frame_number(&self) -> Option<u32> {
        self.inner.lock().stream.as_ref().map(FrameStream::frame_number)
    }

    /// Whether a running scheduler has stopped itself at the frame limit.
    pub fn is_stream_finished(&self) -> bool {
        self.inner
            .lock()
            .scheduler
            .as_ref()
            .is_some_and(FrameScheduler::is_finished)
    }

    /// SETUP: open the frame source and bind the RTP socket.
    ///
    /// On failure the session stays in Init and nothing is kept open.
    pub fn setup(&self, resource: &str, header: &TransportHeader) -> Result<()> {
        let mut inner = self.inner.lock();
        check_state(&inner, Method::Setup, SessionState::Init)?;

        let transport = Transport::new(self.peer, header);
        let source = self.opener.open(resource)?;
        let udp = UdpTransport::bind_for(transport.client_addr)?;
        let stream = FrameStream::new(source, udp, transport.client_addr, self.config.clone());

        tracing::info!(
            session_id = self.id(),
            resource,
            client_rtp = %transport.client_addr,
            ssrc = format_args!("{:#010X}", stream.ssrc()),
            "session set up"
        );

        inner.resource = Some(resource.to_string());
        inner.transport = Some(transport);
        inner.stream = Some(stream);
        self.set_state(&mut inner, SessionState::Ready);
        Ok(())
    }

    /// PLAY: start the frame scheduler.
    pub fn play(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        check_state(&inner, Method::Play, SessionState::Ready)?;

        let stream = inner.stream.take().ok_or(RtspError::InvalidState {
            method: Method::Play,
            state: inner.state,
        })?;

        match FrameScheduler::start(stream, self.config.frame_period) {
            Ok(scheduler) => {
                inner.scheduler = Some(scheduler);
                self.set_state(&mut inner, SessionState::Playing);
                Ok(())
            }
            Err(e) => {
                // The stream went down with the failed spawn; SETUP must be redone.
                tracing::error!(session_id = self.id(), error = %e, "failed to start frame scheduler");
                inner.transport = None;
                self.set_state(&mut inner, SessionState::Init);
                Err(e)
            }
        }
    }

    /// PAUSE: stop the frame scheduler and park the stream.
    ///
    /// Returns once the scheduler thread has exited.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        check_state(&inner, Method::Pause, SessionState::Playing)?;

        let stopped = match inner.scheduler.take() {
            Some(mut scheduler) => scheduler.stop(),
            None => Ok(None),
        };

        match stopped {
            Ok(Some(stream)) => {
                inner.stream = Some(stream);
                self.set_state(&mut inner, SessionState::Ready);
                Ok(())
            }
            Ok(None) => {
                inner.transport = None;
                self.set_state(&mut inner, SessionState::Init);
                Err(RtspError::Io(std::io::Error::other("frame stream lost")))
            }
            Err(e) => {
                inner.transport = None;
                self.set_state(&mut inner, SessionState::Init);
                Err(e)
            }
        }
    }

    /// TEARDOWN: stop the scheduler and close the RTP socket.
    ///
    /// Returns `true` if this call released the session, `false` if it was
    /// already torn down.
    pub fn teardown(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Terminated {
            return false;
        }

        if let Some(mut scheduler) = inner.scheduler.take() {
            if let Err(e) = scheduler.stop() {
                tracing::error!(session_id = self.id(), error = %e, "frame scheduler did not stop cleanly");
            }
        }
        // Dropping the stream closes the RTP socket.
        inner.stream = None;
        inner.transport = None;

        self.set_state(&mut inner, SessionState::Terminated);
        true
    }

    fn set_state(&self, inner: &mut Inner, state: SessionState) {
        tracing::debug!(session_id = self.id(), peer = %self.peer, old_state = ?inner.state, new_state = ?state, "state transition");
        inner.state = state;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn check_state(inner: &Inner, method: Method, expected: SessionState) -> Result<()> {
    if inner.state == expected {
        Ok(())
    } else {
        Err(RtspError::InvalidState {
            method,
            state: inner.state,
        })
    }
}

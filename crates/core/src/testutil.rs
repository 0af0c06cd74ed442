use std::collections::VecDeque;
use std::net::UdpSocket;
use std::time::Duration;

use crate::error::{Result, RtspError};
use crate::media::FrameSource;

/// Frames served from memory. `None` entries fail the read; once the
/// script runs out every read returns `Ok(0)`.
pub(crate) struct ScriptedSource(VecDeque<Option<Vec<u8>>>);

impl ScriptedSource {
    pub(crate) fn new(frames: Vec<Option<Vec<u8>>>) -> Self {
        ScriptedSource(frames.into())
    }

    /// `count` small frames, numbered from 1.
    pub(crate) fn numbered(count: u8) -> Self {
        Self::new((1..=count).map(|i| Some(vec![0xFF, 0xD8, i, 0xFF, 0xD9])).collect())
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.0.pop_front() {
            Some(Some(frame)) => {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            }
            Some(None) => Err(RtspError::FrameSource("scripted failure".to_string())),
            None => Ok(0),
        }
    }
}

/// Loopback UDP socket standing in for an RTP client.
pub(crate) fn rtp_receiver() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    socket
}

//! Frame delivery for a playing session.
//!
//! [`FrameStream`] owns everything one tick needs: the frame source, the
//! RTP socket, the frame counter and the reusable frame buffer.
//! [`FrameScheduler`] moves the stream onto its own thread while PLAYING
//! and hands it back when stopped, so counters survive PAUSE/PLAY.

pub mod scheduler;

use std::net::SocketAddr;

use rand::RngExt;

use crate::media::FrameSource;
use crate::media::rtp::RtpPacket;
use crate::session::SessionConfig;
use crate::transport::UdpTransport;

pub use scheduler::FrameScheduler;

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A packet with this RTP sequence number was sent.
    Sent(u16),
    /// No frame was available; the tick was skipped.
    Skipped,
    /// The packet was built but the UDP send failed.
    SendFailed,
    /// The frame limit was reached. Nothing was sent.
    Finished,
}

pub struct FrameStream {
    source: Box<dyn FrameSource>,
    transport: UdpTransport,
    dest: SocketAddr,
    config: SessionConfig,
    ssrc: u32,
    frame_number: u32,
    buf: Vec<u8>,
}

impl FrameStream {
    pub fn new(
        source: Box<dyn FrameSource>,
        transport: UdpTransport,
        dest: SocketAddr,
        config: SessionConfig,
    ) -> Self {
        let ssrc = config.ssrc.unwrap_or_else(|| rand::rng().random::<u32>());
        let buf = vec![0u8; config.max_frame_size];
        Self {
            source,
            transport,
            dest,
            config,
            ssrc,
            frame_number: 0,
            buf,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_frame_number(mut self, frame_number: u32) -> Self {
        self.frame_number = frame_number;
        self
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Whether the configured frame limit has been reached.
    pub fn is_finished(&self) -> bool {
        self.frame_number >= self.config.frame_limit
    }

    /// Pull the next frame and send it as one RTP datagram.
    pub fn tick(&mut self) -> Tick {
        if self.is_finished() {
            tracing::info!(
                frames = self.frame_number,
                limit = self.config.frame_limit,
                "frame limit reached"
            );
            return Tick::Finished;
        }

        self.frame_number += 1;

        let len = match self.source.next_frame(&mut self.buf) {
            Ok(0) => {
                tracing::warn!(frame = self.frame_number, "frame source returned no data, skipping");
                return Tick::Skipped;
            }
            Ok(len) => len.min(self.buf.len()),
            Err(e) => {
                tracing::warn!(frame = self.frame_number, error = %e, "frame read failed, skipping");
                return Tick::Skipped;
            }
        };

        let sequence = self.frame_number as u16;
        let timestamp = self.frame_number.wrapping_mul(self.config.period_millis());
        let packet = RtpPacket::new(
            self.config.payload_type,
            sequence,
            timestamp,
            self.ssrc,
            &self.buf[..len],
        )
        .with_marker(self.config.marker);

        tracing::trace!(
            version = 2,
            marker = packet.marker,
            pt = packet.payload_type,
            seq = packet.sequence,
            ts = packet.timestamp,
            ssrc = format_args!("{:#010X}", packet.ssrc),
            len = packet.encoded_len(),
            "RTP packet"
        );

        match self.transport.send_to(&packet.encode(), self.dest) {
            Ok(_) => Tick::Sent(sequence),
            Err(e) => {
                tracing::warn!(dest = %self.dest, seq = sequence, error = %e, "RTP send failed");
                Tick::SendFailed
            }
        }
    }
}

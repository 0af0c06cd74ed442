//! Frame sources and RTP packetization.
//!
//! A session streams from one [`FrameSource`], opened by name during SETUP
//! through a [`FrameSourceOpener`]. Every frame is sent whole in a single
//! RTP packet ([`rtp::RtpPacket`]) with a 12-byte fixed header.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`rtp`] | RTP fixed header encode/decode (RFC 3550 §5.1) |
//! | [`mjpeg`] | MJPEG container reader/writer and a directory-backed opener |

pub mod mjpeg;
pub mod rtp;

use crate::error::Result;

/// Supplies sequential raw frames.
pub trait FrameSource: Send {
    /// Fill `buf` with the next frame and return its length.
    ///
    /// `Ok(0)` means no frame is available (for example at end of file). The
    /// streamer treats that, and any error, as a skipped tick.
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Opens a [`FrameSource`] for the resource named in a SETUP request.
pub trait FrameSourceOpener: Send + Sync {
    fn open(&self, resource: &str) -> Result<Box<dyn FrameSource>>;
}

impl<F> FrameSourceOpener for F
where
    F: Fn(&str) -> Result<Box<dyn FrameSource>> + Send + Sync,
{
    fn open(&self, resource: &str) -> Result<Box<dyn FrameSource>> {
        self(resource)
    }
}

//! Minimal RTSP session server that streams recorded MJPEG clips over
//! RTP/UDP, one session per connection.

pub mod error;
pub mod media;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stream;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use error::{Result, RtspError};
pub use media::{FrameSource, FrameSourceOpener};
pub use server::{Server, ServerConfig};
pub use session::{Session, SessionConfig, SessionState};

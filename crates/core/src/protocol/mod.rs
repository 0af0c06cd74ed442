//! RTSP control protocol.
//!
//! Requests are three text lines, CRLF or LF terminated:
//!
//! ```text
//! SETUP clip.mjpeg RTSP/1.0\r\n
//! CSeq: 1\r\n
//! Transport: RTP/UDP; client_port= 25000\r\n
//! ```
//!
//! and every answered request gets exactly three lines back:
//!
//! ```text
//! RTSP/1.0 200 OK\r\n
//! CSeq: 1\r\n
//! Session: 123456\r\n
//! ```
//!
//! ## Supported methods
//!
//! | Method | Valid in | Effect |
//! |--------|----------|--------|
//! | SETUP | Init | Open the clip, bind the RTP socket |
//! | PLAY | Ready | Start frame delivery |
//! | PAUSE | Playing | Stop frame delivery |
//! | TEARDOWN | any | Release everything, close the connection |

pub mod handler;
pub mod request;
pub mod response;

pub use handler::MethodHandler;
pub use request::{Method, RtspRequest};
pub use response::RtspResponse;

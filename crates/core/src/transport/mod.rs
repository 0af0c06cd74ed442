//! Network transport layer for RTSP signaling and RTP media delivery.
//!
//! - **TCP** ([`tcp`]): carries RTSP request/response signaling. One TCP
//!   connection per client, with a thread per connection.
//!
//! - **UDP** ([`udp`]): carries RTP media packets. Each session binds its
//!   own ephemeral socket during SETUP.

pub mod tcp;
pub mod udp;

pub use udp::UdpTransport;

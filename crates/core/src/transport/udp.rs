use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::error::{Result, RtspError};

/// UDP transport for outbound RTP packet delivery.
///
/// Each session binds its own ephemeral socket during SETUP. Dropping the
/// transport closes the socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an ephemeral UDP socket able to reach `dest`.
    pub fn bind_for(dest: SocketAddr) -> Result<Self> {
        let local: SocketAddr = match dest {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        tracing::debug!(local = ?socket.local_addr().ok(), %dest, "RTP socket bound");
        Ok(Self { socket })
    }

    /// Send one datagram to a specific socket address.
    pub fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<usize> {
        self.socket.send_to(payload, addr).map_err(RtspError::Transport)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

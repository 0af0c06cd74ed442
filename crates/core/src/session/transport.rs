use std::net::SocketAddr;

/// Destination for a session's RTP datagrams.
///
/// The address comes from the RTSP connection's peer, the port from the
/// client's SETUP transport line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transport {
    /// Client's RTP receive port.
    pub client_rtp_port: u16,
    /// Full socket address for RTP delivery (`client_ip:client_rtp_port`).
    pub client_addr: SocketAddr,
}

impl Transport {
    pub fn new(peer: SocketAddr, header: &TransportHeader) -> Self {
        Transport {
            client_rtp_port: header.client_rtp_port,
            client_addr: SocketAddr::new(peer.ip(), header.client_rtp_port),
        }
    }
}

/// Client-side transport info from the SETUP transport line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHeader {
    /// Client's requested RTP port.
    pub client_rtp_port: u16,
    /// Client's RTCP port, when given as `client_port=RTP-RTCP`.
    pub client_rtcp_port: Option<u16>,
}

impl TransportHeader {
    /// Parse the transport line of a SETUP request.
    ///
    /// The fourth whitespace-delimited token is the destination port. When
    /// that token is missing or not a port, a `client_port=RTP[-RTCP]`
    /// parameter anywhere on the line is used instead.
    ///
    /// ## Examples
    ///
    /// ```
    /// use rtsp_mjpeg::session::transport::TransportHeader;
    ///
    /// let th = TransportHeader::parse("Transport: RTP/UDP; client_port= 25000").unwrap();
    /// assert_eq!(th.client_rtp_port, 25000);
    ///
    /// let th = TransportHeader::parse("Transport: RTP/AVP;unicast;client_port=8000-8001").unwrap();
    /// assert_eq!(th.client_rtp_port, 8000);
    /// assert_eq!(th.client_rtcp_port, Some(8001));
    ///
    /// assert!(TransportHeader::parse("Transport: RTP/AVP;unicast").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(port) = line.split_whitespace().nth(3).and_then(parse_port) {
            return Some(TransportHeader {
                client_rtp_port: port,
                client_rtcp_port: None,
            });
        }

        for part in line.split([';', ' ', '\t']) {
            if let Some(ports) = part.trim().strip_prefix("client_port=") {
                let mut port_parts = ports.split('-');
                let rtp = port_parts.next().and_then(parse_port)?;
                let rtcp = port_parts.next().and_then(parse_port);

                return Some(TransportHeader {
                    client_rtp_port: rtp,
                    client_rtcp_port: rtcp,
                });
            }
        }
        None
    }
}

fn parse_port(token: &str) -> Option<u16> {
    token.parse::<u16>().ok().filter(|port| *port != 0)
}

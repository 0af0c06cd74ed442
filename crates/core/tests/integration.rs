//! Integration tests: a real server on loopback, driven over TCP, with RTP
//! received on a local UDP socket.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, UdpSocket};
use std::path::Path;
use std::time::Duration;

use rtsp_mjpeg::media::mjpeg::MjpegWriter;
use rtsp_mjpeg::media::rtp::{RTP_HEADER_LEN, RtpHeader};
use rtsp_mjpeg::{Server, ServerConfig, SessionConfig};

const FRAMES: u8 = 3;

fn write_clip(dir: &Path) {
    let file = File::create(dir.join("clip.mjpeg")).unwrap();
    let mut writer = MjpegWriter::new(file);
    for i in 1..=FRAMES {
        writer.write_frame(&[0xFF, 0xD8, i, 0xFF, 0xD9]).unwrap();
    }
}

fn start_server(dir: &Path, session: SessionConfig) -> Server {
    let config = ServerConfig {
        media_root: dir.to_path_buf(),
        session,
    };
    let mut server = Server::with_config("127.0.0.1:0", config);
    server.start().expect("server start");
    server
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(server: &Server) -> Self {
        let stream = TcpStream::connect(server.local_addr().unwrap()).expect("connect to server");
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Client {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
        }
    }

    fn send(&mut self, request: &str) {
        self.writer.write_all(request.as_bytes()).unwrap();
        self.writer.flush().unwrap();
    }

    /// Read one three-line response.
    fn response(&mut self) -> Vec<String> {
        (0..3)
            .map(|_| {
                let mut line = String::new();
                self.reader.read_line(&mut line).unwrap();
                line
            })
            .collect()
    }

    /// Whether the server has closed the connection.
    fn is_closed(&mut self) -> bool {
        let mut line = String::new();
        matches!(self.reader.read_line(&mut line), Ok(0))
    }
}

fn rtp_receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

#[test]
fn setup_play_teardown_streams_clip() {
    let dir = tempfile::tempdir().unwrap();
    write_clip(dir.path());
    let mut server = start_server(
        dir.path(),
        SessionConfig {
            frame_period: Duration::from_millis(10),
            frame_limit: FRAMES as u32,
            ..SessionConfig::default()
        },
    );
    let (rtp, port) = rtp_receiver();
    let mut client = Client::connect(&server);

    client.send(&format!(
        "SETUP clip.mjpeg RTSP/1.0\r\nCSeq: 1\r\nTransport: RTP/UDP; client_port= {port}\r\n"
    ));
    assert_eq!(
        client.response(),
        ["RTSP/1.0 200 OK\r\n", "CSeq: 1\r\n", "Session: 123456\r\n"]
    );

    client.send("PLAY clip.mjpeg RTSP/1.0\r\nCSeq: 2\r\nSession: 123456\r\n");
    assert_eq!(
        client.response(),
        ["RTSP/1.0 200 OK\r\n", "CSeq: 2\r\n", "Session: 123456\r\n"]
    );

    let mut buf = [0u8; 128];
    for i in 1..=FRAMES {
        let n = rtp.recv(&mut buf).expect("RTP datagram");
        let header = RtpHeader::decode(&buf[..n]).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.payload_type, 26);
        assert_eq!(header.sequence, i as u16);
        assert_eq!(header.timestamp, i as u32 * 10);
        assert_eq!(&buf[RTP_HEADER_LEN..n], &[0xFF, 0xD8, i, 0xFF, 0xD9]);
    }

    // Frame limit reached: no more datagrams without a PAUSE.
    rtp.set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    assert!(rtp.recv(&mut buf).is_err());

    client.send("TEARDOWN clip.mjpeg RTSP/1.0\r\nCSeq: 3\r\nSession: 123456\r\n");
    assert_eq!(
        client.response(),
        ["RTSP/1.0 200 OK\r\n", "CSeq: 3\r\n", "Session: 123456\r\n"]
    );
    assert!(client.is_closed());

    server.stop();
}

#[test]
fn out_of_state_requests_get_no_response() {
    let dir = tempfile::tempdir().unwrap();
    write_clip(dir.path());
    let mut server = start_server(dir.path(), SessionConfig::default());
    let (_rtp, port) = rtp_receiver();
    let mut client = Client::connect(&server);

    // PLAY before SETUP and an unknown method are dropped silently; the
    // next answer on the wire belongs to the SETUP.
    client.send("PLAY clip.mjpeg RTSP/1.0\r\nCSeq: 1\r\nSession: 123456\r\n");
    client.send("OPTIONS * RTSP/1.0\r\nCSeq: 2\r\n\r\n");
    client.send(&format!(
        "SETUP clip.mjpeg RTSP/1.0\r\nCSeq: 3\r\nTransport: RTP/AVP;unicast;client_port={port}\r\n"
    ));
    assert_eq!(client.response()[1], "CSeq: 3\r\n");

    client.send("TEARDOWN clip.mjpeg RTSP/1.0\r\nCSeq: 4\r\nSession: 123456\r\n");
    assert_eq!(client.response()[1], "CSeq: 4\r\n");

    server.stop();
}

#[test]
fn missing_clip_answers_not_found_and_keeps_session() {
    let dir = tempfile::tempdir().unwrap();
    write_clip(dir.path());
    let mut server = start_server(dir.path(), SessionConfig::default());
    let (_rtp, port) = rtp_receiver();
    let mut client = Client::connect(&server);

    client.send(&format!(
        "SETUP nope.mjpeg RTSP/1.0\r\nCSeq: 1\r\nTransport: RTP/UDP; client_port= {port}\r\n"
    ));
    assert_eq!(client.response()[0], "RTSP/1.0 404 Not Found\r\n");

    client.send(&format!(
        "SETUP clip.mjpeg RTSP/1.0\r\nCSeq: 2\r\nTransport: RTP/UDP; client_port= {port}\r\n"
    ));
    assert_eq!(client.response()[0], "RTSP/1.0 200 OK\r\n");

    server.stop();
}

#[test]
fn malformed_request_closes_only_that_connection() {
    let dir = tempfile::tempdir().unwrap();
    write_clip(dir.path());
    let mut server = start_server(dir.path(), SessionConfig::default());
    let (_rtp, port) = rtp_receiver();

    let mut bad = Client::connect(&server);
    bad.send("PLAY clip.mjpeg RTSP/1.0\r\nCSeq: two\r\nSession: 123456\r\n");
    assert_eq!(bad.response()[0], "RTSP/1.0 400 Bad Request\r\n");
    assert!(bad.is_closed());

    let mut good = Client::connect(&server);
    good.send(&format!(
        "SETUP clip.mjpeg RTSP/1.0\r\nCSeq: 1\r\nTransport: RTP/UDP; client_port= {port}\r\n"
    ));
    assert_eq!(good.response()[0], "RTSP/1.0 200 OK\r\n");

    server.stop();
}

#[test]
fn non_utf8_request_gets_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    write_clip(dir.path());
    let mut server = start_server(dir.path(), SessionConfig::default());

    let mut client = Client::connect(&server);
    client
        .writer
        .write_all(b"PLAY \xff\xfe clip\r\nCSeq: 1\r\nSession: 1\r\n")
        .unwrap();
    client.writer.flush().unwrap();

    assert_eq!(
        client.response(),
        ["RTSP/1.0 400 Bad Request\r\n", "CSeq: 0\r\n", "Session: 123456\r\n"]
    );
    assert!(client.is_closed());

    server.stop();
}

#[test]
fn server_lifecycle() {
    let mut server = Server::new("127.0.0.1:0");
    assert!(server.local_addr().is_err());
    assert!(!server.is_running());

    server.start().unwrap();
    assert!(server.is_running());
    assert!(server.local_addr().is_ok());
    assert!(server.start().is_err());

    server.stop();
    assert!(!server.is_running());
}

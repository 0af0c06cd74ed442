use std::io::BufReader;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::error::RtspError;
use crate::media::FrameSourceOpener;
use crate::protocol::{MethodHandler, RtspRequest, RtspResponse};
use crate::session::{Session, SessionConfig};

/// Non-blocking TCP accept loop.
///
/// Checks the `running` flag between accepts with a 50ms poll interval
/// so that [`crate::server::Server::stop`] can terminate it promptly.
pub fn accept_loop(
    listener: TcpListener,
    opener: Arc<dyn FrameSourceOpener>,
    config: SessionConfig,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                let o = opener.clone();
                let c = config.clone();
                let r = running.clone();
                thread::spawn(move || {
                    Connection::handle(stream, o, c, r);
                });
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
    tracing::debug!("accept loop exited");
}

/// A single RTSP client connection with its own session.
struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    handler: MethodHandler,
    peer_addr: SocketAddr,
    last_cseq: u32,
}

impl Connection {
    /// Entry point: set up a connection and run its request loop.
    pub fn handle(
        stream: TcpStream,
        opener: Arc<dyn FrameSourceOpener>,
        config: SessionConfig,
        running: Arc<AtomicBool>,
    ) {
        let peer_addr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(_) => return,
        };

        tracing::info!(%peer_addr, "client connected");

        let reader_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(_) => return,
        };

        let session = Session::new(peer_addr, config, opener);

        let mut conn = Connection {
            reader: BufReader::new(reader_stream),
            writer: stream,
            handler: MethodHandler::new(session),
            peer_addr,
            last_cseq: 0,
        };

        let reason = conn.run(&running);
        conn.cleanup();

        tracing::info!(%peer_addr, reason, "client disconnected");
    }

    /// RTSP request/response loop. Returns the reason for exiting.
    fn run(&mut self, running: &Arc<AtomicBool>) -> &'static str {
        while running.load(Ordering::SeqCst) {
            let request = match RtspRequest::read_from(&mut self.reader) {
                Ok(request) => request,
                Err(RtspError::ConnectionClosed) => return "connection closed by client",
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "parse error");
                    let response =
                        RtspResponse::bad_request(self.last_cseq, self.handler.session().id());
                    if let Err(e) = response.write_to(&mut self.writer) {
                        tracing::debug!(peer = %self.peer_addr, error = %e, "failed to send error response");
                    }
                    return "malformed request";
                }
            };
            self.last_cseq = request.cseq;

            tracing::debug!(
                peer = %self.peer_addr,
                method = %request.method,
                cseq = request.cseq,
                resource = ?request.resource,
                "request"
            );

            if let Some(response) = self.handler.handle(&request) {
                tracing::debug!(
                    peer = %self.peer_addr,
                    status = response.status_code,
                    cseq = response.cseq,
                    "response"
                );

                if response.write_to(&mut self.writer).is_err() {
                    return "write error";
                }
            }

            if self.handler.is_closed() {
                return "session torn down";
            }
        }

        "server shutting down"
    }

    /// Release the session and close the RTSP connection.
    fn cleanup(&self) {
        if self.handler.session().teardown() {
            tracing::info!(peer = %self.peer_addr, "released session on disconnect");
        }
        if let Err(e) = self.writer.shutdown(Shutdown::Both) {
            tracing::debug!(peer = %self.peer_addr, error = %e, "failed to shut down connection");
        }
    }
}

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::{Result, RtspError};
use crate::media::FrameSourceOpener;
use crate::media::mjpeg::MediaDir;
use crate::session::SessionConfig;
use crate::transport::tcp;

/// Server-level configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory SETUP resource names are resolved in.
    pub media_root: PathBuf,
    /// Streaming parameters handed to every session.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("."),
            session: SessionConfig::default(),
        }
    }
}

/// RTSP server.
///
/// Accepts connections on a background thread and runs each one, with its
/// own [`Session`](crate::session::Session), on a thread of its own.
/// Sessions share nothing but the configuration and the frame source opener.
pub struct Server {
    running: Arc<AtomicBool>,
    bind_addr: String,
    local_addr: Option<SocketAddr>,
    opener: Arc<dyn FrameSourceOpener>,
    config: Arc<ServerConfig>,
}

impl Server {
    pub fn new(bind_addr: &str) -> Self {
        Self::with_config(bind_addr, ServerConfig::default())
    }

    /// Create a server streaming clips from `config.media_root`.
    pub fn with_config(bind_addr: &str, config: ServerConfig) -> Self {
        let opener = Arc::new(MediaDir::new(config.media_root.clone()));
        Self::with_opener(bind_addr, config, opener)
    }

    /// Create a server with a custom frame source opener.
    ///
    /// `config.media_root` is not consulted; `opener` alone resolves
    /// SETUP resources.
    pub fn with_opener(
        bind_addr: &str,
        config: ServerConfig,
        opener: Arc<dyn FrameSourceOpener>,
    ) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            bind_addr: bind_addr.to_string(),
            local_addr: None,
            opener,
            config: Arc::new(config),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.bind_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let opener = self.opener.clone();
        let session_config = self.config.session.clone();

        tracing::info!(
            addr = %local_addr,
            media_root = %self.config.media_root.display(),
            "RTSP server listening"
        );

        thread::spawn(move || {
            tcp::accept_loop(listener, opener, session_config, running);
        });

        Ok(())
    }

    /// Stop accepting connections.
    ///
    /// Connections already open finish their current request and close.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("server stopping");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.local_addr.ok_or(RtspError::NotStarted)
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }
}

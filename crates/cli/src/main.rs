use clap::Parser;
use rtsp_mjpeg::session::{
    DEFAULT_FRAME_LIMIT, DEFAULT_MAX_FRAME_SIZE, DEFAULT_SESSION_ID, SessionConfig,
};
use rtsp_mjpeg::{Server, ServerConfig};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "rtsp-mjpeg-server",
    about = "RTSP server streaming recorded MJPEG clips over RTP/UDP"
)]
struct Args {
    /// Bind address (host:port)
    #[arg(long, short, default_value = "0.0.0.0:8554")]
    bind: String,

    /// Directory clips named in SETUP are read from
    #[arg(long, short, default_value = ".")]
    media_dir: PathBuf,

    /// Milliseconds between frames
    #[arg(long, default_value_t = 50)]
    frame_period_ms: u64,

    /// Frames streamed before delivery stops
    #[arg(long, default_value_t = DEFAULT_FRAME_LIMIT)]
    frame_limit: u32,

    /// RTP payload type
    #[arg(long, default_value_t = 26, value_parser = clap::value_parser!(u8).range(0..128))]
    payload_type: u8,

    /// Value of the Session header
    #[arg(long, default_value_t = DEFAULT_SESSION_ID)]
    session_id: u64,

    /// Fixed RTP SSRC (random per session if omitted)
    #[arg(long)]
    ssrc: Option<u32>,

    /// Set the RTP marker bit on every packet
    #[arg(long)]
    marker: bool,

    /// Largest frame that can be sent, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = ServerConfig {
        media_root: args.media_dir,
        session: SessionConfig {
            session_id: args.session_id,
            payload_type: args.payload_type,
            frame_period: Duration::from_millis(args.frame_period_ms),
            frame_limit: args.frame_limit,
            max_frame_size: args.max_frame_size,
            marker: args.marker,
            ssrc: args.ssrc,
        },
    };

    let mut server = Server::with_config(&args.bind, config);

    if let Err(e) = server.start() {
        tracing::error!(error = %e, "failed to start server");
        eprintln!("Failed to start server: {}", e);
        return;
    }

    println!("RTSP server on {}, press Enter to stop", args.bind);
    let mut input = String::new();
    if let Err(e) = io::stdin().read_line(&mut input) {
        tracing::warn!(error = %e, "failed to read stdin");
    }

    server.stop();
}

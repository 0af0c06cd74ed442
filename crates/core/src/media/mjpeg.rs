//! MJPEG frame containers.
//!
//! Recorded clips are a plain concatenation of JPEG frames, each preceded
//! by a small framing header. Two framings are read:
//!
//! - **Multipart** (written by the recorder and by [`MjpegWriter`]):
//!
//!   ```text
//!   \r\n\r\n--myboundary\r\n
//!   Content-Type: image/jpeg\r\n
//!   Content-Length: 5120\r\n
//!   Delta-time: 110\r\n
//!   \r\n
//!   <5120 bytes of JPEG>
//!   ```
//!
//! - **Length-prefixed**: five ASCII digits giving the frame length,
//!   followed by the frame bytes (`05120<5120 bytes>`).
//!
//! The framing is detected per frame from the first non-whitespace byte.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, RtspError};
use crate::media::{FrameSource, FrameSourceOpener};

/// Multipart boundary written between frames.
pub const BOUNDARY: &str = "myboundary";

/// Frame spacing recorded in the `Delta-time` part header, in milliseconds.
pub const DEFAULT_DELTA_TIME_MS: u32 = 110;

const LENGTH_PREFIX_DIGITS: usize = 5;

/// Reads frames out of an MJPEG container.
pub struct MjpegReader<R> {
    reader: R,
    frames_read: u64,
}

/// MJPEG reader over a file on disk.
pub type MjpegFile = MjpegReader<BufReader<File>>;

impl MjpegFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RtspError::FrameSource(format!("cannot open {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "opened MJPEG file");
        Ok(MjpegReader::new(BufReader::new(file)))
    }
}

impl<R: BufRead> MjpegReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            frames_read: 0,
        }
    }

    /// Number of frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame into `buf`. Returns `Ok(0)` at end of input.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        let first = match self.skip_whitespace().map_err(frame_error)? {
            Some(byte) => byte,
            None => return Ok(0),
        };

        let len = if first == b'-' {
            self.read_part_header()?
        } else if first.is_ascii_digit() {
            self.read_length_prefix()?
        } else {
            return Err(RtspError::FrameSource(format!(
                "unrecognized frame header byte {first:#04x}"
            )));
        };

        if len > buf.len() {
            io::copy(&mut self.reader.by_ref().take(len as u64), &mut io::sink())
                .map_err(frame_error)?;
            return Err(RtspError::FrameSource(format!(
                "frame of {} bytes exceeds {} byte buffer",
                len,
                buf.len()
            )));
        }

        self.reader.read_exact(&mut buf[..len]).map_err(frame_error)?;
        self.frames_read += 1;
        Ok(len)
    }

    /// Consume leading whitespace and peek the next byte.
    fn skip_whitespace(&mut self) -> io::Result<Option<u8>> {
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(None);
            }
            match available.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(pos) => {
                    let byte = available[pos];
                    self.reader.consume(pos);
                    return Ok(Some(byte));
                }
                None => {
                    let len = available.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    fn read_part_header(&mut self) -> Result<usize> {
        let boundary = self.read_header_line()?;
        if !boundary.starts_with("--") {
            return Err(RtspError::FrameSource(format!(
                "expected boundary line, got {boundary:?}"
            )));
        }

        let mut content_length = None;
        loop {
            let line = self.read_header_line()?;
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.trim().eq_ignore_ascii_case("Content-Length")
            {
                content_length = value.trim().parse::<usize>().ok();
            }
        }

        content_length
            .ok_or_else(|| RtspError::FrameSource("part without Content-Length".to_string()))
    }

    fn read_header_line(&mut self) -> Result<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Err(RtspError::FrameSource("truncated part header".to_string())),
            Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => Err(frame_error(e)),
        }
    }

    fn read_length_prefix(&mut self) -> Result<usize> {
        let mut digits = [0u8; LENGTH_PREFIX_DIGITS];
        self.reader.read_exact(&mut digits).map_err(frame_error)?;
        std::str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                RtspError::FrameSource(format!("invalid length prefix {:?}", &digits[..]))
            })
    }
}

impl<R: BufRead + Send> FrameSource for MjpegReader<R> {
    fn next_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_frame(buf)
    }
}

fn frame_error(e: io::Error) -> RtspError {
    RtspError::FrameSource(e.to_string())
}

/// Writes JPEG frames in the multipart container framing.
pub struct MjpegWriter<W: Write> {
    writer: W,
    delta_time_ms: u32,
}

impl<W: Write> MjpegWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            delta_time_ms: DEFAULT_DELTA_TIME_MS,
        }
    }

    pub fn with_delta_time(mut self, delta_time_ms: u32) -> Self {
        self.delta_time_ms = delta_time_ms;
        self
    }

    pub fn write_frame(&mut self, jpeg: &[u8]) -> io::Result<()> {
        write!(
            self.writer,
            "\r\n\r\n--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nDelta-time: {}\r\n\r\n",
            BOUNDARY,
            jpeg.len(),
            self.delta_time_ms
        )?;
        self.writer.write_all(jpeg)?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Opens clips by file name from a media directory.
#[derive(Debug, Clone)]
pub struct MediaDir {
    root: PathBuf,
}

impl MediaDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a SETUP resource name to a path inside the media directory.
    ///
    /// `rtsp://host:8554/clip.mjpeg`, `/clip.mjpeg` and `clip.mjpeg` all
    /// resolve to `<root>/clip.mjpeg`. Names that would escape the
    /// directory are refused.
    pub fn resolve(&self, resource: &str) -> Result<PathBuf> {
        let name = match resource
            .strip_prefix("rtsp://")
            .or_else(|| resource.strip_prefix("rtsps://"))
        {
            Some(after) => after.split_once('/').map(|(_, path)| path).unwrap_or(""),
            None => resource,
        };
        let name = name.trim_start_matches('/');

        if name.is_empty() {
            return Err(RtspError::FrameSource(format!(
                "no clip named in {resource:?}"
            )));
        }

        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(RtspError::FrameSource(format!(
                "refusing clip path {resource:?}"
            )));
        }

        Ok(self.root.join(relative))
    }
}

impl FrameSourceOpener for MediaDir {
    fn open(&self, resource: &str) -> Result<Box<dyn FrameSource>> {
        let path = self.resolve(resource)?;
        Ok(Box::new(MjpegFile::open(path)?))
    }
}

//! Output sinks for composed status lines.
//!
//! - [`TextSink`]: one line per status on a text stream (sway bar, tmux)
//! - [`DwlbSink`]: `all status <line>` commands over the dwlb unix socket
//! - `XorgSink` (feature `x11`): root window name, read by dwm

use std::env;
use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use statusinfo_common::consts::CLOSING_LINE;
use tracing::{debug, info};

use crate::error::SinkError;

/// Handshake attempts while waiting for dwlb to create its socket.
pub const DWLB_HANDSHAKE_ATTEMPTS: u32 = 10;
/// Pause before each handshake attempt.
pub const DWLB_HANDSHAKE_INTERVAL: Duration = Duration::from_secs(1);

/// Destination of status lines.
pub trait StatusSink {
    /// Deliver one line.
    fn emit(&mut self, line: &str) -> Result<(), SinkError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Send the line that marks the end of the status output.
pub fn emit_closing_line(sink: &mut dyn StatusSink) -> Result<(), SinkError> {
    sink.emit(CLOSING_LINE)
}

/// Where status lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Standard output.
    Text,
    /// dwlb socket number.
    Dwlb(u32),
    /// X root window name, falling back to text without a display.
    Xorg,
}

impl OutputMode {
    /// `-t` wins, then a dwlb socket number; otherwise the X root window.
    pub fn select(text: bool, socket: Option<u32>) -> Self {
        match (text, socket) {
            (true, _) => Self::Text,
            (false, Some(number)) => Self::Dwlb(number),
            (false, None) => Self::Xorg,
        }
    }

    /// Open the sink for this mode.
    ///
    /// # Errors
    /// Only the dwlb mode fails; a missing X display falls back to text.
    pub fn open(self) -> Result<Box<dyn StatusSink>, SinkError> {
        match self {
            Self::Text => Ok(Box::new(TextSink::stdout())),
            Self::Dwlb(number) => Ok(Box::new(DwlbSink::connect(number)?)),
            Self::Xorg => Ok(xorg_or_text(None)),
        }
    }
}

/// X root window sink on `display`, or text output if it cannot be opened.
#[cfg(feature = "x11")]
pub fn xorg_or_text(display: Option<&str>) -> Box<dyn StatusSink> {
    match XorgSink::connect(display) {
        Ok(sink) => {
            info!("Output to X root window name");
            Box::new(sink)
        }
        Err(e) => {
            info!("No X display ({e}): default output to text");
            Box::new(TextSink::stdout())
        }
    }
}

/// Text output; built without X11 support.
#[cfg(not(feature = "x11"))]
pub fn xorg_or_text(_display: Option<&str>) -> Box<dyn StatusSink> {
    tracing::warn!("Built without X11 support: default output to text");
    Box::new(TextSink::stdout())
}

/// Writes each line followed by a newline and flushes immediately.
#[derive(Debug)]
pub struct TextSink<W: Write> {
    out: W,
}

impl TextSink<io::Stdout> {
    /// Text sink on standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextSink<W> {
    /// Text sink on any writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusSink for TextSink<W> {
    fn emit(&mut self, line: &str) -> Result<(), SinkError> {
        writeln!(self.out, "{line}").map_err(SinkError::Text)?;
        self.out.flush().map_err(SinkError::Text)
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

/// Sends status commands to a running dwlb instance.
#[derive(Debug)]
pub struct DwlbSink {
    path: PathBuf,
}

impl DwlbSink {
    /// `<runtime_dir>/dwlb/dwlb-<number>`.
    pub fn socket_path(runtime_dir: &Path, number: u32) -> PathBuf {
        runtime_dir.join("dwlb").join(format!("dwlb-{number}"))
    }

    /// Locate socket `number` under `$XDG_RUNTIME_DIR` and wait for dwlb.
    pub fn connect(number: u32) -> Result<Self, SinkError> {
        let runtime_dir = env::var_os("XDG_RUNTIME_DIR").ok_or(SinkError::NoRuntimeDir)?;
        Self::with_handshake(
            Self::socket_path(Path::new(&runtime_dir), number),
            DWLB_HANDSHAKE_ATTEMPTS,
            DWLB_HANDSHAKE_INTERVAL,
        )
    }

    /// Wait for the socket at `path`, sending `all status dwl` until it is accepted.
    pub fn with_handshake(path: PathBuf, attempts: u32, interval: Duration) -> Result<Self, SinkError> {
        info!("Waiting for dwlb socket on {}", path.display());
        let mut last = None;
        for attempt in 1..=attempts {
            thread::sleep(interval);
            match send(&path, "dwl") {
                Ok(()) => {
                    debug!("dwlb answered after {attempt} attempt(s)");
                    return Ok(Self { path });
                }
                Err(e) => last = Some(e),
            }
        }
        Err(last.unwrap_or_else(|| SinkError::Dwlb {
            path: path.display().to_string(),
            source: io::Error::from(io::ErrorKind::NotConnected),
        }))
    }

    /// Socket this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn send(path: &Path, data: &str) -> Result<(), SinkError> {
    let wrap = |source| SinkError::Dwlb {
        path: path.display().to_string(),
        source,
    };
    let mut stream = UnixStream::connect(path).map_err(wrap)?;
    stream
        .write_all(format!("all status {data}").as_bytes())
        .map_err(wrap)
}

impl StatusSink for DwlbSink {
    fn emit(&mut self, line: &str) -> Result<(), SinkError> {
        send(&self.path, line)
    }

    fn name(&self) -> &'static str {
        "dwlb"
    }
}

/// Stores each line as the `WM_NAME` of the root window, as dwm expects.
#[cfg(feature = "x11")]
pub struct XorgSink {
    conn: x11rb::rust_connection::RustConnection,
    root: x11rb::protocol::xproto::Window,
}

#[cfg(feature = "x11")]
impl std::fmt::Debug for XorgSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XorgSink")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "x11")]
fn x11_err(e: impl std::fmt::Display) -> SinkError {
    SinkError::X11(e.to_string())
}

#[cfg(feature = "x11")]
impl XorgSink {
    /// Connect to `display` (`$DISPLAY` when `None`) and use its default root window.
    pub fn connect(display: Option<&str>) -> Result<Self, SinkError> {
        let (conn, screen) = x11rb::connect(display).map_err(x11_err)?;
        let root = x11rb::connection::Connection::setup(&conn)
            .roots
            .get(screen)
            .map(|s| s.root)
            .ok_or_else(|| SinkError::X11(format!("no screen {screen}")))?;
        Ok(Self { conn, root })
    }
}

#[cfg(feature = "x11")]
impl StatusSink for XorgSink {
    fn emit(&mut self, line: &str) -> Result<(), SinkError> {
        use x11rb::connection::Connection as _;
        use x11rb::protocol::xproto::{AtomEnum, PropMode};
        use x11rb::wrapper::ConnectionExt as _;

        self.conn
            .change_property8(
                PropMode::REPLACE,
                self.root,
                AtomEnum::WM_NAME,
                AtomEnum::STRING,
                line.as_bytes(),
            )
            .map_err(x11_err)?;
        self.conn.flush().map_err(x11_err)
    }

    fn name(&self) -> &'static str {
        "xorg"
    }
}

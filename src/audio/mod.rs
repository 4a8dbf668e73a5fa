use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One looping playback channel. The board owns a channel per selected sound
/// and is the only component that touches its gain or pause state.
pub trait AudioChannel {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn rewind(&mut self);
    fn gain(&self) -> f32;
    fn set_gain(&mut self, gain: f32);
    fn is_paused(&self) -> bool;
}

pub trait AudioBackend {
    fn open_loop(&mut self, file: &Path) -> Result<Box<dyn AudioChannel>>;
}

/// Opens the real rodio backend, or falls back to the null backend when no
/// output device is available (headless runtimes, CI).
pub fn default_backend(assets_dir: PathBuf) -> Box<dyn AudioBackend> {
    match RodioBackend::new(assets_dir) {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            log::warn!("audio output unavailable, using null backend: {err:#}");
            Box::new(NullBackend::new())
        }
    }
}

pub struct RodioBackend {
    stream: OutputStream,
    assets_dir: PathBuf,
}

impl RodioBackend {
    pub fn new(assets_dir: PathBuf) -> Result<Self> {
        let mut stream = with_silenced_stderr(|| {
            OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                })
        })?;
        stream.log_on_drop(false);
        Ok(Self { stream, assets_dir })
    }
}

impl AudioBackend for RodioBackend {
    fn open_loop(&mut self, file: &Path) -> Result<Box<dyn AudioChannel>> {
        let path = self.assets_dir.join(file);
        let file =
            File::open(&path).with_context(|| format!("failed to open sound {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .repeat_infinite();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(source);
        sink.pause();
        sink.set_volume(0.0);

        Ok(Box::new(RodioChannel { sink, gain: 0.0 }))
    }
}

struct RodioChannel {
    sink: Sink,
    gain: f32,
}

impl AudioChannel for RodioChannel {
    fn play(&mut self) -> Result<()> {
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn rewind(&mut self) {
        if let Err(err) = self.sink.try_seek(Duration::ZERO) {
            log::debug!("rewind seek failed: {err:?}");
        }
    }

    fn gain(&self) -> f32 {
        self.gain
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
        self.sink.set_volume(self.gain);
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }
}

/// Headless stand-in keeping only the logical channel state.
#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for NullBackend {
    fn open_loop(&mut self, _file: &Path) -> Result<Box<dyn AudioChannel>> {
        Ok(Box::new(NullChannel {
            gain: 0.0,
            paused: true,
        }))
    }
}

struct NullChannel {
    gain: f32,
    paused: bool,
}

impl AudioChannel for NullChannel {
    fn play(&mut self) -> Result<()> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn rewind(&mut self) {}

    fn gain(&self) -> f32 {
        self.gain
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

//! Greeting-card export.
//!
//! Two procedures share the same shape: force the tree into its formed
//! state, let it settle, then capture what the render surface shows.
//!
//! - [`StillExporter`] composes one frame at native resolution and encodes
//!   it as a JPEG.
//! - [`LoopExporter`] captures a fixed-length loop at a fixed width,
//!   quantizes every frame to a palette and streams it into an
//!   [`AnimatedEncoder`].
//!
//! Exports are cooperative: the exporter never renders on its own. Every
//! time it needs the scene to move on it calls [`ExportHost::wait`], and the
//! host is expected to keep its render loop running for that long. Progress
//! and the host's recording flag are always reset when a run ends, whether
//! it succeeded or failed.
//!
//! # Example
//!
//! ```ignore
//! use christmas_glow::prelude::*;
//!
//! let mut exporter = CardExporter::new(NeuQuantizer::default(), GifSink::new());
//! let mut progress = ProgressTrace::default();
//! let mut sink = DirectorySink::new("cards");
//!
//! exporter.trigger(&mut scene, &mut progress, &mut sink, &ExportRequest::animated());
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;
use tracing::{error, info, info_span};

use crate::capture::{self, CaptureComposer, DEFAULT_MESSAGE};
use crate::encode::{self, AnimatedEncoder, STILL_QUALITY};
use crate::error::ExportError;
use crate::quantize::{Quantizer, MAX_PALETTE};

/// File name of the animated card.
pub const ANIMATED_FILE_NAME: &str = "christmas-glow-card.gif";
/// File name of the still card.
pub const STILL_FILE_NAME: &str = "merry-christmas-card.jpg";

// ============================================================================
// Host and sinks
// ============================================================================

/// The scene an exporter drives.
pub trait ExportHost {
    /// Force the tree into (or out of) its formed state.
    fn set_formed(&mut self, formed: bool);

    /// Tell the renderer a capture is in progress.
    fn set_recording(&mut self, recording: bool);

    /// Keep rendering for `interval`, then return.
    fn wait(&mut self, interval: Duration);

    /// The current render surface, or `None` if there is nothing to read.
    fn surface(&self) -> Option<&Pixmap>;
}

/// Where an export run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    /// Waiting for the tree to form.
    Settling,
    /// Capturing frame `frame` (zero based) of `total`.
    Capturing { frame: u32, total: u32 },
    /// Encoding is being finalized.
    Finalizing,
}

/// Receives export progress, e.g. to drive a progress bar.
pub trait ProgressSink {
    /// Percent complete, or `None` when no export is running.
    fn report(&mut self, progress: Option<u8>);

    fn phase_changed(&mut self, _phase: ExportPhase) {}

    /// An export run failed. Called after progress has been cleared.
    fn failed(&mut self, _error: &ExportError) {}
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: Option<u8>) {}
}

/// Records everything it is told.
#[derive(Debug, Clone, Default)]
pub struct ProgressTrace {
    pub reports: Vec<Option<u8>>,
    pub phases: Vec<ExportPhase>,
    pub failures: Vec<String>,
}

impl ProgressTrace {
    /// The most recent report.
    pub fn current(&self) -> Option<u8> {
        self.reports.last().copied().flatten()
    }
}

impl ProgressSink for ProgressTrace {
    fn report(&mut self, progress: Option<u8>) {
        self.reports.push(progress);
    }

    fn phase_changed(&mut self, phase: ExportPhase) {
        self.phases.push(phase);
    }

    fn failed(&mut self, error: &ExportError) {
        self.failures.push(error.to_string());
    }
}

/// A finished, downloadable card.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportedAsset {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ExportedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedAsset")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Receives finished cards.
pub trait AssetSink {
    fn deliver(&mut self, asset: ExportedAsset) -> io::Result<()>;
}

/// Writes cards into a directory, creating it on first use.
///
/// Bytes land in a hidden `.partial` file first and are renamed into place
/// once complete, so a failed write never leaves a truncated card behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            written: Vec::new(),
        }
    }

    /// Paths written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl AssetSink for DirectorySink {
    fn deliver(&mut self, asset: ExportedAsset) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&asset.file_name);
        let partial = self.dir.join(format!(".{}.partial", asset.file_name));
        if let Err(err) = write_synced(&partial, &asset.bytes).and_then(|()| fs::rename(&partial, &path)) {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        info!(path = %path.display(), bytes = asset.bytes.len(), "card saved");
        self.written.push(path);
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Keeps cards in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub assets: Vec<ExportedAsset>,
}

impl AssetSink for MemorySink {
    fn deliver(&mut self, asset: ExportedAsset) -> io::Result<()> {
        self.assets.push(asset);
        Ok(())
    }
}

// ============================================================================
// Requests and settings
// ============================================================================

/// Which card to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Still,
    Animated,
}

/// A request to export a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub kind: ExportKind,
    pub message: String,
}

impl ExportRequest {
    pub fn new(kind: ExportKind) -> Self {
        Self {
            kind,
            message: DEFAULT_MESSAGE.to_string(),
        }
    }

    pub fn still() -> Self {
        Self::new(ExportKind::Still)
    }

    pub fn animated() -> Self {
        Self::new(ExportKind::Animated)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Capture parameters for animated cards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    /// Output width in pixels. Height follows the surface aspect ratio.
    pub target_width: u32,
    pub fps: u32,
    pub duration: Duration,
    /// Palette size per frame, `2..=256`.
    pub max_colors: usize,
    /// Time the tree gets to form before the first frame.
    pub settle: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            target_width: 800,
            fps: 12,
            duration: Duration::from_secs(3),
            max_colors: MAX_PALETTE,
            settle: Duration::from_secs(1),
        }
    }
}

impl LoopSettings {
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width.max(1);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_max_colors(mut self, colors: usize) -> Self {
        self.max_colors = colors.clamp(2, MAX_PALETTE);
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Frames in one loop, at least one.
    pub fn total_frames(&self) -> u32 {
        ((self.fps as f32 * self.duration.as_secs_f32()).round() as u32).max(1)
    }

    /// Display time of each frame in milliseconds.
    pub fn frame_delay_ms(&self) -> f32 {
        1000.0 / self.fps.max(1) as f32
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(self.frame_delay_ms() / 1000.0)
    }
}

/// Progress after `done` of `total` frames, rounded to a whole percent.
pub fn progress_percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as f32 / total as f32) * 100.0).round() as u8
}

// ============================================================================
// Session guard
// ============================================================================

/// Owns the progress sink for one run and clears it when dropped, so an
/// early return through `?` cannot leave a stale progress bar behind.
struct Session<'a, P: ProgressSink + ?Sized> {
    progress: &'a mut P,
}

impl<'a, P: ProgressSink + ?Sized> Session<'a, P> {
    fn begin(progress: &'a mut P) -> Self {
        Self { progress }
    }

    fn phase(&mut self, phase: ExportPhase) {
        self.progress.phase_changed(phase);
    }

    fn report(&mut self, percent: u8) {
        self.progress.report(Some(percent));
    }
}

impl<P: ProgressSink + ?Sized> Drop for Session<'_, P> {
    fn drop(&mut self) {
        self.progress.report(None);
        self.progress.phase_changed(ExportPhase::Idle);
    }
}

/// Run `body` as a recording, clearing the host's recording flag afterwards
/// whatever the outcome.
fn recording<H, T>(host: &mut H, body: impl FnOnce(&mut H) -> Result<T, ExportError>) -> Result<T, ExportError>
where
    H: ExportHost + ?Sized,
{
    host.set_formed(true);
    host.set_recording(true);
    let result = body(host);
    host.set_recording(false);
    result
}

// ============================================================================
// Loop exporter
// ============================================================================

/// Captures an animated loop.
#[derive(Debug)]
pub struct LoopExporter<Q, E> {
    settings: LoopSettings,
    quantizer: Q,
    encoder: E,
}

impl<Q: Quantizer, E: AnimatedEncoder> LoopExporter<Q, E> {
    pub fn new(quantizer: Q, encoder: E) -> Self {
        Self {
            settings: LoopSettings::default(),
            quantizer,
            encoder,
        }
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn quantizer(&self) -> &Q {
        &self.quantizer
    }

    /// Capture and encode a loop titled `message`.
    ///
    /// On failure nothing is produced and the encoder's partial stream is
    /// discarded.
    pub fn run<H, P>(&mut self, host: &mut H, progress: &mut P, message: &str) -> Result<ExportedAsset, ExportError>
    where
        H: ExportHost + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let span = info_span!("export", kind = "animated");
        let _enter = span.enter();

        let mut session = Session::begin(progress);
        let result = recording(host, |host| self.capture(host, &mut session, message));
        if result.is_err() {
            self.encoder.abort();
        }
        result
    }

    fn capture<H, P>(
        &mut self,
        host: &mut H,
        session: &mut Session<'_, P>,
        message: &str,
    ) -> Result<ExportedAsset, ExportError>
    where
        H: ExportHost + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let settings = self.settings;
        let composer = CaptureComposer::new(message);

        session.phase(ExportPhase::Settling);
        host.wait(settings.settle);

        let (width, height) = {
            let source = host.surface().ok_or(ExportError::SurfaceUnavailable)?;
            capture::target_size(source.width(), source.height(), settings.target_width)
        };
        let mut canvas = capture::canvas(width, height)?;

        let total = settings.total_frames();
        let delay = settings.frame_delay_ms();
        info!(width, height, frames = total, fps = settings.fps, "capturing loop");

        self.encoder.begin(width, height)?;
        session.report(0);

        for frame in 0..total {
            session.phase(ExportPhase::Capturing { frame, total });
            {
                let source = host.surface().ok_or(ExportError::SurfaceUnavailable)?;
                composer.compose(&mut canvas, source);
            }

            let rgba = encode::pixmap_rgba(&canvas);
            let indexed = self.quantizer.quantize(&rgba, settings.max_colors)?;
            self.encoder.write_frame(&indexed, delay)?;

            session.report(progress_percent(frame + 1, total));
            host.wait(settings.frame_interval());
        }

        session.phase(ExportPhase::Finalizing);
        let bytes = self.encoder.finish()?;
        info!(bytes = bytes.len(), "loop encoded");

        Ok(ExportedAsset {
            file_name: ANIMATED_FILE_NAME.to_string(),
            mime: "image/gif",
            bytes,
        })
    }
}

// ============================================================================
// Still exporter
// ============================================================================

/// Captures a single full-resolution card.
#[derive(Debug, Clone, Copy)]
pub struct StillExporter {
    settle: Duration,
    quality: u8,
}

impl Default for StillExporter {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            quality: STILL_QUALITY,
        }
    }
}

impl StillExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// JPEG quality, `1..=100`.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn run<H>(&self, host: &mut H, message: &str) -> Result<ExportedAsset, ExportError>
    where
        H: ExportHost + ?Sized,
    {
        let span = info_span!("export", kind = "still");
        let _enter = span.enter();

        recording(host, |host| {
            host.wait(self.settle);

            let source = host.surface().ok_or(ExportError::SurfaceUnavailable)?;
            let mut canvas = capture::canvas(source.width(), source.height())?;
            CaptureComposer::new(message).compose(&mut canvas, source);

            let bytes = encode::encode_jpeg(&canvas, self.quality)?;
            info!(width = canvas.width(), height = canvas.height(), bytes = bytes.len(), "still encoded");

            Ok(ExportedAsset {
                file_name: STILL_FILE_NAME.to_string(),
                mime: "image/jpeg",
                bytes,
            })
        })
    }
}

// ============================================================================
// Card exporter
// ============================================================================

/// Front door for both card kinds.
#[derive(Debug)]
pub struct CardExporter<Q, E> {
    still: StillExporter,
    animated: LoopExporter<Q, E>,
}

impl<Q: Quantizer, E: AnimatedEncoder> CardExporter<Q, E> {
    pub fn new(quantizer: Q, encoder: E) -> Self {
        Self {
            still: StillExporter::default(),
            animated: LoopExporter::new(quantizer, encoder),
        }
    }

    pub fn with_still(mut self, still: StillExporter) -> Self {
        self.still = still;
        self
    }

    pub fn with_loop_settings(mut self, settings: LoopSettings) -> Self {
        self.animated = self.animated.with_settings(settings);
        self
    }

    pub fn animated(&self) -> &LoopExporter<Q, E> {
        &self.animated
    }

    /// Produce the requested card and hand it to `sink`.
    pub fn export<H, P, S>(
        &mut self,
        host: &mut H,
        progress: &mut P,
        sink: &mut S,
        request: &ExportRequest,
    ) -> Result<(), ExportError>
    where
        H: ExportHost + ?Sized,
        P: ProgressSink + ?Sized,
        S: AssetSink + ?Sized,
    {
        let asset = match request.kind {
            ExportKind::Still => self.still.run(host, &request.message)?,
            ExportKind::Animated => self.animated.run(host, progress, &request.message)?,
        };
        sink.deliver(asset).map_err(ExportError::Delivery)
    }

    /// Like [`export`](Self::export), but failures are logged and reported
    /// to `progress` instead of returned.
    pub fn trigger<H, P, S>(&mut self, host: &mut H, progress: &mut P, sink: &mut S, request: &ExportRequest)
    where
        H: ExportHost + ?Sized,
        P: ProgressSink + ?Sized,
        S: AssetSink + ?Sized,
    {
        if let Err(e) = self.export(host, progress, sink, request) {
            error!(kind = ?request.kind, error = %e, "export failed");
            progress.failed(&e);
        }
    }
}

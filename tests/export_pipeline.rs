//! End-to-end tests for card export.
//!
//! Most tests drive the exporters with a scripted host and fake
//! quantizer/encoder so the capture schedule can be checked exactly; the
//! last ones run the real scene, NeuQuant and the GIF/JPEG encoders.

use std::time::Duration;

use tiny_skia::{Color as SkColor, Pixmap};

use christmas_glow::export::{progress_percent, ANIMATED_FILE_NAME, STILL_FILE_NAME};
use christmas_glow::prelude::*;
use christmas_glow::{ExportPhase, IndexedFrame, LoopExporter, DEFAULT_MESSAGE};

// ============================================================================
// Test doubles
// ============================================================================

struct ScriptedHost {
    surface: Option<Pixmap>,
    formed: bool,
    recording: bool,
    recording_history: Vec<bool>,
    waits: Vec<Duration>,
}

impl ScriptedHost {
    fn new(width: u32, height: u32) -> Self {
        let mut surface = Pixmap::new(width, height).unwrap();
        surface.fill(SkColor::from_rgba8(5, 5, 8, 255));
        Self {
            surface: Some(surface),
            formed: false,
            recording: false,
            recording_history: Vec::new(),
            waits: Vec::new(),
        }
    }

    fn without_surface() -> Self {
        Self {
            surface: None,
            ..Self::new(1, 1)
        }
    }
}

impl ExportHost for ScriptedHost {
    fn set_formed(&mut self, formed: bool) {
        self.formed = formed;
    }

    fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        self.recording_history.push(recording);
    }

    fn wait(&mut self, interval: Duration) {
        self.waits.push(interval);
    }

    fn surface(&self) -> Option<&Pixmap> {
        self.surface.as_ref()
    }
}

#[derive(Default)]
struct FakeQuantizer {
    calls: usize,
    fail_at: Option<usize>,
}

impl Quantizer for FakeQuantizer {
    fn quantize(&mut self, rgba: &[u8], max_colors: usize) -> Result<IndexedFrame, EncodingError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(EncodingError::Quantize(format!("frame {call} rejected")));
        }
        assert_eq!(max_colors, 256);
        Ok(IndexedFrame {
            palette: vec![[0, 0, 0], [255, 215, 0]],
            indices: vec![0; rgba.len() / 4],
        })
    }
}

#[derive(Default)]
struct RecordingEncoder {
    size: Option<(u32, u32)>,
    delays: Vec<f32>,
    finished: usize,
    aborted: usize,
}

impl AnimatedEncoder for RecordingEncoder {
    fn begin(&mut self, width: u32, height: u32) -> Result<(), EncodingError> {
        self.size = Some((width, height));
        self.delays.clear();
        Ok(())
    }

    fn write_frame(&mut self, frame: &IndexedFrame, delay_ms: f32) -> Result<(), EncodingError> {
        let (w, h) = self.size.unwrap();
        assert_eq!(frame.indices.len(), (w * h) as usize);
        self.delays.push(delay_ms);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, EncodingError> {
        self.finished += 1;
        Ok(format!("{} frames", self.delays.len()).into_bytes())
    }

    fn abort(&mut self) {
        self.aborted += 1;
        self.delays.clear();
    }
}

fn reported(trace: &ProgressTrace) -> Vec<u8> {
    trace.reports.iter().flatten().copied().collect()
}

// ============================================================================
// Loop export
// ============================================================================

#[test]
fn test_loop_captures_fixed_schedule() {
    let mut host = ScriptedHost::new(320, 180);
    let mut progress = ProgressTrace::default();
    let mut exporter = LoopExporter::new(FakeQuantizer::default(), RecordingEncoder::default());

    let asset = exporter.run(&mut host, &mut progress, DEFAULT_MESSAGE).unwrap();

    assert_eq!(asset.file_name, ANIMATED_FILE_NAME);
    assert_eq!(asset.mime, "image/gif");
    assert_eq!(asset.bytes, b"36 frames");

    let encoder = exporter.encoder();
    assert_eq!(encoder.size, Some((800, 450)));
    assert_eq!(encoder.delays.len(), 36);
    assert!(encoder.delays.iter().all(|d| (d - 1000.0 / 12.0).abs() < 1e-3));
    assert_eq!(encoder.finished, 1);
    assert_eq!(encoder.aborted, 0);

    // settle first, then one frame interval after every capture
    assert_eq!(host.waits.len(), 37);
    assert_eq!(host.waits[0], Duration::from_secs(1));
    assert!(host.waits[1..]
        .iter()
        .all(|w| (w.as_secs_f32() - 1.0 / 12.0).abs() < 1e-3));

    assert!(host.formed);
    assert_eq!(host.recording_history, vec![true, false]);
}

#[test]
fn test_loop_progress_rises_to_completion() {
    let mut host = ScriptedHost::new(160, 90);
    let mut progress = ProgressTrace::default();
    let mut exporter = LoopExporter::new(FakeQuantizer::default(), RecordingEncoder::default())
        .with_settings(LoopSettings::default().with_target_width(80));

    exporter.run(&mut host, &mut progress, DEFAULT_MESSAGE).unwrap();

    let values = reported(&progress);
    assert_eq!(values.first(), Some(&0));
    assert_eq!(values.last(), Some(&100));
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(values.len(), 37);
    assert_eq!(values[18], progress_percent(18, 36));

    // cleared once the run is over
    assert_eq!(progress.reports.last(), Some(&None));
    assert_eq!(progress.current(), None);
}

#[test]
fn test_loop_phases() {
    let mut host = ScriptedHost::new(160, 90);
    let mut progress = ProgressTrace::default();
    let settings = LoopSettings::default()
        .with_target_width(40)
        .with_fps(2)
        .with_duration(Duration::from_secs(1));
    let mut exporter =
        LoopExporter::new(FakeQuantizer::default(), RecordingEncoder::default()).with_settings(settings);

    exporter.run(&mut host, &mut progress, DEFAULT_MESSAGE).unwrap();

    assert_eq!(
        progress.phases,
        vec![
            ExportPhase::Settling,
            ExportPhase::Capturing { frame: 0, total: 2 },
            ExportPhase::Capturing { frame: 1, total: 2 },
            ExportPhase::Finalizing,
            ExportPhase::Idle,
        ]
    );
}

#[test]
fn test_loop_height_rounds_down() {
    let mut host = ScriptedHost::new(1000, 333);
    let settings = LoopSettings::default().with_duration(Duration::from_millis(250));
    let mut exporter =
        LoopExporter::new(FakeQuantizer::default(), RecordingEncoder::default()).with_settings(settings);

    exporter.run(&mut host, &mut NoProgress, DEFAULT_MESSAGE).unwrap();

    assert_eq!(exporter.encoder().size, Some((800, 266)));
    assert_eq!(exporter.encoder().delays.len(), 3);
}

#[test]
fn test_loop_quantizer_failure_aborts_cleanly() {
    let mut host = ScriptedHost::new(160, 90);
    let mut progress = ProgressTrace::default();
    let quantizer = FakeQuantizer {
        fail_at: Some(3),
        ..FakeQuantizer::default()
    };
    let mut exporter = LoopExporter::new(quantizer, RecordingEncoder::default())
        .with_settings(LoopSettings::default().with_target_width(80));

    let err = exporter.run(&mut host, &mut progress, DEFAULT_MESSAGE).unwrap_err();

    assert!(matches!(err, ExportError::Encoding(EncodingError::Quantize(_))));
    assert_eq!(exporter.quantizer().calls, 4);
    assert_eq!(exporter.encoder().finished, 0);
    assert_eq!(exporter.encoder().aborted, 1);
    assert!(exporter.encoder().delays.is_empty());

    assert!(!host.recording);
    assert_eq!(progress.reports.last(), Some(&None));
    assert_eq!(progress.phases.last(), Some(&ExportPhase::Idle));
    assert!(!progress.phases.contains(&ExportPhase::Finalizing));
}

#[test]
fn test_loop_without_surface() {
    let mut host = ScriptedHost::without_surface();
    let mut progress = ProgressTrace::default();
    let mut exporter = LoopExporter::new(FakeQuantizer::default(), RecordingEncoder::default());

    let err = exporter.run(&mut host, &mut progress, DEFAULT_MESSAGE).unwrap_err();

    assert!(matches!(err, ExportError::SurfaceUnavailable));
    assert_eq!(exporter.quantizer().calls, 0);
    assert_eq!(host.recording_history, vec![true, false]);
    assert_eq!(progress.current(), None);
}

#[test]
fn test_loop_exporter_is_reusable_after_failure() {
    let mut host = ScriptedHost::new(160, 90);
    let quantizer = FakeQuantizer {
        fail_at: Some(0),
        ..FakeQuantizer::default()
    };
    let mut exporter = LoopExporter::new(quantizer, RecordingEncoder::default())
        .with_settings(LoopSettings::default().with_target_width(40));

    assert!(exporter.run(&mut host, &mut NoProgress, DEFAULT_MESSAGE).is_err());
    let asset = exporter.run(&mut host, &mut NoProgress, DEFAULT_MESSAGE).unwrap();
    assert_eq!(asset.bytes, b"36 frames");
}

// ============================================================================
// Still export and the card front door
// ============================================================================

#[test]
fn test_still_is_native_resolution_jpeg() {
    let mut host = ScriptedHost::new(200, 120);
    let asset = StillExporter::new().run(&mut host, DEFAULT_MESSAGE).unwrap();

    assert_eq!(asset.file_name, STILL_FILE_NAME);
    assert_eq!(asset.mime, "image/jpeg");
    let decoded = image::load_from_memory(&asset.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 120));

    assert_eq!(host.waits, vec![Duration::from_secs(1)]);
    assert!(host.formed);
    assert_eq!(host.recording_history, vec![true, false]);
}

#[test]
fn test_still_without_surface() {
    let mut host = ScriptedHost::without_surface();
    let err = StillExporter::new().run(&mut host, DEFAULT_MESSAGE).unwrap_err();
    assert!(matches!(err, ExportError::SurfaceUnavailable));
    assert!(!host.recording);
}

#[test]
fn test_card_exporter_delivers_assets() {
    let mut host = ScriptedHost::new(160, 90);
    let mut sink = MemorySink::default();
    let mut exporter = CardExporter::new(FakeQuantizer::default(), RecordingEncoder::default())
        .with_loop_settings(LoopSettings::default().with_target_width(40));

    exporter
        .export(&mut host, &mut NoProgress, &mut sink, &ExportRequest::still())
        .unwrap();
    exporter
        .export(&mut host, &mut NoProgress, &mut sink, &ExportRequest::animated())
        .unwrap();

    let names: Vec<_> = sink.assets.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, vec![STILL_FILE_NAME, ANIMATED_FILE_NAME]);
}

#[test]
fn test_trigger_reports_failure_without_asset() {
    let mut host = ScriptedHost::new(160, 90);
    let mut sink = MemorySink::default();
    let mut progress = ProgressTrace::default();
    let quantizer = FakeQuantizer {
        fail_at: Some(1),
        ..FakeQuantizer::default()
    };
    let mut exporter = CardExporter::new(quantizer, RecordingEncoder::default())
        .with_loop_settings(LoopSettings::default().with_target_width(40));

    exporter.trigger(&mut host, &mut progress, &mut sink, &ExportRequest::animated());

    assert!(sink.assets.is_empty());
    assert_eq!(progress.failures.len(), 1);
    assert!(progress.failures[0].contains("frame 1 rejected"));
    assert_eq!(progress.current(), None);
    assert!(!host.recording);
}

// ============================================================================
// Real scene and encoders
// ============================================================================

fn small_scene() -> TreeScene<SoftwareBackend> {
    let config = TreeConfig::default().with_particle_count(90);
    TreeScene::with_seed(config, SoftwareBackend::new(96, 54), 11, 1.0 / 30.0)
}

#[test]
fn test_scene_to_gif() {
    let mut scene = small_scene();
    let mut sink = MemorySink::default();
    let settings = LoopSettings::default()
        .with_target_width(64)
        .with_fps(4)
        .with_duration(Duration::from_secs(1))
        .with_settle(Duration::from_millis(200));
    let mut exporter = CardExporter::new(NeuQuantizer::default(), GifSink::new()).with_loop_settings(settings);

    exporter
        .export(&mut scene, &mut NoProgress, &mut sink, &ExportRequest::animated())
        .unwrap();
    assert!(scene.is_formed());

    let gif_bytes = &sink.assets[0].bytes;
    let mut decoder = gif::DecodeOptions::new().read_info(&gif_bytes[..]).unwrap();
    assert_eq!((decoder.width(), decoder.height()), (64, 36));

    let mut frames = 0;
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        assert_eq!(frame.delay, 25);
        frames += 1;
    }
    assert_eq!(frames, 4);
}

#[test]
fn test_scene_to_still() {
    let mut scene = small_scene();
    let mut sink = MemorySink::default();
    let mut exporter = CardExporter::new(NeuQuantizer::default(), GifSink::new())
        .with_still(StillExporter::new().with_settle(Duration::from_millis(100)));

    exporter
        .export(&mut scene, &mut NoProgress, &mut sink, &ExportRequest::still())
        .unwrap();

    // captured at the backend's recording resolution
    let surface = scene.backend().surface().unwrap();
    assert_eq!((surface.width(), surface.height()), (72, 41));
    let decoded = image::load_from_memory(&sink.assets[0].bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (72, 41));
}

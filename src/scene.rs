//! The assembled scene.
//!
//! [`TreeScene`] owns the composed particle layers, the snowfall, the clock
//! and a render backend, and runs one frame per [`TreeScene::frame`] call.
//! It implements [`ExportHost`], so exporters drive it directly: waiting
//! simply renders frames until the requested time has passed.

use std::time::Duration;

use tiny_skia::Pixmap;
use tracing::debug;

use crate::backend::{RenderBackend, SceneView};
use crate::composer::{FieldComposer, Reconfiguration};
use crate::config::TreeConfig;
use crate::export::ExportHost;
use crate::input::Pointer;
use crate::snow::{Snowfall, SNOW_COUNT};
use crate::spawn::SpawnContext;
use crate::time::Clock;

/// Wall-clock frame pacing while waiting in live mode.
const LIVE_FRAME: Duration = Duration::from_millis(16);

#[derive(Debug)]
pub struct TreeScene<B> {
    config: TreeConfig,
    composer: FieldComposer,
    snow: Option<Snowfall>,
    clock: Clock,
    backend: B,
}

impl<B: RenderBackend> TreeScene<B> {
    /// A live scene with fresh randomness.
    pub fn new(config: TreeConfig, backend: B) -> Self {
        let mut spawner = SpawnContext::from_clock();
        Self {
            composer: FieldComposer::new(&config),
            snow: Some(Snowfall::new(SNOW_COUNT, spawner.fork())),
            clock: Clock::new(),
            config,
            backend,
        }
    }

    /// A reproducible scene: seeded layers and a fixed-step clock.
    pub fn with_seed(config: TreeConfig, backend: B, seed: u64, step: f32) -> Self {
        let mut spawner = SpawnContext::from_seed(seed ^ 0x5EED_5A0F);
        Self {
            composer: FieldComposer::with_seed(&config, seed),
            snow: Some(Snowfall::new(SNOW_COUNT, spawner.fork())),
            clock: Clock::fixed(step),
            config,
            backend,
        }
    }

    pub fn without_snow(mut self) -> Self {
        self.snow = None;
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Swap in a new configuration. Only layers whose field key changed are
    /// rebuilt.
    pub fn set_config(&mut self, config: TreeConfig) -> Reconfiguration {
        let report = self.composer.apply_config(&config);
        debug!(
            rebuilt = report.rebuilt.len(),
            kept = report.kept.len(),
            removed = report.removed.len(),
            "scene reconfigured"
        );
        self.config = config;
        report
    }

    /// Edit the configuration in place.
    pub fn update_config(&mut self, edit: impl FnOnce(&mut TreeConfig)) -> Reconfiguration {
        let mut config = self.config.clone();
        edit(&mut config);
        self.set_config(config)
    }

    pub fn set_formed(&mut self, formed: bool) {
        self.composer.set_formed(formed);
    }

    pub fn toggle_formed(&mut self) {
        let formed = !self.composer.is_formed();
        self.composer.set_formed(formed);
    }

    pub fn is_formed(&self) -> bool {
        self.composer.is_formed()
    }

    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.composer.set_pointer(pointer);
    }

    pub fn composer(&self) -> &FieldComposer {
        &self.composer
    }

    pub fn snow(&self) -> Option<&Snowfall> {
        self.snow.as_ref()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Advance time, animate and draw one frame.
    pub fn frame(&mut self) {
        let (elapsed, _) = self.clock.tick();
        self.composer.tick(elapsed);
        if let Some(snow) = &mut self.snow {
            snow.tick();
        }
        self.backend.draw(&SceneView {
            composer: &self.composer,
            snow: self.snow.as_ref(),
            bloom_intensity: self.config.bloom_intensity,
        });
    }

    /// Render `n` frames.
    pub fn run_frames(&mut self, n: u32) {
        for _ in 0..n {
            self.frame();
        }
    }
}

impl<B: RenderBackend> ExportHost for TreeScene<B> {
    fn set_formed(&mut self, formed: bool) {
        self.composer.set_formed(formed);
    }

    fn set_recording(&mut self, recording: bool) {
        self.backend.set_recording(recording);
    }

    fn wait(&mut self, interval: Duration) {
        let ticks = self.clock.ticks_for(interval).max(1);
        let live = self.clock.fixed_delta().is_none();
        for _ in 0..ticks {
            self.frame();
            if live {
                std::thread::sleep(LIVE_FRAME);
            }
        }
    }

    fn surface(&self) -> Option<&Pixmap> {
        self.backend.surface()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::shape::OrnamentShape;

    fn scene() -> TreeScene<SoftwareBackend> {
        let config = TreeConfig::default().with_particle_count(30);
        TreeScene::with_seed(config, SoftwareBackend::new(64, 36), 7, 1.0 / 60.0).without_snow()
    }

    #[test]
    fn test_wait_renders_frames() {
        let mut scene = scene();
        assert!(scene.surface().is_none());
        scene.wait(Duration::from_millis(500));
        assert_eq!(scene.clock().frame(), 30);
        assert!(scene.surface().is_some());
    }

    #[test]
    fn test_short_wait_renders_at_least_one_frame() {
        let mut scene = scene();
        scene.wait(Duration::ZERO);
        assert_eq!(scene.clock().frame(), 1);
    }

    #[test]
    fn test_update_config_keeps_untouched_layers() {
        let mut scene = scene();
        let report = scene.update_config(|c| c.toggle_color(crate::color::Color::from_hex_u32(0xFF0000)));
        assert!(report.rebuilt.is_empty());

        let report = scene.update_config(|c| c.toggle_shape(OrnamentShape::Diamond));
        assert!(!report.rebuilt.is_empty());
        assert!(scene.composer().ornament(OrnamentShape::Diamond).is_some());
    }

    #[test]
    fn test_toggle_formed() {
        let mut scene = scene();
        assert!(!scene.is_formed());
        scene.toggle_formed();
        assert!(scene.is_formed());
    }
}

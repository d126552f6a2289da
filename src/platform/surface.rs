//! Render surface lifecycle
//!
//! An explicit state machine for one drawable surface:
//!
//! ```text
//! Idle --observe()--> Observing <==(intersecting && visible)==> Animating
//!                         \______________________________________/
//!                                          |
//!                                     dispose()
//!                                          v
//!                                      Disposed (terminal)
//! ```
//!
//! The platform driver feeds it intersection, visibility, resize and frame
//! timestamps, and acts on the returned [`Transition`]s (schedule or cancel
//! the next animation frame). Nothing here touches the browser.

use crate::config::{BallpitConfig, PixelRatioClamp, PowerPreference, SizeSource};
use crate::renderer::camera::PerspectiveCamera;

use super::time::{Clock, Debouncer, FrameTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Constructed, observers not installed yet
    Idle,
    /// Observers installed, no frame scheduled
    Observing,
    /// Frame loop scheduled
    Animating,
    Disposed,
}

/// What the driver must do after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Schedule the frame loop
    Start,
    /// Cancel the pending frame
    Stop,
    None,
}

/// Surface-level options, taken from the config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    pub size: SizeSource,
    pub pixel_ratio: PixelRatioClamp,
    pub power_preference: PowerPreference,
    pub antialias: bool,
    pub transparent: bool,
}

impl SurfaceOptions {
    pub fn from_config(config: &BallpitConfig) -> Self {
        Self {
            size: config.size,
            pixel_ratio: config.pixel_ratio,
            power_preference: config.power_preference,
            antialias: config.antialias,
            transparent: config.transparent,
        }
    }
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self::from_config(&BallpitConfig::default())
    }
}

/// Current size in CSS pixels plus the derived world extents
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
    pub ratio: f32,
    pub pixel_ratio: f32,
    /// Visible world width at the camera distance
    pub world_width: f32,
    pub world_height: f32,
}

impl SurfaceSize {
    /// Backing store size in device pixels
    pub fn physical(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_ratio).round().max(1.0) as u32,
            (self.height * self.pixel_ratio).round().max(1.0) as u32,
        )
    }
}

/// One surface's size, visibility and frame clock
#[derive(Debug, Clone)]
pub struct RenderSurface {
    options: SurfaceOptions,
    state: SurfaceState,
    intersecting: bool,
    document_visible: bool,
    clock: Clock,
    time: FrameTime,
    resize: Debouncer,
    size: SurfaceSize,
    camera: PerspectiveCamera,
}

impl RenderSurface {
    pub fn new(options: SurfaceOptions, camera: PerspectiveCamera) -> Self {
        Self {
            options,
            state: SurfaceState::Idle,
            intersecting: false,
            document_visible: true,
            clock: Clock::new(),
            time: FrameTime::default(),
            resize: Debouncer::default(),
            size: SurfaceSize::default(),
            camera,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.state == SurfaceState::Animating
    }

    pub fn is_disposed(&self) -> bool {
        self.state == SurfaceState::Disposed
    }

    pub fn time(&self) -> FrameTime {
        self.time
    }

    pub fn size(&self) -> &SurfaceSize {
        &self.size
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// Observers are installed; from here on visibility drives the loop
    pub fn observe(&mut self, now_ms: f64) -> Transition {
        if self.state != SurfaceState::Idle {
            return Transition::None;
        }
        self.state = SurfaceState::Observing;
        self.reconcile(now_ms)
    }

    pub fn set_intersecting(&mut self, intersecting: bool, now_ms: f64) -> Transition {
        if self.is_disposed() {
            return Transition::None;
        }
        self.intersecting = intersecting;
        self.reconcile(now_ms)
    }

    pub fn set_document_visible(&mut self, visible: bool, now_ms: f64) -> Transition {
        if self.is_disposed() {
            return Transition::None;
        }
        self.document_visible = visible;
        self.reconcile(now_ms)
    }

    fn reconcile(&mut self, now_ms: f64) -> Transition {
        let wanted = self.intersecting && self.document_visible;
        match (self.state, wanted) {
            (SurfaceState::Observing, true) => {
                self.state = SurfaceState::Animating;
                self.clock.start(now_ms);
                log::debug!("surface animating (elapsed {:.2}s)", self.time.elapsed);
                Transition::Start
            }
            (SurfaceState::Animating, false) => {
                self.state = SurfaceState::Observing;
                self.clock.stop();
                log::debug!("surface paused (elapsed {:.2}s)", self.time.elapsed);
                Transition::Stop
            }
            _ => Transition::None,
        }
    }

    /// Advance the clock for one frame; `None` unless animating
    pub fn frame(&mut self, now_ms: f64) -> Option<FrameTime> {
        if !self.is_animating() {
            return None;
        }
        self.time.delta = self.clock.delta(now_ms);
        self.time.elapsed += self.time.delta;
        Some(self.time)
    }

    /// A raw resize event arrived; returns false if it is ignored
    pub fn request_resize(&mut self, now_ms: f64) -> bool {
        if self.is_disposed() || !self.options.size.is_tracked() {
            return false;
        }
        self.resize.trigger(now_ms);
        true
    }

    /// True once per burst, when the debounce window has passed
    pub fn poll_resize(&mut self, now_ms: f64) -> bool {
        !self.is_disposed() && self.resize.poll(now_ms)
    }

    pub fn resize_pending(&self) -> bool {
        self.resize.pending()
    }

    pub fn resize_delay_ms(&self) -> f64 {
        self.resize.delay_ms()
    }

    /// Pick the CSS size from whichever source the options name
    pub fn resolve_size(&self, parent: (f32, f32), window: (f32, f32)) -> (f32, f32) {
        match self.options.size {
            SizeSource::Fixed { width, height } => (width as f32, height as f32),
            SizeSource::Parent => parent,
            SizeSource::Window => window,
        }
    }

    /// Recompute camera, world extents and pixel ratio
    ///
    /// Ignored after disposal or for a degenerate (zero-area or non-finite) size.
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) -> Option<SurfaceSize> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if self.is_disposed() || !usable(width) || !usable(height) {
            return None;
        }
        let ratio = width / height;
        self.camera.set_aspect(ratio);
        let world = self.camera.world_size();
        self.size = SurfaceSize {
            width,
            height,
            ratio,
            pixel_ratio: self.options.pixel_ratio.apply(device_pixel_ratio),
            world_width: world.x,
            world_height: world.y,
        };
        log::debug!(
            "surface resized to {}x{} @{}x (world {:.2}x{:.2})",
            width,
            height,
            self.size.pixel_ratio,
            world.x,
            world.y
        );
        Some(self.size)
    }

    /// Enter the terminal state; false if already disposed
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.clock.stop();
        self.resize.cancel();
        self.state = SurfaceState::Disposed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraParams;

    fn surface() -> RenderSurface {
        RenderSurface::new(
            SurfaceOptions::default(),
            PerspectiveCamera::new(&CameraParams::default()),
        )
    }

    #[test]
    fn test_idle_until_observed() {
        let mut s = surface();
        assert_eq!(s.state(), SurfaceState::Idle);
        assert_eq!(s.set_intersecting(true, 0.0), Transition::None);
        assert_eq!(s.state(), SurfaceState::Idle);

        // Already intersecting when the observers come up
        assert_eq!(s.observe(0.0), Transition::Start);
        assert!(s.is_animating());
        assert_eq!(s.observe(0.0), Transition::None);
    }

    #[test]
    fn test_needs_intersection_and_visibility() {
        let mut s = surface();
        s.observe(0.0);
        assert_eq!(s.state(), SurfaceState::Observing);

        assert_eq!(s.set_document_visible(false, 0.0), Transition::None);
        assert_eq!(s.set_intersecting(true, 0.0), Transition::None);
        assert_eq!(s.state(), SurfaceState::Observing);

        assert_eq!(s.set_document_visible(true, 0.0), Transition::Start);
        assert_eq!(s.set_intersecting(true, 0.0), Transition::None);
        assert_eq!(s.set_document_visible(false, 0.0), Transition::Stop);
        assert_eq!(s.state(), SurfaceState::Observing);
    }

    #[test]
    fn test_frames_only_while_animating() {
        let mut s = surface();
        s.observe(0.0);
        assert!(s.frame(16.0).is_none());
        s.set_intersecting(true, 100.0);
        let t = s.frame(116.0).unwrap();
        assert!((t.delta - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_elapsed_continues_across_pauses() {
        let mut s = surface();
        s.observe(0.0);

        // First window: 0..1000ms
        s.set_intersecting(true, 0.0);
        for i in 1..=10 {
            s.frame(i as f64 * 100.0);
        }
        let first = s.time().elapsed;
        assert!((first - 1.0).abs() < 1e-4);

        // Out of view for 5 seconds; nothing accrues
        s.set_intersecting(false, 1000.0);
        assert!(s.frame(3000.0).is_none());
        assert_eq!(s.time().elapsed, first);

        // Second window: the first frame has ~0 delta, no reset to zero
        s.set_intersecting(true, 6000.0);
        let t = s.frame(6000.0).unwrap();
        assert_eq!(t.delta, 0.0);
        assert_eq!(t.elapsed, first);
        for i in 1..=5 {
            s.frame(6000.0 + i as f64 * 100.0);
        }
        assert!((s.time().elapsed - 1.5).abs() < 1e-4);

        s.set_intersecting(false, 6500.0);
        s.set_intersecting(true, 9000.0);
        let t = s.frame(9100.0).unwrap();
        assert!((t.elapsed - 1.6).abs() < 1e-4);
    }

    #[test]
    fn test_dispose_is_terminal_and_idempotent() {
        let mut s = surface();
        s.observe(0.0);
        s.set_intersecting(true, 0.0);

        assert!(s.dispose());
        assert!(!s.dispose());
        assert_eq!(s.state(), SurfaceState::Disposed);

        assert_eq!(s.set_intersecting(true, 10.0), Transition::None);
        assert_eq!(s.set_document_visible(true, 10.0), Transition::None);
        assert!(s.frame(20.0).is_none());
        assert!(!s.request_resize(20.0));
        assert!(s.resize(800.0, 600.0, 1.0).is_none());
    }

    #[test]
    fn test_resize_debounced() {
        let mut s = surface();
        let mut recomputes = 0;
        for i in 0..8 {
            let now = i as f64 * 10.0;
            assert!(s.request_resize(now));
            if s.poll_resize(now) {
                recomputes += 1;
            }
        }
        if s.poll_resize(70.0 + s.resize_delay_ms()) {
            recomputes += 1;
        }
        assert_eq!(recomputes, 1);

        // Spaced beyond the window: one recompute each
        for i in 0..3 {
            let now = 1000.0 + i as f64 * 500.0;
            s.request_resize(now);
            assert!(s.poll_resize(now + 150.0));
        }
    }

    #[test]
    fn test_fixed_size_ignores_resize_events() {
        let options = SurfaceOptions {
            size: SizeSource::Fixed {
                width: 320,
                height: 240,
            },
            ..Default::default()
        };
        let mut s = RenderSurface::new(options, PerspectiveCamera::new(&CameraParams::default()));
        assert!(!s.request_resize(0.0));
        assert_eq!(s.resolve_size((1.0, 1.0), (2.0, 2.0)), (320.0, 240.0));
    }

    #[test]
    fn test_resize_updates_world_and_pixel_ratio() {
        let options = SurfaceOptions {
            pixel_ratio: PixelRatioClamp {
                min: None,
                max: Some(1.5),
            },
            ..Default::default()
        };
        let mut s = RenderSurface::new(options, PerspectiveCamera::new(&CameraParams::default()));
        let size = s.resize(1000.0, 800.0, 3.0).unwrap();
        assert_eq!(size.ratio, 1.25);
        assert_eq!(size.pixel_ratio, 1.5);
        assert_eq!(size.physical(), (1500, 1200));
        assert!((size.world_width / size.world_height - 1.25).abs() < 1e-5);
        assert!(s.resize(0.0, 800.0, 1.0).is_none());
        assert!(s.resize(f32::NAN, 800.0, 1.0).is_none());
        assert!(s.resize(1000.0, f32::INFINITY, 1.0).is_none());
        assert_eq!(s.size().width, 1000.0);
    }
}

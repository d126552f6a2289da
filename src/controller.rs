//! Composition root for one ballpit instance
//!
//! Owns the surface state machine, the physics world and the instance batch,
//! and exposes the operations the host page drives: pause, recount, pointer
//! input, resize and dispose.

use glam::Vec2;

use crate::config::BallpitConfig;
use crate::error::Result;
use crate::platform::input::Registration;
use crate::platform::surface::{RenderSurface, SurfaceOptions, SurfaceSize, Transition};
use crate::platform::time::FrameTime;
use crate::renderer::batch::ParticleBatch;
use crate::renderer::camera::PerspectiveCamera;
use crate::sim::PhysicsWorld;

/// A world and the batch mirroring it; always replaced as a pair
#[derive(Debug, Clone)]
struct Spheres {
    world: PhysicsWorld,
    batch: ParticleBatch,
}

type FrameHook = Box<dyn FnMut(FrameTime)>;

pub struct BallpitController {
    config: BallpitConfig,
    surface: RenderSurface,
    spheres: Option<Spheres>,
    paused: bool,
    registration: Option<Registration>,
    after_render: Option<FrameHook>,
    seed: u64,
    builds: u64,
}

impl BallpitController {
    /// Validate the config and set up an idle surface
    ///
    /// Spheres are created on the first [`resize`](Self::resize) so the
    /// initial scatter covers the visible area.
    pub fn new(config: BallpitConfig, options: SurfaceOptions) -> Result<Self> {
        config.validate()?;
        let camera = PerspectiveCamera::new(&config.camera);
        let seed = config.seed.unwrap_or_default();
        log::info!("ballpit: {} spheres, seed {}", config.count, seed);
        Ok(Self {
            surface: RenderSurface::new(options, camera),
            config,
            spheres: None,
            paused: false,
            registration: None,
            after_render: None,
            seed,
            builds: 0,
        })
    }

    pub fn config(&self) -> &BallpitConfig {
        &self.config
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut RenderSurface {
        &mut self.surface
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        self.surface.camera()
    }

    pub fn batch(&self) -> Option<&ParticleBatch> {
        self.spheres.as_ref().map(|s| &s.batch)
    }

    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.spheres.as_ref().map(|s| &s.world)
    }

    pub fn particle_count(&self) -> usize {
        self.spheres
            .as_ref()
            .map_or(self.config.count, |s| s.world.count())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disposed(&self) -> bool {
        self.surface.is_disposed()
    }

    /// Build a fresh world + batch for the current config
    fn build_spheres(&mut self) -> Spheres {
        let seed = self.seed.wrapping_add(self.builds);
        self.builds += 1;
        let world = PhysicsWorld::new(self.config.physics_params(), seed);
        let mut batch = ParticleBatch::new(world.count(), &self.config);
        batch.sync(&world);
        Spheres { world, batch }
    }

    /// Rebuild world and batch with `count` spheres
    ///
    /// The current bounds and control state carry over. Before the first
    /// resize only the configured count changes.
    pub fn set_particle_count(&mut self, count: usize) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        let mut next = BallpitConfig {
            count,
            ..self.config.clone()
        };
        if let Some(current) = &self.spheres {
            let params = current.world.params();
            next.max_x = params.max_x;
            next.max_y = params.max_y;
        }
        next.validate()?;
        self.config = next;

        let Some(current) = &self.spheres else {
            return Ok(());
        };
        let target = current.world.control_target();
        let control = current.world.control_enabled();

        let mut spheres = self.build_spheres();
        spheres.world.set_control_target(target);
        spheres.world.set_control_enabled(control);
        spheres.batch.sync(&spheres.world);
        self.spheres = Some(spheres);
        log::debug!("recount: {} spheres", count);
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        log::info!("ballpit {}", if self.paused { "paused" } else { "resumed" });
        self.paused
    }

    /// Advance physics and mirror it into the batch, unless paused
    pub fn before_render(&mut self, time: FrameTime) {
        if self.paused {
            return;
        }
        if let Some(Spheres { world, batch }) = &mut self.spheres {
            world.update(time.delta);
            batch.sync(world);
        }
    }

    pub fn set_after_render(&mut self, hook: impl FnMut(FrameTime) + 'static) {
        self.after_render = Some(Box::new(hook));
    }

    pub fn after_render(&mut self, time: FrameTime) {
        if let Some(hook) = &mut self.after_render {
            hook(time);
        }
    }

    /// Run one animation frame: step, draw, then the after-render hook
    ///
    /// Returns false when the surface is not animating and nothing ran.
    pub fn frame(
        &mut self,
        now_ms: f64,
        draw: impl FnOnce(Option<&ParticleBatch>, &PerspectiveCamera),
    ) -> bool {
        let Some(time) = self.surface.frame(now_ms) else {
            return false;
        };
        self.before_render(time);
        draw(self.batch(), self.surface.camera());
        self.after_render(time);
        true
    }

    /// Pointer at `ndc` over the surface: steer the cursor sphere there
    pub fn pointer_moved(&mut self, ndc: Vec2) {
        let Some(spheres) = &mut self.spheres else {
            return;
        };
        if let Some(point) = self.surface.camera().unproject_to_plane(ndc) {
            spheres.world.set_control_target(point);
            spheres.world.set_control_enabled(true);
        }
    }

    pub fn pointer_left(&mut self) {
        if let Some(spheres) = &mut self.spheres {
            spheres.world.set_control_enabled(false);
        }
    }

    /// Surface resized; recompute the camera and push the new bounds
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) -> Option<SurfaceSize> {
        let size = self.surface.resize(width, height, device_pixel_ratio)?;
        let (half_w, half_h) = (size.world_width / 2.0, size.world_height / 2.0);
        match &mut self.spheres {
            Some(spheres) => spheres.world.set_bounds(half_w, half_h),
            None => {
                self.config.max_x = half_w;
                self.config.max_y = half_h;
                let spheres = self.build_spheres();
                self.spheres = Some(spheres);
                log::info!("ballpit populated in {:.2}x{:.2} world units", size.world_width, size.world_height);
            }
        }
        Some(size)
    }

    pub fn set_intersecting(&mut self, intersecting: bool, now_ms: f64) -> Transition {
        self.surface.set_intersecting(intersecting, now_ms)
    }

    pub fn set_document_visible(&mut self, visible: bool, now_ms: f64) -> Transition {
        self.surface.set_document_visible(visible, now_ms)
    }

    /// Keep the pointer registration alive for this instance's lifetime
    pub fn attach_pointer(&mut self, registration: Registration) {
        if self.is_disposed() {
            drop(registration);
            return;
        }
        self.registration = Some(registration);
    }

    pub fn has_pointer(&self) -> bool {
        self.registration.is_some()
    }

    /// Drop the pointer registration, then the surface; false if already done
    pub fn dispose(&mut self) -> bool {
        if let Some(mut registration) = self.registration.take() {
            registration.dispose();
        }
        if !self.surface.dispose() {
            return false;
        }
        self.spheres = None;
        self.after_render = None;
        log::info!("ballpit disposed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::input::{CountingSource, PointerBroker, PointerHooks, Rect, SurfaceKey};
    use crate::platform::surface::SurfaceState;
    use glam::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;

    fn controller(count: usize) -> BallpitController {
        let config = BallpitConfig {
            count,
            seed: Some(42),
            ..Default::default()
        };
        let options = SurfaceOptions::from_config(&config);
        BallpitController::new(config, options).unwrap()
    }

    fn running(count: usize) -> BallpitController {
        let mut c = controller(count);
        c.resize(800.0, 600.0, 1.0);
        c.surface_mut().observe(0.0);
        c.set_intersecting(true, 0.0);
        c
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BallpitConfig {
            count: 0,
            ..Default::default()
        };
        assert!(BallpitController::new(config, SurfaceOptions::default()).is_err());
    }

    #[test]
    fn test_inverted_camera_rejected_before_population() {
        for fov in [-50.0, 200.0] {
            let config = BallpitConfig {
                count: 10,
                camera: crate::config::CameraParams {
                    fov,
                    ..Default::default()
                },
                ..Default::default()
            };
            let options = SurfaceOptions::from_config(&config);
            assert!(BallpitController::new(config, options).is_err());
        }
    }

    #[test]
    fn test_first_resize_populates_visible_area() {
        let mut c = controller(30);
        assert!(c.batch().is_none());
        let size = c.resize(800.0, 600.0, 2.0).unwrap();
        let world = c.world().unwrap();
        assert_eq!(world.count(), 30);
        assert!((world.params().max_x - size.world_width / 2.0).abs() < 1e-5);
        assert!((world.params().max_y - size.world_height / 2.0).abs() < 1e-5);
        assert_eq!(c.batch().unwrap().len(), 30);
    }

    #[test]
    fn test_frames_step_physics() {
        let mut c = running(10);
        let before = c.world().unwrap().position(3);
        let mut drawn = 0;
        for i in 1..=10 {
            assert!(c.frame(i as f64 * 16.0, |batch, _| {
                assert!(batch.is_some());
                drawn += 1;
            }));
        }
        assert_eq!(drawn, 10);
        assert_ne!(c.world().unwrap().position(3), before);
    }

    #[test]
    fn test_paused_frames_render_without_stepping() {
        let mut c = running(10);
        c.frame(16.0, |_, _| {});
        assert!(c.toggle_pause());
        let snapshot = c.world().unwrap().positions().to_vec();
        let generation = c.batch().unwrap().generation();

        let mut drawn = 0;
        for i in 2..6 {
            c.frame(i as f64 * 16.0, |_, _| drawn += 1);
        }
        assert_eq!(drawn, 4);
        assert_eq!(c.world().unwrap().positions(), &snapshot[..]);
        assert_eq!(c.batch().unwrap().generation(), generation);

        assert!(!c.toggle_pause());
        c.frame(200.0, |_, _| {});
        assert_eq!(c.batch().unwrap().generation(), generation + 1);
    }

    #[test]
    fn test_after_render_hook_sees_frame_time() {
        let mut c = running(4);
        let seen = Rc::new(Cell::new(0.0f32));
        let sink = seen.clone();
        c.set_after_render(move |t| sink.set(t.elapsed));
        c.frame(500.0, |_, _| {});
        assert!((seen.get() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_recount_preserves_bounds_and_control() {
        let mut c = running(20);
        c.pointer_moved(Vec2::new(0.5, 0.5));
        let target = c.world().unwrap().control_target();
        let bounds = c.world().unwrap().params().max_x;

        c.set_particle_count(50).unwrap();
        let world = c.world().unwrap();
        assert_eq!(world.count(), 50);
        assert_eq!(c.batch().unwrap().len(), 50);
        assert_eq!(world.params().max_x, bounds);
        assert!(world.control_enabled());
        assert_eq!(world.control_target(), target);
        assert_eq!(c.config().count, 50);

        assert!(c.set_particle_count(0).is_err());
        assert_eq!(c.particle_count(), 50);
    }

    #[test]
    fn test_recount_before_population_sets_count() {
        let mut c = controller(20);
        c.set_particle_count(7).unwrap();
        assert!(c.batch().is_none());
        c.resize(400.0, 400.0, 1.0);
        assert_eq!(c.particle_count(), 7);
    }

    #[test]
    fn test_pointer_drives_cursor_sphere() {
        let mut c = running(5);
        c.pointer_moved(Vec2::ZERO);
        let world = c.world().unwrap();
        assert!(world.control_enabled());
        assert!(world.control_target().length() < 1e-4);

        let half = c.surface().size().world_width / 2.0;
        c.pointer_moved(Vec2::new(1.0, 0.0));
        let target = c.world().unwrap().control_target();
        assert!((target - Vec3::new(half, 0.0, 0.0)).length() < 1e-3);

        c.pointer_left();
        assert!(!c.world().unwrap().control_enabled());
    }

    #[test]
    fn test_dispose_unregisters_then_stops() {
        let source = CountingSource::new();
        let broker = PointerBroker::new(source.clone());
        let mut c = running(5);
        let registration = broker
            .register(
                SurfaceKey(1),
                || Rect::new(0.0, 0.0, 800.0, 600.0),
                PointerHooks::new(),
            )
            .unwrap();
        c.attach_pointer(registration);
        assert!(c.has_pointer());
        assert_eq!(source.active(), 1);

        assert!(c.dispose());
        assert!(!c.has_pointer());
        assert_eq!(source.active(), 0);
        assert!(broker.is_empty());
        assert_eq!(c.surface().state(), SurfaceState::Disposed);
        assert!(c.batch().is_none());

        assert!(!c.dispose());
        assert_eq!(source.detaches(), 1);
    }

    #[test]
    fn test_events_after_dispose_ignored() {
        let mut c = running(5);
        c.dispose();
        assert!(c.resize(1024.0, 768.0, 1.0).is_none());
        assert!(!c.frame(100.0, |_, _| panic!("no frame after dispose")));
        assert_eq!(c.set_intersecting(true, 100.0), Transition::None);
        c.pointer_moved(Vec2::ZERO);
        assert!(c.set_particle_count(10).is_ok());
        assert!(c.batch().is_none());
    }
}

//! Ballpit entry point
//!
//! The widget itself runs in the browser through the `Ballpit` class
//! exported by the library. Natively this binary drives the controller
//! headlessly for a few simulated seconds and reports what it saw.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Ballpit (native) starting...");
    log::info!("Native mode is a headless smoke run - serve the wasm build for the real widget");

    let count = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(60);

    match smoke::run(count, 600) {
        Ok(report) => {
            println!("\n{report}");
            println!("✓ Smoke run passed!");
        }
        Err(err) => {
            log::error!("smoke run failed: {}", err);
            std::process::exit(1);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod smoke {
    use std::fmt;

    use ballpit::platform::input::{
        CountingSource, PointerBroker, PointerEvent, PointerHooks, Rect, SurfaceKey,
    };
    use ballpit::platform::surface::SurfaceOptions;
    use ballpit::{BallpitConfig, BallpitController, Result};
    use std::cell::RefCell;
    use std::rc::Rc;

    const WIDTH: f32 = 1280.0;
    const HEIGHT: f32 = 720.0;
    const FRAME_MS: f64 = 1000.0 / 60.0;

    pub struct Report {
        frames: usize,
        particles: usize,
        elapsed: f32,
        out_of_bounds: usize,
        deepest_overlap: f32,
    }

    impl fmt::Display for Report {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "frames:          {}", self.frames)?;
            writeln!(f, "particles:       {}", self.particles)?;
            writeln!(f, "elapsed:         {:.2}s", self.elapsed)?;
            writeln!(f, "out of bounds:   {}", self.out_of_bounds)?;
            write!(f, "deepest overlap: {:.4}", self.deepest_overlap)
        }
    }

    pub fn run(count: usize, frames: usize) -> Result<Report> {
        let config = BallpitConfig {
            count,
            seed: Some(0x5eed),
            ..Default::default()
        };
        let options = SurfaceOptions::from_config(&config);
        let controller = Rc::new(RefCell::new(BallpitController::new(config, options)?));

        let broker = PointerBroker::new(CountingSource::new());
        let registration = {
            let moved = Rc::downgrade(&controller);
            let left = Rc::downgrade(&controller);
            broker.register(
                SurfaceKey(1),
                || Rect::new(0.0, 0.0, WIDTH, HEIGHT),
                PointerHooks::new()
                    .on_move(move |state| {
                        if let Some(c) = moved.upgrade() {
                            c.borrow_mut().pointer_moved(state.n_position);
                        }
                    })
                    .on_leave(move |_| {
                        if let Some(c) = left.upgrade() {
                            c.borrow_mut().pointer_left();
                        }
                    }),
            )?
        };

        {
            let mut c = controller.borrow_mut();
            c.attach_pointer(registration);
            c.resize(WIDTH, HEIGHT, 1.0);
            c.surface_mut().observe(0.0);
            c.set_intersecting(true, 0.0);
        }

        let mut drawn = 0;
        for frame in 1..=frames {
            // Sweep the pointer in a circle for the first half, then leave
            if frame < frames / 2 {
                let t = frame as f32 / 60.0;
                broker.dispatch(PointerEvent::Move {
                    x: WIDTH / 2.0 + t.cos() * WIDTH / 4.0,
                    y: HEIGHT / 2.0 + t.sin() * HEIGHT / 4.0,
                });
            } else if frame == frames / 2 {
                broker.dispatch(PointerEvent::Leave);
            }
            if controller
                .borrow_mut()
                .frame(frame as f64 * FRAME_MS, |_, _| drawn += 1)
            {
                log::trace!("frame {}", frame);
            }
        }

        let mut c = controller.borrow_mut();
        let report = {
            let world = c.world().cloned();
            let elapsed = c.surface().time().elapsed;
            match world {
                Some(world) => {
                    let p = world.params();
                    let eps = 1e-3;
                    let out_of_bounds = (1..world.count())
                        .filter(|&i| {
                            let pos = world.position(i);
                            // With gravity on, only the floor holds spheres in
                            let y_out = if p.gravity == 0.0 {
                                pos.y.abs() > p.max_y + eps
                            } else {
                                pos.y < -p.max_y - eps
                            };
                            pos.x.abs() > p.max_x + eps
                                || y_out
                                || pos.z.abs() > p.max_z.max(p.max_size) + eps
                        })
                        .count();
                    let mut deepest_overlap = 0.0f32;
                    for i in 1..world.count() {
                        for j in (i + 1)..world.count() {
                            let dist = world.position(i).distance(world.position(j));
                            let overlap = world.radius(i) + world.radius(j) - dist;
                            deepest_overlap = deepest_overlap.max(overlap);
                        }
                    }
                    Report {
                        frames: drawn,
                        particles: world.count(),
                        elapsed,
                        out_of_bounds,
                        deepest_overlap,
                    }
                }
                None => Report {
                    frames: drawn,
                    particles: 0,
                    elapsed,
                    out_of_bounds: 0,
                    deepest_overlap: 0.0,
                },
            }
        };
        c.dispose();
        Ok(report)
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `ballpit::web::start`, this is just to satisfy the compiler
}

//! Browser glue for the wasm32 build
//!
//! Wires DOM listeners, observers and `requestAnimationFrame` into a
//! [`BallpitController`] and exports the `Ballpit` class to JavaScript.
//! Every instance on the page shares one [`PointerBroker`] whose listeners
//! live on `document.body`.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, HtmlCanvasElement, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, MouseEvent, ResizeObserver, TouchEvent, Window,
};

use crate::config::{self, BallpitConfig, SizeSource};
use crate::controller::BallpitController;
use crate::error::{BallpitError, Result};
use crate::platform::host::{SharedHost, Teardown};
use crate::platform::input::{
    EventSource, PointerBroker, PointerEvent, PointerHooks, PointerState, Rect, SurfaceKey,
    WeakPointerBroker,
};
use crate::platform::surface::{SurfaceOptions, Transition};
use crate::renderer::camera::PerspectiveCamera;
use crate::renderer::{MaterialUniform, ParticleBatch, SphereRenderState};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // Already initialised when a second module instance shares the page
    let _ = console_log::init_with_level(log::Level::Info);
}

// ============================================================================
// DOCUMENT POINTER LISTENERS
// ============================================================================

type Listener = Closure<dyn FnMut(web_sys::Event)>;

/// Document-body listeners feeding the shared broker
///
/// Closures are built on the first attach and kept for the page lifetime;
/// detach only removes them from the DOM, so a hook that disposes the last
/// surface mid-dispatch never frees the closure that is running.
#[derive(Default)]
struct DocumentEvents {
    listeners: Vec<(&'static str, Listener)>,
}

fn mouse_point(event: &web_sys::Event) -> Option<(f32, f32)> {
    let event = event.dyn_ref::<MouseEvent>()?;
    Some((event.client_x() as f32, event.client_y() as f32))
}

fn first_touch(event: &web_sys::Event) -> Option<(f32, f32)> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
    Some((touch.client_x() as f32, touch.client_y() as f32))
}

impl DocumentEvents {
    fn build(broker: WeakPointerBroker) -> Vec<(&'static str, Listener)> {
        let on = |translate: fn(&web_sys::Event) -> Option<PointerEvent>| {
            let broker = broker.clone();
            Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
                if let Some(event) = translate(&event) {
                    broker.dispatch(event);
                }
            })
        };
        vec![
            (
                "pointermove",
                on(|e| mouse_point(e).map(|(x, y)| PointerEvent::Move { x, y })),
            ),
            ("pointerleave", on(|_| Some(PointerEvent::Leave))),
            (
                "click",
                on(|e| mouse_point(e).map(|(x, y)| PointerEvent::Click { x, y })),
            ),
            (
                "touchstart",
                on(|e| first_touch(e).map(|(x, y)| PointerEvent::TouchStart { x, y })),
            ),
            (
                "touchmove",
                on(|e| first_touch(e).map(|(x, y)| PointerEvent::TouchMove { x, y })),
            ),
            ("touchend", on(|_| Some(PointerEvent::TouchEnd))),
            ("touchcancel", on(|_| Some(PointerEvent::TouchEnd))),
        ]
    }
}

fn body() -> Option<HtmlElement> {
    web_sys::window()?.document()?.body()
}

impl EventSource for DocumentEvents {
    fn attach(&mut self, broker: WeakPointerBroker) {
        let Some(body) = body() else {
            log::warn!("no document body; pointer input disabled");
            return;
        };
        if self.listeners.is_empty() {
            self.listeners = Self::build(broker);
        }
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        for (name, listener) in &self.listeners {
            let _ = body.add_event_listener_with_callback_and_add_event_listener_options(
                name,
                listener.as_ref().unchecked_ref(),
                &options,
            );
        }
    }

    fn detach(&mut self) {
        let Some(body) = body() else {
            return;
        };
        for (name, listener) in &self.listeners {
            let _ = body.remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
        }
    }
}

thread_local! {
    static BROKER: PointerBroker = PointerBroker::new(DocumentEvents::default());
    static NEXT_KEY: Cell<u64> = const { Cell::new(1) };
}

// ============================================================================
// PER-INSTANCE HOST STATE
// ============================================================================

struct Inner {
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
    controller: BallpitController,
    gpu: Option<SphereRenderState>,
    animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    resize_done: Option<Closure<dyn FnMut()>>,
    frame_id: Option<i32>,
    resize_timeout: Option<i32>,
    glue: Option<Glue>,
}

fn draw(gpu: &mut SphereRenderState, batch: Option<&ParticleBatch>, camera: &PerspectiveCamera) {
    match gpu.render(batch, camera) {
        Ok(_) => {}
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu.reconfigure(),
        Err(wgpu::SurfaceError::OutOfMemory) => {
            log::error!("Out of memory!");
        }
        Err(e) => log::warn!("Render error: {:?}", e),
    }
}

impl Inner {
    fn now(&self) -> f64 {
        self.window
            .performance()
            .map_or_else(js_sys::Date::now, |p| p.now())
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Start => self.schedule_frame(),
            Transition::Stop => self.cancel_frame(),
            Transition::None => {}
        }
    }

    fn schedule_frame(&mut self) {
        if self.frame_id.is_some() {
            return;
        }
        if let Some(callback) = self.animate.borrow().as_ref() {
            self.frame_id = self
                .window
                .request_animation_frame(callback.as_ref().unchecked_ref())
                .ok();
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(id) = self.frame_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
    }

    fn on_frame(&mut self, now: f64) {
        self.frame_id = None;
        if !self.controller.surface().is_animating() {
            return;
        }
        self.schedule_frame();
        let Inner {
            controller, gpu, ..
        } = self;
        controller.frame(now, |batch, camera| {
            if let Some(gpu) = gpu {
                draw(gpu, batch, camera);
            }
        });
    }

    /// Measure the configured size source and push it everywhere
    fn resize_now(&mut self) {
        let window_size = (
            self.window
                .inner_width()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0) as f32,
            self.window
                .inner_height()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0) as f32,
        );
        let parent_size = self
            .canvas
            .parent_element()
            .and_then(|parent| parent.dyn_into::<HtmlElement>().ok())
            .map(|parent| (parent.offset_width() as f32, parent.offset_height() as f32))
            .unwrap_or(window_size);
        let (width, height) = self
            .controller
            .surface()
            .resolve_size(parent_size, window_size);
        let dpr = self.window.device_pixel_ratio() as f32;

        let Some(size) = self.controller.resize(width, height, dpr) else {
            return;
        };
        let (physical_w, physical_h) = size.physical();
        self.canvas.set_width(physical_w);
        self.canvas.set_height(physical_h);
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{}px", width));
        let _ = style.set_property("height", &format!("{}px", height));
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(physical_w, physical_h);
        }
    }

    fn request_resize(&mut self) {
        let now = self.now();
        if !self.controller.surface_mut().request_resize(now) {
            return;
        }
        self.cancel_resize();
        let delay = self.controller.surface().resize_delay_ms() as i32;
        self.arm_resize(delay);
    }

    fn arm_resize(&mut self, delay_ms: i32) {
        if let Some(callback) = &self.resize_done {
            self.resize_timeout = self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    callback.as_ref().unchecked_ref(),
                    delay_ms,
                )
                .ok();
        }
    }

    fn cancel_resize(&mut self) {
        if let Some(id) = self.resize_timeout.take() {
            self.window.clear_timeout_with_handle(id);
        }
    }

    fn finish_resize(&mut self) {
        self.resize_timeout = None;
        let now = self.now();
        if self.controller.surface_mut().poll_resize(now) {
            self.resize_now();
        } else if self.controller.surface().resize_pending() {
            // Timer clock ran slightly ahead of performance.now()
            self.arm_resize(1);
        }
    }

    fn visibility_changed(&mut self) {
        let visible = !self.document.hidden();
        let now = self.now();
        let transition = self.controller.set_document_visible(visible, now);
        self.apply(transition);
    }
}

impl Teardown for Inner {
    /// Stop the loop, drop listeners and GPU state
    fn teardown(&mut self) {
        self.cancel_frame();
        self.cancel_resize();
        if let Some(glue) = self.glue.take() {
            glue.disconnect(&self.window, &self.document);
        }
        self.controller.dispose();
        self.gpu = None;
        self.animate.borrow_mut().take();
        self.resize_done = None;
    }
}

/// Observers and listeners owned by one instance
struct Glue {
    intersection: IntersectionObserver,
    _on_intersect: Closure<dyn FnMut(js_sys::Array)>,
    resize_observer: Option<ResizeObserver>,
    on_resize: Option<Closure<dyn FnMut()>>,
    on_visibility: Closure<dyn FnMut()>,
}

impl Glue {
    fn disconnect(&self, window: &Window, document: &Document) {
        self.intersection.disconnect();
        if let Some(observer) = &self.resize_observer {
            observer.disconnect();
        }
        if let Some(callback) = &self.on_resize {
            let _ = window.remove_event_listener_with_callback("resize", callback.as_ref().unchecked_ref());
        }
        let _ = document.remove_event_listener_with_callback(
            "visibilitychange",
            self.on_visibility.as_ref().unchecked_ref(),
        );
    }
}

fn setup(host: &SharedHost<Inner>) -> Result<RefMut<'_, Inner>> {
    host.try_borrow_mut()
        .ok_or_else(|| BallpitError::SurfaceUnavailable("instance busy during setup".into()))
}

fn js_error(err: JsValue) -> BallpitError {
    BallpitError::SurfaceUnavailable(format!("{:?}", err))
}

fn to_js(err: BallpitError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn style_canvas(canvas: &HtmlCanvasElement) {
    let style = canvas.style();
    for (name, value) in [
        ("display", "block"),
        ("touch-action", "pan-y"),
        ("user-select", "none"),
        ("-webkit-user-select", "none"),
    ] {
        let _ = style.set_property(name, value);
    }
}

// ============================================================================
// JS EXPORT
// ============================================================================

/// One ballpit mounted on a canvas
#[wasm_bindgen]
pub struct Ballpit {
    host: SharedHost<Inner>,
}

#[wasm_bindgen]
impl Ballpit {
    /// Mount on `canvas`; `config_json` uses the camelCase option names
    pub async fn create(
        canvas: HtmlCanvasElement,
        config_json: Option<String>,
    ) -> std::result::Result<Ballpit, JsValue> {
        Self::build(canvas, config_json.as_deref())
            .await
            .map_err(|err| {
                log::error!("ballpit: {}", err);
                to_js(err)
            })
    }

    #[wasm_bindgen(js_name = setCount)]
    pub fn set_count(&self, count: usize) -> std::result::Result<(), JsValue> {
        self.inner()?
            .controller
            .set_particle_count(count)
            .map_err(to_js)
    }

    /// Returns the new paused state
    #[wasm_bindgen(js_name = togglePause)]
    pub fn toggle_pause(&self) -> std::result::Result<bool, JsValue> {
        Ok(self.inner()?.controller.toggle_pause())
    }

    #[wasm_bindgen(js_name = isPaused)]
    pub fn is_paused(&self) -> bool {
        self.inner().is_ok_and(|inner| inner.controller.is_paused())
    }

    #[wasm_bindgen(js_name = particleCount)]
    pub fn particle_count(&self) -> usize {
        self.inner()
            .map(|inner| inner.controller.particle_count())
            .unwrap_or_default()
    }

    /// Sphere centres as a flat xyz array
    #[wasm_bindgen(js_name = particlePositions)]
    pub fn particle_positions(&self) -> Vec<f32> {
        self.inner()
            .ok()
            .and_then(|inner| inner.controller.batch().map(ParticleBatch::positions))
            .unwrap_or_default()
    }

    /// Stop the loop, drop listeners and GPU state; safe to call repeatedly
    ///
    /// Called from inside one of the instance's own callbacks, teardown runs
    /// as soon as that callback returns.
    pub fn dispose(&mut self) {
        self.host.dispose();
    }
}

impl Ballpit {
    fn inner(&self) -> std::result::Result<RefMut<'_, Inner>, JsValue> {
        self.host
            .try_borrow_mut()
            .ok_or_else(|| to_js(BallpitError::SurfaceUnavailable("instance busy".into())))
    }

    async fn build(canvas: HtmlCanvasElement, config_json: Option<&str>) -> Result<Ballpit> {
        let window =
            web_sys::window().ok_or_else(|| BallpitError::SurfaceUnavailable("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| BallpitError::SurfaceUnavailable("no document".into()))?;

        let mut config = match config_json {
            Some(json) => BallpitConfig::from_json(json)?,
            None => BallpitConfig::default(),
        };
        if config.seed.is_none() {
            config.seed = Some(js_sys::Date::now() as u64);
        }
        let options = SurfaceOptions::from_config(&config);
        let material = MaterialUniform::new(&config.material, &config.scattering);
        let controller = BallpitController::new(config, options)?;

        style_canvas(&canvas);

        // WebGPU when the browser has it, WebGL2 otherwise
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference.into(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| BallpitError::NoAdapter)?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let mut inner = Inner {
            window: window.clone(),
            document: document.clone(),
            canvas: canvas.clone(),
            controller,
            gpu: None,
            animate: Rc::new(RefCell::new(None)),
            resize_done: None,
            frame_id: None,
            resize_timeout: None,
            glue: None,
        };

        // First measurement also populates the world
        inner.resize_now();
        let (width, height) = (inner.canvas.width().max(1), inner.canvas.height().max(1));
        inner.gpu =
            Some(SphereRenderState::new(surface, &adapter, width, height, &options, &material).await?);

        let host = SharedHost::new(inner);
        let weak = host.downgrade();
        {
            let mut inner = setup(&host)?;
            let w = weak.clone();
            *inner.animate.borrow_mut() = Some(Closure::new(move |now: f64| {
                w.with(|inner| inner.on_frame(now));
            }));
            let w = weak.clone();
            inner.resize_done = Some(Closure::new(move || w.with(Inner::finish_resize)));
        }

        let on_intersect = {
            let w = weak.clone();
            Closure::<dyn FnMut(js_sys::Array)>::new(move |entries: js_sys::Array| {
                let Ok(entry) = entries.get(0).dyn_into::<IntersectionObserverEntry>() else {
                    return;
                };
                w.with(|inner| {
                    let now = inner.now();
                    let transition = inner.controller.set_intersecting(entry.is_intersecting(), now);
                    inner.apply(transition);
                });
            })
        };
        let intersection =
            IntersectionObserver::new(on_intersect.as_ref().unchecked_ref()).map_err(js_error)?;
        intersection.observe(&canvas);

        let (on_resize, resize_observer) = if options.size.is_tracked() {
            let w = weak.clone();
            let callback = Closure::<dyn FnMut()>::new(move || w.with(Inner::request_resize));
            let _ = window.add_event_listener_with_callback("resize", callback.as_ref().unchecked_ref());
            let observer = match (options.size, canvas.parent_element()) {
                (SizeSource::Parent, Some(parent)) => {
                    let observer =
                        ResizeObserver::new(callback.as_ref().unchecked_ref()).map_err(js_error)?;
                    observer.observe(&parent);
                    Some(observer)
                }
                _ => None,
            };
            (Some(callback), observer)
        } else {
            (None, None)
        };

        let on_visibility = {
            let w = weak.clone();
            Closure::<dyn FnMut()>::new(move || w.with(Inner::visibility_changed))
        };
        let _ = document.add_event_listener_with_callback(
            "visibilitychange",
            on_visibility.as_ref().unchecked_ref(),
        );

        let glue = Glue {
            intersection,
            _on_intersect: on_intersect,
            resize_observer,
            on_resize,
            on_visibility,
        };

        let hooks = PointerHooks::new()
            .on_move({
                let w = weak.clone();
                move |state: &PointerState| {
                    w.with(|inner| inner.controller.pointer_moved(state.n_position))
                }
            })
            .on_leave({
                let w = weak.clone();
                move |_: &PointerState| w.with(|inner| inner.controller.pointer_left())
            })
            .on_click(|state: &PointerState| log::debug!("ballpit click at {:?}", state.position));
        let bounds = {
            let canvas = canvas.clone();
            move || {
                let r = canvas.get_bounding_client_rect();
                Rect::new(r.left() as f32, r.top() as f32, r.width() as f32, r.height() as f32)
            }
        };
        let key = SurfaceKey(NEXT_KEY.with(|next| {
            let key = next.get();
            next.set(key + 1);
            key
        }));
        let registration = match BROKER.with(|broker| broker.register(key, bounds, hooks)) {
            Ok(registration) => registration,
            Err(err) => {
                glue.disconnect(&window, &document);
                return Err(err);
            }
        };

        {
            let mut inner = setup(&host)?;
            inner.glue = Some(glue);
            inner.controller.attach_pointer(registration);
            let now = inner.now();
            let visible = !inner.document.hidden();
            inner.controller.set_document_visible(visible, now);
            let transition = inner.controller.surface_mut().observe(now);
            inner.apply(transition);
        }

        log::info!("Ballpit running");
        Ok(Ballpit { host })
    }
}

impl Drop for Ballpit {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Sphere count the page uses for a viewport of `width` CSS pixels
#[wasm_bindgen(js_name = recommendedCount)]
pub fn recommended_count(width: f32) -> usize {
    config::recommended_count(width)
}

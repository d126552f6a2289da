//! Shared pointer routing
//!
//! One set of document-level pointer/touch listeners feeds every registered
//! surface. The broker keeps a record per surface (position, hover, touch)
//! and fires that surface's hooks as the pointer enters, moves over, clicks
//! on and leaves its rectangle. Listeners are attached on the first
//! registration and detached when the last one goes away.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::Vec2;

use crate::error::{BallpitError, Result};

/// Identity of a registered surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceKey(pub u64);

/// Client-space rectangle of a surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Inclusive on every edge
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left
            && p.x <= self.left + self.width
            && p.y >= self.top
            && p.y <= self.top + self.height
    }

    /// Element-local position and its -1..1 normalized form (Y up)
    pub fn local(&self, p: Vec2) -> (Vec2, Vec2) {
        let local = Vec2::new(p.x - self.left, p.y - self.top);
        let normalized = Vec2::new(
            (local.x / self.width) * 2.0 - 1.0,
            (-local.y / self.height) * 2.0 + 1.0,
        );
        (local, normalized)
    }
}

/// Per-surface interaction state handed to hooks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    /// Element-local position in CSS pixels
    pub position: Vec2,
    /// Normalized position, -1..1 on both axes, Y up
    pub n_position: Vec2,
    pub hover: bool,
    pub touching: bool,
}

/// Raw document-level input, in client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Move { x: f32, y: f32 },
    /// Pointer left the document
    Leave,
    Click { x: f32, y: f32 },
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    /// Touch end or cancel
    TouchEnd,
}

pub type Hook = Box<dyn FnMut(&PointerState)>;

/// Callbacks for one surface; unset hooks are skipped
#[derive(Default)]
pub struct PointerHooks {
    pub on_enter: Option<Hook>,
    pub on_move: Option<Hook>,
    pub on_click: Option<Hook>,
    pub on_leave: Option<Hook>,
}

impl PointerHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter(mut self, f: impl FnMut(&PointerState) + 'static) -> Self {
        self.on_enter = Some(Box::new(f));
        self
    }

    pub fn on_move(mut self, f: impl FnMut(&PointerState) + 'static) -> Self {
        self.on_move = Some(Box::new(f));
        self
    }

    pub fn on_click(mut self, f: impl FnMut(&PointerState) + 'static) -> Self {
        self.on_click = Some(Box::new(f));
        self
    }

    pub fn on_leave(mut self, f: impl FnMut(&PointerState) + 'static) -> Self {
        self.on_leave = Some(Box::new(f));
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum HookKind {
    Enter,
    Move,
    Click,
    Leave,
}

/// Installs and removes the document-level listeners
///
/// The broker calls `attach` when its first surface registers and `detach`
/// when the last one is disposed; never twice in a row.
pub trait EventSource {
    fn attach(&mut self, broker: WeakPointerBroker);
    fn detach(&mut self);
}

struct Record {
    key: SurfaceKey,
    bounds: Box<dyn Fn() -> Rect>,
    state: Cell<PointerState>,
    hooks: RefCell<PointerHooks>,
    live: Cell<bool>,
}

impl Record {
    fn update_position(&self, rect: &Rect, pointer: Vec2) {
        let (position, n_position) = rect.local(pointer);
        let mut state = self.state.get();
        state.position = position;
        state.n_position = n_position;
        self.state.set(state);
    }

    fn modify(&self, f: impl FnOnce(&mut PointerState)) {
        let mut state = self.state.get();
        f(&mut state);
        self.state.set(state);
    }

    /// Run one hook; skipped once the record is disposed or when re-entered
    fn fire(&self, kind: HookKind) {
        if !self.live.get() {
            return;
        }
        let state = self.state.get();
        let Ok(mut hooks) = self.hooks.try_borrow_mut() else {
            log::warn!("pointer hook re-entered for {:?}, skipping", self.key);
            return;
        };
        let hook = match kind {
            HookKind::Enter => hooks.on_enter.as_mut(),
            HookKind::Move => hooks.on_move.as_mut(),
            HookKind::Click => hooks.on_click.as_mut(),
            HookKind::Leave => hooks.on_leave.as_mut(),
        };
        if let Some(hook) = hook {
            hook(&state);
        }
    }
}

struct Shared {
    records: RefCell<Vec<Rc<Record>>>,
    source: RefCell<Box<dyn EventSource>>,
    attached: Cell<bool>,
}

impl Shared {
    fn remove(self: &Rc<Self>, key: SurfaceKey) -> bool {
        let removed = {
            let mut records = self.records.borrow_mut();
            let before = records.len();
            records.retain(|record| {
                if record.key == key {
                    record.live.set(false);
                    false
                } else {
                    true
                }
            });
            before != records.len()
        };

        if removed && self.records.borrow().is_empty() && self.attached.get() {
            self.attached.set(false);
            self.source.borrow_mut().detach();
            log::debug!("pointer listeners detached");
        }
        removed
    }
}

/// Reference-counted registry of interactive surfaces
#[derive(Clone)]
pub struct PointerBroker {
    shared: Rc<Shared>,
}

/// Non-owning broker handle held by listeners
#[derive(Clone)]
pub struct WeakPointerBroker {
    shared: Weak<Shared>,
}

impl WeakPointerBroker {
    pub fn upgrade(&self) -> Option<PointerBroker> {
        self.shared.upgrade().map(|shared| PointerBroker { shared })
    }

    /// Forward an event if the broker is still alive
    pub fn dispatch(&self, event: PointerEvent) {
        if let Some(broker) = self.upgrade() {
            broker.dispatch(event);
        }
    }
}

impl PointerBroker {
    pub fn new(source: impl EventSource + 'static) -> Self {
        Self {
            shared: Rc::new(Shared {
                records: RefCell::new(Vec::new()),
                source: RefCell::new(Box::new(source)),
                attached: Cell::new(false),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakPointerBroker {
        WeakPointerBroker {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.shared.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the document-level listeners are currently installed
    pub fn attached(&self) -> bool {
        self.shared.attached.get()
    }

    /// Current interaction state of a surface
    pub fn state(&self, key: SurfaceKey) -> Option<PointerState> {
        self.shared
            .records
            .borrow()
            .iter()
            .find(|record| record.key == key)
            .map(|record| record.state.get())
    }

    /// Start routing pointer input to a surface
    ///
    /// `bounds` is queried on every event so the rectangle tracks layout
    /// and scrolling.
    pub fn register(
        &self,
        key: SurfaceKey,
        bounds: impl Fn() -> Rect + 'static,
        hooks: PointerHooks,
    ) -> Result<Registration> {
        {
            let mut records = self.shared.records.borrow_mut();
            if records.iter().any(|record| record.key == key) {
                return Err(BallpitError::AlreadyRegistered(key));
            }
            records.push(Rc::new(Record {
                key,
                bounds: Box::new(bounds),
                state: Cell::new(PointerState::default()),
                hooks: RefCell::new(hooks),
                live: Cell::new(true),
            }));
        }

        if !self.shared.attached.get() {
            self.shared.attached.set(true);
            self.shared.source.borrow_mut().attach(self.downgrade());
            log::debug!("pointer listeners attached");
        }

        Ok(Registration {
            key,
            broker: Rc::downgrade(&self.shared),
            disposed: false,
        })
    }

    /// Route one document-level event to every registered surface
    ///
    /// Hooks run without any broker borrow held, so they may register or
    /// dispose surfaces (their own included) mid-dispatch.
    pub fn dispatch(&self, event: PointerEvent) {
        let records: Vec<Rc<Record>> = self.shared.records.borrow().clone();

        match event {
            PointerEvent::Move { x, y } => {
                let pointer = Vec2::new(x, y);
                for record in &records {
                    let rect = (record.bounds)();
                    let state = record.state.get();
                    if rect.contains(pointer) {
                        record.update_position(&rect, pointer);
                        if !state.hover {
                            record.modify(|s| s.hover = true);
                            record.fire(HookKind::Enter);
                        }
                        record.fire(HookKind::Move);
                    } else if state.hover && !state.touching {
                        record.modify(|s| s.hover = false);
                        record.fire(HookKind::Leave);
                    }
                }
            }
            PointerEvent::Leave => {
                for record in &records {
                    if record.state.get().hover {
                        record.modify(|s| s.hover = false);
                        record.fire(HookKind::Leave);
                    }
                }
            }
            PointerEvent::Click { x, y } => {
                let pointer = Vec2::new(x, y);
                for record in &records {
                    let rect = (record.bounds)();
                    record.update_position(&rect, pointer);
                    if rect.contains(pointer) {
                        record.fire(HookKind::Click);
                    }
                }
            }
            PointerEvent::TouchStart { x, y } => {
                let pointer = Vec2::new(x, y);
                for record in &records {
                    let rect = (record.bounds)();
                    if rect.contains(pointer) {
                        record.modify(|s| s.touching = true);
                        record.update_position(&rect, pointer);
                        if !record.state.get().hover {
                            record.modify(|s| s.hover = true);
                            record.fire(HookKind::Enter);
                        }
                        record.fire(HookKind::Move);
                    }
                }
            }
            PointerEvent::TouchMove { x, y } => {
                let pointer = Vec2::new(x, y);
                for record in &records {
                    let rect = (record.bounds)();
                    record.update_position(&rect, pointer);
                    let state = record.state.get();
                    if rect.contains(pointer) {
                        if !state.hover {
                            record.modify(|s| {
                                s.hover = true;
                                s.touching = true;
                            });
                            record.fire(HookKind::Enter);
                        }
                        record.fire(HookKind::Move);
                    } else if state.hover && state.touching {
                        // Dragged out mid-touch: keep tracking until lift-off
                        record.fire(HookKind::Move);
                    }
                }
            }
            PointerEvent::TouchEnd => {
                for record in &records {
                    let state = record.state.get();
                    if state.touching {
                        record.modify(|s| s.touching = false);
                        if state.hover {
                            record.modify(|s| s.hover = false);
                            record.fire(HookKind::Leave);
                        }
                    }
                }
            }
        }
    }
}

/// Handle for one registered surface; disposing (or dropping) unregisters it
pub struct Registration {
    key: SurfaceKey,
    broker: Weak<Shared>,
    disposed: bool,
}

impl Registration {
    pub fn key(&self) -> SurfaceKey {
        self.key
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Remove the surface from the broker; later calls do nothing
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(shared) = self.broker.upgrade() {
            shared.remove(self.key);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Event source that only counts attach/detach calls
///
/// Used by headless runs and tests in place of document listeners.
#[derive(Debug, Clone, Default)]
pub struct CountingSource {
    attaches: Rc<Cell<usize>>,
    detaches: Rc<Cell<usize>>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attaches(&self) -> usize {
        self.attaches.get()
    }

    pub fn detaches(&self) -> usize {
        self.detaches.get()
    }

    /// Listener sets currently installed (0 or 1)
    pub fn active(&self) -> usize {
        self.attaches.get() - self.detaches.get()
    }
}

impl EventSource for CountingSource {
    fn attach(&mut self, _broker: WeakPointerBroker) {
        self.attaches.set(self.attaches.get() + 1);
    }

    fn detach(&mut self) {
        self.detaches.set(self.detaches.get() + 1);
    }
}

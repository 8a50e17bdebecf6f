use std::cell::RefCell;
use std::rc::Rc;

use console_error_panic_hook::set_once;
use gloo_events::{EventListener, EventListenerOptions};
use gloo_render::{AnimationFrame, request_animation_frame};
use runtime::FrameHandle;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlCanvasElement, HtmlElement, MouseEvent, TouchEvent};

use crate::asset::fetch_model;
use crate::config::ViewerConfig;
use crate::device::DeviceProfile;
use crate::session::{DisplaySurface, LoadCallback, ViewerSession};
use crate::surface::SurfaceSize;
use crate::wgpu::WgpuContext;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    console_log::init_with_level(log::Level::Debug)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(())
}

/// Pending `requestAnimationFrame`. Dropping the gloo handle cancels it.
struct RafHandle(AnimationFrame);

impl FrameHandle for RafHandle {
    fn cancel(self) {
        drop(self.0);
    }
}

struct CanvasSurface {
    canvas: HtmlCanvasElement,
}

impl DisplaySurface for CanvasSurface {
    fn set_size(&mut self, size: SurfaceSize) {
        self.canvas.set_width(size.backing_width());
        self.canvas.set_height(size.backing_height());
    }

    fn reveal(&mut self) {
        if let Err(err) = self.canvas.style().set_property("opacity", "1") {
            log::warn!("failed to reveal canvas: {err:?}");
        }
    }
}

type WebSession = ViewerSession<WgpuContext, CanvasSurface, RafHandle>;

struct Shared {
    session: RefCell<WebSession>,
    container: HtmlElement,
    canvas: HtmlCanvasElement,
    listeners: RefCell<Vec<EventListener>>,
}

/// Options object accepted from JavaScript:
/// `{ onLoad?: () => void, modelUrl?: string, config?: object | string }`.
struct ViewerOptions {
    on_load: Option<LoadCallback>,
    config: ViewerConfig,
}

impl ViewerOptions {
    fn read(options: Option<&js_sys::Object>) -> Result<Self, JsValue> {
        let Some(options) = options else {
            return Ok(Self {
                on_load: None,
                config: ViewerConfig::default(),
            });
        };
        let get = |key: &str| js_sys::Reflect::get(options, &JsValue::from_str(key));

        let on_load = get("onLoad")?
            .dyn_into::<js_sys::Function>()
            .ok()
            .map(|callback| -> LoadCallback {
                Box::new(move || {
                    if let Err(err) = callback.call0(&JsValue::NULL) {
                        log::error!("onLoad callback threw: {err:?}");
                    }
                })
            });

        let raw = get("config")?;
        let mut config = if raw.is_undefined() || raw.is_null() {
            ViewerConfig::default()
        } else {
            let json = match raw.as_string() {
                Some(json) => json,
                None => String::from(js_sys::JSON::stringify(&raw)?),
            };
            ViewerConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        if let Some(url) = get("modelUrl")?.as_string() {
            config.asset.url = url;
            config
                .validate()
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
        }

        Ok(Self { on_load, config })
    }
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or(0.0, |p| p.now())
}

fn container_size(container: &HtmlElement) -> (f64, f64) {
    (
        container.client_width() as f64,
        container.client_height() as f64,
    )
}

fn touch_points(event: &TouchEvent) -> Vec<(f64, f64)> {
    let list = event.touches();
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|t| (t.client_x() as f64, t.client_y() as f64))
        .collect()
}

fn schedule_frame(shared: &Rc<Shared>) {
    let weak = Rc::downgrade(shared);
    let handle = request_animation_frame(move |timestamp| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let running = shared.session.borrow_mut().tick(timestamp);
        if running {
            schedule_frame(&shared);
        }
    });
    shared.session.borrow_mut().schedule(RafHandle(handle));
}

fn start_gpu(shared: &Rc<Shared>) {
    let weak = Rc::downgrade(shared);
    let canvas = shared.canvas.clone();
    spawn_local(async move {
        let context = match WgpuContext::new(canvas).await {
            Ok(context) => context,
            Err(err) => {
                log::error!("gpu initialization failed: {err}");
                return;
            }
        };
        if let Some(shared) = weak.upgrade() {
            shared.session.borrow_mut().attach_draw_context(context);
        }
    });
}

fn start_load(shared: &Rc<Shared>) {
    let weak = Rc::downgrade(shared);
    let (url, token) = {
        let session = shared.session.borrow();
        (session.config().asset.url.clone(), session.dispose_token())
    };
    spawn_local(async move {
        let result = fetch_model(&url).await;
        if token.is_disposed() {
            log::debug!("model {url} arrived after dispose");
            return;
        }
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let callback = shared.session.borrow_mut().complete_load(result, now_ms());
        if let Some(callback) = callback {
            callback();
        }
    });
}

fn install_listeners(shared: &Rc<Shared>, window: &web_sys::Window) {
    let mut listeners = Vec::new();
    let container = shared.container.clone();

    let weak = Rc::downgrade(shared);
    listeners.push(EventListener::new(window, "resize", move |_event: &Event| {
        let (Some(shared), Some(window)) = (weak.upgrade(), web_sys::window()) else {
            return;
        };
        let (width, height) = container_size(&shared.container);
        let device = DeviceProfile::from_window(&window);
        shared.session.borrow_mut().resize(width, height, device);
    }));

    let weak = Rc::downgrade(shared);
    listeners.push(EventListener::new(&container, "mousedown", move |event: &Event| {
        let (Some(shared), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        shared
            .session
            .borrow_mut()
            .pointer_down(event.client_x() as f64, event.client_y() as f64);
    }));

    let weak = Rc::downgrade(shared);
    listeners.push(EventListener::new(&container, "mousemove", move |event: &Event| {
        let (Some(shared), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        shared
            .session
            .borrow_mut()
            .pointer_move(event.client_x() as f64, event.client_y() as f64);
    }));

    for name in ["mouseup", "mouseleave"] {
        let weak = Rc::downgrade(shared);
        listeners.push(EventListener::new(&container, name, move |_event: &Event| {
            if let Some(shared) = weak.upgrade() {
                shared.session.borrow_mut().pointer_up();
            }
        }));
    }

    let weak = Rc::downgrade(shared);
    listeners.push(EventListener::new(&container, "touchstart", move |event: &Event| {
        let (Some(shared), Some(event)) = (weak.upgrade(), event.dyn_ref::<TouchEvent>()) else {
            return;
        };
        shared.session.borrow_mut().touch_start(&touch_points(event));
    }));

    // Non-passive so an active drag can keep the page from scrolling.
    let weak = Rc::downgrade(shared);
    listeners.push(EventListener::new_with_options(
        &container,
        "touchmove",
        EventListenerOptions::enable_prevent_default(),
        move |event: &Event| {
            let (Some(shared), Some(touch)) = (weak.upgrade(), event.dyn_ref::<TouchEvent>())
            else {
                return;
            };
            if shared.session.borrow_mut().touch_move(&touch_points(touch)) {
                event.prevent_default();
            }
        },
    ));

    for name in ["touchend", "touchcancel"] {
        let weak = Rc::downgrade(shared);
        listeners.push(EventListener::new(&container, name, move |_event: &Event| {
            if let Some(shared) = weak.upgrade() {
                shared.session.borrow_mut().touch_end();
            }
        }));
    }

    *shared.listeners.borrow_mut() = listeners;
}

/// Interactive model viewer mounted into a caller-provided container.
#[wasm_bindgen]
pub struct ModelViewer {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl ModelViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(container: HtmlElement, options: Option<js_sys::Object>) -> Result<ModelViewer, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document missing"))?;
        let options = ViewerOptions::read(options.as_ref())?;

        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        let style = canvas.style();
        style.set_property("display", "block")?;
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("opacity", "0")?;
        style.set_property("transition", "opacity 0.6s ease")?;
        container.append_child(&canvas)?;

        let (width, height) = container_size(&container);
        let mut session = ViewerSession::new(
            options.config,
            DeviceProfile::from_window(&window),
            CanvasSurface {
                canvas: canvas.clone(),
            },
            width,
            height,
        );
        if let Some(on_load) = options.on_load {
            session.set_on_load(on_load);
        }
        log::info!("model viewer mounted at {width}x{height}");

        let shared = Rc::new(Shared {
            session: RefCell::new(session),
            container,
            canvas,
            listeners: RefCell::new(Vec::new()),
        });
        install_listeners(&shared, &window);
        schedule_frame(&shared);
        start_gpu(&shared);
        start_load(&shared);

        Ok(ModelViewer { shared })
    }

    /// Stop rendering, release GPU resources and detach from the page.
    /// Safe to call more than once.
    pub fn dispose(&self) {
        let disposed = self.shared.session.borrow_mut().dispose();
        self.shared.listeners.borrow_mut().clear();
        if disposed {
            self.shared.canvas.remove();
        }
    }
}

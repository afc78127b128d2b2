use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};

use controller::{ClickOutcome, MapConfig, MapController, Viewport, fetch_dataset};
use results::{CardRenderer, CardStatus, RenderRequest, RenderedBatch};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

mod draw;
mod net;

use net::{DomImageLoader, HttpFetcher, HttpTaxonLookup, WindowTimer, js_error};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Pointer travel (px) below which a press-release counts as a click.
const CLICK_SLOP_PX: f64 = 4.0;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&JsValue::from_str(&format!($($t)*))))
}

macro_rules! console_error {
    ($($t:tt)*) => (web_sys::console::error_1(&JsValue::from_str(&format!($($t)*))))
}

#[derive(Debug, Default, Copy, Clone)]
struct Drag {
    start: [f64; 2],
    last: [f64; 2],
    moved: bool,
}

#[derive(Default)]
struct HostState {
    controller: Option<MapController>,
    canvas: Option<HtmlCanvasElement>,
    ctx: Option<CanvasRenderingContext2d>,
    panel: Option<HtmlElement>,
    drag: Option<Drag>,
}

thread_local! {
    static STATE: RefCell<HostState> = RefCell::new(HostState::default());
}

/// TLS access that yields the default on teardown instead of panicking.
fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&RefCell<HostState>) -> R,
    R: Default,
{
    STATE.try_with(f).unwrap_or_default()
}

fn with_controller<F, R>(f: F) -> R
where
    F: FnOnce(&mut MapController) -> R,
    R: Default,
{
    with_state(|state| state.borrow_mut().controller.as_mut().map(f).unwrap_or_default())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    console_error_panic_hook::set_once();
    Ok(())
}

/// Binds `#map` and `#results`, then starts the one-time dataset load.
///
/// `config_json` is an optional camelCase [`MapConfig`] overlay.
#[wasm_bindgen]
pub fn init_map(config_json: Option<String>) -> Result<(), JsValue> {
    let config: MapConfig = match config_json.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            serde_json::from_str(raw).map_err(|e| JsValue::from_str(&format!("config: {e}")))?
        }
        _ => MapConfig::default(),
    };
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id("map")
        .ok_or_else(|| JsValue::from_str("missing #map"))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    let panel = document
        .get_element_by_id("results")
        .ok_or_else(|| JsValue::from_str("missing #results"))?
        .dyn_into::<HtmlElement>()?;

    let viewport = Viewport::new(canvas.width() as f64, canvas.height() as f64);
    let dataset_url = config.dataset_url.clone();

    with_state(|state| {
        let mut s = state.borrow_mut();
        s.controller = Some(MapController::new(config, viewport));
        s.canvas = Some(canvas);
        s.ctx = Some(ctx);
        s.panel = Some(panel);
    });
    sync_panel();
    render();

    spawn_local(async move {
        match fetch_dataset(&HttpFetcher, &dataset_url).await {
            Ok(dataset) => {
                console_log!("loaded {} recordings from {dataset_url}", dataset.len());
                let rejected = with_controller(|c| c.load_dataset(dataset).err());
                if let Some(err) = rejected {
                    console_error!("{err}");
                }
            }
            Err(err) => {
                console_error!("{err}");
                with_controller(|c| c.fail_dataset(err.to_string()));
            }
        }
        sync_panel();
        render();
    });
    Ok(())
}

/// Redraws the canvas from the controller.
#[wasm_bindgen]
pub fn render() {
    with_state(|state| {
        let mut s = state.borrow_mut();
        let HostState {
            controller, ctx, ..
        } = &mut *s;
        if let (Some(controller), Some(ctx)) = (controller.as_mut(), ctx.as_ref()) {
            draw::draw_map(ctx, controller);
        }
    });
}

fn sync_panel() {
    let snapshot = with_state(|state| {
        let s = state.borrow();
        let controller = s.controller.as_ref()?;
        let panel = s.panel.clone()?;
        Some((panel, controller.panel().to_html(), controller.panel().opacity()))
    });
    if let Some((panel, html, opacity)) = snapshot {
        panel.set_inner_html(&html);
        let _ = panel.style().set_property("opacity", &opacity.to_string());
    }
}

/// Advances the view animation. Returns `true` while another frame is
/// needed.
#[wasm_bindgen]
pub fn map_frame(now_ms: f64) -> bool {
    let finished = with_controller(|c| c.tick(now_ms));
    if finished {
        map_move_end();
    } else {
        render();
    }
    with_controller(|c| c.is_animating())
}

#[wasm_bindgen]
pub fn map_move_end() {
    with_controller(|c| c.move_end());
    sync_panel();
    render();
}

#[wasm_bindgen]
pub fn map_pointer_down(x: f64, y: f64) {
    with_state(|state| {
        state.borrow_mut().drag = Some(Drag {
            start: [x, y],
            last: [x, y],
            moved: false,
        });
    });
}

#[wasm_bindgen]
pub fn map_pointer_move(x: f64, y: f64) {
    let delta = with_state(|state| {
        let mut s = state.borrow_mut();
        let drag = s.drag.as_mut()?;
        if !drag.moved {
            let dx = x - drag.start[0];
            let dy = y - drag.start[1];
            drag.moved = dx * dx + dy * dy > CLICK_SLOP_PX * CLICK_SLOP_PX;
        }
        let delta = [x - drag.last[0], y - drag.last[1]];
        drag.last = [x, y];
        drag.moved.then_some(delta)
    });
    if let Some([dx, dy]) = delta {
        with_controller(|c| c.pan_by(dx, dy));
        render();
    }
}

/// Ends a press: a drag finishes the move, anything else is a click.
/// Returns `true` when the click started a view animation.
#[wasm_bindgen]
pub fn map_pointer_up(x: f64, y: f64) -> bool {
    let drag = with_state(|state| state.borrow_mut().drag.take());
    match drag {
        Some(drag) if drag.moved => {
            map_move_end();
            false
        }
        _ => map_click(x, y),
    }
}

/// Returns `true` when the click started a view animation.
#[wasm_bindgen]
pub fn map_click(x: f64, y: f64) -> bool {
    let outcome = with_controller(|c| Some(c.click([x, y]))).unwrap_or(ClickOutcome::Ignored);
    match outcome {
        ClickOutcome::Ignored => false,
        ClickOutcome::ZoomToExtent(_) => true,
        ClickOutcome::ShowResults { request, .. } => {
            sync_panel();
            spawn_render(request);
            true
        }
    }
}

fn spawn_render(request: RenderRequest) {
    let Some(config) = with_controller(|c| Some(c.config().clone())) else {
        return;
    };
    spawn_local(async move {
        let renderer = CardRenderer::new(
            HttpTaxonLookup {
                endpoint: config.taxa_endpoint.clone(),
            },
            DomImageLoader,
            WindowTimer,
            config.renderer_config(),
        );
        let batch = renderer.render_batch(request).await;
        for note in degraded_cards(&batch) {
            console_log!("{note}");
        }
        if with_controller(|c| c.complete_render(batch)) {
            sync_panel();
        }
    });
}

/// One line per card that did not resolve its species photo.
fn degraded_cards(batch: &RenderedBatch) -> Vec<String> {
    batch
        .cards
        .iter()
        .filter_map(|card| {
            let what = match card.status {
                CardStatus::Complete => return None,
                CardStatus::Fallback => "using the default image",
                CardStatus::TimedOut => "timed out",
            };
            Some(format!(
                "card for {} (feature {}) {what}",
                card.scientific_name, card.feature_index
            ))
        })
        .collect()
}

#[wasm_bindgen]
pub fn map_zoom_at(x: f64, y: f64, wheel_delta_y: f64) -> Result<(), JsValue> {
    if !x.is_finite() || !y.is_finite() || !wheel_delta_y.is_finite() {
        return Err(JsValue::from_str("map_zoom_at args must be finite"));
    }
    let delta = (-wheel_delta_y * 0.002).clamp(-1.0, 1.0);
    with_controller(|c| c.zoom_by(delta, [x, y]));
    map_move_end();
    Ok(())
}

#[wasm_bindgen]
pub fn map_resize(width_px: f64, height_px: f64) {
    with_state(|state| {
        let mut s = state.borrow_mut();
        if let Some(canvas) = s.canvas.as_ref() {
            canvas.set_width(width_px.max(1.0) as u32);
            canvas.set_height(height_px.max(1.0) as u32);
        }
        if let Some(c) = s.controller.as_mut() {
            c.resize(Viewport::new(width_px, height_px));
        }
    });
    render();
}

/// Toggles fullscreen on the map canvas' parent.
#[wasm_bindgen]
pub fn toggle_fullscreen() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    if document.fullscreen_element().is_some() {
        document.exit_fullscreen();
        return Ok(());
    }
    let target = with_state(|state| {
        let s = state.borrow();
        s.canvas.as_ref().and_then(|c| c.parent_element())
    })
    .ok_or_else(|| JsValue::from_str("map not initialized"))?;
    target.request_fullscreen().map_err(|e| {
        console_error!("fullscreen: {}", js_error(&e));
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use results::ResultCard;

    fn card(index: usize, name: &str, status: CardStatus) -> ResultCard {
        ResultCard {
            feature_index: index,
            image: "./img/default_bird.png".to_string(),
            scientific_name: name.to_string(),
            common_name: String::new(),
            date: String::new(),
            audio: String::new(),
            creator: String::new(),
            source_url: String::new(),
            asset_id: String::new(),
            status,
        }
    }

    #[test]
    fn only_degraded_cards_are_reported() {
        let batch = RenderedBatch {
            generation: 1,
            cards: vec![
                card(0, "Turdus migratorius", CardStatus::Complete),
                card(3, "Cardinalis cardinalis", CardStatus::Fallback),
                card(7, "Troglodytes aedon", CardStatus::TimedOut),
            ],
        };
        assert_eq!(
            degraded_cards(&batch),
            vec![
                "card for Cardinalis cardinalis (feature 3) using the default image".to_string(),
                "card for Troglodytes aedon (feature 7) timed out".to_string(),
            ]
        );
    }
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use upbeat_shared::colors::{
    owned_tile_color, player_color, shade, terrain_color, to_hex, HEX_BORDER,
};
use upbeat_shared::{GridAddress, HexLayout, MapCell, MapCellIndex, Viewport, ZoomDirection};

use crate::app::Selected;
use crate::colors::rgba_css;
use crate::render_loop::FrameScheduler;

const BACKGROUND: &str = "#1b2a1a";
/// Pointer travel below this many CSS pixels still counts as a click.
const CLICK_SLOP_PX: f64 = 5.0;
const ARROW_PAN_PX: f64 = 50.0;

struct KeydownBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

fn unbind_window_listeners() {
    KEYDOWN_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("keydown", old._handler.as_ref().unchecked_ref());
        }
    });
    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("resize", old._handler.as_ref().unchecked_ref());
        }
    });
}

/// CSS size of the canvas container, or the window size before mount.
fn container_size(canvas: Option<&HtmlCanvasElement>) -> (f64, f64) {
    if let Some(parent) = canvas.and_then(|c| c.parent_element()) {
        let w = parent.client_width() as f64;
        let h = parent.client_height() as f64;
        if w > 0.0 && h > 0.0 {
            return (w, h);
        }
    }
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

/// Pointer position relative to the canvas' top-left corner.
fn local_point(canvas: Option<&HtmlCanvasElement>, e: &MouseEvent) -> (f64, f64) {
    canvas
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (
                e.client_x() as f64 - rect.left(),
                e.client_y() as f64 - rect.top(),
            )
        })
        .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
}

fn trace_hex(ctx: &CanvasRenderingContext2d, corners: &[(f64, f64); 6]) {
    ctx.begin_path();
    ctx.move_to(corners[0].0, corners[0].1);
    for &(x, y) in &corners[1..] {
        ctx.line_to(x, y);
    }
    ctx.close_path();
}

fn draw_cell(
    ctx: &CanvasRenderingContext2d,
    layout: &HexLayout,
    cell: &MapCell,
    selected: bool,
    scale: f64,
) {
    let corners = layout.corners(cell.address);
    let fill = match (cell.is_owned(), cell.is_city_center) {
        (true, true) => shade(owned_tile_color(cell.owner_id), -0.08),
        (true, false) => owned_tile_color(cell.owner_id),
        (false, _) => terrain_color(cell.terrain()),
    };

    trace_hex(ctx, &corners);
    ctx.set_fill_style_str(&to_hex(fill));
    ctx.fill();
    ctx.set_stroke_style_str(&to_hex(HEX_BORDER));
    ctx.set_line_width(1.0 / scale);
    ctx.stroke();

    if let Some(owner) = player_color(cell.owner_id) {
        // Inset outline in the owner's color.
        let (cx, cy) = layout.center(cell.address);
        let inset = corners.map(|(x, y)| (cx + (x - cx) * 0.86, cy + (y - cy) * 0.86));
        trace_hex(ctx, &inset);
        ctx.set_stroke_style_str(&rgba_css(owner, 0.9));
        ctx.set_line_width(3.0);
        ctx.stroke();

        if cell.is_city_center {
            let radius = layout.hex_width * 0.16;
            ctx.begin_path();
            ctx.arc(cx, cy, radius, 0.0, std::f64::consts::TAU).ok();
            ctx.set_fill_style_str(&to_hex(owner));
            ctx.fill();
            ctx.set_stroke_style_str("#ffffff");
            ctx.set_line_width(2.0);
            ctx.stroke();
        }
    }

    if selected {
        trace_hex(ctx, &corners);
        ctx.set_stroke_style_str("rgba(255,255,255,0.95)");
        ctx.set_line_width(3.0 / scale);
        ctx.stroke();
    }
}

fn paint_map(
    ctx: &CanvasRenderingContext2d,
    css_w: f64,
    css_h: f64,
    layout: &HexLayout,
    vp: &Viewport,
    index: &MapCellIndex,
    selected: Option<GridAddress>,
) {
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, css_w, css_h);

    ctx.save();
    ctx.translate(vp.offset_x, vp.offset_y).ok();
    ctx.scale(vp.scale, vp.scale).ok();

    // Skip hexes whose box lies fully off screen.
    let (min_x, min_y) = vp.screen_to_world(0.0, 0.0);
    let (max_x, max_y) = vp.screen_to_world(css_w, css_h);
    let w = layout.hex_width;
    let h = layout.hex_height();
    for cell in index.cells() {
        let (x, y) = layout.anchor(cell.address);
        if x + w < min_x || x > max_x || y + h < min_y || y > max_y {
            continue;
        }
        draw_cell(ctx, layout, cell, selected == Some(cell.address), vp.scale);
    }

    ctx.restore();
}

/// The hex map: Canvas 2D rendering plus pan, zoom and cell selection.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let viewport: RwSignal<Viewport> = expect_context();
    let index: RwSignal<MapCellIndex> = expect_context();
    let layout: HexLayout = expect_context();
    let Selected(selected) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Cached 2D context (invalidated when the backing store is resized)
    let paint_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));
    let press_x = Rc::new(Cell::new(0.0f64));
    let press_y = Rc::new(Cell::new(0.0f64));
    let centered = Rc::new(Cell::new(false));

    let scheduler = Rc::new(FrameScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let (css_w, css_h) = container_size(Some(canvas));
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .max(1.0);
        let backing_w = (css_w * dpr).round() as u32;
        let backing_h = (css_h * dpr).round() as u32;
        if canvas.width() != backing_w || canvas.height() != backing_h {
            canvas.set_width(backing_w);
            canvas.set_height(backing_h);
            paint_ctx.borrow_mut().take();
        }

        let ctx = {
            let mut slot = paint_ctx.borrow_mut();
            if slot.is_none() {
                *slot = canvas
                    .get_context("2d")
                    .ok()
                    .flatten()
                    .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
            }
            let Some(ctx) = slot.clone() else {
                return;
            };
            ctx
        };
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

        let vp = viewport.get_untracked();
        let current = selected.get_untracked();
        index.with_untracked(|index| {
            paint_map(&ctx, css_w, css_h, &layout, &vp, index, current);
        });
    }));

    // Center the grid the first time a map arrives.
    Effect::new(move || {
        let (rows, cols) = index.with(|i| (i.rows(), i.cols()));
        if rows == 0 || cols == 0 || centered.get() {
            return;
        }
        let canvas = canvas_ref.get_untracked();
        let (cw, ch) = container_size(canvas.as_ref());
        viewport.update(|vp| vp.center_on(rows, cols, &layout, cw, ch));
        centered.set(true);
    });

    // Repaint on any map, viewport or selection change.
    let sched_fx = scheduler.clone();
    Effect::new(move || {
        index.track();
        viewport.track();
        selected.track();
        sched_fx.request();
    });

    // Window listeners: resize repaints, Z/X zoom about the canvas center, arrows pan.
    let sched_resize = scheduler.clone();
    Effect::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };
        unbind_window_listeners();

        let sched = sched_resize.clone();
        let on_resize = Closure::<dyn Fn()>::new(move || sched.request());
        if window
            .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding {
                    window: window.clone(),
                    _handler: on_resize,
                });
            });
        }

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();
                // Don't intercept when typing in the plan editor
                if target_tag == "INPUT" || target_tag == "TEXTAREA" {
                    return;
                }
                let direction = match e.key().as_str() {
                    "z" | "Z" => ZoomDirection::In,
                    "x" | "X" => ZoomDirection::Out,
                    key => {
                        let (dx, dy) = match key {
                            "ArrowLeft" => (ARROW_PAN_PX, 0.0),
                            "ArrowRight" => (-ARROW_PAN_PX, 0.0),
                            "ArrowUp" => (0.0, ARROW_PAN_PX),
                            "ArrowDown" => (0.0, -ARROW_PAN_PX),
                            _ => return,
                        };
                        e.prevent_default();
                        viewport.update(|vp| vp.pan(dx, dy));
                        return;
                    }
                };
                e.prevent_default();
                let canvas = canvas_ref.get_untracked();
                let (cw, ch) = container_size(canvas.as_ref());
                viewport.update(|vp| vp.zoom_step(direction, cw / 2.0, ch / 2.0));
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    on_cleanup(unbind_window_listeners);

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let (x, y) = local_point(canvas_ref.get_untracked().as_ref(), &e);
        viewport.update(|vp| vp.zoom_at(e.delta_y(), x, y));
    };

    let on_pointer_down = {
        let press_x = press_x.clone();
        let press_y = press_y.clone();
        move |e: PointerEvent| {
            press_x.set(e.client_x() as f64);
            press_y.set(e.client_y() as f64);
            viewport.update(|vp| vp.begin_drag(e.client_x() as f64, e.client_y() as f64));

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = move |e: PointerEvent| {
        if !viewport.with_untracked(Viewport::is_dragging) {
            return;
        }
        viewport.update(|vp| vp.continue_drag(e.client_x() as f64, e.client_y() as f64));
    };

    let on_pointer_up = move |e: PointerEvent| {
        viewport.update(Viewport::end_drag);
        if let Some(target) = e.target()
            && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
        {
            el.style().set_property("cursor", "grab").ok();
        }
    };

    let on_click = move |e: MouseEvent| {
        let dx = (e.client_x() as f64 - press_x.get()).abs();
        let dy = (e.client_y() as f64 - press_y.get()).abs();
        if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
            return;
        }
        let (sx, sy) = local_point(canvas_ref.get_untracked().as_ref(), &e);
        let (wx, wy) = viewport.with_untracked(|vp| vp.screen_to_world(sx, sy));
        let hit = index.with_untracked(|index| {
            layout
                .address_at(wx, wy, index.rows(), index.cols())
                .filter(|address| index.cell_at(*address).is_some())
        });
        if hit != selected.get_untracked() {
            selected.set(hit);
        }
    };

    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:click=on_click
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

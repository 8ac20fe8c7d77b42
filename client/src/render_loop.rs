use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests into at most one `requestAnimationFrame` per vsync.
pub struct FrameScheduler {
    shared: Rc<FrameState>,
}

struct FrameState {
    window: Option<web_sys::Window>,
    pending: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl FrameState {
    fn request(&self) {
        if self.pending.get().is_some() {
            return;
        }
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let callback = self.callback.borrow();
        let Some(cb) = callback.as_ref() else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            self.pending.set(Some(id));
        }
    }
}

impl FrameScheduler {
    pub fn new(paint: impl Fn() + 'static) -> Self {
        let shared = Rc::new(FrameState {
            window: web_sys::window(),
            pending: Cell::new(None),
            callback: RefCell::new(None),
        });

        let frame_state = shared.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            frame_state.pending.set(None);
            paint();
        });
        *shared.callback.borrow_mut() = Some(cb);

        Self { shared }
    }

    /// Ask for a repaint on the next frame. Repeated calls before that frame
    /// collapse into one.
    pub fn request(&self) {
        self.shared.request();
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Some(id) = self.shared.pending.take()
            && let Some(window) = self.shared.window.as_ref()
        {
            let _ = window.cancel_animation_frame(id);
        }
        // The closure holds an Rc back to the state; break the cycle.
        self.shared.callback.borrow_mut().take();
    }
}

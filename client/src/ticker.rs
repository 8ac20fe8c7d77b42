use std::cell::RefCell;

use gloo_timers::callback::Interval;
use wasm_bindgen_futures::spawn_local;
use upbeat_shared::{ClockHandle, ClockKind};

/// One running 1 Hz interval per clock kind.
#[derive(Default)]
struct TickerBindings {
    decision: Option<Interval>,
    edit: Option<Interval>,
}

impl TickerBindings {
    fn slot(&mut self, kind: ClockKind) -> &mut Option<Interval> {
        match kind {
            ClockKind::Decision => &mut self.decision,
            ClockKind::Edit => &mut self.edit,
        }
    }
}

thread_local! {
    static TICKERS: RefCell<TickerBindings> = RefCell::new(TickerBindings::default());
}

/// Clear the interval now, free its closure once the current callback returns.
/// A ticker is usually stopped from inside its own tick.
fn retire(interval: Interval) {
    let callback = interval.cancel();
    spawn_local(async move {
        drop(callback);
    });
}

/// Call `on_tick(handle)` every second until stopped or replaced.
pub fn start(handle: ClockHandle, on_tick: impl Fn(ClockHandle) + 'static) {
    let interval = Interval::new(1_000, move || on_tick(handle));
    let old = TICKERS.with(|tickers| tickers.borrow_mut().slot(handle.kind()).replace(interval));
    if let Some(old) = old {
        retire(old);
    }
}

pub fn stop(kind: ClockKind) {
    let old = TICKERS.with(|tickers| tickers.borrow_mut().slot(kind).take());
    if let Some(old) = old {
        retire(old);
    }
}

pub fn stop_all() {
    stop(ClockKind::Decision);
    stop(ClockKind::Edit);
}

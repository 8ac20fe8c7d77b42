use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use upbeat_shared::ChannelMessage;

const RECONNECT_BASE_MS: f64 = 500.0;
const RECONNECT_MAX_MS: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Live,
    Reconnecting,
}

struct ChannelConnection {
    ws: WebSocket,
    _on_open: Closure<dyn Fn()>,
    _on_message: Closure<dyn Fn(MessageEvent)>,
    _on_close: Closure<dyn Fn(CloseEvent)>,
}

impl ChannelConnection {
    fn close(self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.close().ok();
    }
}

thread_local! {
    static CHANNEL_CONNECTION: RefCell<Option<ChannelConnection>> = const { RefCell::new(None) };
    static RECONNECT_TIMEOUT: RefCell<Option<Timeout>> = const { RefCell::new(None) };
    static CONSECUTIVE_FAILURES: RefCell<u32> = const { RefCell::new(0) };
}

fn reconnect_backoff_ms(consecutive_failures: u32) -> f64 {
    let exponent = consecutive_failures.saturating_sub(1).min(6);
    let factor = 1u32 << exponent;
    (RECONNECT_BASE_MS * factor as f64).min(RECONNECT_MAX_MS)
}

/// `ws(s)://` form of the server base, or of the page origin when empty.
fn channel_url(base: &str) -> Option<String> {
    if let Some(rest) = base.strip_prefix("https://") {
        return Some(format!("wss://{rest}/ws"));
    }
    if let Some(rest) = base.strip_prefix("http://") {
        return Some(format!("ws://{rest}/ws"));
    }
    let location = web_sys::window()?.location();
    let scheme = match location.protocol().ok()?.as_str() {
        "https:" => "wss",
        _ => "ws",
    };
    let host = location.host().ok()?;
    Some(format!("{scheme}://{host}{base}/ws"))
}

pub fn disconnect() {
    RECONNECT_TIMEOUT.with(|slot| {
        if let Some(timeout) = slot.borrow_mut().take() {
            timeout.cancel();
        }
    });
    CHANNEL_CONNECTION.with(|slot| {
        if let Some(connection) = slot.borrow_mut().take() {
            connection.close();
        }
    });
    CONSECUTIVE_FAILURES.with(|count| *count.borrow_mut() = 0);
}

fn schedule_reconnect(
    base: String,
    log: RwSignal<Vec<ChannelMessage>>,
    status: RwSignal<ConnectionStatus>,
) {
    let attempt = CONSECUTIVE_FAILURES.with(|count| {
        let mut count = count.borrow_mut();
        *count = count.saturating_add(1);
        *count
    });
    let backoff_ms = reconnect_backoff_ms(attempt);
    web_sys::console::warn_1(
        &format!(
            "push channel closed (attempt {attempt}); reconnecting in {}ms",
            backoff_ms.round()
        )
        .into(),
    );
    let timeout = Timeout::new(backoff_ms as u32, move || {
        connect(base, log, status);
    });
    RECONNECT_TIMEOUT.with(|slot| {
        if let Some(old) = slot.borrow_mut().replace(timeout) {
            old.cancel();
        }
    });
}

/// Open the push channel and append every decoded message to `log`.
pub fn connect(
    base: String,
    log: RwSignal<Vec<ChannelMessage>>,
    status: RwSignal<ConnectionStatus>,
) {
    let Some(url) = channel_url(&base) else {
        status.set(ConnectionStatus::Reconnecting);
        return;
    };
    if status.get_untracked() != ConnectionStatus::Reconnecting {
        status.set(ConnectionStatus::Connecting);
    }

    let ws = match WebSocket::new(&url) {
        Ok(ws) => ws,
        Err(_) => {
            status.set(ConnectionStatus::Reconnecting);
            schedule_reconnect(base, log, status);
            return;
        }
    };

    let on_open = Closure::<dyn Fn()>::new(move || {
        CONSECUTIVE_FAILURES.with(|count| *count.borrow_mut() = 0);
        status.set(ConnectionStatus::Live);
    });
    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    let on_message = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
        let Some(data) = e.data().as_string() else {
            return;
        };
        match serde_json::from_str::<ChannelMessage>(&data) {
            Ok(message) => log.update(|messages| messages.push(message)),
            Err(err) => {
                web_sys::console::warn_1(&format!("unreadable channel message: {err}").into());
            }
        }
    });
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

    let reconnect_base = base.clone();
    let on_close = Closure::<dyn Fn(CloseEvent)>::new(move |_: CloseEvent| {
        status.set(ConnectionStatus::Reconnecting);
        schedule_reconnect(reconnect_base.clone(), log, status);
    });
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

    // Replace any existing connection, unregistering its handlers first.
    CHANNEL_CONNECTION.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(old) = slot.take() {
            old.close();
        }
        *slot = Some(ChannelConnection {
            ws,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        });
    });
}

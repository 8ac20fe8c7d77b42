use leptos::prelude::*;

use upbeat_shared::time_format::format_mmss;
use upbeat_shared::{FlowEvent, HexLayout, MapCellIndex, PlayerState, TurnPhase, Viewport};

use crate::app::{FetchError, FlowDriver, Selected};
use crate::channel::ConnectionStatus;
use crate::storage;

const PANEL_STYLE: &str = "position: absolute; right: 16px; bottom: 16px; width: 360px; \
    display: flex; flex-direction: column; gap: 8px; padding: 12px; border-radius: 8px; \
    background: rgba(20, 16, 12, 0.88); color: #f3e9d2; font-family: sans-serif;";
const MODAL_STYLE: &str = "position: absolute; inset: 0; display: flex; align-items: center; \
    justify-content: center; background: rgba(0, 0, 0, 0.45);";

/// Forget the stored session and drafts, then return to the entry page.
fn leave_game() {
    storage::drafts().clear_session();
    if let Some(window) = web_sys::window() {
        window.location().set_href("/").ok();
    }
}

/// Top strip: player, treasury, announcements and the revision countdown.
#[component]
pub fn TurnBanner() -> impl IntoView {
    let driver: FlowDriver = expect_context();
    let flow = driver.flow();
    let player: RwSignal<Option<PlayerState>> = expect_context();
    let connection: RwSignal<ConnectionStatus> = expect_context();

    let identity = move || {
        player.with(|p| match p {
            Some(p) => format!("{} | turn {} | {}", p.name, p.turn_index, p.treasury_label()),
            None => flow.with(|f| f.player().to_string()),
        })
    };
    let announcement = move || flow.with(|f| f.banner().map(str::to_string));
    let edit_countdown = move || {
        flow.with(|f| match (f.phase(), f.edit_remaining()) {
            (TurnPhase::Editing, Some(secs)) => Some(format!("Time left to revise: {}", format_mmss(secs))),
            _ => None,
        })
    };
    let link_state = move || match connection.get() {
        ConnectionStatus::Live => None,
        ConnectionStatus::Connecting => Some("connecting"),
        ConnectionStatus::Reconnecting => Some("reconnecting"),
    };

    view! {
        <div style="position: absolute; top: 0; left: 0; right: 0; display: flex; gap: 16px; \
            align-items: center; padding: 8px 16px; background: rgba(20, 16, 12, 0.8); \
            color: #f3e9d2; font-family: sans-serif; pointer-events: none;">
            <span style="font-weight: bold;">{identity}</span>
            {move || announcement().map(|text| view! { <span class="gm-banner">{text}</span> })}
            {move || edit_countdown().map(|text| view! {
                <span class="edit-countdown" style="margin-left: auto; color: #ffd27f;">{text}</span>
            })}
            {move || link_state().map(|state| view! {
                <span style="opacity: 0.7; font-size: 12px;">{state}</span>
            })}
            <button style="pointer-events: auto;" on:click=move |_| leave_game()>"Leave game"</button>
        </div>
    }
}

/// Popup anchored beside the selected cell, plus the zoom hint.
#[component]
pub fn CellInfo() -> impl IntoView {
    let index: RwSignal<MapCellIndex> = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let layout: HexLayout = expect_context();
    let Selected(selected) = expect_context();

    let popup = move || {
        let address = selected.get()?;
        let (text, terrain) = index.with(|index| {
            let description = index.describe_cell(address)?;
            let cell = index.cell_at(address)?;
            Some((description.to_string(), cell.terrain().name()))
        })?;
        let (wx, wy) = layout.center(address);
        let (sx, sy) = viewport.with(|vp| vp.world_to_screen(wx, wy));
        let style = format!(
            "position: absolute; left: {:.0}px; top: {:.0}px; transform: translate(-50%, -120%); \
             padding: 8px 12px; border-radius: 6px; background: rgba(20, 16, 12, 0.88); \
             color: #f3e9d2; font-family: sans-serif; white-space: nowrap; cursor: pointer;",
            sx, sy
        );
        Some((text, terrain, style))
    };
    let zoom_hint = move || format!("Zoom {}% (Z / X)", viewport.with(Viewport::zoom_percent));

    view! {
        {move || popup().map(|(text, terrain, style)| view! {
            <div class="cell-info" style=style on:click=move |_| selected.set(None)>
                <div>{text}</div>
                <div style="opacity: 0.7; font-size: 12px;">{terrain}</div>
            </div>
        })}
        <div style="position: absolute; left: 16px; bottom: 16px; padding: 4px 8px; \
            border-radius: 4px; background: rgba(20, 16, 12, 0.7); color: #f3e9d2; \
            font-family: sans-serif; font-size: 12px; pointer-events: none;">
            {zoom_hint}
        </div>
    }
}

#[component]
fn DecisionModal() -> impl IntoView {
    let driver: FlowDriver = expect_context();
    let flow = driver.flow();

    let countdown = move || {
        flow.with(|f| f.decision_remaining().map(format_mmss))
            .unwrap_or_default()
    };

    view! {
        <div style=MODAL_STYLE>
            <div style="min-width: 320px; padding: 20px; border-radius: 10px; \
                background: #2b2118; color: #f3e9d2; font-family: sans-serif; text-align: center;">
                <h3 style="margin: 0 0 8px;">"Your turn"</h3>
                <p style="margin: 0 0 12px;">"Revise your construction plan?"</p>
                <p class="decision-countdown" style="font-size: 28px; margin: 0 0 16px;">{countdown}</p>
                <div style="display: flex; gap: 12px; justify-content: center;">
                    <button on:click=move |_| driver.send(FlowEvent::Accept)>"Revise"</button>
                    <button on:click=move |_| driver.send(FlowEvent::Decline)>"Keep plan"</button>
                </div>
            </div>
        </div>
    }
}

/// Construction plan editor with submit control and the revision offer.
#[component]
pub fn PlanPanel() -> impl IntoView {
    let driver: FlowDriver = expect_context();
    let flow = driver.flow();
    let FetchError(fetch_error) = expect_context();

    let text = move || flow.with(|f| f.buffer().text().to_string());
    let locked = move || flow.with(|f| !f.can_edit());
    let submit_disabled = move || flow.with(|f| !f.can_submit() || f.is_busy());
    let submit_label = move || {
        if flow.with(|f| f.is_busy()) {
            "Submitting..."
        } else {
            "Submit plan"
        }
    };
    let dirty_marker = move || flow.with(|f| f.buffer().is_dirty()).then_some("unsaved changes");
    let error = move || {
        flow.with(|f| f.last_error().map(|e| e.indicator().to_string()))
            .or_else(|| fetch_error.get())
    };
    let offer_open = move || flow.with(|f| f.can_accept());

    view! {
        <div class="plan-panel" style=PANEL_STYLE>
            <label style="font-weight: bold;">"Construction plan"</label>
            <textarea
                rows="12"
                spellcheck="false"
                style="width: 100%; box-sizing: border-box; font-family: monospace; resize: vertical;"
                prop:value=text
                prop:disabled=locked
                on:input=move |ev| driver.send(FlowEvent::Edit(event_target_value(&ev)))
            />
            <div style="display: flex; gap: 8px; align-items: center;">
                <button
                    prop:disabled=submit_disabled
                    on:click=move |_| driver.send(FlowEvent::Submit)
                >
                    {submit_label}
                </button>
                {move || dirty_marker().map(|label| view! {
                    <span style="opacity: 0.7; font-size: 12px;">{label}</span>
                })}
                {move || error().map(|label| view! {
                    <span
                        class="submit-error"
                        style="color: #ff8a7a; font-size: 12px; cursor: pointer;"
                        on:click=move |_| {
                            flow.update(|f| f.clear_error());
                            fetch_error.set(None);
                        }
                    >
                        {label}
                    </span>
                })}
            </div>
        </div>
        <Show when=offer_open>
            <DecisionModal />
        </Show>
    }
}

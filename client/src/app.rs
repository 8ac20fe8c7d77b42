use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use upbeat_shared::storage::{initial_plan_text, Session};
use upbeat_shared::{
    run_submission, ChannelMessage, Effect as FlowEffect, EngineConfig, FlowError, FlowEvent,
    GridAddress, HexLayout, MapCellIndex, PlanBuffer, PlanFlow, PlanGateway, PlayerResponse,
    PlayerState, Redirect, SessionError, TurnWindowConfig, Viewport,
};

use crate::api::{self, HttpGateway};
use crate::canvas::MapCanvas;
use crate::channel::{self, ConnectionStatus};
use crate::plan_panel::{CellInfo, PlanPanel, TurnBanner};
use crate::storage;
use crate::ticker;

/// Newtype wrappers so context lookups of same-typed signals stay distinct.
#[derive(Clone, Copy)]
pub(crate) struct Selected(pub RwSignal<Option<GridAddress>>);
#[derive(Clone, Copy)]
pub(crate) struct FetchError(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct Windows(pub RwSignal<TurnWindowConfig>);

thread_local! {
    static DRAFT_DEBOUNCE: RefCell<Option<Timeout>> = const { RefCell::new(None) };
}

fn persist_draft(player: &str, text: &str) {
    storage::drafts().save_draft(player, text);
}

/// Write the draft once edits have been quiet for `delay_ms`.
fn persist_draft_debounced(player: String, text: String, delay_ms: u32) {
    let timeout = Timeout::new(delay_ms, move || persist_draft(&player, &text));
    DRAFT_DEBOUNCE.with(|slot| {
        if let Some(old) = slot.borrow_mut().replace(timeout) {
            old.cancel();
        }
    });
}

fn cancel_pending_draft() {
    DRAFT_DEBOUNCE.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            old.cancel();
        }
    });
}

/// Applies flow events and carries out the effects they produce.
#[derive(Clone, Copy)]
pub(crate) struct FlowDriver {
    flow: RwSignal<PlanFlow>,
    gateway: StoredValue<HttpGateway>,
    draft_debounce_ms: u32,
}

impl FlowDriver {
    pub fn flow(self) -> RwSignal<PlanFlow> {
        self.flow
    }

    pub fn dispatch(self, event: FlowEvent) -> Result<(), FlowError> {
        let Some(result) = self.flow.try_update(|flow| flow.apply(event)) else {
            return Ok(());
        };
        self.run(result?);
        Ok(())
    }

    /// Dispatch from an input handler; a refused input only gets logged.
    pub fn send(self, event: FlowEvent) {
        if let Err(e) = self.dispatch(event) {
            web_sys::console::warn_1(&format!("plan flow: {e}").into());
        }
    }

    pub fn observe(self, log: &[ChannelMessage], windows: TurnWindowConfig) {
        let Some(result) = self
            .flow
            .try_update(|flow| flow.observe_channel(log, windows))
        else {
            return;
        };
        match result {
            Ok(effects) => self.run(effects),
            Err(e) => web_sys::console::warn_1(&format!("plan flow: {e}").into()),
        }
    }

    pub fn shutdown(self) {
        if let Some(effects) = self.flow.try_update(|flow| flow.shutdown()) {
            self.run(effects);
        }
        ticker::stop_all();
    }

    fn run(self, effects: Vec<FlowEffect>) {
        let submitting = effects
            .iter()
            .any(|effect| matches!(effect, FlowEffect::Submit(_)));
        for effect in effects {
            match effect {
                FlowEffect::StartTicker(handle) => {
                    ticker::start(handle, move |handle| {
                        self.send(FlowEvent::Tick(handle));
                    });
                }
                FlowEffect::StopTicker(kind) => ticker::stop(kind),
                FlowEffect::PersistDraft { player, text } => {
                    if submitting {
                        cancel_pending_draft();
                        persist_draft(&player, &text);
                    } else {
                        persist_draft_debounced(player, text, self.draft_debounce_ms);
                    }
                }
                FlowEffect::Submit(request) => {
                    let gateway = self.gateway.get_value();
                    spawn_local(async move {
                        let result = run_submission(&gateway, &request).await;
                        if let Err(e) = &result {
                            web_sys::console::warn_1(
                                &format!("plan submission failed: {e}").into(),
                            );
                        }
                        self.send(FlowEvent::SubmissionFinished {
                            ticket: request.ticket,
                            result,
                        });
                    });
                }
                FlowEffect::MarkReady => self.gateway.with_value(|gateway| gateway.mark_ready()),
            }
        }
    }
}

/// Root application component: resolves the session, then hands over to the game.
#[component]
pub fn App() -> impl IntoView {
    let config = storage::load_settings();
    storage::save_settings(&config);

    match storage::drafts().session() {
        Ok(session) => view! { <GameView session=session config=config /> }.into_any(),
        Err(err) => view! { <EntryRedirect reason=err /> }.into_any(),
    }
}

#[component]
fn EntryRedirect(reason: SessionError) -> impl IntoView {
    web_sys::console::info_1(&format!("redirecting to entry: {reason}").into());
    let href = match reason.redirect() {
        Redirect::Entry => "/",
    };
    view! {
        <div class="entry-redirect">
            <p>"No active game session."</p>
            <a href=href>"Return to the lobby"</a>
        </div>
    }
}

/// Opening text and last synced text, fixed at the first player fetch.
#[derive(Clone, PartialEq)]
struct BootPlan {
    text: String,
    synced: String,
}

#[component]
fn GameView(session: Session, config: EngineConfig) -> impl IntoView {
    let gateway = StoredValue::new(HttpGateway::default());
    let player: RwSignal<Option<PlayerState>> = RwSignal::new(None);
    let index: RwSignal<MapCellIndex> = RwSignal::new(MapCellIndex::default());
    let windows: RwSignal<TurnWindowConfig> = RwSignal::new(TurnWindowConfig::default());
    let fetch_error: RwSignal<Option<String>> = RwSignal::new(None);
    let log: RwSignal<Vec<ChannelMessage>> = RwSignal::new(Vec::new());
    let connection: RwSignal<ConnectionStatus> = RwSignal::new(ConnectionStatus::Connecting);
    let boot: RwSignal<Option<BootPlan>> = RwSignal::new(None);

    provide_context(player);
    provide_context(index);
    provide_context(log);
    provide_context(connection);
    provide_context(FetchError(fetch_error));
    provide_context(Windows(windows));

    let refresh_nonce: RwSignal<u64> = RwSignal::new(0);
    let name = session.player.clone();
    let refresh = move || {
        let name = name.clone();
        let gateway = gateway.get_value();
        let request_nonce = issue_nonce(refresh_nonce);
        spawn_local(async move {
            let player_result = gateway.fetch_player(&name).await;
            let land_result = gateway.fetch_land().await;
            // A newer refresh was issued while this one was in flight.
            if !is_latest(refresh_nonce, request_nonce) {
                return;
            }
            match (player_result, land_result) {
                (Ok(response), Ok(land)) => {
                    fetch_error.set(None);
                    apply_refresh(&name, response, &land, player, index, windows, boot);
                }
                (Err(e), _) | (_, Err(e)) => {
                    web_sys::console::warn_1(&format!("refresh failed: {e}").into());
                    fetch_error.set(Some(e.indicator().to_string()));
                }
            }
        });
    };

    // Refetch player and map on every push-channel message (and once on mount).
    Effect::new(move || {
        log.with(|messages| messages.len());
        refresh();
    });

    // Connect to the push channel on mount
    Effect::new(move || {
        channel::connect(api::server_base(), log, connection);
        on_cleanup(|| {
            channel::disconnect();
        });
    });

    let player_name = session.player.clone();
    view! {
        <div class="game-root" style="position: fixed; inset: 0; overflow: hidden;">
            {move || match boot.get() {
                Some(plan) => view! {
                    <Game
                        player=player_name.clone()
                        buffer=PlanBuffer::new(plan.text, plan.synced)
                        config=config.clone()
                        gateway=gateway
                    />
                }
                .into_any(),
                None => view! {
                    <div class="loading">
                        {move || fetch_error.get().unwrap_or_else(|| "Loading map".to_string())}
                    </div>
                }
                .into_any(),
            }}
        </div>
    }
}

fn issue_nonce(nonce: RwSignal<u64>) -> u64 {
    let next = nonce.get_untracked().wrapping_add(1);
    nonce.set(next);
    next
}

fn is_latest(nonce: RwSignal<u64>, request: u64) -> bool {
    nonce.try_get_untracked() == Some(request)
}

fn apply_refresh(
    name: &str,
    response: PlayerResponse,
    land: &upbeat_shared::LandResponse,
    player: RwSignal<Option<PlayerState>>,
    index: RwSignal<MapCellIndex>,
    windows: RwSignal<TurnWindowConfig>,
    boot: RwSignal<Option<BootPlan>>,
) {
    let next_index = MapCellIndex::from_land(land);
    let state = response.state();
    if let Some(state) = &state
        && !next_index.matches_player(state)
    {
        web_sys::console::warn_1(
            &format!(
                "player grid {}x{} does not match map {}x{}",
                state.rows,
                state.cols,
                next_index.rows(),
                next_index.cols()
            )
            .into(),
        );
    }

    if boot.try_with_untracked(Option::is_none).unwrap_or(false) {
        let draft = storage::drafts().draft(name);
        let server_plan = response.constructionplan.clone();
        boot.set(Some(BootPlan {
            text: initial_plan_text(draft.as_deref(), server_plan.as_deref()),
            synced: server_plan.unwrap_or_default(),
        }));
    }

    windows.set(land.turn_windows());
    index.set(next_index);
    player.set(state);
}

#[component]
fn Game(
    player: String,
    buffer: PlanBuffer,
    config: EngineConfig,
    gateway: StoredValue<HttpGateway>,
) -> impl IntoView {
    let Windows(windows) = expect_context();
    let log: RwSignal<Vec<ChannelMessage>> = expect_context();
    let player_state: RwSignal<Option<PlayerState>> = expect_context();

    let layout = HexLayout::new(config.hex_width);
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::new(config.viewport));
    let selected: RwSignal<Option<GridAddress>> = RwSignal::new(None);
    let flow: RwSignal<PlanFlow> = RwSignal::new(PlanFlow::new(player, buffer, &config));
    let driver = FlowDriver {
        flow,
        gateway,
        draft_debounce_ms: config.draft_debounce_ms,
    };

    provide_context(layout);
    provide_context(viewport);
    provide_context(Selected(selected));
    provide_context(driver);

    Effect::new(move || {
        let current = windows.get();
        flow.update(|flow| flow.set_windows(current));
    });

    Effect::new(move || {
        if let Some(turn_index) = player_state.with(|p| p.as_ref().map(|p| p.turn_index)) {
            driver.send(FlowEvent::PlayerRefreshed { turn_index });
        }
    });

    Effect::new(move || {
        let current = windows.get_untracked();
        log.with(|messages| driver.observe(messages, current));
    });

    on_cleanup(move || {
        cancel_pending_draft();
        driver.shutdown();
    });

    view! {
        <MapCanvas />
        <TurnBanner />
        <CellInfo />
        <PlanPanel />
    }
}

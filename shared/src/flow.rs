use crate::clock::{ClockEvent, ClockHandle, ClockKind, TurnClock, TurnWindowConfig};
use crate::config::{DeclinePolicy, EngineConfig};
use crate::error::{FlowError, GatewayError};
use crate::events::{self, ChannelMessage, TurnSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    Idle,
    AwaitingDecision,
    Editing,
    Submitting,
}

/// The locally edited plan text and the last text the server accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanBuffer {
    text: String,
    last_synced: String,
}

impl PlanBuffer {
    pub fn new(text: impl Into<String>, last_synced: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            last_synced: last_synced.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_synced(&self) -> &str {
        &self.last_synced
    }

    pub fn is_dirty(&self) -> bool {
        self.text != self.last_synced
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
    }

    fn mark_synced(&mut self, text: &str) {
        self.last_synced.clear();
        self.last_synced.push_str(text);
    }
}

/// Baselines are saved only; revisions are saved and then validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Baseline,
    Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    User,
    /// The edit window ran out.
    Timeout,
    /// An offer was resolved without opening the editor because decisions
    /// are disabled for the session.
    AutoResolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub ticket: SubmissionTicket,
    pub player: String,
    pub plan: String,
    pub kind: SubmissionKind,
    pub trigger: SubmitTrigger,
}

/// Work the shell must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Drive this handle with one `FlowEvent::Tick` per second.
    StartTicker(ClockHandle),
    StopTicker(ClockKind),
    /// Run the request through the gateway, then report back with
    /// `FlowEvent::SubmissionFinished`.
    Submit(SubmissionRequest),
    PersistDraft { player: String, text: String },
    /// Fire-and-forget readiness notice on the push channel.
    MarkReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    YourTurn(TurnWindowConfig),
    NotYourTurn,
    Accept,
    Decline,
    Submit,
    Edit(String),
    Tick(ClockHandle),
    SubmissionFinished {
        ticket: SubmissionTicket,
        result: Result<(), GatewayError>,
    },
    PlayerRefreshed {
        turn_index: u32,
    },
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: SubmissionTicket,
    plan: String,
    kind: SubmissionKind,
    origin: TurnPhase,
}

/// Turn/plan state machine.
///
/// Every input goes through [`apply`](Self::apply), which either refuses it
/// without touching state or performs one transition and returns the
/// [`Effect`]s the caller has to carry out. Timers are owned here as
/// [`TurnClock`]s; the caller only relays their ticks.
#[derive(Debug, Clone)]
pub struct PlanFlow {
    player: String,
    policy: DeclinePolicy,
    game_master: String,
    phase: TurnPhase,
    windows: TurnWindowConfig,
    buffer: PlanBuffer,
    decision_clock: TurnClock,
    edit_clock: TurnClock,
    decision_disabled: bool,
    baseline_pending: bool,
    decision_remainder: Option<u32>,
    edit_remainder: Option<u32>,
    turn_index: Option<u32>,
    suppress_offers: bool,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    last_error: Option<GatewayError>,
    banner: Option<String>,
    seen_messages: usize,
}

impl PlanFlow {
    pub fn new(player: impl Into<String>, buffer: PlanBuffer, config: &EngineConfig) -> Self {
        Self {
            player: player.into(),
            policy: config.decline_policy,
            game_master: config.game_master_sender.clone(),
            phase: TurnPhase::Idle,
            windows: TurnWindowConfig::default(),
            buffer,
            decision_clock: TurnClock::new(ClockKind::Decision),
            edit_clock: TurnClock::new(ClockKind::Edit),
            decision_disabled: false,
            baseline_pending: true,
            decision_remainder: None,
            edit_remainder: None,
            turn_index: None,
            suppress_offers: false,
            in_flight: None,
            next_ticket: 0,
            last_error: None,
            banner: None,
            seen_messages: 0,
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn buffer(&self) -> &PlanBuffer {
        &self.buffer
    }

    pub fn windows(&self) -> TurnWindowConfig {
        self.windows
    }

    /// Update the windows used by the next offer or editor.
    pub fn set_windows(&mut self, windows: TurnWindowConfig) {
        self.windows = windows;
    }

    pub fn decision_remaining(&self) -> Option<u32> {
        self.decision_clock.remaining()
    }

    pub fn edit_remaining(&self) -> Option<u32> {
        self.edit_clock.remaining()
    }

    pub fn decision_disabled(&self) -> bool {
        self.decision_disabled
    }

    pub fn baseline_pending(&self) -> bool {
        self.baseline_pending
    }

    pub fn can_accept(&self) -> bool {
        self.phase == TurnPhase::AwaitingDecision
    }

    pub fn can_edit(&self) -> bool {
        match self.phase {
            TurnPhase::Editing => true,
            TurnPhase::Idle => self.baseline_pending,
            TurnPhase::AwaitingDecision | TurnPhase::Submitting => false,
        }
    }

    pub fn can_submit(&self) -> bool {
        self.can_edit()
    }

    pub fn is_busy(&self) -> bool {
        self.phase == TurnPhase::Submitting
    }

    pub fn last_error(&self) -> Option<&GatewayError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Latest game-master announcement, independent of phase.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Feed the push-channel log. Only a change in length is classified, so
    /// re-rendering the same log never replays a signal.
    pub fn observe_channel(
        &mut self,
        log: &[ChannelMessage],
        windows: TurnWindowConfig,
    ) -> Result<Vec<Effect>, FlowError> {
        if log.len() == self.seen_messages {
            return Ok(Vec::new());
        }
        self.seen_messages = log.len();

        if let Some(message) = events::latest_from(log, &self.game_master) {
            self.banner = Some(message.content.clone());
        }

        match events::turn_signal(log, &self.player) {
            Some(TurnSignal::YourTurn) => self.apply(FlowEvent::YourTurn(windows)),
            Some(TurnSignal::NotYourTurn) => self.apply(FlowEvent::NotYourTurn),
            None => Ok(Vec::new()),
        }
    }

    pub fn apply(&mut self, event: FlowEvent) -> Result<Vec<Effect>, FlowError> {
        let mut effects = Vec::new();
        let result = self.dispatch(event, &mut effects);
        if let Err(err) = &result {
            tracing::warn!(phase = ?self.phase, error = %err, "plan flow input rejected");
        }
        self.check_invariants();
        result.map(|()| effects)
    }

    /// Stop both clocks, e.g. when the game view is torn down. An open offer
    /// or editor falls back to idle; an in-flight submission is left alone.
    pub fn shutdown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.decision_clock.stop().is_some() {
            effects.push(Effect::StopTicker(ClockKind::Decision));
        }
        if let Some(remaining) = self.edit_clock.stop() {
            self.edit_remainder = Some(remaining);
            effects.push(Effect::StopTicker(ClockKind::Edit));
        }
        if self.phase != TurnPhase::Submitting {
            self.set_phase(TurnPhase::Idle);
        }
        self.check_invariants();
        effects
    }

    fn dispatch(&mut self, event: FlowEvent, effects: &mut Vec<Effect>) -> Result<(), FlowError> {
        match event {
            FlowEvent::YourTurn(windows) => {
                self.windows = windows;
                self.on_offer(effects);
                Ok(())
            }
            FlowEvent::NotYourTurn => {
                self.on_withdraw(effects);
                Ok(())
            }
            FlowEvent::Accept => self.on_accept(effects),
            FlowEvent::Decline => self.on_decline(effects),
            FlowEvent::Submit => self.on_submit(effects),
            FlowEvent::Edit(text) => self.on_edit(text, effects),
            FlowEvent::Tick(handle) => {
                self.on_tick(handle, effects);
                Ok(())
            }
            FlowEvent::SubmissionFinished { ticket, result } => {
                self.on_submission_finished(ticket, result, effects);
                Ok(())
            }
            FlowEvent::PlayerRefreshed { turn_index } => {
                self.on_player_refreshed(turn_index);
                Ok(())
            }
        }
    }

    fn on_offer(&mut self, effects: &mut Vec<Effect>) {
        if self.phase != TurnPhase::Idle {
            tracing::trace!(phase = ?self.phase, "turn signal while busy, ignoring");
            return;
        }
        if self.suppress_offers {
            tracing::debug!(player = %self.player, "offer suppressed until next turn");
            return;
        }

        let seconds =
            TurnClock::resolve_window(self.decision_remainder.take(), self.windows.decision_window_secs);
        if seconds == 0 {
            self.on_decision_expired(effects);
            return;
        }
        let handle = self.decision_clock.start(seconds);
        self.set_phase(TurnPhase::AwaitingDecision);
        effects.push(Effect::StartTicker(handle));
    }

    fn on_withdraw(&mut self, effects: &mut Vec<Effect>) {
        if self.phase != TurnPhase::AwaitingDecision {
            return;
        }
        self.decision_remainder = self.decision_clock.stop();
        effects.push(Effect::StopTicker(ClockKind::Decision));
        self.set_phase(TurnPhase::Idle);
    }

    fn on_accept(&mut self, effects: &mut Vec<Effect>) -> Result<(), FlowError> {
        if self.phase != TurnPhase::AwaitingDecision {
            return Err(FlowError::NoOfferPending { phase: self.phase });
        }
        self.close_offer(effects);

        if self.decision_disabled {
            self.begin_submission(SubmitTrigger::AutoResolve, effects);
            return Ok(());
        }

        let seconds = self
            .edit_remainder
            .unwrap_or(0)
            .max(self.windows.edit_window_secs);
        if seconds == 0 {
            self.on_edit_expired(effects);
            return Ok(());
        }
        let handle = self.edit_clock.start(seconds);
        self.set_phase(TurnPhase::Editing);
        effects.push(Effect::StartTicker(handle));
        Ok(())
    }

    fn on_decline(&mut self, effects: &mut Vec<Effect>) -> Result<(), FlowError> {
        if self.phase != TurnPhase::AwaitingDecision {
            return Err(FlowError::NoOfferPending { phase: self.phase });
        }
        self.close_offer(effects);
        if self.decision_disabled {
            self.begin_submission(SubmitTrigger::AutoResolve, effects);
            return Ok(());
        }
        if self.policy == DeclinePolicy::SuppressTurn {
            self.suppress_offers = true;
        }
        self.set_phase(TurnPhase::Idle);
        Ok(())
    }

    fn on_submit(&mut self, effects: &mut Vec<Effect>) -> Result<(), FlowError> {
        match self.phase {
            TurnPhase::Submitting => Err(FlowError::SubmissionInFlight),
            TurnPhase::Editing => {
                self.edit_remainder = self.edit_clock.stop();
                effects.push(Effect::StopTicker(ClockKind::Edit));
                self.begin_submission(SubmitTrigger::User, effects);
                Ok(())
            }
            TurnPhase::Idle if self.baseline_pending => {
                self.begin_submission(SubmitTrigger::User, effects);
                Ok(())
            }
            phase => Err(FlowError::SubmitUnavailable { phase }),
        }
    }

    fn on_edit(&mut self, text: String, effects: &mut Vec<Effect>) -> Result<(), FlowError> {
        if !self.can_edit() {
            return Err(FlowError::BufferLocked { phase: self.phase });
        }
        self.buffer.set_text(text);
        effects.push(self.persist_draft());
        Ok(())
    }

    fn on_tick(&mut self, handle: ClockHandle, effects: &mut Vec<Effect>) {
        let clock = match handle.kind() {
            ClockKind::Decision => &mut self.decision_clock,
            ClockKind::Edit => &mut self.edit_clock,
        };
        match clock.tick(handle) {
            None | Some(ClockEvent::Tick { .. }) => {}
            Some(ClockEvent::Expired) => {
                effects.push(Effect::StopTicker(handle.kind()));
                match handle.kind() {
                    ClockKind::Decision => self.on_decision_expired(effects),
                    ClockKind::Edit => self.on_edit_expired(effects),
                }
            }
        }
    }

    fn on_decision_expired(&mut self, effects: &mut Vec<Effect>) {
        self.decision_remainder = None;
        if self.decision_disabled {
            self.begin_submission(SubmitTrigger::AutoResolve, effects);
        } else {
            tracing::debug!(player = %self.player, "decision window lapsed");
            self.set_phase(TurnPhase::Idle);
        }
    }

    fn on_edit_expired(&mut self, effects: &mut Vec<Effect>) {
        tracing::info!(player = %self.player, "edit window expired, submitting current plan");
        self.decision_disabled = true;
        self.edit_remainder = Some(0);
        self.begin_submission(SubmitTrigger::Timeout, effects);
    }

    fn on_submission_finished(
        &mut self,
        ticket: SubmissionTicket,
        result: Result<(), GatewayError>,
        effects: &mut Vec<Effect>,
    ) {
        let current = self.in_flight.as_ref().is_some_and(|f| f.ticket == ticket);
        if !current || self.phase != TurnPhase::Submitting {
            tracing::trace!(?ticket, "ignoring stale submission result");
            return;
        }
        let Some(flight) = self.in_flight.take() else {
            return;
        };

        match result {
            Ok(()) => {
                self.buffer.mark_synced(&flight.plan);
                if flight.kind == SubmissionKind::Baseline {
                    self.baseline_pending = false;
                }
                self.last_error = None;
                self.set_phase(TurnPhase::Idle);
                effects.push(Effect::MarkReady);
            }
            Err(err) => {
                tracing::warn!(
                    player = %self.player,
                    kind = ?flight.kind,
                    error = %err,
                    "plan submission failed"
                );
                self.last_error = Some(err);
                if flight.origin == TurnPhase::Idle {
                    self.set_phase(TurnPhase::Idle);
                    return;
                }
                let seconds =
                    TurnClock::resolve_window(self.edit_remainder, self.windows.edit_window_secs)
                        .max(1);
                let handle = self.edit_clock.start(seconds);
                self.set_phase(TurnPhase::Editing);
                effects.push(Effect::StartTicker(handle));
            }
        }
    }

    fn on_player_refreshed(&mut self, turn_index: u32) {
        if self.turn_index == Some(turn_index) {
            return;
        }
        tracing::debug!(turn_index, "turn advanced");
        self.turn_index = Some(turn_index);
        self.suppress_offers = false;
        self.decision_remainder = None;
        self.edit_remainder = None;
    }

    fn close_offer(&mut self, effects: &mut Vec<Effect>) {
        self.decision_clock.stop();
        self.decision_remainder = None;
        effects.push(Effect::StopTicker(ClockKind::Decision));
    }

    fn begin_submission(&mut self, trigger: SubmitTrigger, effects: &mut Vec<Effect>) {
        let kind = if self.baseline_pending {
            SubmissionKind::Baseline
        } else {
            SubmissionKind::Revision
        };
        self.next_ticket += 1;
        let ticket = SubmissionTicket(self.next_ticket);
        let plan = self.buffer.text().to_string();

        self.in_flight = Some(InFlight {
            ticket,
            plan: plan.clone(),
            kind,
            origin: self.phase,
        });
        self.set_phase(TurnPhase::Submitting);

        effects.push(self.persist_draft());
        effects.push(Effect::Submit(SubmissionRequest {
            ticket,
            player: self.player.clone(),
            plan,
            kind,
            trigger,
        }));
    }

    fn persist_draft(&self) -> Effect {
        Effect::PersistDraft {
            player: self.player.clone(),
            text: self.buffer.text().to_string(),
        }
    }

    fn set_phase(&mut self, next: TurnPhase) {
        if self.phase != next {
            tracing::debug!(from = ?self.phase, to = ?next, "turn phase");
        }
        self.phase = next;
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.decision_clock.is_running(),
            self.phase == TurnPhase::AwaitingDecision
        );
        debug_assert_eq!(
            self.edit_clock.is_running(),
            self.phase == TurnPhase::Editing
        );
        debug_assert_eq!(
            self.in_flight.is_some(),
            self.phase == TurnPhase::Submitting
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MessageKind;

    const WINDOWS: TurnWindowConfig = TurnWindowConfig::new(5, 2);

    fn flow() -> PlanFlow {
        PlanFlow::new("alice", PlanBuffer::new("", ""), &EngineConfig::default())
    }

    fn started(effects: &[Effect], kind: ClockKind) -> ClockHandle {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::StartTicker(handle) if handle.kind() == kind => Some(*handle),
                _ => None,
            })
            .expect("ticker started")
    }

    fn submitted(effects: &[Effect]) -> Option<&SubmissionRequest> {
        effects.iter().find_map(|effect| match effect {
            Effect::Submit(request) => Some(request),
            _ => None,
        })
    }

    /// Submit a baseline from idle and acknowledge it.
    fn complete_baseline(flow: &mut PlanFlow) {
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();
    }

    fn open_editor(flow: &mut PlanFlow) -> ClockHandle {
        let effects = flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        started(&effects, ClockKind::Decision);
        let effects = flow.apply(FlowEvent::Accept).unwrap();
        assert_eq!(flow.phase(), TurnPhase::Editing);
        started(&effects, ClockKind::Edit)
    }

    #[test]
    fn first_submission_is_baseline_then_revisions() {
        let mut flow = flow();
        flow.apply(FlowEvent::Edit("move up".into())).unwrap();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let request = submitted(&effects).unwrap().clone();
        assert_eq!(request.kind, SubmissionKind::Baseline);
        assert_eq!(request.plan, "move up");
        assert!(effects.contains(&Effect::PersistDraft {
            player: "alice".into(),
            text: "move up".into()
        }));
        let effects = flow
            .apply(FlowEvent::SubmissionFinished {
                ticket: request.ticket,
                result: Ok(()),
            })
            .unwrap();
        assert_eq!(effects, vec![Effect::MarkReady]);
        assert!(!flow.buffer().is_dirty());
        assert!(!flow.can_edit());

        open_editor(&mut flow);
        flow.apply(FlowEvent::Edit("move up\ncollect 5".into())).unwrap();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let request = submitted(&effects).unwrap();
        assert_eq!(request.kind, SubmissionKind::Revision);
        assert_eq!(request.plan, "move up\ncollect 5");
        assert!(effects.contains(&Effect::StopTicker(ClockKind::Edit)));
    }

    #[test]
    fn forced_expiry_submits_current_buffer() {
        let mut flow = flow();
        complete_baseline(&mut flow);
        let handle = open_editor(&mut flow);
        flow.apply(FlowEvent::Edit("invest 10".into())).unwrap();

        assert!(flow.apply(FlowEvent::Tick(handle)).unwrap().is_empty());
        assert_eq!(flow.edit_remaining(), Some(1));
        let effects = flow.apply(FlowEvent::Tick(handle)).unwrap();
        assert_eq!(effects[0], Effect::StopTicker(ClockKind::Edit));
        let request = submitted(&effects).unwrap().clone();
        assert_eq!(request.plan, "invest 10");
        assert_eq!(request.trigger, SubmitTrigger::Timeout);
        assert_eq!(flow.phase(), TurnPhase::Submitting);
        assert!(flow.decision_disabled());
        assert_eq!(flow.buffer().text(), "invest 10");

        flow.apply(FlowEvent::SubmissionFinished {
            ticket: request.ticket,
            result: Ok(()),
        })
        .unwrap();
        assert_eq!(flow.phase(), TurnPhase::Idle);
        assert_eq!(flow.buffer().last_synced(), "invest 10");
    }

    #[test]
    fn decline_mid_countdown_returns_to_idle() {
        let mut flow = flow();
        let effects = flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        let handle = started(&effects, ClockKind::Decision);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        assert_eq!(flow.decision_remaining(), Some(3));

        let effects = flow.apply(FlowEvent::Decline).unwrap();
        assert_eq!(effects, vec![Effect::StopTicker(ClockKind::Decision)]);
        assert_eq!(flow.phase(), TurnPhase::Idle);
        assert_eq!(flow.edit_remaining(), None);

        // The interval may still fire once before the shell tears it down.
        assert!(flow.apply(FlowEvent::Tick(handle)).unwrap().is_empty());
        assert_eq!(flow.phase(), TurnPhase::Idle);
    }

    #[test]
    fn second_submit_is_rejected_while_in_flight() {
        let mut flow = flow();
        flow.apply(FlowEvent::Submit).unwrap();
        assert_eq!(
            flow.apply(FlowEvent::Submit),
            Err(FlowError::SubmissionInFlight)
        );
        assert_eq!(flow.phase(), TurnPhase::Submitting);
        assert!(matches!(
            flow.apply(FlowEvent::Edit("late".into())),
            Err(FlowError::BufferLocked {
                phase: TurnPhase::Submitting
            })
        ));
    }

    #[test]
    fn decision_expiry_without_answer_goes_idle() {
        let mut flow = flow();
        let effects = flow
            .apply(FlowEvent::YourTurn(TurnWindowConfig::new(1, 10)))
            .unwrap();
        let handle = started(&effects, ClockKind::Decision);
        let effects = flow.apply(FlowEvent::Tick(handle)).unwrap();
        assert_eq!(effects, vec![Effect::StopTicker(ClockKind::Decision)]);
        assert_eq!(flow.phase(), TurnPhase::Idle);
        assert_eq!(
            flow.apply(FlowEvent::Accept),
            Err(FlowError::NoOfferPending {
                phase: TurnPhase::Idle
            })
        );
    }

    #[test]
    fn zero_decision_window_expires_immediately() {
        let mut flow = flow();
        let effects = flow
            .apply(FlowEvent::YourTurn(TurnWindowConfig::new(0, 10)))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(flow.phase(), TurnPhase::Idle);
    }

    #[test]
    fn disabled_decisions_resolve_offers_by_submitting() {
        let mut flow = flow();
        complete_baseline(&mut flow);
        let handle = open_editor(&mut flow);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        let effects = flow.apply(FlowEvent::Tick(handle)).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();

        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        let effects = flow.apply(FlowEvent::Accept).unwrap();
        let request = submitted(&effects).unwrap();
        assert_eq!(request.trigger, SubmitTrigger::AutoResolve);
        assert_eq!(request.kind, SubmissionKind::Revision);
        assert_eq!(flow.edit_remaining(), None);
    }

    /// Baseline saved, editor opened and left to time out: decisions are off.
    fn disable_decisions(flow: &mut PlanFlow) {
        complete_baseline(flow);
        let handle = open_editor(flow);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        let effects = flow.apply(FlowEvent::Tick(handle)).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();
        assert!(flow.decision_disabled());
    }

    #[test]
    fn disabled_decisions_submit_on_decline() {
        let mut flow = flow();
        disable_decisions(&mut flow);
        let text = flow.buffer().text().to_string();

        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        let effects = flow.apply(FlowEvent::Decline).unwrap();
        assert!(effects.contains(&Effect::StopTicker(ClockKind::Decision)));
        let request = submitted(&effects).unwrap();
        assert_eq!(request.trigger, SubmitTrigger::AutoResolve);
        assert_eq!(request.plan, text);
        assert_eq!(flow.phase(), TurnPhase::Submitting);
        assert_eq!(flow.buffer().text(), text);
    }

    #[test]
    fn disabled_decisions_submit_when_decision_window_lapses() {
        let mut flow = flow();
        disable_decisions(&mut flow);
        let text = flow.buffer().text().to_string();

        let effects = flow
            .apply(FlowEvent::YourTurn(TurnWindowConfig::new(2, 10)))
            .unwrap();
        let handle = started(&effects, ClockKind::Decision);
        assert!(submitted(&flow.apply(FlowEvent::Tick(handle)).unwrap()).is_none());
        let effects = flow.apply(FlowEvent::Tick(handle)).unwrap();
        assert!(effects.contains(&Effect::StopTicker(ClockKind::Decision)));
        let request = submitted(&effects).unwrap();
        assert_eq!(request.trigger, SubmitTrigger::AutoResolve);
        assert_eq!(request.kind, SubmissionKind::Revision);
        assert_eq!(request.plan, text);
        assert_eq!(flow.phase(), TurnPhase::Submitting);
        assert_eq!(flow.buffer().text(), text);
    }

    #[test]
    fn turn_advance_drops_saved_edit_time() {
        let mut flow = flow();
        complete_baseline(&mut flow);
        flow.apply(FlowEvent::PlayerRefreshed { turn_index: 1 }).unwrap();

        flow.apply(FlowEvent::YourTurn(TurnWindowConfig::new(5, 9)))
            .unwrap();
        let effects = flow.apply(FlowEvent::Accept).unwrap();
        let handle = started(&effects, ClockKind::Edit);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();

        flow.apply(FlowEvent::PlayerRefreshed { turn_index: 2 }).unwrap();
        flow.apply(FlowEvent::YourTurn(TurnWindowConfig::new(5, 3)))
            .unwrap();
        flow.apply(FlowEvent::Accept).unwrap();
        assert_eq!(flow.edit_remaining(), Some(3));
    }

    #[test]
    fn failed_revision_reopens_editor_with_buffer() {
        let mut flow = flow();
        complete_baseline(&mut flow);
        let handle = open_editor(&mut flow);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        flow.apply(FlowEvent::Edit("attack 3".into())).unwrap();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;

        let effects = flow
            .apply(FlowEvent::SubmissionFinished {
                ticket,
                result: Err(GatewayError::Status { status: 500 }),
            })
            .unwrap();
        assert_eq!(flow.phase(), TurnPhase::Editing);
        assert_eq!(flow.edit_remaining(), Some(1));
        started(&effects, ClockKind::Edit);
        assert_eq!(flow.buffer().text(), "attack 3");
        assert!(flow.buffer().is_dirty());
        assert_eq!(
            flow.last_error(),
            Some(&GatewayError::Status { status: 500 })
        );
    }

    #[test]
    fn failed_baseline_from_idle_stays_idle() {
        let mut flow = flow();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Err(GatewayError::Network("offline".into())),
        })
        .unwrap();
        assert_eq!(flow.phase(), TurnPhase::Idle);
        assert!(flow.baseline_pending());
        assert!(flow.can_submit());
    }

    #[test]
    fn stale_submission_result_is_ignored() {
        let mut flow = flow();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();

        let effects = flow
            .apply(FlowEvent::SubmissionFinished {
                ticket,
                result: Err(GatewayError::Decode("late".into())),
            })
            .unwrap();
        assert!(effects.is_empty());
        assert!(flow.last_error().is_none());
        assert_eq!(flow.phase(), TurnPhase::Idle);
    }

    #[test]
    fn withdrawn_offer_resumes_from_remainder() {
        let mut flow = flow();
        let effects = flow
            .apply(FlowEvent::YourTurn(TurnWindowConfig::new(10, 30)))
            .unwrap();
        let handle = started(&effects, ClockKind::Decision);
        for _ in 0..3 {
            flow.apply(FlowEvent::Tick(handle)).unwrap();
        }
        flow.apply(FlowEvent::NotYourTurn).unwrap();
        assert_eq!(flow.phase(), TurnPhase::Idle);

        flow.apply(FlowEvent::YourTurn(TurnWindowConfig::new(10, 30)))
            .unwrap();
        assert_eq!(flow.decision_remaining(), Some(7));

        flow.apply(FlowEvent::NotYourTurn).unwrap();
        flow.apply(FlowEvent::PlayerRefreshed { turn_index: 2 }).unwrap();
        flow.apply(FlowEvent::YourTurn(TurnWindowConfig::new(10, 30)))
            .unwrap();
        assert_eq!(flow.decision_remaining(), Some(10));
    }

    #[test]
    fn suppress_policy_holds_until_turn_advances() {
        let config = EngineConfig {
            decline_policy: DeclinePolicy::SuppressTurn,
            ..EngineConfig::default()
        };
        let mut flow = PlanFlow::new("alice", PlanBuffer::default(), &config);
        flow.apply(FlowEvent::PlayerRefreshed { turn_index: 1 }).unwrap();
        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        flow.apply(FlowEvent::Decline).unwrap();

        assert!(flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap().is_empty());
        assert_eq!(flow.phase(), TurnPhase::Idle);

        flow.apply(FlowEvent::PlayerRefreshed { turn_index: 2 }).unwrap();
        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        assert_eq!(flow.phase(), TurnPhase::AwaitingDecision);
    }

    #[test]
    fn default_policy_reopens_next_offer() {
        let mut flow = flow();
        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        flow.apply(FlowEvent::Decline).unwrap();
        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        assert_eq!(flow.phase(), TurnPhase::AwaitingDecision);
    }

    #[test]
    fn edit_window_takes_larger_of_remainder_and_window() {
        let mut flow = flow();
        complete_baseline(&mut flow);

        flow.apply(FlowEvent::YourTurn(TurnWindowConfig::new(5, 6)))
            .unwrap();
        let effects = flow.apply(FlowEvent::Accept).unwrap();
        let handle = started(&effects, ClockKind::Edit);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();

        // Saved 5 seconds beat a 2 second window.
        open_editor(&mut flow);
        assert_eq!(flow.edit_remaining(), Some(5));
        flow.apply(FlowEvent::Submit).unwrap();
    }

    #[test]
    fn remainder_shorter_than_window_is_topped_up() {
        let mut flow = flow();
        complete_baseline(&mut flow);
        let handle = open_editor(&mut flow);
        flow.apply(FlowEvent::Tick(handle)).unwrap();
        let effects = flow.apply(FlowEvent::Submit).unwrap();
        let ticket = submitted(&effects).unwrap().ticket;
        flow.apply(FlowEvent::SubmissionFinished {
            ticket,
            result: Ok(()),
        })
        .unwrap();

        open_editor(&mut flow);
        assert_eq!(flow.edit_remaining(), Some(2));
    }

    #[test]
    fn channel_log_drives_offers_and_banner() {
        let mut flow = flow();
        let mut log = vec![ChannelMessage {
            sender: "GM".into(),
            kind: MessageKind::Chat,
            content: "alice".into(),
            timestamp: None,
        }];
        let effects = flow.observe_channel(&log, WINDOWS).unwrap();
        started(&effects, ClockKind::Decision);
        assert_eq!(flow.banner(), Some("alice"));

        // Same log again: nothing replays.
        assert!(flow.observe_channel(&log, WINDOWS).unwrap().is_empty());

        log.push(ChannelMessage {
            sender: "bob".into(),
            kind: MessageKind::Chat,
            content: "hello".into(),
            timestamp: None,
        });
        let effects = flow.observe_channel(&log, WINDOWS).unwrap();
        assert_eq!(effects, vec![Effect::StopTicker(ClockKind::Decision)]);
        assert_eq!(flow.phase(), TurnPhase::Idle);
        assert_eq!(flow.banner(), Some("alice"));
    }

    #[test]
    fn shutdown_stops_running_clocks() {
        let mut flow = flow();
        flow.apply(FlowEvent::YourTurn(WINDOWS)).unwrap();
        assert_eq!(
            flow.shutdown(),
            vec![Effect::StopTicker(ClockKind::Decision)]
        );
        assert_eq!(flow.phase(), TurnPhase::Idle);
        assert!(flow.shutdown().is_empty());
    }
}

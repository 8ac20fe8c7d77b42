use thiserror::Error;

use crate::flow::TurnPhase;

/// Failure talking to the game server. Always recoverable: the caller keeps
/// its state and the next attempt retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("parse error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Short label for the inline indicator next to the submit button.
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Network(_) => "Connection lost, try again",
            Self::Status { status } if *status >= 500 => "Server error, try again",
            Self::Status { .. } => "Request rejected, try again",
            Self::Decode(_) => "Unexpected reply, try again",
        }
    }
}

/// An input the plan flow refused. Refusals never change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("no revision offer is pending (phase: {phase:?})")]
    NoOfferPending { phase: TurnPhase },
    #[error("the plan cannot be edited while {phase:?}")]
    BufferLocked { phase: TurnPhase },
    #[error("nothing can be submitted while {phase:?}")]
    SubmitUnavailable { phase: TurnPhase },
}

/// Where the shell should send the user when a prerequisite is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Entry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no active player identity")]
    MissingPlayer,
    #[error("no current map reference")]
    MissingMap,
}

impl SessionError {
    pub const fn redirect(self) -> Redirect {
        match self {
            Self::MissingPlayer | Self::MissingMap => Redirect::Entry,
        }
    }
}

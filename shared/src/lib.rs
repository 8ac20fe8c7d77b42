pub mod clock;
pub mod colors;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod gateway;
pub mod hex;
pub mod map;
pub mod player;
pub mod storage;
pub mod time_format;
pub mod viewport;

pub use clock::{ClockEvent, ClockHandle, ClockKind, TurnClock, TurnWindowConfig};
pub use config::{DeclinePolicy, EngineConfig};
pub use error::{FlowError, GatewayError, Redirect, SessionError};
pub use events::{ChannelMessage, MessageKind, TurnSignal, GAME_MASTER};
pub use flow::{
    Effect, FlowEvent, PlanBuffer, PlanFlow, SubmissionKind, SubmissionRequest, SubmissionTicket,
    SubmitTrigger, TurnPhase,
};
pub use gateway::{run_submission, PlanGateway};
pub use hex::{GridAddress, HexLayout, Terrain};
pub use map::{CellDescription, LandResponse, MapCell, MapCellIndex, MapSnapshot};
pub use player::{PlayerResponse, PlayerState};
pub use storage::{DraftStore, KeyValueStore, MemoryStore, Session};
pub use viewport::{Viewport, ViewportConfig, ZoomDirection};

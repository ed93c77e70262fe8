//! Race domain model: stages, per-part competitor state, the session
//! aggregate and its snapshots.

mod part;
mod session;
mod snapshot;
mod stage;

pub use part::{
    ActivityEntry, ActivityLog, AgentResult, CompetitorState, CompetitorStatus, Part, PartState,
    StageEvent, Winner, ACTIVITY_LOG_CAPACITY, MAX_MESSAGE_CHARS,
};
pub use session::{Generation, RaceId, RaceSession, RaceStatus, SessionParams};
pub use snapshot::{AgentSnapshot, HumanSnapshot, PartSnapshot, RaceSnapshot};
pub use stage::{compute_progress, Stage, STAGE_WEIGHTS};

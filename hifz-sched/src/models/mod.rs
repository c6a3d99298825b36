//! Domain models for the scheduling core

pub mod ayah;
pub mod event;
pub mod fluency;
pub mod item_state;
pub mod session;
pub mod transition;
pub mod user;

pub use ayah::Ayah;
pub use event::{EventType, NewReviewEvent, ReviewEvent, SessionType, StepType};
pub use fluency::{FluencyGateTest, FluencyTestStatus};
pub use item_state::{ItemStatus, ReviewTier, UserItemState};
pub use session::{DailySession, QueueMode, SessionRun, SessionStatus};
pub use transition::TransitionScore;
pub use user::{PriorJuzBand, ProgramVariant, ScaffoldingLevel, TajwidConfidence, User};

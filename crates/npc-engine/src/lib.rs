//! NPC Engine - background activity for simulated characters
//!
//! Architecture:
//! - Personalities weight which action an NPC prefers
//! - The selector adjusts those weights for the NPC's energy and rolls one action
//! - Executors validate the action against world state and commit it atomically
//! - The batch orchestrator drives a bounded number of distinct NPCs per call

pub mod batch;
pub mod error;
pub mod executors;
pub mod personality;
pub mod selector;

pub use batch::{
    ActionRecord, ActivityEngine, BatchConfig, BatchReport, ExcludedCharacter,
    DEFAULT_ACTIVITY_COUNT, DEFAULT_ACTIVITY_TYPES, DEFAULT_MARKET_VOLATILITY,
};
pub use error::{EngineError, EngineResult};
pub use executors::{ActionResult, LocationBias, Outcome, SkipReason, WorldSnapshot};
pub use personality::Personality;
pub use selector::select_action;

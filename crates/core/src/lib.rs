//! CARX Core - Shared data models, static tables, and errors

pub mod activities;
pub mod errors;
pub mod levels;
pub mod models;

pub use activities::ActivityKind;
pub use errors::{Error, Result};
pub use levels::{current_level, level_definition, max_level, LevelDefinition, RewardTemplate, ACHIEVEMENT_LEVELS};
pub use models::*;

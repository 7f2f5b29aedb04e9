//! Data models for the achievements engine

mod achievement;
mod exchange;
mod reward;
mod xp;

pub use achievement::*;
pub use exchange::*;
pub use reward::*;
pub use xp::*;

//! CARX Engine - XP ledger, achievements, rewards, and the exchange market

pub mod catalog;
pub mod codes;
pub mod service;

pub use service::AchievementsService;

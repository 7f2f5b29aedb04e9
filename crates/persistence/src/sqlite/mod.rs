//! SQLite database management

mod activities;
mod balances;
mod connection;
mod exchange;
mod rewards;

pub use activities::*;
pub use balances::*;
pub use connection::Database;
pub use exchange::*;
pub use rewards::*;
